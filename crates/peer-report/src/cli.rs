use crate::settings::Settings;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "peer-report",
    about = "Per-peer forwarding activity report from channel and forwarding snapshots",
    version,
    author
)]
pub struct Cli {
    /// Path to a TOML settings file (defaults to config/default.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Channel snapshot (listchannels JSON)
    #[arg(long)]
    pub channels: Option<PathBuf>,

    /// Forwarding snapshot (fwdinghistory JSON)
    #[arg(long)]
    pub forwarding: Option<PathBuf>,

    /// Output path for the report CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Applies CLI overrides (if any) on top of file and environment settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(log_level) = &self.log_level {
            settings.log_level = log_level.clone();
        }
        if let Some(channels) = &self.channels {
            settings.report.channels_path = channels.clone();
        }
        if let Some(forwarding) = &self.forwarding {
            settings.report.forwarding_path = forwarding.clone();
        }
        if let Some(output) = &self.output {
            settings.report.output_path = output.clone();
        }
    }
}
