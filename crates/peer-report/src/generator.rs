use crate::{
    aggregator::{PeerAggregates, aggregate},
    metrics::{ReportRow, rank},
    report::write_report,
    resolver::{HttpTxLookup, TimestampResolver, TxLookup},
    settings::Settings,
    snapshot::{ChannelSnapshot, ForwardingSnapshot},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct ReportGenerator {
    settings: Settings,
    now: Option<DateTime<Utc>>,
}

impl ReportGenerator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            now: None,
        }
    }

    /// Ages channels relative to `now` instead of the wall clock at generation time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Runs the full pipeline against the configured explorer and writes the CSV report.
    pub async fn run(&self) -> Result<PathBuf> {
        let lookup = HttpTxLookup::new(&self.settings.timestamp_service)
            .context("Failed to build timestamp service client")?;
        self.run_with_lookup(lookup).await
    }

    pub async fn run_with_lookup<L: TxLookup>(&self, lookup: L) -> Result<PathBuf> {
        let rows = self.generate(lookup).await?;

        let output = &self.settings.report.output_path;
        write_report(output, &rows)
            .with_context(|| format!("Could not write to {}", output.display()))?;

        Ok(output.clone())
    }

    /// Loads both snapshots before any lookup, so a bad input aborts without side effects.
    pub async fn generate<L: TxLookup>(&self, lookup: L) -> Result<Vec<ReportRow>> {
        let report = &self.settings.report;

        let channels = ChannelSnapshot::load(&report.channels_path)?
            .into_channels(&report.channels_path);
        let events = ForwardingSnapshot::load(&report.forwarding_path)?
            .into_events(&report.forwarding_path);
        info!(
            "Loaded {} channels and {} forwarding events",
            channels.len(),
            events.len()
        );

        let now = self.now.unwrap_or_else(Utc::now);
        let mut resolver = TimestampResolver::new(lookup, &self.settings.timestamp_service);
        let peers: PeerAggregates = aggregate(&channels, &events, &mut resolver, now).await;
        info!(
            "Aggregated {} peers ({} funding timestamps resolved)",
            peers.len(),
            resolver.cached()
        );

        Ok(rank(&peers))
    }
}
