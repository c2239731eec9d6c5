use anyhow::Result;
use clap::Parser;
use peer_report::{cli::Cli, generator::ReportGenerator, settings::Settings};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::new(cli.config.as_ref())?;
    cli.apply(&mut settings);
    init_logging(&settings.log_level);

    info!(
        "Generating peer activity report from {} and {}",
        settings.report.channels_path.display(),
        settings.report.forwarding_path.display()
    );

    let output = ReportGenerator::new(settings).run().await?;
    info!("Report written to {}", output.display());
    Ok(())
}

fn init_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();
}
