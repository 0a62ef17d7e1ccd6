use anyhow::Result;
use holdscraper::{config::Settings, pipeline};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) settings ─────────────────────────────────────────────────
    let settings = Settings::from_env();
    info!(
        root = %settings.root.display(),
        sources = %settings.sources_path.display(),
        "settings loaded"
    );

    // ─── 3) fetch, snapshot and diff every source ────────────────────
    // per-source failures are already logged by the pipeline
    let report = pipeline::run_all(&settings).await?;

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "all done"
    );
    Ok(())
}
