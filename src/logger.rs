use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init_tracing(level: LevelFilter, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("sqlx=warn".parse()?)
        .add_directive("tower_http=info".parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    }

    Ok(())
}
