use pathquill::PathquillConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn").add_directive(
            "pathquill=info"
                .parse()
                .expect("static directive always parses"),
        )
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = PathquillConfig::load(None)?;
    pathquill::web::serve(config).await?;
    Ok(())
}
