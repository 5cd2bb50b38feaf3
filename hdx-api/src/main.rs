use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = hdx_api::config::load()?;
    let ax = hdx_api::build(&settings).await?;

    let addr = settings.addr();
    info!(%addr, suffix = %settings.gateway.domain_suffix, prefix = %settings.gateway.path_prefix, "starting hdx-api");

    ax.listen(addr).await?;

    Ok(())
}
