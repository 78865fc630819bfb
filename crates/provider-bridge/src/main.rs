//! provider-bridge: drives a provider bridge session over stdin/stdout.

mod driver;
mod output;

fn main() -> eyre::Result<()> {
    // Logs go to stderr; stdout carries the host protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = provider_bridge_adapters::BridgeConfig::from_env()?;
    tracing::info!(
        chain_id = config.chain_id,
        rpc_url = %config.rpc_url,
        "Starting provider bridge"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, driver::run(config))
}
