use clap::Parser;
use miette::{IntoDiagnostic, Result};
use vendproxy::application::flow::PaymentFlowController;
use vendproxy::application::gateway::GatewayClient;
use vendproxy::config::HostConfig;
use vendproxy::domain::ports::{SessionStoreBox, TerminalRegistryBox};
use vendproxy::infrastructure::http::HttpGatewayTransport;
use vendproxy::infrastructure::in_memory::InMemorySessionStore;
use vendproxy::infrastructure::sqlite::SqliteTerminalRegistry;
use vendproxy::interfaces::cli::{Cli, execute};
use vendproxy::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.host.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    cli.host.apply(&mut config);
    config.validate()?;

    init_logging(&config.log_level, config.log_format);

    let registry = SqliteTerminalRegistry::connect_with_retry(
        &config.database.url,
        config.database.max_connections,
        &config.database.retry_policy(),
    )
    .await
    .into_diagnostic()?;
    let registry: TerminalRegistryBox = Box::new(registry);
    let sessions = open_sessions(&config)?;

    let transport = HttpGatewayTransport::new(&config.gateway.url, config.gateway.timeout())
        .into_diagnostic()?;
    let gateway = GatewayClient::new(Box::new(transport), &config.gateway.version);

    let controller = PaymentFlowController::new(registry, sessions, gateway);
    let response = execute(&controller, cli.command).await;

    println!("{}", serde_json::to_string(&response).into_diagnostic()?);
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_sessions(config: &HostConfig) -> Result<SessionStoreBox> {
    use vendproxy::infrastructure::rocksdb::RocksDbSessionStore;

    match &config.session.path {
        Some(path) => {
            let store = RocksDbSessionStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemorySessionStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_sessions(config: &HostConfig) -> Result<SessionStoreBox> {
    if config.session.path.is_some() {
        tracing::warn!(
            "WARNING: --session-path provided but 'storage-rocksdb' feature is disabled. Falling back to in-memory session storage."
        );
    }
    Ok(Box::new(InMemorySessionStore::new()))
}
