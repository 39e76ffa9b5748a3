use lsp_mux::{RuntimeConfig, build_service};
use tower_lsp_server::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // stdout carries the protocol stream
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = RuntimeConfig::from_env();
    tracing::info!("starting {} {}", config.name, config.version);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = build_service(config, |_| {});

    Server::new(stdin, stdout, socket).serve(service).await;
}
