use regional_agent::{chat, AgentService, AppConfig};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("regional_agent=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = AgentService::start(AppConfig::from_env());

    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = chat::run(&service, stdin, tokio::io::stdout()).await {
        tracing::error!("Terminal session ended: {}", e);
        std::process::exit(1);
    }
}
