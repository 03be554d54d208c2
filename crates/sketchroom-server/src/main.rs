//! SketchRoom server binary.

use sketchroom_server::{ServerConfig, ServerError};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchroom_server=info,tower_http=info".into()),
        )
        .init();

    let result = match ServerConfig::from_env() {
        Ok(config) => sketchroom_server::serve(config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        error!("Server stopped: {}", e);
    }
    result
}
