//! MDM Server - Main entry point

use anyhow::Result;
use mdm_common::logging::{init_logging, LogConfig};
use tracing::info;

use mdm_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("mdm-server".to_string())
        .filter_directives("mdm_server=debug,tower_http=debug,sqlx=info".to_string())
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting MDM import server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{} ({:?} store)",
        config.server.host, config.server.port, config.store
    );

    api::serve(config).await
}
