//! Sandbox server
//!
//! Configuration comes from the file named by `INVADER_CONFIG` (TOML or
//! JSON), then `.env` and `INVADER_*` variables, for example
//! `INVADER_PAGSEGURO__TOKEN`. Payments are kept in memory; the cart id is
//! read from the `sess-cart-id` header.

use invader::prelude::*;
use invader::sandbox;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    invader_log::init();
    invader_log::install_log_bridge();

    let config = ConfigManager::from_default_env();
    if let Ok(path) = std::env::var("INVADER_CONFIG") {
        config.load_file_auto(&path)?;
    }
    config.load_dotenv(None)?;

    let server: ServerConfig = config.section_or_default("server")?;
    let payment = InvaderPaymentService::new(
        Arc::new(sandbox::demo_payables()),
        Arc::new(sandbox::demo_store()),
    );
    let router = sandbox::router(&config, payment)?;

    Application::new(router).listen(&server).await?;
    Ok(())
}
