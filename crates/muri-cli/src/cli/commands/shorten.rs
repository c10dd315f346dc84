//! Shorten command handler.

use anyhow::Result;
use muri_core::api::ApiClient;
use muri_core::config::Config;

pub async fn run(config: &Config, url: &str) -> Result<()> {
    let api = ApiClient::new(config)?;
    let short = api.shorten(url).await?;
    println!("{short}");
    Ok(())
}
