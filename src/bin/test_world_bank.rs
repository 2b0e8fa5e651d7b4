// src/bin/test_world_bank.rs
use dotenv::dotenv;
use gdp_dashboard::config::AppConfig;
use gdp_dashboard::services::world_bank::{SeriesSource, WorldBankClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let client = WorldBankClient::from_config(&AppConfig::from_env())?;
    println!("URL:          {}", client.url());

    let series = client.fetch().await?;
    println!("Country:      {} ({})", series.country.value, series.country.id);
    println!("Indicator:    {}", series.indicator.value);
    println!("Last updated: {:?}", series.last_updated);
    println!("Years:        {:?}..{:?} ({} points)", series.first_year(), series.last_year(), series.len());
    for point in series.tail(5) {
        println!("  {}  {:.0}", point.year, point.value);
    }
    Ok(())
}
