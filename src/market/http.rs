use super::MarketDataSource;
use crate::domain::ForecastSnapshot;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Wire shape of the market data source response, per spec.md §6: a
/// pull interface returning `prices` (24 numbers), `demand` (24 numbers),
/// `competitors` (integer), local timezone.
#[derive(Debug, Deserialize)]
struct MarketDataResponse {
    prices: Vec<f64>,
    demand: Vec<f64>,
    competitors: u32,
}

/// HTTP-polled market data source, following the teacher's
/// `ElprisetJustNuPriceForecaster` shape: a base URL plus a `reqwest`
/// client reused across calls.
pub struct HttpMarketDataSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketDataSource {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build market data HTTP client: {e}"))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn refresh(&self) -> anyhow::Result<ForecastSnapshot> {
        let response: MarketDataResponse = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("market data request failed: {e}"))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("market data endpoint returned an error status: {e}"))?
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("failed to parse market data response: {e}"))?;

        if response.prices.len() != 24 || response.demand.len() != 24 {
            anyhow::bail!(
                "market data response had {} prices and {} demand entries, expected 24 each",
                response.prices.len(),
                response.demand.len()
            );
        }

        let mut price_forecast = [0.0; 24];
        let mut grid_demand_forecast = [0.0; 24];
        price_forecast.copy_from_slice(&response.prices);
        grid_demand_forecast.copy_from_slice(&response.demand);

        Ok(ForecastSnapshot {
            price_forecast,
            grid_demand_forecast,
            num_competitors: response.competitors,
        })
    }
}
