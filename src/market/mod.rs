pub mod http;
pub mod scripted;

use crate::domain::ForecastSnapshot;
use async_trait::async_trait;

pub use http::HttpMarketDataSource;
pub use scripted::ScriptedMarketDataSource;

/// Abstract capability supplying price/demand forecasts and competitor
/// count (C5). `refresh` may fail; on failure the caller must retain the
/// previous snapshot (spec.md §4.5, §7 "Stale forecast").
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<ForecastSnapshot>;
}
