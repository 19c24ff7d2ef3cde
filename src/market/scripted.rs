use super::MarketDataSource;
use crate::domain::ForecastSnapshot;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A pre-scripted sequence of refresh outcomes for deterministic tests.
/// Exhausting the script repeats its last outcome, following the same
/// replay-then-hold convention as `ScriptedBatteryBus`.
pub struct ScriptedMarketDataSource {
    script: Mutex<VecDeque<anyhow::Result<ForecastSnapshot>>>,
    last_ok: Mutex<ForecastSnapshot>,
}

impl ScriptedMarketDataSource {
    pub fn new(outcomes: impl IntoIterator<Item = anyhow::Result<ForecastSnapshot>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            last_ok: Mutex::new(ForecastSnapshot::empty()),
        }
    }

    pub fn always_succeeding(snapshot: ForecastSnapshot) -> Self {
        Self::new([Ok(snapshot)])
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarketDataSource {
    async fn refresh(&self) -> anyhow::Result<ForecastSnapshot> {
        let mut script = self.script.lock().await;
        match script.pop_front() {
            Some(Ok(snapshot)) => {
                *self.last_ok.lock().await = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last_ok.lock().await.clone()),
        }
    }
}
