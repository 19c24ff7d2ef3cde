//! Bid submission transport: HTTP POST to an endpoint identified at
//! configuration time, query parameters `capacity`, `price`, and (for
//! day-ahead) `hour` (spec.md §6). Non-200 responses are logged and treated
//! as non-fatal — bid submission never blocks the dispatch loop on a retry.

use async_trait::async_trait;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub enum BidKind {
    FastDispatch,
    DayAhead { hour: u32 },
}

#[async_trait]
pub trait BidTransport: Send + Sync {
    async fn submit_bid(&self, kind: BidKind, capacity_kwh: f64, price: f64) -> anyhow::Result<()>;
}

/// Production transport: HTTP POST with query parameters, per spec.md §6.
pub struct HttpBidTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBidTransport {
    pub fn new(endpoint: String, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build bid transport HTTP client: {e}"))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl BidTransport for HttpBidTransport {
    async fn submit_bid(&self, kind: BidKind, capacity_kwh: f64, price: f64) -> anyhow::Result<()> {
        let mut query = vec![
            ("capacity".to_string(), capacity_kwh.to_string()),
            ("price".to_string(), price.to_string()),
        ];
        if let BidKind::DayAhead { hour } = kind {
            query.push(("hour".to_string(), hour.to_string()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("bid submission request failed: {e}"))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), endpoint = %self.endpoint, "bid submission returned a non-200 response");
        }
        Ok(())
    }
}

/// Test/offline fake that records every submitted bid instead of sending it.
#[derive(Default)]
pub struct RecordingBidTransport {
    pub submitted: tokio::sync::Mutex<Vec<(BidKindRecord, f64, f64)>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BidKindRecord {
    FastDispatch,
    DayAhead(u32),
}

#[async_trait]
impl BidTransport for RecordingBidTransport {
    async fn submit_bid(&self, kind: BidKind, capacity_kwh: f64, price: f64) -> anyhow::Result<()> {
        let record = match kind {
            BidKind::FastDispatch => BidKindRecord::FastDispatch,
            BidKind::DayAhead { hour } => BidKindRecord::DayAhead(hour),
        };
        self.submitted.lock().await.push((record, capacity_kwh, price));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_transport_captures_fast_dispatch_bids() {
        let transport = RecordingBidTransport::default();
        transport.submit_bid(BidKind::FastDispatch, 2.5, 0.6).await.unwrap();
        let submitted = transport.submitted.lock().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], (BidKindRecord::FastDispatch, 2.5, 0.6));
    }
}
