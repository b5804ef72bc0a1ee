use std::future::Future;

use anyhow::Context;
use serde::Serialize;

use crate::models::candle::Candle;

const HYPERLIQUID_API_URL: &str = "https://api.hyperliquid.xyz/info";
const DAY_MS: u64 = 86_400_000;

/// Supplies daily closes, oldest first, for a symbol
pub trait PriceSource: Send + Sync + 'static {
    fn daily_closes(
        &self,
        symbol: &str,
        lookback_days: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<f64>>> + Send;
}

#[derive(Debug, Serialize)]
struct CandleRequest {
    #[serde(rename = "type")]
    request_type: String,
    req: CandleRequestInner,
}

#[derive(Debug, Serialize)]
struct CandleRequestInner {
    coin: String,
    interval: String,
    #[serde(rename = "startTime")]
    start_time: u64,
    #[serde(rename = "endTime")]
    end_time: u64,
}

#[derive(Clone)]
pub struct HyperliquidClient {
    client: reqwest::Client,
}

impl HyperliquidClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch candles for a coin within a time range
    pub async fn fetch_candles(
        &self,
        coin: &str,
        interval: &str,
        start_time: u64,
        end_time: u64,
    ) -> Result<Vec<Candle>, reqwest::Error> {
        let request = CandleRequest {
            request_type: "candleSnapshot".to_string(),
            req: CandleRequestInner {
                coin: coin.to_string(),
                interval: interval.to_string(),
                start_time,
                end_time,
            },
        };

        self.client
            .post(HYPERLIQUID_API_URL)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Candle>>()
            .await
    }

    /// Fetch the last `lookback_days` daily closes, oldest first
    pub async fn fetch_daily_closes(
        &self,
        coin: &str,
        lookback_days: usize,
    ) -> Result<Vec<f64>, reqwest::Error> {
        let now = chrono::Utc::now().timestamp_millis() as u64;
        let (start_time, end_time) = daily_range(now, lookback_days);

        let candles = self.fetch_candles(coin, "1d", start_time, end_time).await?;
        Ok(closes_in_order(candles))
    }
}

impl Default for HyperliquidClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSource for HyperliquidClient {
    async fn daily_closes(&self, symbol: &str, lookback_days: usize) -> anyhow::Result<Vec<f64>> {
        self.fetch_daily_closes(symbol, lookback_days)
            .await
            .with_context(|| format!("failed to fetch daily candles for {symbol}"))
    }
}

fn daily_range(now_ms: u64, days: usize) -> (u64, u64) {
    let span = DAY_MS.saturating_mul(days as u64);
    (now_ms.saturating_sub(span), now_ms)
}

fn closes_in_order(mut candles: Vec<Candle>) -> Vec<f64> {
    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);
    candles.into_iter().map(|c| c.close).collect()
}
