use serde::{Deserialize, Serialize};

/// Daily candle as returned by the candle snapshot endpoint.
/// Only the fields the screener needs are decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time (epoch ms)
    #[serde(rename = "t")]
    pub open_time: u64,
    /// Candle close time (epoch ms)
    #[serde(rename = "T")]
    pub close_time: u64,
    /// Close price
    #[serde(rename = "c", deserialize_with = "deserialize_string_to_f64")]
    pub close: f64,
}

fn deserialize_string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}
