pub mod candle;
pub mod health;
pub mod pattern;
pub mod screener;
