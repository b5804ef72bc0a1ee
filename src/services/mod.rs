pub mod export;
pub mod hyperliquid;
pub mod screener;
