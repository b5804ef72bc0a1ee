use std::sync::Arc;

use crate::business_logic::config::ScreenerConfig;
use crate::business_logic::head_and_shoulders::HeadShouldersDetector;
use crate::services::hyperliquid::HyperliquidClient;
use crate::services::screener::ScreenerService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ScreenerConfig>,
    pub detector: HeadShouldersDetector,
    pub screener: Arc<ScreenerService<HyperliquidClient>>,
}

impl AppState {
    pub fn new(config: ScreenerConfig, client: Arc<HyperliquidClient>) -> Self {
        let detector = HeadShouldersDetector::new(config.detector.clone());
        let screener = ScreenerService::new(client, &config).with_detector(detector.clone());

        Self {
            config: Arc::new(config),
            detector,
            screener: Arc::new(screener),
        }
    }
}
