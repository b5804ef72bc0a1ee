//! Head-and-shoulders screener.
//!
//! The detection core lives in [`business_logic`] and is a pure function of a
//! close series; everything else fetches prices, screens symbol lists and
//! serves results over HTTP.

pub mod business_logic;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

pub use business_logic::head_and_shoulders::{detect, HeadShouldersDetector, PatternResult};
