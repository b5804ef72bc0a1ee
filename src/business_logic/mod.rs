pub mod config;
pub mod extrema;
pub mod head_and_shoulders;
pub mod score;
pub mod shape;
pub mod similarity;
