pub mod aggregator;
pub mod matching;
pub mod ports;
