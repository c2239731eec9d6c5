pub mod aggregator;
pub mod cli;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod report;
pub mod resolver;
pub mod settings;
pub mod snapshot;
