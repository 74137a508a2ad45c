pub mod builder;
pub mod clock;
pub mod config;
pub mod config_store;
pub mod duration;
pub mod error;
pub mod history;
pub mod market_data;
pub mod metric;
pub mod models;
pub mod refresh;
pub mod service;
pub mod staleness;

pub use builder::TrackerServiceBuilder;
pub use error::TrackerError;
pub use service::TrackerService;
