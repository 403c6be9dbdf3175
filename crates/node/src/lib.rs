pub mod config;
pub mod logging;
pub mod service;
pub mod worker;

pub use config::NodeConfig;
pub use service::Node;
pub use worker::MiningWorker;
