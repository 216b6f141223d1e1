// src/services/mod.rs

pub mod debounce;
pub mod gateway;
pub mod http;

pub use debounce::Debouncer;
pub use gateway::DataGateway;
pub use http::HttpGateway;
