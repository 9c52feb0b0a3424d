pub mod aggregate;
pub mod config;
pub mod csv;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod http_client;
pub mod logging;
pub mod migrate;
pub mod pipeline;
pub mod publish;
pub mod store;
