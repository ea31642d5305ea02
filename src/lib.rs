pub mod config;
pub mod constants;
pub mod error;
pub mod id_pool;
pub mod logging;
pub mod parser;
pub mod schema;
pub mod validation;

// Layered boundaries: ports in app, adapters in infra
pub mod app;
pub mod infra;

pub mod generators;
pub mod observability;
