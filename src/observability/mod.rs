// Observability: metrics recorded during generation and submission

pub mod metrics;

pub use metrics::{init, render, write_to_file};
