//! Inbound adapters: fixture loading for the demo CLI.

pub mod json;
