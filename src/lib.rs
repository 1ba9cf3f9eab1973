pub mod api;
pub mod bubbles;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod validation;
pub mod web;

pub use error::{Error, Result};
