//! APISIX MCP server library
//!
//! Exposes the Apache APISIX Admin API to Model Context Protocol clients as
//! a catalog of schema-validated tools.
//!
//! # Layers
//!
//! - [`schema`]: resource shapes, validation and partial updates
//! - [`dispatch`]: one validated command, one Admin API request
//! - [`batch`]: concurrent, order-preserving request fan-out to the data plane
//! - [`admin`]: HTTP transport and outcome normalization
//! - [`tools`] and [`server`]: the MCP surface over stdio

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging.
///
/// Logs go to stderr; stdout carries the protocol.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("tracing already initialized: {e}")))
}
