//! Tableau Server REST API client.

mod client;
mod error;
mod types;

pub use client::TableauClient;
pub use error::{RestError, RestResult};
