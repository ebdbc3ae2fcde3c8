//! Reports Tableau Server users who have been inactive on every site they
//! belong to, and records them in a database table.
//!
//! A pass signs in with a personal access token, walks every site, merges
//! each site's stale users by name, and upserts the result without ever
//! moving a stored last login backwards. See [`jobs::run_sync`].

pub mod config;
pub mod db;
pub mod jobs;
pub mod models;
#[cfg(feature = "native")]
pub mod observability;
pub mod report;
pub mod rest;
pub mod services;
