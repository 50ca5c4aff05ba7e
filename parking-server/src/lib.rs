//! Corfu parking availability server.
//!
//! Serves real-time parking availability for streets in Corfu town from
//! an in-memory cache that a background task refreshes from a data
//! source (a static dataset or a remote API).

pub mod cache;
pub mod config;
pub mod domain;
pub mod providers;
pub mod service;
pub mod web;
