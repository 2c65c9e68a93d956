//! services/api/src/lib.rs
//!
//! The library crate backing the `api` binary: configuration, the error
//! taxonomy, the port adapters, and the web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
