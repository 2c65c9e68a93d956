//! services/api/src/adapters/mod.rs
//!
//! Declares the concrete implementations of the `core` crate's ports.

pub mod db;
pub mod photos;
pub mod report_llm;
