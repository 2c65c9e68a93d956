//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use goodhands_core::ports::{CareStore, PhotoStore, ReportSynthesisService};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CareStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub ai: Arc<dyn ReportSynthesisService>,
    pub config: Arc<Config>,
}
