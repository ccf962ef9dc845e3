//! Asset inventory dashboard backend.
//!
//! Keeps an optimistic in-process copy of the asset collection in sync with a
//! spreadsheet-backed record service and serves it to the dashboard front end.

pub mod config;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod settings;
pub mod store;
pub mod utils;
