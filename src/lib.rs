//! Inspection Lineage Library
//!
//! Resolves the checklist an inspection inherits from its ancestor chain,
//! clones it into follow-ups, adjudicates task status and aggregates the
//! results. This module exports the core components for testing and
//! integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod store;
pub mod subscriptions;
pub mod types;
