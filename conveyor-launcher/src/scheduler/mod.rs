//! Scheduler layer for the launcher
//!
//! Periodically pulls every pipe repository and rebuilds the catalog when
//! at least one of them moved.

pub mod reconciler;

pub use reconciler::Reconciler;
