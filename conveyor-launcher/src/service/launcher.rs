//! Pipe launcher
//!
//! Starts pipes by sending them to their entry segment:
//! - Look the pipe up in the catalog (or take a caller-supplied pipe)
//! - Work on a private copy; the catalog entry is never touched
//! - Fill in missing segment endpoints from service discovery
//! - Attach the payload to the entry segment
//! - Send the whole pipe as JSON to the entry endpoint, exactly once

use conveyor_client::SegmentClient;
use conveyor_core::{Endpoint, Payload, Pipe};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::catalog::{PipeCatalog, RebuildReport};
use crate::discovery::ServiceDiscovery;
use crate::error::{LaunchError, Result};
use crate::scheduler::Reconciler;

/// Dispatch engine bound to one catalog and one discovery table
pub struct PipeLauncher {
    catalog: Arc<PipeCatalog>,
    discovery: Arc<ServiceDiscovery>,
    client: SegmentClient,
}

impl PipeLauncher {
    pub fn new(
        catalog: Arc<PipeCatalog>,
        discovery: Arc<ServiceDiscovery>,
        client: SegmentClient,
    ) -> Self {
        Self {
            catalog,
            discovery,
            client,
        }
    }

    pub fn catalog(&self) -> &Arc<PipeCatalog> {
        &self.catalog
    }

    // =============================================================================
    // Launching
    // =============================================================================

    /// Launch a catalogued pipe without payload
    pub async fn run_pipe(&self, name: &str) -> Result<()> {
        let pipe = self.require_pipe(name)?;
        self.dispatch(&pipe, None).await
    }

    /// Launch a catalogued pipe with text data
    pub async fn run_pipe_with_data(
        &self,
        name: &str,
        data: &str,
        mime_type: Option<&str>,
        info: Option<JsonValue>,
    ) -> Result<()> {
        let pipe = self.require_pipe(name)?;
        let payload = Payload::text(data, mime_type.map(str::to_string), info);
        self.dispatch(&pipe, Some(payload)).await
    }

    /// Launch a catalogued pipe with binary data, sent base64-encoded
    pub async fn run_pipe_with_binary_data(
        &self,
        name: &str,
        data: &[u8],
        mime_type: Option<&str>,
        info: Option<JsonValue>,
    ) -> Result<()> {
        let pipe = self.require_pipe(name)?;
        let payload = Payload::binary(data, mime_type.map(str::to_string), info);
        self.dispatch(&pipe, Some(payload)).await
    }

    /// Launch any pipe, catalogued or not
    ///
    /// # Errors
    /// - `NoSegments` / `EndpointUnresolved` before any request is made
    /// - `Rejected` when the entry endpoint answers with anything but 200 or 202
    /// - `Unreachable` when the entry endpoint cannot be reached
    pub async fn dispatch(&self, pipe: &Pipe, payload: Option<Payload>) -> Result<()> {
        let (prepared, endpoint) = self.prepare(pipe, payload)?;
        let document = serde_json::to_vec(&prepared)?;

        debug!(
            "Launching pipe '{}' via {} {}",
            prepared.name(),
            endpoint.method_or_default(),
            endpoint.address
        );

        self.client
            .send_document(&endpoint, document)
            .await
            .map_err(|e| {
                warn!("Launching pipe '{}' failed: {}", prepared.name(), e);
                LaunchError::from(e)
            })
    }

    /// Builds the request-scoped copy of a pipe that `dispatch` would send
    ///
    /// Returns the copy together with the entry segment's endpoint.
    pub fn prepare(&self, pipe: &Pipe, payload: Option<Payload>) -> Result<(Pipe, Endpoint)> {
        let mut prepared = pipe.clone();

        for segment in &mut prepared.body.segments {
            if segment.body.endpoint.is_none() {
                segment.body.endpoint = self
                    .discovery
                    .resolve(&segment.header.name, ServiceDiscovery::HTTP);
            }
        }

        let entry = prepared
            .entry_segment()
            .ok_or_else(|| LaunchError::NoSegments(pipe.name().to_string()))?;

        let endpoint = entry
            .body
            .endpoint
            .clone()
            .ok_or_else(|| LaunchError::EndpointUnresolved {
                segment: entry.name().to_string(),
            })?;

        if let Some(payload) = payload {
            prepared.attach_payload(payload);
        }

        Ok((prepared, endpoint))
    }

    fn require_pipe(&self, name: &str) -> Result<Pipe> {
        self.catalog
            .lookup(name)
            .ok_or_else(|| LaunchError::UnknownPipe(name.to_string()))
    }

    // =============================================================================
    // Catalog access
    // =============================================================================

    pub fn is_pipe_available(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    pub fn available_pipes(&self) -> Vec<Pipe> {
        self.catalog.list()
    }

    pub fn get_pipe(&self, name: &str) -> Option<Pipe> {
        self.catalog.lookup(name)
    }

    /// Rebuild the catalog now, on the blocking pool
    pub async fn reload(&self) -> std::result::Result<RebuildReport, JoinError> {
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || catalog.rebuild()).await
    }

    /// Start periodic repository synchronization in the background
    pub fn spawn_reconciler(&self, interval: Duration) -> JoinHandle<()> {
        Reconciler::new(Arc::clone(&self.catalog), interval).spawn()
    }
}
