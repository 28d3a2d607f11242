//! Service discovery
//!
//! Static lookup from a segment name and protocol to an endpoint, built once
//! from the `serviceDiscovery` section of the cluster configuration and never
//! mutated afterwards.

use conveyor_core::Endpoint;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::warn;

/// Discovery entry for one segment service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceEntry {
    /// Endpoints keyed by protocol (`http`, `eventbus`, ...)
    #[serde(default)]
    pub endpoints: HashMap<String, Endpoint>,
}

/// Reads a `serviceDiscovery` section, skipping malformed entries
///
/// A segment that is not an object, or an endpoint without a usable
/// `address`, is logged and left out; the rest of the table still loads.
pub(crate) fn lenient_services<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, ServiceEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, JsonValue>::deserialize(deserializer)?;
    let mut services = HashMap::with_capacity(raw.len());

    for (segment, value) in raw {
        let JsonValue::Object(mut entry) = value else {
            warn!("Ignoring service discovery entry '{}': not an object", segment);
            continue;
        };

        let mut endpoints = HashMap::new();
        if let Some(JsonValue::Object(raw_endpoints)) = entry.remove("endpoints") {
            for (protocol, endpoint) in raw_endpoints {
                match Endpoint::deserialize(endpoint) {
                    Ok(endpoint) => {
                        endpoints.insert(protocol, endpoint);
                    }
                    Err(e) => {
                        warn!(
                            "Ignoring {} endpoint of segment '{}': {}",
                            protocol, segment, e
                        );
                    }
                }
            }
        }

        services.insert(segment, ServiceEntry { endpoints });
    }

    Ok(services)
}

/// Read-only segment name resolver
#[derive(Debug, Clone, Default)]
pub struct ServiceDiscovery {
    services: HashMap<String, ServiceEntry>,
}

impl ServiceDiscovery {
    /// Protocol used when dispatching pipes
    pub const HTTP: &'static str = "http";

    pub fn new(services: HashMap<String, ServiceEntry>) -> Self {
        if services.is_empty() {
            warn!("Empty service discovery configured!");
        }
        Self { services }
    }

    /// All endpoints known for a segment, keyed by protocol
    ///
    /// Unknown segments yield an empty map.
    pub fn resolve_all(&self, segment: &str) -> HashMap<String, Endpoint> {
        self.services
            .get(segment)
            .map(|entry| entry.endpoints.clone())
            .unwrap_or_default()
    }

    /// The endpoint for a segment and protocol, if one is configured
    pub fn resolve(&self, segment: &str, protocol: &str) -> Option<Endpoint> {
        self.services
            .get(segment)
            .and_then(|entry| entry.endpoints.get(protocol))
            .cloned()
    }

    /// Names of all configured segment services, sorted
    pub fn segments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
