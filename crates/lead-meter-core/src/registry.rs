//! Client registry.
//!
//! Maps CRM client identifiers to billing targets. Built once at startup from
//! a JSON object such as
//! `{"roofco": "si_999", "plumbco": "leads_created:cus_123"}`
//! and never mutated afterwards; changing the mapping requires a restart.

use std::collections::HashMap;

use crate::error::{RelayError, Result};
use crate::ids::BillingTarget;

/// Read-only client → billing target mapping.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    targets: HashMap<String, BillingTarget>,
}

impl ClientRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Strictly parse a JSON object of string values.
    ///
    /// Entries whose target is empty or not a recognised target form are
    /// dropped, so lookups for them fail the same way as for unmapped clients.
    pub fn try_from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        let map: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(map.into_iter().collect())
    }

    /// Parse a JSON mapping, degrading to an empty registry when malformed.
    ///
    /// A malformed mapping is logged as a warning rather than treated as
    /// fatal; every lookup against the resulting registry fails.
    #[must_use]
    pub fn from_json(raw: &str) -> Self {
        match Self::try_from_json(raw) {
            Ok(registry) => {
                tracing::info!(clients = registry.len(), "Client registry loaded");
                registry
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Client map is not a valid JSON object of strings; using empty registry"
                );
                Self::empty()
            }
        }
    }

    /// Resolve a client to its billing target. Exact, case-sensitive match.
    pub fn resolve(&self, client_id: &str) -> Result<&BillingTarget> {
        self.targets
            .get(client_id)
            .ok_or_else(|| RelayError::UnknownClient {
                client_id: client_id.to_string(),
            })
    }

    /// Number of mapped clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no client is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ClientRegistry
where
    K: Into<String>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let targets = iter
            .into_iter()
            .filter_map(|(client, target)| {
                let client: String = client.into();
                let raw = target.as_ref();
                match BillingTarget::parse(raw) {
                    Some(target) => Some((client, target)),
                    None => {
                        if !raw.is_empty() {
                            tracing::warn!(
                                client_id = %client,
                                target = %raw,
                                "Unrecognised billing target; expected si_<id> or <event_name>:<customer>"
                            );
                        }
                        None
                    }
                }
            })
            .collect();
        Self { targets }
    }
}
