// Secondary registry mapping provider ids to provider metadata. Last write
// wins; listing is stable by id.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Metadata describing an external tool provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Stable provider id from name and version: `name[:version]`. Empty name
/// yields an empty id.
pub fn provider_id(name: &str, version: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    if version.is_empty() {
        return name.to_string();
    }
    format!("{name}:{version}")
}

/// Provider discovery operations.
pub trait ProviderStore: Send + Sync {
    /// Register a provider under the given id (derived from name/version
    /// when empty) and return the resolved id. Last write wins.
    fn register_provider(&self, id: &str, provider: ProviderInfo) -> Result<String>;

    /// Fetch a provider by id.
    fn describe_provider(&self, id: &str) -> Result<ProviderInfo>;

    /// All registered providers, sorted by id.
    fn list_providers(&self) -> Result<Vec<ProviderInfo>>;
}

#[derive(Default)]
pub struct InMemoryProviderStore {
    providers: RwLock<FxHashMap<String, ProviderInfo>>,
}

impl InMemoryProviderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderStore for InMemoryProviderStore {
    fn register_provider(&self, id: &str, provider: ProviderInfo) -> Result<String> {
        if provider.name.is_empty() {
            return Err(DiscoveryError::InvalidProvider {
                message: "provider name is required".into(),
            });
        }

        let id = if id.is_empty() {
            provider_id(&provider.name, &provider.version)
        } else {
            id.to_string()
        };
        if id.is_empty() {
            return Err(DiscoveryError::InvalidProviderId);
        }

        self.providers.write().insert(id.clone(), provider);
        Ok(id)
    }

    fn describe_provider(&self, id: &str) -> Result<ProviderInfo> {
        if id.is_empty() {
            return Err(DiscoveryError::InvalidProviderId);
        }
        self.providers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DiscoveryError::not_found(format!("provider {id}")))
    }

    fn list_providers(&self) -> Result<Vec<ProviderInfo>> {
        let providers = self.providers.read();
        let mut ids: Vec<&String> = providers.keys().collect();
        ids.sort();
        Ok(ids.into_iter().map(|id| providers[id].clone()).collect())
    }
}
