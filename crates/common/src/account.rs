//! Per-account configuration registry.
//!
//! Each marketplace account carries its own token-source document and its
//! own mapping schema. Keeping these in a registry makes onboarding a new
//! account a data change rather than a code change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where an account's marketplace access token is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenSource {
    /// An HTML document whose body embeds the token between a `y>` marker
    /// and the following closing tag. `key` selects the `tk<key>.html`
    /// document under the token base URL.
    HtmlMarker { key: String },
    /// A JSON document of the shape `{"data": "<token>"}`. `key` selects
    /// the `tk<key>.txt` document under the token base URL.
    JsonDocument { key: String },
}

/// Configuration for one marketplace account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Canonical lowercase account name.
    pub name: String,
    /// Token-source document for this account.
    pub token_source: TokenSource,
    /// Database schema holding this account's item-mapping table.
    pub mapping_schema: String,
}

/// Registry of known accounts, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: HashMap<String, AccountConfig>,
}

impl AccountRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the accounts currently in production.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // The principal account publishes its token under the legacy "amz" key.
        registry.insert(AccountConfig {
            name: "principal".to_string(),
            token_source: TokenSource::HtmlMarker {
                key: "amz".to_string(),
            },
            mapping_schema: "principal".to_string(),
        });
        for name in ["oficial", "renault", "psa", "jeep"] {
            registry.insert(AccountConfig {
                name: name.to_string(),
                token_source: TokenSource::HtmlMarker {
                    key: name.to_string(),
                },
                mapping_schema: name.to_string(),
            });
        }
        registry.insert(AccountConfig {
            name: "ford".to_string(),
            token_source: TokenSource::JsonDocument {
                key: "ford".to_string(),
            },
            mapping_schema: "ford".to_string(),
        });
        registry
    }

    /// Adds or replaces an account.
    pub fn insert(&mut self, config: AccountConfig) {
        self.accounts.insert(config.name.to_lowercase(), config);
    }

    /// Looks up a registered account by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.get(&name.to_lowercase())
    }

    /// Resolves an account by name, falling back to the naming convention
    /// for accounts not yet registered: an HTML-marker token document keyed
    /// by the account name and the `principal` mapping schema.
    pub fn resolve(&self, name: &str) -> AccountConfig {
        let lower = name.to_lowercase();
        self.accounts.get(&lower).cloned().unwrap_or(AccountConfig {
            name: lower.clone(),
            token_source: TokenSource::HtmlMarker { key: lower },
            mapping_schema: "principal".to_string(),
        })
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no accounts are registered.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_maps_to_amz_token_key() {
        let registry = AccountRegistry::with_defaults();
        let config = registry.resolve("principal");
        assert_eq!(
            config.token_source,
            TokenSource::HtmlMarker {
                key: "amz".to_string()
            }
        );
        assert_eq!(config.mapping_schema, "principal");
    }

    #[test]
    fn ford_uses_json_token_source() {
        let registry = AccountRegistry::with_defaults();
        let config = registry.resolve("ford");
        assert!(matches!(config.token_source, TokenSource::JsonDocument { .. }));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = AccountRegistry::with_defaults();
        assert_eq!(registry.resolve("PSA").name, "psa");
        assert_eq!(registry.resolve("PSA").mapping_schema, "psa");
    }

    #[test]
    fn unknown_account_falls_back_to_convention() {
        let registry = AccountRegistry::with_defaults();
        let config = registry.resolve("newdealer");
        assert_eq!(
            config.token_source,
            TokenSource::HtmlMarker {
                key: "newdealer".to_string()
            }
        );
        assert_eq!(config.mapping_schema, "principal");
    }
}
