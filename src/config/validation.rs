//! Configuration validation.
//!
//! Semantic checks on top of what serde enforces. Returns every problem
//! found, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, StoreKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("mapping_store.url: {0}")]
    InvalidStoreUrl(String),

    #[error("mapping_store.{0} must not be empty")]
    EmptyStoreField(&'static str),

    #[error("mapping_store.hosts[{index}]: host_url must not be empty")]
    EmptyHost { index: usize },

    #[error("mapping_store.hosts: duplicate host {0}")]
    DuplicateHost(String),

    #[error("mapping_store.hosts: host {0} has no targets")]
    NoTargets(String),

    #[error("resolver.cache.ttl_secs must be greater than zero")]
    ZeroCacheTtl,
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let store = &config.mapping_store;
    match store.kind {
        StoreKind::Http => {
            if store.url.is_empty() {
                errors.push(ValidationError::EmptyStoreField("url"));
            } else if let Err(e) = Url::parse(&store.url) {
                errors.push(ValidationError::InvalidStoreUrl(e.to_string()));
            }
            if store.database.is_empty() {
                errors.push(ValidationError::EmptyStoreField("database"));
            }
            if store.collection.is_empty() {
                errors.push(ValidationError::EmptyStoreField("collection"));
            }
        }
        StoreKind::File => {
            if store.path.is_empty() {
                errors.push(ValidationError::EmptyStoreField("path"));
            }
        }
        StoreKind::Static => {
            let mut seen = HashSet::new();
            for (index, host) in store.hosts.iter().enumerate() {
                if host.host.is_empty() {
                    errors.push(ValidationError::EmptyHost { index });
                    continue;
                }
                if !seen.insert(host.host.as_str()) {
                    errors.push(ValidationError::DuplicateHost(host.host.clone()));
                }
                if host.targets.is_empty() {
                    errors.push(ValidationError::NoTargets(host.host.clone()));
                }
            }
        }
    }

    if config.resolver.cache.enabled && config.resolver.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroCacheTtl);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::HostMapping;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.mapping_store.kind = StoreKind::Static;
        config.mapping_store.hosts = vec![
            HostMapping::new("a.test", vec!["localhost:1".into()]),
            HostMapping::new("a.test", vec![]),
            HostMapping::new("", vec!["localhost:2".into()]),
        ];
        config.resolver.cache.enabled = true;
        config.resolver.cache.ttl_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "listener.bind_address",
                    value: "not-an-address".into(),
                },
                ValidationError::DuplicateHost("a.test".into()),
                ValidationError::NoTargets("a.test".into()),
                ValidationError::EmptyHost { index: 2 },
                ValidationError::ZeroCacheTtl,
            ]
        );
    }

    #[test]
    fn test_http_store_fields() {
        let mut config = GatewayConfig::default();
        config.mapping_store.url = "::not a url".into();
        config.mapping_store.collection.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::InvalidStoreUrl(_)));
        assert_eq!(errors[1], ValidationError::EmptyStoreField("collection"));
    }

    #[test]
    fn test_file_store_requires_path() {
        let mut config = GatewayConfig::default();
        config.mapping_store.kind = StoreKind::File;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::EmptyStoreField("path")]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
