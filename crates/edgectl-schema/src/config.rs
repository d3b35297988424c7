use crate::types::{Backend, Dictionary, Domain, Resource, ServiceId, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unknown field '{field}' in {section}")]
    UnknownField { section: String, field: String },
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("service '{0}' is declared more than once")]
    DuplicateService(String),
    #[error("service '{service}' has a {kind} with an empty name")]
    EmptyResourceName { service: String, kind: &'static str },
    #[error("service '{service}' declares {kind} '{name}' more than once")]
    DuplicateResource {
        service: String,
        kind: &'static str,
        name: String,
    },
    #[error("service '{service}': backend '{backend}' has an empty address")]
    EmptyBackendAddress { service: String, backend: String },
}

/// The local config file: one `[[service]]` table per managed service.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceConfig>,
}

/// Desired state of one service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    /// Pin the remote service by ID instead of looking it up by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServiceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, rename = "domain")]
    pub domains: Vec<Domain>,
    #[serde(default, rename = "backend")]
    pub backends: Vec<Backend>,
    #[serde(default, rename = "dictionary")]
    pub dictionaries: Vec<Dictionary>,
}

impl ConfigFile {
    /// Find a declared service by name, or by its pinned ID.
    pub fn service(&self, name_or_id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| {
            s.name == name_or_id || s.id.as_ref().is_some_and(|id| *id == *name_or_id)
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::EmptyServiceName);
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
            check_resources(&service.name, &service.domains)?;
            check_resources(&service.name, &service.backends)?;
            check_resources(&service.name, &service.dictionaries)?;
            if let Some(b) = service.backends.iter().find(|b| b.address.trim().is_empty()) {
                return Err(ConfigError::EmptyBackendAddress {
                    service: service.name.clone(),
                    backend: b.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn check_resources<R: Resource>(service: &str, resources: &[R]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for r in resources {
        if r.name().trim().is_empty() {
            return Err(ConfigError::EmptyResourceName {
                service: service.to_owned(),
                kind: R::KIND,
            });
        }
        if !seen.insert(r.name()) {
            return Err(ConfigError::DuplicateResource {
                service: service.to_owned(),
                kind: R::KIND,
                name: r.name().to_owned(),
            });
        }
    }
    Ok(())
}

// Resource types accept unknown keys so they can read API payloads; the
// config file is held to the declared field lists instead.
fn check_known_fields(table: &toml::Table) -> Result<(), ConfigError> {
    let Some(services) = table.get("service").and_then(toml::Value::as_array) else {
        return Ok(());
    };
    for service in services.iter().filter_map(toml::Value::as_table) {
        let label = service
            .get("name")
            .and_then(toml::Value::as_str)
            .unwrap_or("<unnamed>");
        if let Some(settings) = service.get("settings").and_then(toml::Value::as_table) {
            reject_unknown(&format!("service '{label}' settings"), settings, Settings::FIELDS)?;
        }
        for (key, fields) in [
            (Domain::KIND, Domain::FIELDS),
            (Backend::KIND, Backend::FIELDS),
            (Dictionary::KIND, Dictionary::FIELDS),
        ] {
            let entries = service.get(key).and_then(toml::Value::as_array);
            for entry in entries.into_iter().flatten().filter_map(toml::Value::as_table) {
                reject_unknown(&format!("service '{label}' {key}"), entry, fields)?;
            }
        }
    }
    Ok(())
}

fn reject_unknown(section: &str, table: &toml::Table, allowed: &[&str]) -> Result<(), ConfigError> {
    match table.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(field) => Err(ConfigError::UnknownField {
            section: section.to_owned(),
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

pub fn parse_config_str(input: &str) -> Result<ConfigFile, ConfigError> {
    let table: toml::Table = toml::from_str(input)?;
    check_known_fields(&table)?;
    let config: ConfigFile = toml::Value::Table(table).try_into()?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[[service]]
name = "edge-1"

[service.settings]
default_ttl = 3600

[[service.domain]]
name = "www.example.com"
comment = "primary"

[[service.domain]]
name = "static.example.com"

[[service.backend]]
name = "origin"
address = "origin.example.com"
port = 443
use_ssl = true

[[service.dictionary]]
name = "redirects"

[[service]]
name = "edge-2"
id = "7i6HN3TK9wS159v2gPAZ8A"
"#;

    #[test]
    fn parses_full_config() {
        let config = parse_config_str(FULL).expect("should parse");
        assert_eq!(config.services.len(), 2);
        let edge1 = &config.services[0];
        assert_eq!(edge1.domains.len(), 2);
        assert_eq!(edge1.domains[0].comment.as_deref(), Some("primary"));
        assert_eq!(edge1.backends[0].port, 443);
        assert!(edge1.backends[0].use_ssl);
        assert_eq!(edge1.dictionaries[0].name, "redirects");
        assert_eq!(edge1.settings.as_ref().unwrap().default_ttl, Some(3600));
    }

    #[test]
    fn backend_port_defaults_to_80() {
        let config = parse_config_str(
            r#"
[[service]]
name = "edge-1"

[[service.backend]]
name = "origin"
address = "10.0.0.1"
"#,
        )
        .unwrap();
        assert_eq!(config.services[0].backends[0].port, 80);
        assert!(!config.services[0].backends[0].use_ssl);
    }

    #[test]
    fn looks_up_service_by_name_or_pinned_id() {
        let config = parse_config_str(FULL).unwrap();
        assert_eq!(config.service("edge-1").unwrap().name, "edge-1");
        assert_eq!(
            config.service("7i6HN3TK9wS159v2gPAZ8A").unwrap().name,
            "edge-2"
        );
        assert!(config.service("edge-3").is_none());
    }

    #[test]
    fn empty_file_has_no_services() {
        let config = parse_config_str("").unwrap();
        assert!(config.services.is_empty());
    }

    #[test]
    fn rejects_unknown_service_field() {
        let input = r#"
[[service]]
name = "edge-1"
colour = "blue"
"#;
        assert!(matches!(
            parse_config_str(input),
            Err(ConfigError::ParseToml(_))
        ));
    }

    #[test]
    fn rejects_unknown_backend_field() {
        let input = r#"
[[service]]
name = "edge-1"

[[service.backend]]
name = "origin"
address = "origin.example.com"
use_sll = true
"#;
        let err = parse_config_str(input).unwrap_err();
        assert!(
            matches!(&err, ConfigError::UnknownField { field, .. } if field == "use_sll"),
            "got {err}"
        );
    }

    #[test]
    fn rejects_unknown_settings_field() {
        let input = r#"
[[service]]
name = "edge-1"

[service.settings]
default_tll = 10
"#;
        assert!(matches!(
            parse_config_str(input),
            Err(ConfigError::UnknownField { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_services() {
        let input = r#"
[[service]]
name = "edge-1"

[[service]]
name = "edge-1"
"#;
        assert!(matches!(
            parse_config_str(input),
            Err(ConfigError::DuplicateService(name)) if name == "edge-1"
        ));
    }

    #[test]
    fn rejects_duplicate_domains() {
        let input = r#"
[[service]]
name = "edge-1"

[[service.domain]]
name = "www.example.com"

[[service.domain]]
name = "www.example.com"
"#;
        assert!(matches!(
            parse_config_str(input),
            Err(ConfigError::DuplicateResource { kind: "domain", .. })
        ));
    }

    #[test]
    fn rejects_empty_service_name() {
        let input = r#"
[[service]]
name = "  "
"#;
        assert!(matches!(
            parse_config_str(input),
            Err(ConfigError::EmptyServiceName)
        ));
    }

    #[test]
    fn rejects_empty_backend_address() {
        let input = r#"
[[service]]
name = "edge-1"

[[service.backend]]
name = "origin"
address = ""
"#;
        assert!(matches!(
            parse_config_str(input),
            Err(ConfigError::EmptyBackendAddress { .. })
        ));
    }

    #[test]
    fn parse_config_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.services.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            parse_config_file(dir.path().join("nope.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
