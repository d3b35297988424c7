//! Remote CDN-configuration API access for edgectl.
//!
//! This crate defines the `EdgeApi` trait the rest of the workspace programs
//! against, the records it returns (`Service`, `Version`, `ValidationResult`),
//! an HTTP implementation (`http::HttpClient`), credential and endpoint
//! configuration (`RemoteConfig`), and an in-memory implementation
//! (`mock::MockApi`) used by tests.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{read_key_file, RemoteConfig, DEFAULT_API_URL, DEFAULT_CONSOLE_URL};

use chrono::{DateTime, Utc};
use edgectl_schema::{
    Backend, Dictionary, DictionaryId, DictionaryItem, Domain, ServiceId, Settings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("remote config error: {0}")]
    Config(String),
}

/// A service as returned by the API.
///
/// Depending on the endpoint, `current_version` may be zero (list calls) and
/// the active version must then be read from `versions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(default, rename = "version")]
    pub current_version: u32,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl Service {
    /// The active version number, if the record identifies one.
    pub fn active_version(&self) -> Option<u32> {
        if self.current_version != 0 {
            return Some(self.current_version);
        }
        self.versions.iter().find(|v| v.active).map(|v| v.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub number: u32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            active: false,
            locked: false,
            comment: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Raw response of the version validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: String,
    #[serde(default, rename = "msg")]
    pub message: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
            message: None,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: "error".to_owned(),
            message: Some(message.to_owned()),
            warnings: Vec::new(),
            errors: vec![message.to_owned()],
        }
    }
}

/// Operations the CDN configuration API offers.
///
/// Every call is a single request; implementations never retry.
pub trait EdgeApi: Send + Sync {
    fn list_services(&self) -> Result<Vec<Service>, RemoteError>;

    /// Look a service up by its exact name.
    fn search_service(&self, name: &str) -> Result<Service, RemoteError>;

    /// Fetch a service with its version list and current version filled in.
    fn get_service(&self, id: &ServiceId) -> Result<Service, RemoteError>;

    fn list_versions(&self, service: &ServiceId) -> Result<Vec<Version>, RemoteError>;

    /// The remote's text rendering of `from` diffed against `to`.
    fn get_diff(&self, service: &ServiceId, from: u32, to: u32) -> Result<String, RemoteError>;

    fn validate_version(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<ValidationResult, RemoteError>;

    fn activate_version(&self, service: &ServiceId, version: u32) -> Result<Version, RemoteError>;

    /// Copy `version` into a new, editable version.
    fn clone_version(&self, service: &ServiceId, version: u32) -> Result<Version, RemoteError>;

    fn list_domains(&self, service: &ServiceId, version: u32) -> Result<Vec<Domain>, RemoteError>;
    fn create_domain(
        &self,
        service: &ServiceId,
        version: u32,
        domain: &Domain,
    ) -> Result<(), RemoteError>;
    fn update_domain(
        &self,
        service: &ServiceId,
        version: u32,
        domain: &Domain,
    ) -> Result<(), RemoteError>;
    fn delete_domain(&self, service: &ServiceId, version: u32, name: &str)
        -> Result<(), RemoteError>;

    fn list_backends(&self, service: &ServiceId, version: u32)
        -> Result<Vec<Backend>, RemoteError>;
    fn create_backend(
        &self,
        service: &ServiceId,
        version: u32,
        backend: &Backend,
    ) -> Result<(), RemoteError>;
    fn update_backend(
        &self,
        service: &ServiceId,
        version: u32,
        backend: &Backend,
    ) -> Result<(), RemoteError>;
    fn delete_backend(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError>;

    fn list_dictionaries(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<Vec<Dictionary>, RemoteError>;
    fn get_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, RemoteError>;
    fn create_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        dictionary: &Dictionary,
    ) -> Result<(), RemoteError>;
    fn update_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        dictionary: &Dictionary,
    ) -> Result<(), RemoteError>;
    fn delete_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError>;

    fn get_settings(&self, service: &ServiceId, version: u32) -> Result<Settings, RemoteError>;
    fn update_settings(
        &self,
        service: &ServiceId,
        version: u32,
        settings: &Settings,
    ) -> Result<(), RemoteError>;

    fn list_dictionary_items(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
    ) -> Result<Vec<DictionaryItem>, RemoteError>;
    fn upsert_dictionary_item(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
        item: &DictionaryItem,
    ) -> Result<(), RemoteError>;
    fn delete_dictionary_item(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
        key: &str,
    ) -> Result<(), RemoteError>;

    /// The rendered configuration of a single version, obtained by diffing
    /// it against itself.
    fn rendered_text(&self, service: &ServiceId, version: u32) -> Result<String, RemoteError> {
        self.get_diff(service, version, version)
    }
}
