//! Desired-state schema for edgectl.
//!
//! This crate defines the resource types shared between the local config file
//! and the remote API payloads (`Domain`, `Backend`, `Dictionary`, `Settings`),
//! string newtypes for remote identifiers, and the TOML config file that
//! declares the desired state of each service (`ConfigFile`).

pub mod config;
pub mod types;

pub use config::{parse_config_file, parse_config_str, ConfigError, ConfigFile, ServiceConfig};
pub use types::{
    Backend, Dictionary, DictionaryId, DictionaryItem, Domain, Resource, ServiceId, Settings,
};
