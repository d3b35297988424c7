//! Remote identifiers and the versioned resources a service is built from.
//!
//! Identifier newtypes serialize/deserialize as plain strings. Resource types
//! are shared by the config file and the remote API, so they tolerate the
//! extra bookkeeping fields the API returns (`service_id`, `version`, ...).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Opaque identifier the remote API assigns to a service.
    ServiceId
);

string_newtype!(
    /// Opaque identifier of a dictionary container. Items are addressed by it.
    DictionaryId
);

/// A named, versioned resource attached to a service version.
pub trait Resource: Clone + fmt::Debug {
    /// Table name used in the config file and in log output.
    const KIND: &'static str;
    /// Keys accepted for this resource in the config file.
    const FIELDS: &'static [&'static str];

    fn name(&self) -> &str;

    /// True if `remote` already satisfies every field this declaration sets.
    /// Optional fields left unset in the declaration are not compared.
    fn matches(&self, remote: &Self) -> bool;
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn optional_matches<T: PartialEq>(desired: Option<&T>, remote: Option<&T>) -> bool {
    desired.is_none() || desired == remote
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<String>,
}

impl Resource for Domain {
    const KIND: &'static str = "domain";
    const FIELDS: &'static [&'static str] = &["name", "comment"];

    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, remote: &Self) -> bool {
        self.name == remote.name && optional_matches(self.comment.as_ref(), remote.comment.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub name: String,
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ssl_cert_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub shield: Option<String>,
}

fn default_port() -> u16 {
    80
}

impl Resource for Backend {
    const KIND: &'static str = "backend";
    const FIELDS: &'static [&'static str] = &[
        "name",
        "address",
        "port",
        "use_ssl",
        "ssl_cert_hostname",
        "connect_timeout",
        "weight",
        "shield",
    ];

    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, remote: &Self) -> bool {
        self.name == remote.name
            && self.address == remote.address
            && self.port == remote.port
            && self.use_ssl == remote.use_ssl
            && optional_matches(
                self.ssl_cert_hostname.as_ref(),
                remote.ssl_cert_hostname.as_ref(),
            )
            && optional_matches(self.connect_timeout.as_ref(), remote.connect_timeout.as_ref())
            && optional_matches(self.weight.as_ref(), remote.weight.as_ref())
            && optional_matches(self.shield.as_ref(), remote.shield.as_ref())
    }
}

/// A dictionary container. Its items are not versioned and are managed
/// separately from pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub name: String,
    #[serde(default)]
    pub write_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DictionaryId>,
}

impl Dictionary {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            write_only: false,
            id: None,
        }
    }
}

impl Resource for Dictionary {
    const KIND: &'static str = "dictionary";
    const FIELDS: &'static [&'static str] = &["name", "write_only"];

    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, remote: &Self) -> bool {
        self.name == remote.name && self.write_only == remote.write_only
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryItem {
    #[serde(rename = "item_key")]
    pub key: String,
    #[serde(rename = "item_value")]
    pub value: String,
}

/// Version-wide settings. Unset fields are left as the remote has them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(
        rename = "general.default_ttl",
        alias = "default_ttl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_ttl: Option<u32>,
    #[serde(
        rename = "general.default_host",
        alias = "default_host",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_host: Option<String>,
    #[serde(
        rename = "general.stale_if_error",
        alias = "stale_if_error",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stale_if_error: Option<bool>,
}

impl Settings {
    pub const FIELDS: &'static [&'static str] = &[
        "default_ttl",
        "default_host",
        "stale_if_error",
        "general.default_ttl",
        "general.default_host",
        "general.stale_if_error",
    ];

    pub fn matches(&self, remote: &Self) -> bool {
        optional_matches(self.default_ttl.as_ref(), remote.default_ttl.as_ref())
            && optional_matches(self.default_host.as_ref(), remote.default_host.as_ref())
            && optional_matches(self.stale_if_error.as_ref(), remote.stale_if_error.as_ref())
    }
}
