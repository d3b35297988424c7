use crate::{EdgeApi, RemoteConfig, RemoteError, Service, ValidationResult, Version};
use edgectl_schema::{
    Backend, Dictionary, DictionaryId, DictionaryItem, Domain, ServiceId, Settings,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use url::Url;

/// HTTP implementation of [`EdgeApi`].
///
/// Talks to a REST API rooted at `RemoteConfig::api_url`:
/// - `GET  /service`, `GET /service/search?name=`, `GET /service/<id>/details`
/// - `GET  /service/<id>/version`
/// - `GET  /service/<id>/diff/from/<a>/to/<b>?format=text`
/// - `GET  /service/<id>/version/<n>/validate`
/// - `PUT  /service/<id>/version/<n>/{activate,clone}`
/// - `GET/POST /service/<id>/version/<n>/{domain,backend,dictionary}`,
///   `PUT/DELETE` on `.../<kind>/<name>`
/// - `GET/PUT /service/<id>/version/<n>/settings`
/// - `GET /service/<id>/dictionary/<dict>/items`, `PUT/DELETE .../item/<key>`
///
/// Every request carries the API key as `Fastly-Key`. Bodies are JSON.
pub struct HttpClient {
    config: RemoteConfig,
    agent: ureq::Agent,
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

#[derive(Deserialize)]
struct DiffResponse {
    diff: String,
}

impl HttpClient {
    pub fn new(config: RemoteConfig) -> Self {
        // Error statuses are inspected here so the API's message survives.
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build(),
        );
        Self { config, agent }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.config.api_url).map_err(|e| {
            RemoteError::Config(format!("invalid API URL '{}': {e}", self.config.api_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                RemoteError::Config(format!("API URL '{}' cannot be a base", self.config.api_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn version_url(
        &self,
        service: &ServiceId,
        version: u32,
        tail: &[&str],
    ) -> Result<Url, RemoteError> {
        let number = version.to_string();
        let mut segments = vec!["service", service.as_str(), "version", number.as_str()];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    fn headers<B>(&self, req: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let req = req.header("Accept", "application/json");
        match self.config.api_key {
            Some(ref key) => req.header("Fastly-Key", key),
            None => req,
        }
    }

    fn request(
        &self,
        method: Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, RemoteError> {
        let target = url.as_str();
        tracing::debug!("{method} {target}");
        let result = match method {
            Method::Get => self.headers(self.agent.get(target)).call(),
            Method::Delete => self.headers(self.agent.delete(target)).call(),
            Method::Post | Method::Put => {
                let req = if matches!(method, Method::Post) {
                    self.agent.post(target)
                } else {
                    self.agent.put(target)
                };
                let req = self.headers(req);
                match body {
                    Some(data) => req.header("Content-Type", "application/json").send(data),
                    None => req.send_empty(),
                }
            }
        };
        let resp = result.map_err(|e| RemoteError::Http(e.to_string()))?;

        let code = resp.status().as_u16();
        let mut reader = resp.into_body().into_reader();
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        if code == 404 {
            return Err(RemoteError::NotFound(
                api_message(&buf).unwrap_or_else(|| target.to_owned()),
            ));
        }
        if code >= 400 {
            return Err(RemoteError::Api {
                status: code,
                message: api_message(&buf).unwrap_or_else(|| format!("{method} {target} failed")),
            });
        }
        Ok(buf)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, RemoteError> {
        let body = self.request(Method::Get, url, None)?;
        decode(&body)
    }

    fn send_json<P: Serialize>(
        &self,
        method: Method,
        url: &Url,
        payload: &P,
    ) -> Result<Vec<u8>, RemoteError> {
        let data =
            serde_json::to_vec(payload).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        self.request(method, url, Some(&data))
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RemoteError> {
    serde_json::from_slice(body).map_err(|e| RemoteError::Serialization(e.to_string()))
}

/// Pull the human-readable message out of an API error body
/// (`{"msg": "...", "detail": "..."}`).
fn api_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let msg = value.get("msg").and_then(serde_json::Value::as_str)?;
    match value.get("detail").and_then(serde_json::Value::as_str) {
        Some(detail) if !detail.is_empty() => Some(format!("{msg}: {detail}")),
        _ => Some(msg.to_owned()),
    }
}

impl EdgeApi for HttpClient {
    fn list_services(&self) -> Result<Vec<Service>, RemoteError> {
        self.get_json(&self.url(&["service"])?)
    }

    fn search_service(&self, name: &str) -> Result<Service, RemoteError> {
        let mut url = self.url(&["service", "search"])?;
        url.query_pairs_mut().append_pair("name", name);
        self.get_json(&url)
    }

    fn get_service(&self, id: &ServiceId) -> Result<Service, RemoteError> {
        self.get_json(&self.url(&["service", id.as_str(), "details"])?)
    }

    fn list_versions(&self, service: &ServiceId) -> Result<Vec<Version>, RemoteError> {
        self.get_json(&self.url(&["service", service.as_str(), "version"])?)
    }

    fn get_diff(&self, service: &ServiceId, from: u32, to: u32) -> Result<String, RemoteError> {
        let (from, to) = (from.to_string(), to.to_string());
        let mut url = self.url(&["service", service.as_str(), "diff", "from", &from, "to", &to])?;
        url.query_pairs_mut().append_pair("format", "text");
        let resp: DiffResponse = self.get_json(&url)?;
        Ok(resp.diff)
    }

    fn validate_version(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<ValidationResult, RemoteError> {
        self.get_json(&self.version_url(service, version, &["validate"])?)
    }

    fn activate_version(&self, service: &ServiceId, version: u32) -> Result<Version, RemoteError> {
        let url = self.version_url(service, version, &["activate"])?;
        decode(&self.request(Method::Put, &url, None)?)
    }

    fn clone_version(&self, service: &ServiceId, version: u32) -> Result<Version, RemoteError> {
        let url = self.version_url(service, version, &["clone"])?;
        decode(&self.request(Method::Put, &url, None)?)
    }

    fn list_domains(&self, service: &ServiceId, version: u32) -> Result<Vec<Domain>, RemoteError> {
        self.get_json(&self.version_url(service, version, &["domain"])?)
    }

    fn create_domain(
        &self,
        service: &ServiceId,
        version: u32,
        domain: &Domain,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["domain"])?;
        self.send_json(Method::Post, &url, domain).map(drop)
    }

    fn update_domain(
        &self,
        service: &ServiceId,
        version: u32,
        domain: &Domain,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["domain", &domain.name])?;
        self.send_json(Method::Put, &url, domain).map(drop)
    }

    fn delete_domain(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["domain", name])?;
        self.request(Method::Delete, &url, None).map(drop)
    }

    fn list_backends(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<Vec<Backend>, RemoteError> {
        self.get_json(&self.version_url(service, version, &["backend"])?)
    }

    fn create_backend(
        &self,
        service: &ServiceId,
        version: u32,
        backend: &Backend,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["backend"])?;
        self.send_json(Method::Post, &url, backend).map(drop)
    }

    fn update_backend(
        &self,
        service: &ServiceId,
        version: u32,
        backend: &Backend,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["backend", &backend.name])?;
        self.send_json(Method::Put, &url, backend).map(drop)
    }

    fn delete_backend(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["backend", name])?;
        self.request(Method::Delete, &url, None).map(drop)
    }

    fn list_dictionaries(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<Vec<Dictionary>, RemoteError> {
        self.get_json(&self.version_url(service, version, &["dictionary"])?)
    }

    fn get_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, RemoteError> {
        self.get_json(&self.version_url(service, version, &["dictionary", name])?)
    }

    fn create_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        dictionary: &Dictionary,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["dictionary"])?;
        self.send_json(Method::Post, &url, dictionary).map(drop)
    }

    fn update_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        dictionary: &Dictionary,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["dictionary", &dictionary.name])?;
        self.send_json(Method::Put, &url, dictionary).map(drop)
    }

    fn delete_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["dictionary", name])?;
        self.request(Method::Delete, &url, None).map(drop)
    }

    fn get_settings(&self, service: &ServiceId, version: u32) -> Result<Settings, RemoteError> {
        self.get_json(&self.version_url(service, version, &["settings"])?)
    }

    fn update_settings(
        &self,
        service: &ServiceId,
        version: u32,
        settings: &Settings,
    ) -> Result<(), RemoteError> {
        let url = self.version_url(service, version, &["settings"])?;
        self.send_json(Method::Put, &url, settings).map(drop)
    }

    fn list_dictionary_items(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
    ) -> Result<Vec<DictionaryItem>, RemoteError> {
        let url = self.url(&[
            "service",
            service.as_str(),
            "dictionary",
            dictionary.as_str(),
            "items",
        ])?;
        self.get_json(&url)
    }

    fn upsert_dictionary_item(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
        item: &DictionaryItem,
    ) -> Result<(), RemoteError> {
        let url = self.url(&[
            "service",
            service.as_str(),
            "dictionary",
            dictionary.as_str(),
            "item",
            &item.key,
        ])?;
        self.send_json(Method::Put, &url, item).map(drop)
    }

    fn delete_dictionary_item(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
        key: &str,
    ) -> Result<(), RemoteError> {
        let url = self.url(&[
            "service",
            service.as_str(),
            "dictionary",
            dictionary.as_str(),
            "item",
            key,
        ])?;
        self.request(Method::Delete, &url, None).map(drop)
    }
}
