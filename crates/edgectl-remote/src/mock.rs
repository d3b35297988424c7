//! In-memory [`EdgeApi`] used by tests across the workspace.
//!
//! Behaves like the remote API closely enough for the workflows built on top:
//! versions lock on activation, only unlocked versions accept edits, clones
//! copy every resource, and diffs are rendered from the stored resources
//! unless a test overrides the text. Every call is recorded, and any
//! operation can be made to fail.

use crate::{EdgeApi, RemoteError, Service, ValidationResult, Version};
use edgectl_schema::{
    Backend, Dictionary, DictionaryId, DictionaryItem, Domain, ServiceId, Settings,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Everything attached to one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionResources {
    pub domains: Vec<Domain>,
    pub backends: Vec<Backend>,
    pub dictionaries: Vec<Dictionary>,
    pub settings: Settings,
}

#[derive(Debug, Clone)]
struct VersionState {
    record: Version,
    resources: VersionResources,
}

#[derive(Debug, Clone)]
struct ServiceState {
    id: ServiceId,
    name: String,
    versions: BTreeMap<u32, VersionState>,
    items: BTreeMap<DictionaryId, BTreeMap<String, String>>,
}

impl ServiceState {
    fn record(&self, current: bool) -> Service {
        let versions: Vec<Version> = self.versions.values().map(|v| v.record.clone()).collect();
        let active = versions.iter().find(|v| v.active).map_or(0, |v| v.number);
        Service {
            id: self.id.clone(),
            name: self.name.clone(),
            current_version: if current { active } else { 0 },
            versions,
        }
    }

    fn version(&self, number: u32) -> Result<&VersionState, RemoteError> {
        self.versions.get(&number).ok_or_else(|| {
            RemoteError::NotFound(format!("version {number} of service {}", self.id))
        })
    }

    fn editable(&mut self, number: u32) -> Result<&mut VersionResources, RemoteError> {
        let id = self.id.clone();
        let state = self
            .versions
            .get_mut(&number)
            .ok_or_else(|| RemoteError::NotFound(format!("version {number} of service {id}")))?;
        if state.record.locked || state.record.active {
            return Err(RemoteError::Api {
                status: 400,
                message: format!("version {number} is locked"),
            });
        }
        Ok(&mut state.resources)
    }
}

#[derive(Default)]
struct MockState {
    services: Vec<ServiceState>,
    rendered: HashMap<(ServiceId, u32), String>,
    diffs: HashMap<(ServiceId, u32, u32), String>,
    validations: HashMap<(ServiceId, u32), ValidationResult>,
    failures: BTreeSet<&'static str>,
    calls: Vec<String>,
    next_dictionary: u32,
}

impl MockState {
    fn service(&self, id: &ServiceId) -> Result<&ServiceState, RemoteError> {
        self.services
            .iter()
            .find(|s| s.id == *id)
            .ok_or_else(|| RemoteError::NotFound(format!("service {id}")))
    }

    fn service_mut(&mut self, id: &ServiceId) -> Result<&mut ServiceState, RemoteError> {
        self.services
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or_else(|| RemoteError::NotFound(format!("service {id}")))
    }

    fn rendered(&self, id: &ServiceId, version: u32) -> Result<String, RemoteError> {
        if let Some(text) = self.rendered.get(&(id.clone(), version)) {
            return Ok(text.clone());
        }
        let state = self.service(id)?.version(version)?;
        Ok(render(&state.resources))
    }
}

#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Http(format!("mutex poisoned: {e}")))
    }

    /// Record a call and apply any injected failure for `op`.
    fn enter(
        &self,
        op: &'static str,
        detail: String,
    ) -> Result<MutexGuard<'_, MockState>, RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(format!("{op} {detail}").trim_end().to_owned());
        if state.failures.contains(op) {
            return Err(RemoteError::Http(format!("injected failure: {op}")));
        }
        Ok(state)
    }

    /// Register a service with versions `1..=versions`. The active version
    /// and every version before it are locked.
    pub fn add_service(&self, id: &str, name: &str, versions: u32, active: Option<u32>) {
        let versions = (1..=versions)
            .map(|n| {
                let record = Version {
                    active: Some(n) == active,
                    locked: active.is_some_and(|a| n <= a),
                    ..Version::new(n)
                };
                (
                    n,
                    VersionState {
                        record,
                        resources: VersionResources::default(),
                    },
                )
            })
            .collect();
        if let Ok(mut state) = self.lock() {
            state.services.push(ServiceState {
                id: ServiceId::new(id),
                name: name.to_owned(),
                versions,
                items: BTreeMap::new(),
            });
        }
    }

    /// Replace the resources of a version, bypassing the lock check.
    pub fn set_resources(&self, id: &str, version: u32, resources: VersionResources) {
        if let Ok(mut state) = self.lock() {
            if let Ok(service) = state.service_mut(&ServiceId::new(id)) {
                if let Some(v) = service.versions.get_mut(&version) {
                    v.resources = resources;
                }
            }
        }
    }

    pub fn resources(&self, id: &str, version: u32) -> Option<VersionResources> {
        let state = self.lock().ok()?;
        let service = state.service(&ServiceId::new(id)).ok()?;
        service.versions.get(&version).map(|v| v.resources.clone())
    }

    pub fn versions(&self, id: &str) -> Vec<Version> {
        self.lock()
            .ok()
            .and_then(|state| {
                state
                    .service(&ServiceId::new(id))
                    .ok()
                    .map(|s| s.versions.values().map(|v| v.record.clone()).collect())
            })
            .unwrap_or_default()
    }

    /// Override the text returned for a version's self-diff.
    pub fn set_rendered(&self, id: &str, version: u32, text: &str) {
        if let Ok(mut state) = self.lock() {
            state
                .rendered
                .insert((ServiceId::new(id), version), text.to_owned());
        }
    }

    /// Override the text returned for a `from`/`to` diff request.
    pub fn set_diff(&self, id: &str, from: u32, to: u32, text: &str) {
        if let Ok(mut state) = self.lock() {
            state
                .diffs
                .insert((ServiceId::new(id), from, to), text.to_owned());
        }
    }

    pub fn set_validation(&self, id: &str, version: u32, result: ValidationResult) {
        if let Ok(mut state) = self.lock() {
            state
                .validations
                .insert((ServiceId::new(id), version), result);
        }
    }

    pub fn set_items(&self, id: &str, dictionary: &str, items: &[(&str, &str)]) {
        if let Ok(mut state) = self.lock() {
            if let Ok(service) = state.service_mut(&ServiceId::new(id)) {
                service.items.insert(
                    DictionaryId::new(dictionary),
                    items
                        .iter()
                        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                        .collect(),
                );
            }
        }
    }

    /// Make every later call to `op` (a trait method name) fail.
    pub fn fail_on(&self, op: &'static str) {
        if let Ok(mut state) = self.lock() {
            state.failures.insert(op);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }
}

/// Deterministic text rendering of a version, standing in for generated
/// configuration.
fn render(resources: &VersionResources) -> String {
    let mut lines = Vec::new();
    for b in &resources.backends {
        lines.push(format!(
            "backend {} {{ .host = \"{}\"; .port = \"{}\"; .ssl = {}; }}",
            b.name, b.address, b.port, b.use_ssl
        ));
    }
    for d in &resources.domains {
        lines.push(format!("# domain {}", d.name));
    }
    for d in &resources.dictionaries {
        lines.push(format!("table {} {{ }}", d.name));
    }
    if let Some(ttl) = resources.settings.default_ttl {
        lines.push(format!("set beresp.ttl = {ttl}s;"));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn line_diff(from: &str, to: &str) -> String {
    let old: BTreeSet<&str> = from.lines().collect();
    let new: BTreeSet<&str> = to.lines().collect();
    let mut out = String::new();
    for line in from.lines() {
        out.push_str(if new.contains(line) { " " } else { "-" });
        out.push_str(line);
        out.push('\n');
    }
    for line in to.lines().filter(|l| !old.contains(l)) {
        out.push('+');
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn upsert_named<T: Clone>(
    list: &mut Vec<T>,
    item: &T,
    name_of: impl Fn(&T) -> &str,
    create: bool,
) -> Result<(), RemoteError> {
    let name = name_of(item).to_owned();
    match (list.iter().position(|x| name_of(x) == name), create) {
        (Some(_), true) => Err(RemoteError::Api {
            status: 409,
            message: format!("'{name}' already exists"),
        }),
        (None, false) => Err(RemoteError::NotFound(name)),
        (Some(i), false) => {
            list[i] = item.clone();
            Ok(())
        }
        (None, true) => {
            list.push(item.clone());
            Ok(())
        }
    }
}

fn remove_named<T>(
    list: &mut Vec<T>,
    name: &str,
    name_of: impl Fn(&T) -> &str,
) -> Result<(), RemoteError> {
    let before = list.len();
    list.retain(|x| name_of(x) != name);
    if list.len() == before {
        return Err(RemoteError::NotFound(name.to_owned()));
    }
    Ok(())
}

impl EdgeApi for MockApi {
    fn list_services(&self) -> Result<Vec<Service>, RemoteError> {
        let state = self.enter("list_services", String::new())?;
        Ok(state.services.iter().map(|s| s.record(false)).collect())
    }

    fn search_service(&self, name: &str) -> Result<Service, RemoteError> {
        let state = self.enter("search_service", name.to_owned())?;
        state
            .services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.record(false))
            .ok_or_else(|| RemoteError::NotFound(format!("service named '{name}'")))
    }

    fn get_service(&self, id: &ServiceId) -> Result<Service, RemoteError> {
        let state = self.enter("get_service", id.to_string())?;
        Ok(state.service(id)?.record(true))
    }

    fn list_versions(&self, service: &ServiceId) -> Result<Vec<Version>, RemoteError> {
        let state = self.enter("list_versions", service.to_string())?;
        Ok(state.service(service)?.record(false).versions)
    }

    fn get_diff(&self, service: &ServiceId, from: u32, to: u32) -> Result<String, RemoteError> {
        let state = self.enter("get_diff", format!("{service} {from} {to}"))?;
        if let Some(text) = state.diffs.get(&(service.clone(), from, to)) {
            return Ok(text.clone());
        }
        let old = state.rendered(service, from)?;
        if from == to {
            return Ok(old);
        }
        let new = state.rendered(service, to)?;
        if old == new {
            return Ok(old);
        }
        Ok(line_diff(&old, &new))
    }

    fn validate_version(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<ValidationResult, RemoteError> {
        let state = self.enter("validate_version", format!("{service} {version}"))?;
        state.service(service)?.version(version)?;
        Ok(state
            .validations
            .get(&(service.clone(), version))
            .cloned()
            .unwrap_or_else(ValidationResult::ok))
    }

    fn activate_version(&self, service: &ServiceId, version: u32) -> Result<Version, RemoteError> {
        let mut state = self.enter("activate_version", format!("{service} {version}"))?;
        let svc = state.service_mut(service)?;
        svc.version(version)?;
        for (number, v) in &mut svc.versions {
            v.record.active = *number == version;
            if *number == version {
                v.record.locked = true;
            }
        }
        Ok(svc.version(version)?.record.clone())
    }

    fn clone_version(&self, service: &ServiceId, version: u32) -> Result<Version, RemoteError> {
        let mut state = self.enter("clone_version", format!("{service} {version}"))?;
        let svc = state.service_mut(service)?;
        let resources = svc.version(version)?.resources.clone();
        let number = svc.versions.keys().max().copied().unwrap_or(0) + 1;
        let record = Version::new(number);
        svc.versions.insert(
            number,
            VersionState {
                record: record.clone(),
                resources,
            },
        );
        Ok(record)
    }

    fn list_domains(&self, service: &ServiceId, version: u32) -> Result<Vec<Domain>, RemoteError> {
        let state = self.enter("list_domains", format!("{service} {version}"))?;
        Ok(state.service(service)?.version(version)?.resources.domains.clone())
    }

    fn create_domain(
        &self,
        service: &ServiceId,
        version: u32,
        domain: &Domain,
    ) -> Result<(), RemoteError> {
        let detail = format!("{service} {version} {}", domain.name);
        let mut state = self.enter("create_domain", detail)?;
        let res = state.service_mut(service)?.editable(version)?;
        upsert_named(&mut res.domains, domain, |d| &d.name, true)
    }

    fn update_domain(
        &self,
        service: &ServiceId,
        version: u32,
        domain: &Domain,
    ) -> Result<(), RemoteError> {
        let detail = format!("{service} {version} {}", domain.name);
        let mut state = self.enter("update_domain", detail)?;
        let res = state.service_mut(service)?.editable(version)?;
        upsert_named(&mut res.domains, domain, |d| &d.name, false)
    }

    fn delete_domain(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter("delete_domain", format!("{service} {version} {name}"))?;
        let res = state.service_mut(service)?.editable(version)?;
        remove_named(&mut res.domains, name, |d| &d.name)
    }

    fn list_backends(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<Vec<Backend>, RemoteError> {
        let state = self.enter("list_backends", format!("{service} {version}"))?;
        Ok(state.service(service)?.version(version)?.resources.backends.clone())
    }

    fn create_backend(
        &self,
        service: &ServiceId,
        version: u32,
        backend: &Backend,
    ) -> Result<(), RemoteError> {
        let mut state =
            self.enter("create_backend", format!("{service} {version} {}", backend.name))?;
        let res = state.service_mut(service)?.editable(version)?;
        upsert_named(&mut res.backends, backend, |b| &b.name, true)
    }

    fn update_backend(
        &self,
        service: &ServiceId,
        version: u32,
        backend: &Backend,
    ) -> Result<(), RemoteError> {
        let mut state =
            self.enter("update_backend", format!("{service} {version} {}", backend.name))?;
        let res = state.service_mut(service)?.editable(version)?;
        upsert_named(&mut res.backends, backend, |b| &b.name, false)
    }

    fn delete_backend(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter("delete_backend", format!("{service} {version} {name}"))?;
        let res = state.service_mut(service)?.editable(version)?;
        remove_named(&mut res.backends, name, |b| &b.name)
    }

    fn list_dictionaries(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<Vec<Dictionary>, RemoteError> {
        let state = self.enter("list_dictionaries", format!("{service} {version}"))?;
        Ok(state
            .service(service)?
            .version(version)?
            .resources
            .dictionaries
            .clone())
    }

    fn get_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, RemoteError> {
        let state = self.enter("get_dictionary", format!("{service} {version} {name}"))?;
        state
            .service(service)?
            .version(version)?
            .resources
            .dictionaries
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("dictionary '{name}'")))
    }

    fn create_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        dictionary: &Dictionary,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(
            "create_dictionary",
            format!("{service} {version} {}", dictionary.name),
        )?;
        state.next_dictionary += 1;
        let mut created = dictionary.clone();
        created.id = Some(DictionaryId::new(format!("dict-{}", state.next_dictionary)));
        let res = state.service_mut(service)?.editable(version)?;
        upsert_named(&mut res.dictionaries, &created, |d| &d.name, true)
    }

    fn update_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        dictionary: &Dictionary,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(
            "update_dictionary",
            format!("{service} {version} {}", dictionary.name),
        )?;
        let res = state.service_mut(service)?.editable(version)?;
        let id = res
            .dictionaries
            .iter()
            .find(|d| d.name == dictionary.name)
            .and_then(|d| d.id.clone());
        let updated = Dictionary {
            id,
            ..dictionary.clone()
        };
        upsert_named(&mut res.dictionaries, &updated, |d| &d.name, false)
    }

    fn delete_dictionary(
        &self,
        service: &ServiceId,
        version: u32,
        name: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter("delete_dictionary", format!("{service} {version} {name}"))?;
        let res = state.service_mut(service)?.editable(version)?;
        remove_named(&mut res.dictionaries, name, |d| &d.name)
    }

    fn get_settings(&self, service: &ServiceId, version: u32) -> Result<Settings, RemoteError> {
        let state = self.enter("get_settings", format!("{service} {version}"))?;
        Ok(state.service(service)?.version(version)?.resources.settings.clone())
    }

    fn update_settings(
        &self,
        service: &ServiceId,
        version: u32,
        settings: &Settings,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter("update_settings", format!("{service} {version}"))?;
        let res = state.service_mut(service)?.editable(version)?;
        let current = &mut res.settings;
        if settings.default_ttl.is_some() {
            current.default_ttl = settings.default_ttl;
        }
        if settings.default_host.is_some() {
            current.default_host.clone_from(&settings.default_host);
        }
        if settings.stale_if_error.is_some() {
            current.stale_if_error = settings.stale_if_error;
        }
        Ok(())
    }

    fn list_dictionary_items(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
    ) -> Result<Vec<DictionaryItem>, RemoteError> {
        let state = self.enter("list_dictionary_items", format!("{service} {dictionary}"))?;
        let items = state.service(service)?.items.get(dictionary);
        Ok(items
            .into_iter()
            .flatten()
            .map(|(key, value)| DictionaryItem {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn upsert_dictionary_item(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
        item: &DictionaryItem,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(
            "upsert_dictionary_item",
            format!("{service} {dictionary} {}", item.key),
        )?;
        state
            .service_mut(service)?
            .items
            .entry(dictionary.clone())
            .or_default()
            .insert(item.key.clone(), item.value.clone());
        Ok(())
    }

    fn delete_dictionary_item(
        &self,
        service: &ServiceId,
        dictionary: &DictionaryId,
        key: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.enter(
            "delete_dictionary_item",
            format!("{service} {dictionary} {key}"),
        )?;
        let removed = state
            .service_mut(service)?
            .items
            .get_mut(dictionary)
            .and_then(|items| items.remove(key));
        match removed {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(format!("item '{key}'"))),
        }
    }
}
