//! Push planning: compare a service's desired state from the config file
//! with the resources of its active version, and carry any difference into a
//! new version.

use crate::diff::DiffEngine;
use crate::service::{lookup_service, resolve_active_version};
use crate::CoreError;
use edgectl_remote::{EdgeApi, Service};
use edgectl_schema::{Backend, Dictionary, Domain, Resource, ServiceConfig, ServiceId, Settings};
use serde::Serialize;
use tracing::{debug, info};

/// Per-kind changes, keyed by resource name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceChanges<T> {
    pub create: Vec<T>,
    pub update: Vec<T>,
    pub delete: Vec<String>,
}

impl<T> Default for ResourceChanges<T> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
        }
    }
}

impl<T: Resource> ResourceChanges<T> {
    /// Declared resources missing remotely are created, declared resources
    /// the remote does not satisfy are updated, and remote resources that are
    /// not declared are deleted.
    pub fn between(desired: &[T], remote: &[T]) -> Self {
        let mut changes = Self::default();
        for d in desired {
            match remote.iter().find(|r| r.name() == d.name()) {
                None => changes.create.push(d.clone()),
                Some(r) if !d.matches(r) => changes.update.push(d.clone()),
                Some(_) => {}
            }
        }
        for r in remote {
            if !desired.iter().any(|d| d.name() == r.name()) {
                changes.delete.push(r.name().to_owned());
            }
        }
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    fn describe(&self, lines: &mut Vec<String>) {
        for r in &self.create {
            lines.push(format!("+ {} {}", T::KIND, r.name()));
        }
        for r in &self.update {
            lines.push(format!("~ {} {}", T::KIND, r.name()));
        }
        for name in &self.delete {
            lines.push(format!("- {} {name}", T::KIND));
        }
    }
}

/// The resources attached to one remote version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub domains: Vec<Domain>,
    pub backends: Vec<Backend>,
    pub dictionaries: Vec<Dictionary>,
    pub settings: Settings,
}

impl Snapshot {
    pub fn fetch(api: &dyn EdgeApi, service: &ServiceId, version: u32) -> Result<Self, CoreError> {
        debug!("fetching resources of {service} version {version}");
        Ok(Self {
            domains: api.list_domains(service, version)?,
            backends: api.list_backends(service, version)?,
            dictionaries: api.list_dictionaries(service, version)?,
            settings: api.get_settings(service, version)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub domains: ResourceChanges<Domain>,
    pub backends: ResourceChanges<Backend>,
    pub dictionaries: ResourceChanges<Dictionary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.backends.is_empty()
            && self.dictionaries.is_empty()
            && self.settings.is_none()
    }

    /// One line per change: `+` create, `~` update, `-` delete.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.domains.describe(&mut lines);
        self.backends.describe(&mut lines);
        self.dictionaries.describe(&mut lines);
        if self.settings.is_some() {
            lines.push("~ settings".to_owned());
        }
        lines
    }
}

pub fn plan(desired: &ServiceConfig, snapshot: &Snapshot) -> SyncPlan {
    SyncPlan {
        domains: ResourceChanges::between(&desired.domains, &snapshot.domains),
        backends: ResourceChanges::between(&desired.backends, &snapshot.backends),
        dictionaries: ResourceChanges::between(&desired.dictionaries, &snapshot.dictionaries),
        settings: desired
            .settings
            .as_ref()
            .filter(|s| !s.matches(&snapshot.settings))
            .cloned(),
    }
}

/// Apply `plan` to an editable version: deletes, then updates, then
/// creates, then settings.
pub fn apply(
    api: &dyn EdgeApi,
    service: &ServiceId,
    version: u32,
    plan: &SyncPlan,
) -> Result<(), CoreError> {
    for name in &plan.domains.delete {
        api.delete_domain(service, version, name)?;
    }
    for name in &plan.backends.delete {
        api.delete_backend(service, version, name)?;
    }
    for name in &plan.dictionaries.delete {
        api.delete_dictionary(service, version, name)?;
    }

    for d in &plan.domains.update {
        api.update_domain(service, version, d)?;
    }
    for b in &plan.backends.update {
        api.update_backend(service, version, b)?;
    }
    for d in &plan.dictionaries.update {
        api.update_dictionary(service, version, d)?;
    }

    for d in &plan.domains.create {
        api.create_domain(service, version, d)?;
    }
    for b in &plan.backends.create {
        api.create_backend(service, version, b)?;
    }
    for d in &plan.dictionaries.create {
        api.create_dictionary(service, version, d)?;
    }

    if let Some(settings) = &plan.settings {
        api.update_settings(service, version, settings)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    /// Desired state already matches the active version.
    Unchanged,
    /// A version was created but renders the same as the active one.
    NoEffectiveChange { version: u32 },
    Created { version: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub service: Service,
    pub active: u32,
    pub plan: SyncPlan,
    #[serde(flatten)]
    pub outcome: PushOutcome,
}

/// Bring one service's remote state in line with `desired`, creating a new
/// (inactive) version when anything differs.
pub fn push_service(api: &dyn EdgeApi, desired: &ServiceConfig) -> Result<PushReport, CoreError> {
    let service = match &desired.id {
        Some(id) => api.get_service(id)?,
        None => lookup_service(api, &desired.name)?,
    };
    let active = resolve_active_version(&service)?;
    let snapshot = Snapshot::fetch(api, &service.id, active)?;
    let plan = plan(desired, &snapshot);

    if plan.is_empty() {
        info!("{}: version {active} already matches the config", service.name);
        return Ok(PushReport {
            service,
            active,
            plan,
            outcome: PushOutcome::Unchanged,
        });
    }

    let cloned = api.clone_version(&service.id, active)?;
    info!(
        "{}: cloned version {active} to {}, applying {} change(s)",
        service.name,
        cloned.number,
        plan.describe().len()
    );
    apply(api, &service.id, cloned.number, &plan)?;

    let outcome = if DiffEngine::new(api).versions_equal(&service.id, active, cloned.number)? {
        PushOutcome::NoEffectiveChange {
            version: cloned.number,
        }
    } else {
        PushOutcome::Created {
            version: cloned.number,
        }
    };
    Ok(PushReport {
        service,
        active,
        plan,
        outcome,
    })
}
