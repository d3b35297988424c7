use crate::CoreError;
use edgectl_remote::{EdgeApi, RemoteError, Service};
use edgectl_schema::ServiceId;
use tracing::debug;

/// The active version of `service`.
///
/// An explicit current version wins. When it is zero (list and search
/// responses) the version list is scanned for the active entry.
pub fn resolve_active_version(service: &Service) -> Result<u32, CoreError> {
    service
        .active_version()
        .ok_or_else(|| CoreError::NoActiveVersion(service.name.clone()))
}

/// Find a service by exact name, falling back to treating the argument as a
/// service ID.
pub fn lookup_service(api: &dyn EdgeApi, name_or_id: &str) -> Result<Service, CoreError> {
    match api.search_service(name_or_id) {
        Ok(service) => Ok(service),
        Err(RemoteError::NotFound(_)) => {
            debug!("no service named '{name_or_id}', trying it as an ID");
            api.get_service(&ServiceId::new(name_or_id))
                .map_err(|e| match e {
                    RemoteError::NotFound(_) => RemoteError::NotFound(format!(
                        "no service with name or ID '{name_or_id}'"
                    )),
                    other => other,
                })
                .map_err(CoreError::from)
        }
        Err(e) => Err(e.into()),
    }
}
