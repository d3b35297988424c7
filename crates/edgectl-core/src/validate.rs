use crate::CoreError;
use edgectl_remote::EdgeApi;
use edgectl_schema::ServiceId;
use tracing::{debug, info};

/// A validation that allows activation to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Warnings {
        message: Option<String>,
        warnings: Vec<String>,
    },
}

pub struct VersionValidator<'a> {
    api: &'a dyn EdgeApi,
}

impl<'a> VersionValidator<'a> {
    pub fn new(api: &'a dyn EdgeApi) -> Self {
        Self { api }
    }

    /// Run remote validation for `version` and classify the result.
    ///
    /// Status `error` is fatal. Warnings under any other status pass. Any
    /// status besides `ok` without warnings is unexpected.
    pub fn validate(
        &self,
        service: &ServiceId,
        version: u32,
    ) -> Result<ValidationOutcome, CoreError> {
        let result = self
            .api
            .validate_version(service, version)
            .map_err(|source| CoreError::RemoteContext {
                context: "validating version".to_owned(),
                source,
            })?;

        if result.status == "error" {
            let message = match &result.message {
                Some(m) if !m.is_empty() => m.clone(),
                _ => result.errors.join("\n"),
            };
            return Err(CoreError::Validation {
                service: service.to_string(),
                version,
                message,
            });
        }

        if !result.warnings.is_empty() {
            debug!(
                "version {version} on service {service} validated with {} warning(s)",
                result.warnings.len()
            );
            return Ok(ValidationOutcome::Warnings {
                message: result.message,
                warnings: result.warnings,
            });
        }

        if result.status == "ok" {
            info!("version {version} on service {service} is valid");
            return Ok(ValidationOutcome::Valid);
        }

        Err(CoreError::UnexpectedValidation {
            version,
            status: result.status,
        })
    }
}
