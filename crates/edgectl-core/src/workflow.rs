use crate::cancel::CancelFlag;
use crate::diff::DiffEngine;
use crate::gate::InteractionGate;
use crate::present::{count_changes, ChangePresenter};
use crate::prompt::Prompter;
use crate::service::resolve_active_version;
use crate::CoreError;
use edgectl_remote::{EdgeApi, Service, DEFAULT_CONSOLE_URL};
use edgectl_schema::ServiceId;
use serde::Serialize;
use std::io::Write;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Activated { previous: u32, activated: u32 },
    DryRun,
    Declined,
}

/// Confirm-then-activate sequence for a candidate version.
///
/// Shows the diff against the active version, asks before anything changes
/// (unless the operator passed assume-yes), and stops short of activation in
/// dry-run mode.
pub struct ActivationWorkflow<'a> {
    api: &'a dyn EdgeApi,
    gate: InteractionGate,
    prompter: &'a mut dyn Prompter,
    presenter: ChangePresenter,
    cancel: CancelFlag,
    console_url: String,
}

impl<'a> ActivationWorkflow<'a> {
    pub fn new(
        api: &'a dyn EdgeApi,
        gate: InteractionGate,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            api,
            gate,
            prompter,
            presenter: ChangePresenter::default(),
            cancel: CancelFlag::new(),
            console_url: DEFAULT_CONSOLE_URL.to_owned(),
        }
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: ChangePresenter) -> Self {
        self.presenter = presenter;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_console_url(mut self, console_url: &str) -> Self {
        console_url.clone_into(&mut self.console_url);
        self
    }

    pub fn activate(
        &mut self,
        service: &Service,
        candidate: u32,
        out: &mut dyn Write,
    ) -> Result<ActivationOutcome, CoreError> {
        let previous = resolve_active_version(service)?;
        let engine = DiffEngine::new(self.api);
        let diff = engine.unified_diff(&service.id, previous, candidate)?;

        self.gate.require_confirmable()?;

        let url = diff_url(&self.console_url, &service.id, previous, candidate)?;
        writeln!(out, "Diff URL: {url}")?;

        if engine.versions_equal(&service.id, previous, candidate)? {
            writeln!(
                out,
                "Note: version {candidate} renders the same as active version {previous}"
            )?;
        }

        let title = format!("{} version {previous} -> {candidate}", service.name);
        if !self.gate.assume_yes() {
            let (additions, removals) = count_changes(&diff);
            let question = format!("{additions} additions and {removals} removals in diff. View?");
            if self.prompter.confirm(&question)? {
                self.presenter
                    .render(&diff, &title, self.gate.use_pager(), out)?;
            }
        } else if self.gate.noop() {
            self.presenter.render(&diff, &title, false, out)?;
        }

        if self.gate.noop() {
            info!("dry run: not activating version {candidate} for {}", service.name);
            return Ok(ActivationOutcome::DryRun);
        }

        self.check_cancelled(candidate)?;
        if !self.gate.assume_yes() {
            let question = format!("Activate version {candidate} for service {}?", service.name);
            if !self.prompter.confirm(&question)? {
                info!("activation of version {candidate} for {} declined", service.name);
                return Ok(ActivationOutcome::Declined);
            }
        }

        self.check_cancelled(candidate)?;

        let activated = self.api.activate_version(&service.id, candidate)?;
        writeln!(
            out,
            "Activated version {} for {}. Old version: {previous}",
            activated.number, service.name
        )?;
        Ok(ActivationOutcome::Activated {
            previous,
            activated: activated.number,
        })
    }

    fn check_cancelled(&self, candidate: u32) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Interrupted(candidate));
        }
        Ok(())
    }
}

/// Web console link comparing two versions of a service.
pub fn diff_url(
    console_url: &str,
    service: &ServiceId,
    from: u32,
    to: u32,
) -> Result<Url, CoreError> {
    let invalid = |e: String| CoreError::Usage(format!("invalid console URL '{console_url}': {e}"));
    let mut url = Url::parse(console_url).map_err(|e| invalid(e.to_string()))?;
    let range = format!("{from},{to}");
    url.path_segments_mut()
        .map_err(|()| invalid("cannot be a base".to_owned()))?
        .pop_if_empty()
        .extend(["configure", "services", service.as_str(), "diff", range.as_str()]);
    Ok(url)
}
