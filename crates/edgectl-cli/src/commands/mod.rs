pub mod completions;
pub mod dictionary;
pub mod man_pages;
pub mod push;
pub mod service;
pub mod version;

use dialoguer::Input;
use edgectl_core::{CancelFlag, ChangePresenter, CoreError, InteractionGate, Prompter};
use edgectl_remote::http::HttpClient;
use edgectl_remote::{read_key_file, RemoteConfig, RemoteError};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_REMOTE_ERROR: u8 = 3;
pub const EXIT_VALIDATION_ERROR: u8 = 4;
pub const EXIT_NON_INTERACTIVE: u8 = 5;

const KEY_FILE: &str = "api_key";

/// Global options shared by every command.
pub struct Context {
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub assume_yes: bool,
    pub json: bool,
    pub cancel: CancelFlag,
}

impl Context {
    pub fn gate(&self, noop: bool) -> InteractionGate {
        InteractionGate::detect(self.assume_yes, noop)
    }

    /// Endpoint and credentials: `--endpoint` over the stored config, and the
    /// API key from the flag or environment, then `./api_key`, then the
    /// stored config.
    pub fn remote_config(&self) -> Result<RemoteConfig, String> {
        let stored = RemoteConfig::load_default().map_err(|e| e.to_string())?;
        let key = resolve_api_key(self.api_key.as_deref(), Path::new(KEY_FILE), &stored)?;
        let mut config = match &self.endpoint {
            Some(url) => RemoteConfig::new(url).with_console_url(&stored.console_url),
            None => stored,
        };
        config.api_key = Some(key);
        Ok(config)
    }

    pub fn client(&self) -> Result<HttpClient, String> {
        let config = self.remote_config()?;
        debug!("using API at {}", config.api_url);
        Ok(HttpClient::new(config))
    }

    /// Where human-readable progress goes: stdout, or stderr when stdout
    /// carries JSON.
    /// Diff presenter for this run. With `--json` the diff is written to the
    /// human output stream instead of a pager, which would inherit stdout.
    pub fn presenter(&self) -> ChangePresenter {
        let presenter = ChangePresenter::detect();
        if self.json {
            presenter.without_pager()
        } else {
            presenter
        }
    }

    pub fn out(&self) -> Box<dyn Write> {
        if self.json {
            Box::new(std::io::stderr())
        } else {
            Box::new(std::io::stdout())
        }
    }
}

pub fn resolve_api_key(
    flag: Option<&str>,
    key_file: &Path,
    stored: &RemoteConfig,
) -> Result<String, String> {
    if let Some(key) = flag.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_owned());
    }
    if let Some(key) = read_key_file(key_file).map_err(|e| e.to_string())? {
        debug!("API key read from {}", key_file.display());
        return Ok(key);
    }
    if let Some(key) = stored.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_owned());
    }
    Err(format!(
        "usage: no API key found (use --api-key or EDGECTL_API_KEY, or write it to ./{KEY_FILE})"
    ))
}

#[allow(clippy::needless_pass_by_value)]
pub fn remote_err(e: RemoteError) -> String {
    CoreError::from(e).to_string()
}

/// Map an error message to the process exit code.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("usage:") {
        EXIT_USAGE
    } else if msg.starts_with("remote error:") {
        EXIT_REMOTE_ERROR
    } else if msg.starts_with("validation failed") || msg.starts_with("unexpected validation") {
        EXIT_VALIDATION_ERROR
    } else if msg.starts_with("in non-interactive shell") {
        EXIT_NON_INTERACTIVE
    } else {
        EXIT_FAILURE
    }
}

/// Yes/no prompt on the terminal; anything other than `y` or `n` is
/// rejected and asked again.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool, CoreError> {
        let answer: String = Input::new()
            .with_prompt(format!("{question} [y/n]"))
            .validate_with(|input: &String| -> Result<(), String> {
                if input == "y" || input == "n" {
                    Ok(())
                } else {
                    Err(format!("Invalid input: {input}"))
                }
            })
            .interact_text()
            .map_err(|e| CoreError::Prompt(e.to_string()))?;
        Ok(answer == "y")
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn yes_no(flag: bool) -> String {
    use console::Style;
    if flag {
        Style::new().green().apply_to("yes").to_string()
    } else {
        "no".to_owned()
    }
}
