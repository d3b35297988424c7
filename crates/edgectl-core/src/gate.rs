use crate::CoreError;
use std::io::IsTerminal;

/// Whether this invocation may prompt, and what the operator pre-authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionGate {
    interactive: bool,
    assume_yes: bool,
    noop: bool,
}

impl InteractionGate {
    pub fn new(interactive: bool, assume_yes: bool, noop: bool) -> Self {
        Self {
            interactive,
            assume_yes,
            noop,
        }
    }

    /// Build a gate for the current process, reading terminal attachment
    /// from standard input.
    pub fn detect(assume_yes: bool, noop: bool) -> Self {
        Self::new(std::io::stdin().is_terminal(), assume_yes, noop)
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn assume_yes(&self) -> bool {
        self.assume_yes
    }

    pub fn noop(&self) -> bool {
        self.noop
    }

    /// Fails with `NonInteractive` when a prompt would be needed but no
    /// terminal is attached.
    pub fn require_confirmable(&self) -> Result<(), CoreError> {
        if !self.interactive && !self.assume_yes {
            return Err(CoreError::NonInteractive);
        }
        Ok(())
    }

    pub fn use_pager(&self) -> bool {
        self.interactive && !self.assume_yes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_without_assume_yes_is_rejected() {
        let err = InteractionGate::new(false, false, false)
            .require_confirmable()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "in non-interactive shell and --assume-yes not used"
        );
    }

    #[test]
    fn assume_yes_allows_non_interactive() {
        assert!(InteractionGate::new(false, true, false)
            .require_confirmable()
            .is_ok());
    }

    #[test]
    fn interactive_is_confirmable() {
        assert!(InteractionGate::new(true, false, true)
            .require_confirmable()
            .is_ok());
    }

    #[test]
    fn pager_only_for_interactive_prompting_sessions() {
        assert!(InteractionGate::new(true, false, false).use_pager());
        assert!(!InteractionGate::new(true, true, false).use_pager());
        assert!(!InteractionGate::new(false, false, false).use_pager());
    }
}
