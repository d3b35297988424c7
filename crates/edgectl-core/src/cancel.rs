use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Set when the operator interrupts; checked before irreversible steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Install a Ctrl-C handler that sets the returned flag. A second Ctrl-C
/// exits immediately.
pub fn install_signal_handler() -> CancelFlag {
    let flag = CancelFlag::new();
    let handler_flag = flag.clone();
    let installed = ctrlc::set_handler(move || {
        if handler_flag.is_cancelled() {
            std::process::exit(1);
        }
        handler_flag.cancel();
        eprintln!("\ninterrupt received, nothing will be activated (Ctrl-C again to exit)");
    });
    if let Err(e) = installed {
        warn!("failed to install Ctrl-C handler, interrupts will not stop activation: {e}");
    }
    flag
}
