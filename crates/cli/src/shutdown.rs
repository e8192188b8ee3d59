use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ShutdownController {
    forced: AtomicU8,
    requested: AtomicU8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEvent {
    Graceful,
    Immediate,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_forced(&self) -> u8 {
        self.forced.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Acquire) != 0
    }
}

/// Installs a Ctrl-C handler: the first press requests a graceful shutdown, a second press
/// within the same process lifetime requests an immediate one.
pub fn install_ctrl_c_handler(
    shutdown: Arc<ShutdownController>,
    on_event: impl Fn(ShutdownEvent) + Send + 'static,
) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        shutdown.requested.store(1, Ordering::Release);
        let n = shutdown.bump_forced();
        if n == 1 {
            on_event(ShutdownEvent::Graceful);
        } else {
            on_event(ShutdownEvent::Immediate);
        }
    })?;
    Ok(())
}
