use crate::error::{ExportError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cooperative Ctrl-C handling. The pipeline polls this flag between network
/// steps and between partitions, so a stopped run only ever leaves whole
/// artifacts behind.
pub struct GracefulShutdown {
    interrupts: Arc<AtomicUsize>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let interrupts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&interrupts);

        ctrlc::set_handler(move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                eprintln!(
                    "\nStopping after the current step... (press Ctrl+C again to abort immediately)"
                );
            } else {
                eprintln!("\nAborting.");
                std::process::exit(130);
            }
        })
        .map_err(|e| ExportError::Config {
            message: format!("Failed to install the Ctrl+C handler: {}", e),
        })?;

        Ok(Self { interrupts })
    }

    /// Flag-only instance; tests cannot install a process-wide handler twice.
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self {
            interrupts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst) == 0
    }

    /// Turns a pending Ctrl+C into a `Cancelled` error at a safe point.
    pub fn check_shutdown(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ExportError::Cancelled)
        }
    }

    pub fn request_shutdown(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_until_shutdown_requested() {
        let shutdown = GracefulShutdown::new_for_test();

        assert!(shutdown.is_running());
        assert!(shutdown.check_shutdown().is_ok());

        shutdown.request_shutdown();
        assert!(!shutdown.is_running());
    }

    #[test]
    fn test_check_shutdown_reports_cancelled() {
        let shutdown = GracefulShutdown::new_for_test();
        shutdown.request_shutdown();

        assert!(matches!(
            shutdown.check_shutdown(),
            Err(ExportError::Cancelled)
        ));
    }
}
