//! Cooperative shutdown.
//!
//! A single atomic flag, initially `false`, set once by an interrupt and read
//! by the polling loop between steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Exit status used when a second interrupt cuts the wind-down short.
const FORCED_EXIT_CODE: i32 = 130;

/// What an interrupt should do given the flag's prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// First interrupt: let the loop finish its current step.
    Graceful,
    /// Flag was already raised: terminate now.
    Forced,
}

/// Shared shutdown request flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create a flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` if this call raised it.
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn interrupt(&self) -> Interrupt {
        if self.request() {
            Interrupt::Graceful
        } else {
            Interrupt::Forced
        }
    }

    /// Raise the flag on the first Ctrl-C and exit the process on the second.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let flag = self.clone();

        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }

                match flag.interrupt() {
                    Interrupt::Graceful => {
                        info!("Interrupt received, stopping after the current step");
                    }
                    Interrupt::Forced => {
                        warn!("Second interrupt received, exiting immediately");
                        std::process::exit(FORCED_EXIT_CODE);
                    }
                }
            }
        })
    }
}
