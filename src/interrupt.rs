use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-blocking "please stop" poll, checked once per frame
pub trait StopSignal {
    fn stop_requested(&self) -> bool;
}

/// Stop flag shared with whoever owns the other end
#[derive(Debug, Clone, Default)]
pub struct FlagSignal {
    flag: Arc<AtomicBool>,
}

impl FlagSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl StopSignal for FlagSignal {
    fn stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Raised by Ctrl+C, or SIGTERM on unix
///
/// A watcher thread runs a small tokio runtime that waits for the signal
/// and sets the flag. The pipeline itself stays synchronous.
pub struct CtrlCSignal {
    flag: FlagSignal,
}

impl CtrlCSignal {
    pub fn install() -> Result<Self> {
        let flag = FlagSignal::new();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build signal runtime")?;

        let watcher = flag.clone();
        std::thread::Builder::new()
            .name("stop-signal".into())
            .spawn(move || {
                runtime.block_on(wait_for_shutdown());
                watcher.request_stop();
            })
            .context("Failed to spawn signal watcher")?;

        Ok(Self { flag })
    }
}

impl StopSignal for CtrlCSignal {
    fn stop_requested(&self) -> bool {
        self.flag.stop_requested()
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Stop requested");
}
