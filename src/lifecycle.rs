//! Signal handling: SIGINT and SIGTERM both cancel the run's shutdown
//! token, since that's what `docker stop` sends a foreground process.
//!
//! No separate task set is needed to drain in-flight dispatcher cycles:
//! the scheduler's rendezvous channel already guarantees at most one
//! tick is ever in flight, and that tick runs to completion before the
//! scheduler's own loop re-checks the cancellation token.

use tracing::info;

use crate::context::RunContext;

/// Spawn a task that cancels `ctx.shutdown` on the first SIGINT or
/// SIGTERM. Returns immediately; the signal wait happens in the
/// background for the lifetime of the process.
pub fn install(ctx: &RunContext) {
    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        shutdown.cancel();
    });
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
