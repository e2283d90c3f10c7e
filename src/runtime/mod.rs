//! The narrow interface the rest of the engine uses to talk to a container
//! runtime (C1 in spec terms). `docker` holds the real `bollard`-backed
//! implementation; `test_support` holds an in-memory fake used by the rest
//! of the crate's unit tests.

pub mod docker;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::container::Container;

pub use docker::DockerClient;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container {0} could not be stopped")]
    CouldNotStop(String),

    #[error("{0}")]
    Other(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Adapts a generic container-runtime API into the operations the engine
/// needs. All mutating operations take a `dry` flag: when set, they log a
/// `DRY:`-prefixed line and return success without contacting the runtime,
/// so the same validation and logging paths run in both modes.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// List every running container known to the runtime.
    async fn list_running(&self) -> RuntimeResult<Vec<Container>>;

    /// Send `signal` to the container's main process.
    async fn kill(&self, container: &Container, signal: &str, dry: bool) -> RuntimeResult<()>;

    /// Send the container's stop signal, poll for it to exit, then force-kill
    /// with `SIGKILL` if it's still running after `wait_seconds`.
    async fn stop(&self, container: &Container, wait_seconds: u64, dry: bool) -> RuntimeResult<()>;

    /// Pause every process in the container, sleep for `duration`, then
    /// unpause. Returns the unpause error if it fails, the pause is
    /// considered to have leaked in that case.
    async fn pause(&self, container: &Container, duration: Duration, dry: bool) -> RuntimeResult<()>;

    /// Remove the container.
    async fn remove(
        &self,
        container: &Container,
        force: bool,
        remove_links: bool,
        remove_volumes: bool,
        dry: bool,
    ) -> RuntimeResult<()>;

    /// Create and start an exec session running `argv` inside the
    /// container, waiting for it to complete. `privileged` requests the
    /// elevated capabilities `tc` needs to configure qdiscs.
    async fn exec(
        &self,
        container: &Container,
        argv: &[&str],
        privileged: bool,
        dry: bool,
    ) -> RuntimeResult<()>;
}
