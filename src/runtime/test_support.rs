//! In-memory `RuntimeClient` used by the rest of the crate's unit tests.
//! Not built into the release binary.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::container::Container;

use super::{RuntimeClient, RuntimeError, RuntimeResult};

/// One recorded call against a [`FakeClient`], for tests that assert on
/// what the executors actually asked the runtime to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Kill { id: String, signal: String, dry: bool },
    Stop { id: String, wait_seconds: u64, dry: bool },
    Pause { id: String, dry: bool },
    Remove { id: String, force: bool, links: bool, volumes: bool, dry: bool },
    Exec { id: String, argv: Vec<String>, privileged: bool, dry: bool },
}

#[derive(Default)]
struct State {
    containers: Vec<Container>,
    calls: Vec<Call>,
    fail_unpause: bool,
    fail_ids: HashMap<String, String>,
}

/// A fake runtime backed by a fixed container list, recording every call
/// made against it. Failures are injected per-container-id via
/// [`FakeClient::fail_id`] / globally for unpause via
/// [`FakeClient::fail_unpause`].
pub struct FakeClient {
    state: Mutex<State>,
}

impl FakeClient {
    pub fn with_containers(containers: Vec<Container>) -> Self {
        Self { state: Mutex::new(State { containers, ..Default::default() }) }
    }

    pub fn empty() -> Self {
        Self::with_containers(Vec::new())
    }

    /// Make every mutating call against `id` fail with `RuntimeError::Other(message)`.
    pub fn fail_id(&self, id: &str, message: &str) {
        self.state.lock().unwrap().fail_ids.insert(id.to_string(), message.to_string());
    }

    /// Make `pause`'s unpause step fail, simulating a leaked pause.
    pub fn fail_unpause(&self) {
        self.state.lock().unwrap().fail_unpause = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn check_failure(&self, id: &str) -> RuntimeResult<()> {
        let state = self.state.lock().unwrap();
        if let Some(message) = state.fail_ids.get(id) {
            return Err(RuntimeError::Other(message.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl RuntimeClient for FakeClient {
    async fn list_running(&self) -> RuntimeResult<Vec<Container>> {
        Ok(self.state.lock().unwrap().containers.iter().filter(|c| c.running).cloned().collect())
    }

    async fn kill(&self, container: &Container, signal: &str, dry: bool) -> RuntimeResult<()> {
        self.check_failure(&container.id)?;
        self.state.lock().unwrap().calls.push(Call::Kill {
            id: container.id.clone(),
            signal: signal.to_string(),
            dry,
        });
        Ok(())
    }

    async fn stop(&self, container: &Container, wait_seconds: u64, dry: bool) -> RuntimeResult<()> {
        self.check_failure(&container.id)?;
        self.state.lock().unwrap().calls.push(Call::Stop { id: container.id.clone(), wait_seconds, dry });
        Ok(())
    }

    async fn pause(&self, container: &Container, _duration: Duration, dry: bool) -> RuntimeResult<()> {
        self.check_failure(&container.id)?;
        self.state.lock().unwrap().calls.push(Call::Pause { id: container.id.clone(), dry });
        if self.state.lock().unwrap().fail_unpause {
            return Err(RuntimeError::Other(format!("unpause failed for {}", container.id)));
        }
        Ok(())
    }

    async fn remove(
        &self,
        container: &Container,
        force: bool,
        remove_links: bool,
        remove_volumes: bool,
        dry: bool,
    ) -> RuntimeResult<()> {
        self.check_failure(&container.id)?;
        self.state.lock().unwrap().calls.push(Call::Remove {
            id: container.id.clone(),
            force,
            links: remove_links,
            volumes: remove_volumes,
            dry,
        });
        Ok(())
    }

    async fn exec(
        &self,
        container: &Container,
        argv: &[&str],
        privileged: bool,
        dry: bool,
    ) -> RuntimeResult<()> {
        self.check_failure(&container.id)?;
        self.state.lock().unwrap().calls.push(Call::Exec {
            id: container.id.clone(),
            argv: argv.iter().map(|s| s.to_string()).collect(),
            privileged,
            dry,
        });
        Ok(())
    }
}
