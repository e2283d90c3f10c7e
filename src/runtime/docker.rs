//! Bollard-backed implementation of [`RuntimeClient`].
//!
//! Inspects a container and classifies 404/409 responses rather than
//! propagating them as errors, and runs in-container commands with the
//! usual create_exec/start_exec/drain sequence.

use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{KillContainerOptions, ListContainersOptions, RemoveContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::ContainerInspectResponse;
use bollard::Docker;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::container::Container;

use super::{RuntimeClient, RuntimeError, RuntimeResult};

/// TLS material for connecting to a remote runtime socket over TCP.
pub struct TlsPaths {
    pub ca_cert: String,
    pub cert: String,
    pub key: String,
}

pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect using the same precedence the CLI advertises in its global
    /// flags / `DOCKER_HOST` / `DOCKER_TLS_VERIFY` / `DOCKER_CERT_PATH`
    /// environment variables. TLS certificate loading itself is handed
    /// straight to `bollard`'s own loader rather than parsed here.
    pub fn connect(host: Option<&str>, tls: Option<TlsPaths>) -> RuntimeResult<Self> {
        let docker = match (host, tls) {
            (Some(host), Some(tls)) => Docker::connect_with_ssl(
                host,
                std::path::Path::new(&tls.key),
                std::path::Path::new(&tls.cert),
                std::path::Path::new(&tls.ca_cert),
                120,
                bollard::API_DEFAULT_VERSION,
            )
            .map_err(RuntimeError::Docker)?,
            (Some(host), None) => Docker::connect_with_http(host, 120, bollard::API_DEFAULT_VERSION)
                .map_err(RuntimeError::Docker)?,
            (None, _) => Docker::connect_with_local_defaults().map_err(RuntimeError::Docker)?,
        };
        Ok(Self::new(docker))
    }

    fn to_container(inspect: ContainerInspectResponse) -> Container {
        let id = inspect.id.unwrap_or_default();
        let name = inspect.name.unwrap_or_default();
        let image = inspect
            .config
            .as_ref()
            .and_then(|c| c.image.clone())
            .unwrap_or_default();
        let labels = inspect
            .config
            .as_ref()
            .and_then(|c| c.labels.clone())
            .unwrap_or_default();
        let running = inspect.state.and_then(|s| s.running).unwrap_or(false);

        Container { id, name, image, labels, running }
    }

    /// `true` if the container is gone (404) or inspected as not running.
    async fn is_stopped(&self, id: &str) -> RuntimeResult<bool> {
        match self.docker.inspect_container(id, None).await {
            Err(DockerError::DockerResponseServerError { status_code: 404, .. }) => Ok(true),
            Err(e) => Err(RuntimeError::Docker(e)),
            Ok(info) => Ok(!info.state.and_then(|s| s.running).unwrap_or(false)),
        }
    }

    /// Poll `is_stopped` once per second for up to `wait_seconds`,
    /// returning as soon as the container is confirmed stopped.
    async fn wait_until_stopped(&self, id: &str, wait_seconds: u64) -> RuntimeResult<bool> {
        if self.is_stopped(id).await? {
            return Ok(true);
        }
        for _ in 0..wait_seconds {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if self.is_stopped(id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Send `signal`, treating "already gone" / "not running" as success.
    async fn send_signal(&self, id: &str, signal: &str) -> RuntimeResult<()> {
        let options = KillContainerOptions { signal };
        match self.docker.kill_container(id, Some(options)).await {
            Ok(_) => Ok(()),
            Err(DockerError::DockerResponseServerError { status_code: 404, .. }) => {
                debug!("container {} not found for signal {}", id, signal);
                Ok(())
            }
            Err(DockerError::DockerResponseServerError { status_code: 409, .. }) => {
                debug!("container {} not running, signal {} skipped", id, signal);
                Ok(())
            }
            Err(e) => Err(RuntimeError::Docker(e)),
        }
    }
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn list_running(&self) -> RuntimeResult<Vec<Container>> {
        let options = Some(ListContainersOptions::<String> { all: false, ..Default::default() });
        let summaries = self.docker.list_containers(options).await.map_err(RuntimeError::Docker)?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = summary.id.unwrap_or_default();
            let inspect = self.docker.inspect_container(&id, None).await.map_err(RuntimeError::Docker)?;
            containers.push(Self::to_container(inspect));
        }
        Ok(containers)
    }

    async fn kill(&self, container: &Container, signal: &str, dry: bool) -> RuntimeResult<()> {
        if dry {
            info!("DRY: kill {} with {}", container.display_name(), signal);
            return Ok(());
        }
        self.send_signal(&container.id, signal).await
    }

    async fn stop(&self, container: &Container, wait_seconds: u64, dry: bool) -> RuntimeResult<()> {
        let signal = container.stop_signal().to_string();

        if dry {
            info!(
                "DRY: stop {} (signal {}, wait {}s, SIGKILL fallback)",
                container.display_name(),
                signal,
                wait_seconds
            );
            return Ok(());
        }

        self.send_signal(&container.id, &signal).await?;
        if self.wait_until_stopped(&container.id, wait_seconds).await? {
            return Ok(());
        }

        warn!("container {} still running after {}s, sending SIGKILL", container.display_name(), wait_seconds);
        self.send_signal(&container.id, "SIGKILL").await?;

        if self.wait_until_stopped(&container.id, wait_seconds).await? {
            Ok(())
        } else {
            Err(RuntimeError::CouldNotStop(container.display_name().to_string()))
        }
    }

    async fn pause(&self, container: &Container, duration: Duration, dry: bool) -> RuntimeResult<()> {
        if dry {
            info!("DRY: pause {} for {:?}", container.display_name(), duration);
            return Ok(());
        }

        self.docker.pause_container(&container.id).await.map_err(RuntimeError::Docker)?;
        tokio::time::sleep(duration).await;

        // The unpause error, if any, is returned as-is: a failed unpause
        // means this container is left paused (LEAKED), which the caller
        // must be able to distinguish from a failed pause.
        self.docker.unpause_container(&container.id).await.map_err(RuntimeError::Docker)
    }

    async fn remove(
        &self,
        container: &Container,
        force: bool,
        remove_links: bool,
        remove_volumes: bool,
        dry: bool,
    ) -> RuntimeResult<()> {
        if dry {
            info!(
                "DRY: remove {} (force={} links={} volumes={})",
                container.display_name(),
                force,
                remove_links,
                remove_volumes
            );
            return Ok(());
        }

        let options = RemoveContainerOptions { force, link: remove_links, v: remove_volumes };
        self.docker
            .remove_container(&container.id, Some(options))
            .await
            .map_err(RuntimeError::Docker)
    }

    async fn exec(
        &self,
        container: &Container,
        argv: &[&str],
        privileged: bool,
        dry: bool,
    ) -> RuntimeResult<()> {
        if dry {
            info!("DRY: exec {:?} in {} (privileged={})", argv, container.display_name(), privileged);
            return Ok(());
        }

        let exec = self
            .docker
            .create_exec(
                &container.id,
                CreateExecOptions {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    privileged: Some(privileged),
                    cmd: Some(argv.to_vec()),
                    ..Default::default()
                },
            )
            .await
            .map_err(RuntimeError::Docker)?;

        let result = self
            .docker
            .start_exec(&exec.id, Some(StartExecOptions { detach: false, tty: false, output_capacity: None }))
            .await
            .map_err(RuntimeError::Docker)?;

        if let StartExecResults::Attached { mut output, .. } = result {
            while let Some(chunk) = output.next().await {
                if let Err(e) = chunk {
                    warn!("exec {:?} in {}: {}", argv, container.display_name(), e);
                }
            }
        }

        let inspected = self.docker.inspect_exec(&exec.id).await.map_err(RuntimeError::Docker)?;
        match inspected.exit_code {
            Some(0) | None => Ok(()),
            Some(code) => Err(RuntimeError::Other(format!(
                "exec {:?} in {} exited with code {}",
                argv,
                container.display_name(),
                code
            ))),
        }
    }
}
