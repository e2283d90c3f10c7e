//! Fans `RuntimeClient::remove` out over every target.

use super::{ExecError, TargetFailure};
use crate::container::Container;
use crate::context::RunContext;
use crate::runtime::RuntimeClient;

pub async fn run(
    client: &dyn RuntimeClient,
    targets: &[Container],
    force: bool,
    remove_links: bool,
    remove_volumes: bool,
    ctx: &RunContext,
) -> Result<(), ExecError> {
    let mut failures = Vec::new();
    for container in targets {
        if let Err(error) = client.remove(container, force, remove_links, remove_volumes, ctx.dry).await {
            failures.push(TargetFailure { container: container.display_name().to_string(), error });
        }
    }
    ExecError::from_failures(failures, targets.len())
}
