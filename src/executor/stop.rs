//! Fans `RuntimeClient::stop` out over every target.

use super::{ExecError, TargetFailure};
use crate::container::Container;
use crate::context::RunContext;
use crate::runtime::RuntimeClient;

pub async fn run(
    client: &dyn RuntimeClient,
    targets: &[Container],
    wait_seconds: u64,
    ctx: &RunContext,
) -> Result<(), ExecError> {
    let mut failures = Vec::new();
    for container in targets {
        if let Err(error) = client.stop(container, wait_seconds, ctx.dry).await {
            failures.push(TargetFailure { container: container.display_name().to_string(), error });
        }
    }
    ExecError::from_failures(failures, targets.len())
}
