//! Run-wide settings threaded through the dispatcher and executors,
//! built once at startup and passed by reference rather than read from
//! a global.

use tokio_util::sync::CancellationToken;

/// Settings that apply to every tick of a run, independent of which
/// chaos command is being applied.
#[derive(Clone)]
pub struct RunContext {
    /// When set, executors log what they would do and skip the runtime
    /// call.
    pub dry: bool,
    /// When set, the target resolver narrows a non-empty match set down
    /// to one randomly-chosen container.
    pub random: bool,
    /// Cancelled on SIGINT/SIGTERM; observed cooperatively between ticks
    /// and inside long-running netem holds.
    pub shutdown: CancellationToken,
    /// When set, an IP-filtered netem command builds its `tc` filter with
    /// `match ip dst <ip>` instead of the default `match ip dport <ip>`.
    pub dst_match: bool,
}

impl RunContext {
    pub fn new(dry: bool, random: bool) -> Self {
        Self { dry, random, shutdown: CancellationToken::new(), dst_match: false }
    }

    pub fn with_dst_match(mut self, dst_match: bool) -> Self {
        self.dst_match = dst_match;
        self
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_shutting_down() {
        let ctx = RunContext::new(false, false);
        assert!(!ctx.is_shutting_down());
    }

    #[test]
    fn cancelling_shutdown_token_is_observed() {
        let ctx = RunContext::new(false, false);
        ctx.shutdown.cancel();
        assert!(ctx.is_shutting_down());
    }

    #[test]
    fn clone_shares_the_same_shutdown_token() {
        let ctx = RunContext::new(true, true);
        let clone = ctx.clone();
        ctx.shutdown.cancel();
        assert!(clone.is_shutting_down());
    }
}
