//! Drives dispatcher ticks either once (for a single one-shot chaos
//! command) or on a fixed interval until shutdown.
//!
//! The ticker only ever has one tick in flight, backpressuring against a
//! slow-running command instead of piling up ticks. `tokio::sync::mpsc`'s
//! smallest bounded capacity is 1, not 0, so that's the channel capacity
//! used here; it gives the same one-in-flight guarantee a true
//! unbuffered channel would.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::command::ChaosCommand;
use crate::context::RunContext;
use crate::dispatcher;
use crate::runtime::RuntimeClient;
use crate::selector::Selector;

/// How the scheduler decides when to fire a tick.
pub enum TickSource {
    /// Run the command exactly once, after one `interval` wait, and return.
    Once(Duration),
    /// Run the command every `interval` until `ctx.shutdown` is cancelled.
    Recurring(Duration),
}

/// Drive `command` against `selector` per `tick_source`, stopping early
/// if `ctx.shutdown` is cancelled between ticks. Never returns an error:
/// a single tick failing is logged and the loop continues, since one bad
/// target must not stop the rest of a run.
pub async fn run(
    client: &dyn RuntimeClient,
    selector: Selector,
    command: ChaosCommand,
    ctx: RunContext,
    tick_source: TickSource,
) {
    match tick_source {
        TickSource::Once(interval) => {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    run_tick(client, &selector, &command, &ctx).await;
                }
                _ = ctx.shutdown.cancelled() => {}
            }
        }
        TickSource::Recurring(interval) => {
            run_recurring(client, selector, command, ctx, interval).await;
        }
    }
}

async fn run_tick(client: &dyn RuntimeClient, selector: &Selector, command: &ChaosCommand, ctx: &RunContext) {
    if let Err(e) = dispatcher::dispatch(client, selector, command, ctx).await {
        warn!("tick failed: {}", e);
    }
}

async fn run_recurring(
    client: &dyn RuntimeClient,
    selector: Selector,
    command: ChaosCommand,
    ctx: RunContext,
    interval: Duration,
) {
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let ticker_shutdown = ctx.shutdown.clone();

    let ticker = tokio::spawn(async move {
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
                _ = ticker_shutdown.cancelled() => break,
            }
        }
    });

    loop {
        tokio::select! {
            signal = rx.recv() => {
                match signal {
                    Some(()) => run_tick(client, &selector, &command, &ctx).await,
                    None => break,
                }
            }
            _ = ctx.shutdown.cancelled() => {
                info!("shutdown requested, draining scheduler");
                break;
            }
        }
    }

    ticker.abort();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::container::Container;
    use crate::runtime::test_support::FakeClient;

    fn running(name: &str) -> Container {
        Container {
            id: format!("id-{name}"),
            name: name.to_string(),
            image: "alpine".into(),
            labels: Default::default(),
            running: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn once_runs_exactly_one_tick_after_the_interval_elapses() {
        let client = Arc::new(FakeClient::with_containers(vec![running("a")]));
        let ctx = RunContext::new(false, false);

        let handle = tokio::spawn({
            let client = client.clone();
            async move {
                run(
                    client.as_ref(),
                    Selector::All,
                    ChaosCommand::Kill { signal: "SIGKILL".into() },
                    ctx,
                    TickSource::Once(Duration::from_secs(1)),
                )
                .await;
            }
        });

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(client.calls().is_empty());

        tokio::time::advance(Duration::from_millis(600)).await;
        handle.await.unwrap();
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn once_does_not_panic_when_the_tick_errors() {
        let client = FakeClient::with_containers(vec![running("a")]);
        client.fail_id("id-a", "boom");
        let ctx = RunContext::new(false, false);
        run(
            &client,
            Selector::All,
            ChaosCommand::Kill { signal: "SIGKILL".into() },
            ctx,
            TickSource::Once(Duration::from_millis(1)),
        )
        .await;
    }

    #[tokio::test]
    async fn recurring_stops_as_soon_as_shutdown_is_cancelled() {
        let client = FakeClient::with_containers(vec![running("a")]);
        let ctx = RunContext::new(false, false);
        let shutdown = ctx.shutdown.clone();
        shutdown.cancel();

        run(
            &client,
            Selector::All,
            ChaosCommand::Kill { signal: "SIGKILL".into() },
            ctx,
            TickSource::Recurring(Duration::from_secs(3600)),
        )
        .await;

        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn recurring_fires_multiple_ticks_before_shutdown() {
        let client = Arc::new(FakeClient::with_containers(vec![running("a")]));
        let ctx = RunContext::new(false, false);
        let shutdown = ctx.shutdown.clone();

        let handle = tokio::spawn({
            let client = client.clone();
            async move {
                run(
                    client.as_ref(),
                    Selector::All,
                    ChaosCommand::Kill { signal: "SIGKILL".into() },
                    ctx,
                    TickSource::Recurring(Duration::from_secs(1)),
                )
                .await;
            }
        });

        tokio::time::advance(Duration::from_millis(3500)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(client.calls().len() >= 2);
    }
}
