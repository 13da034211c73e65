use std::{sync::Weak, time::Duration};

use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{request_executor_state::RequestExecutorState, RequestExecutorMessage};
use crate::document_conventions::ReadBalanceBehavior;

/// Background side of a request executor: periodic topology refresh, periodic speed tests,
/// and topology refreshes asked for by responses.
///
/// Holds only a weak reference to the executor state, so dropping the last handle ends the
/// actor as well.
pub(super) struct RequestExecutorActor {
    state: Weak<RequestExecutorState>,
    receiver: mpsc::Receiver<RequestExecutorMessage>,
    shutdown: CancellationToken,
    topology_refresh_interval: Duration,
    speed_test_interval: Duration,
}

impl RequestExecutorActor {
    pub(super) fn new(
        state: Weak<RequestExecutorState>,
        receiver: mpsc::Receiver<RequestExecutorMessage>,
        shutdown: CancellationToken,
        topology_refresh_interval: Duration,
        speed_test_interval: Duration,
    ) -> Self {
        Self {
            state,
            receiver,
            shutdown,
            topology_refresh_interval,
            speed_test_interval,
        }
    }

    async fn handle_message(&self, msg: RequestExecutorMessage) {
        match msg {
            RequestExecutorMessage::UpdateTopology { node, force } => {
                let Some(state) = self.state.upgrade() else {
                    return;
                };
                if let Err(e) = state.update_topology(node, force).await {
                    tracing::error!(
                        "An error occurred while refreshing the topology. Caused by: {}",
                        e
                    );
                }
            }
        }
    }

    /// Refreshes the topology from the preferred node, unless a response came back within the
    /// last refresh interval. Failures are logged, never raised.
    #[instrument(level = "debug", skip(self))]
    async fn refresh_topology(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        if state.topology_updates_disabled || state.is_disposed() {
            return;
        }
        if state.last_return_response().elapsed() < self.topology_refresh_interval {
            tracing::trace!("A response came back recently, skipping timed topology refresh");
            return;
        }
        let Some(node) = state.preferred_node() else {
            return;
        };

        match state.update_topology(node, false).await {
            Ok(true) => tracing::debug!("Timed topology refresh complete"),
            Ok(false) => tracing::debug!("Timed topology refresh skipped"),
            Err(e) => tracing::error!(
                "There was an error updating the topology. Caused by: {}",
                e
            ),
        }
    }

    fn schedule_speed_test(&self) {
        if let Some(state) = self.state.upgrade() {
            if state.conventions.read_balance_behavior() == ReadBalanceBehavior::FastestNode {
                tracing::trace!("Entering speed test phase");
                state.schedule_speed_test();
            }
        }
    }
}

#[instrument(level = "debug", name = "Running Request Executor Actor", skip(actor))]
pub(super) async fn run_request_executor_actor(mut actor: RequestExecutorActor) {
    let mut topology_update_timer = interval_at(
        Instant::now() + actor.topology_refresh_interval,
        actor.topology_refresh_interval,
    );
    topology_update_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut speed_test_timer = interval_at(
        Instant::now() + actor.speed_test_interval,
        actor.speed_test_interval,
    );
    speed_test_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = actor.shutdown.cancelled() => {
                tracing::debug!("Request executor actor shutting down");
                break;
            }
            _ = topology_update_timer.tick() => {
                tracing::debug!("Updating topology via timer.");
                actor.refresh_topology().await;
            }
            _ = speed_test_timer.tick() => {
                actor.schedule_speed_test();
            }
            opt_msg = actor.receiver.recv() => {
                let msg = match opt_msg {
                    Some(msg) => msg,
                    None => break,
                };
                actor.handle_message(msg).await;
            }
        }
    }
}
