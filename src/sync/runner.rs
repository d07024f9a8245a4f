// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use super::agent::SyncAgent;
use super::host::Host;
use crate::store::now_secs;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A running poll loop. Stopping (or dropping) the handle ends the loop at its next await.
pub struct PollHandle<H> {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<SyncAgent<H>>,
}

impl<H> PollHandle<H> {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ends the loop and hands the agent back, after it announced that nothing is open.
    ///
    /// `None` if the task panicked.
    pub async fn stop(mut self) -> Option<SyncAgent<H>> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.task.await {
            Ok(agent) => Some(agent),
            Err(err) => {
                tracing::warn!(error = %err, "poll loop ended abnormally");
                None
            }
        }
    }
}

/// Drives `agent` on the current tokio runtime: a tick every poll interval, plus high-mesh
/// retries while one is pending.
pub fn spawn_poll_loop<H>(agent: SyncAgent<H>) -> PollHandle<H>
where
    H: Host + Send + 'static,
{
    let (stop, stopped) = oneshot::channel();
    let task = tokio::spawn(run(agent, stopped));
    PollHandle {
        stop: Some(stop),
        task,
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run<H: Host>(mut agent: SyncAgent<H>, mut stopped: oneshot::Receiver<()>) -> SyncAgent<H> {
    let mut poll = ticker(agent.config().poll_interval);
    let mut retry = ticker(agent.config().high_mesh_retry_delay);
    tracing::info!(side = %agent.side(), "poll loop started");

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = poll.tick() => {
                let outcome = agent.tick(now_secs());
                tracing::trace!(?outcome, "poll");
            }
            _ = retry.tick(), if agent.retry_pending() => {
                let status = agent.tick_retry();
                tracing::trace!(?status, "high mesh retry");
            }
        }
    }

    agent.shutdown(now_secs());
    tracing::info!(side = %agent.side(), "poll loop stopped");
    agent
}
