// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The hand-off protocol on top of [`crate::store`].
//!
//! [`decision::decide`] is pure and looks only at values. [`SyncAgent`] gathers those values
//! from disk and the host application, runs the decision and carries out its effects. The
//! [`runner`] drives an agent on a timer.

use std::path::PathBuf;

pub mod agent;
pub mod decision;
pub mod host;
pub mod retry;
pub mod runner;
pub mod send;

pub use agent::{Action, SkipReason, SyncAgent, TickOutcome};
pub use decision::{
    decide, Decision, IgnoreReason, Incoming, LocalSession, OpenSession, RejectReason, Trigger,
};
pub use host::{
    Artifacts, Completion, Exported, Exporter, Host, HostError, HostEvent, Launcher, Notice,
    OpenDocument, ProcessLauncher, RecordingHost,
};
pub use retry::{HighMeshRetry, RetryStatus, RetryTarget};
pub use runner::{spawn_poll_loop, PollHandle};
pub use send::{plan_wake, SendReport, SendRequest, WakePlan};

use crate::store::StoreError;

/// Failures of user-initiated operations. Background polling never returns these.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no hand-off manifest found")]
    NoManifest,

    #[error("manifest at {0:?} is unreadable")]
    UnreadableManifest(PathBuf),

    #[error("hand-off rejected: {0}")]
    Rejected(RejectReason),

    #[error("artifact not found: {0}")]
    MissingArtifact(String),

    #[error("another import is still running")]
    InProgress,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
