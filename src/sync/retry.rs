// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::PathBuf;

use super::host::Host;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryTarget {
    Attach(PathBuf),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStatus {
    Idle,
    Done,
    Waiting { remaining: u32 },
    Exhausted,
}

/// Bounded retry for the high-detail reference mesh.
///
/// The host only accepts it once the document is ready, which may lag the reload/create.
/// Queuing a new target replaces the old one and restores the full attempt budget.
#[derive(Debug, Clone)]
pub struct HighMeshRetry {
    target: Option<RetryTarget>,
    remaining: u32,
    attempts: u32,
}

impl HighMeshRetry {
    pub fn new(attempts: u32) -> Self {
        Self {
            target: None,
            remaining: 0,
            attempts,
        }
    }

    pub fn queue(&mut self, target: RetryTarget) {
        if self.attempts == 0 {
            return;
        }
        tracing::debug!(retry = ?target, "high mesh retry queued");
        self.target = Some(target);
        self.remaining = self.attempts;
    }

    pub fn cancel(&mut self) {
        self.target = None;
        self.remaining = 0;
    }

    pub fn target(&self) -> Option<&RetryTarget> {
        self.target.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.target.is_some()
    }

    /// One attempt. Every call that does not succeed uses up one unit of the budget.
    pub fn tick(&mut self, host: &mut impl Host) -> RetryStatus {
        let Some(target) = &self.target else {
            return RetryStatus::Idle;
        };
        let applied = match target {
            RetryTarget::Attach(path) => host.attach_high_mesh(path),
            RetryTarget::Clear => host.clear_high_mesh(),
        };
        if applied {
            self.cancel();
            return RetryStatus::Done;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            tracing::warn!(retry = ?self.target, "high mesh not applied; giving up");
            self.cancel();
            return RetryStatus::Exhausted;
        }
        RetryStatus::Waiting {
            remaining: self.remaining,
        }
    }
}
