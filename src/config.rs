// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Timing knobs and launch-time inputs.

use std::path::PathBuf;
use std::time::Duration;

use crate::store::WriteDurability;

pub const POLL_ENV_VAR: &str = "GOB_SP_POLL_MS";
pub const HEARTBEAT_ENV_VAR: &str = "GOB_SP_HEARTBEAT_SECS";
pub const FORCE_NEW_TOKEN_ENV_VAR: &str = "GOB_SP_FORCE_NEW_TOKEN";
pub const FORCE_NEW_TOKEN_ARG_PREFIXES: [&str; 2] = ["--gob-force-new-token=", "--gob-force-new="];

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub poll_interval: Duration,
    /// Minimum gap between full manifest scans of every candidate root.
    pub scan_cooldown: Duration,
    pub heartbeat_interval: Duration,
    pub heartbeat_max_age: Duration,
    /// Pause after the receiving application reported itself busy.
    pub busy_backoff: Duration,
    /// Pause after a reload/create failed outright.
    pub failure_backoff: Duration,
    pub high_mesh_retry_delay: Duration,
    pub high_mesh_retry_count: u32,
    pub durability: WriteDurability,
    pub preferred_root: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3000),
            scan_cooldown: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_max_age: Duration::from_secs(120),
            busy_backoff: Duration::from_secs(2),
            failure_backoff: Duration::from_secs(2),
            high_mesh_retry_delay: Duration::from_millis(800),
            high_mesh_retry_count: 60,
            durability: WriteDurability::BestEffort,
            preferred_root: None,
        }
    }
}

impl BridgeConfig {
    /// Defaults plus whatever the process environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `GOB_SP_POLL_MS` and `GOB_SP_HEARTBEAT_SECS` from `lookup`. Unparsable or zero
    /// values keep the current setting.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |key: &str| {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => Some(value),
                _ => {
                    tracing::warn!(key, value = %raw, "ignoring malformed override");
                    None
                }
            }
        };
        if let Some(ms) = positive(POLL_ENV_VAR) {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = positive(HEARTBEAT_ENV_VAR) {
            self.heartbeat_interval = Duration::from_secs(secs);
        }
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_scan_cooldown(mut self, cooldown: Duration) -> Self {
        self.scan_cooldown = cooldown;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_heartbeat_max_age(mut self, max_age: Duration) -> Self {
        self.heartbeat_max_age = max_age;
        self
    }

    pub fn with_busy_backoff(mut self, backoff: Duration) -> Self {
        self.busy_backoff = backoff;
        self
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    pub fn with_high_mesh_retry(mut self, delay: Duration, count: u32) -> Self {
        self.high_mesh_retry_delay = delay;
        self.high_mesh_retry_count = count;
        self
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_preferred_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.preferred_root = Some(root.into());
        self
    }
}

/// The force-new token this instance was launched with: the environment variable first, then
/// the first non-empty `--gob-force-new-token=` / `--gob-force-new=` argument.
pub fn parse_launch_token(
    env_value: Option<String>,
    args: impl IntoIterator<Item = String>,
) -> Option<String> {
    if let Some(token) = env_value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
    {
        return Some(token);
    }
    args.into_iter().find_map(|arg| {
        FORCE_NEW_TOKEN_ARG_PREFIXES.iter().find_map(|prefix| {
            arg.strip_prefix(prefix)
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_owned)
        })
    })
}

pub fn launch_token_from_process() -> Option<String> {
    parse_launch_token(
        std::env::var(FORCE_NEW_TOKEN_ENV_VAR).ok(),
        std::env::args().skip(1),
    )
}
