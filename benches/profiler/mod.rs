// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Criterion setup shared by the bridge benchmarks.
//!
//! `PAINTBRIDGE_BENCH_SAMPLES`, `PAINTBRIDGE_BENCH_WARMUP` and `PAINTBRIDGE_BENCH_SECONDS` tune
//! the measurement; `PAINTBRIDGE_PROFILE_HZ` sets the pprof sampling rate, `0` turns the
//! flamegraph off.

use std::time::Duration;

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

#[derive(Debug, Clone, Copy, PartialEq)]
struct BenchSettings {
    samples: usize,
    warmup: Duration,
    measurement: Duration,
    profile_hz: Option<i32>,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            samples: 30,
            warmup: Duration::from_secs(1),
            measurement: Duration::from_secs(4),
            profile_hz: Some(100),
        }
    }
}

impl BenchSettings {
    fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().map(|raw| raw.trim().to_owned());
        let secs = |name: &str, fallback: Duration, max: f64| {
            var(name)
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map_or(fallback, |secs| Duration::from_secs_f64(secs.min(max)))
        };

        Self {
            samples: var("PAINTBRIDGE_BENCH_SAMPLES")
                .and_then(|raw| raw.parse::<usize>().ok())
                .map_or(defaults.samples, |n| n.clamp(10, 500)),
            warmup: secs("PAINTBRIDGE_BENCH_WARMUP", defaults.warmup, 30.0),
            measurement: secs("PAINTBRIDGE_BENCH_SECONDS", defaults.measurement, 120.0),
            profile_hz: match var("PAINTBRIDGE_PROFILE_HZ").and_then(|raw| raw.parse::<i32>().ok()) {
                Some(hz) if hz <= 0 => None,
                Some(hz) => Some(hz.min(1_000)),
                None => defaults.profile_hz,
            },
        }
    }

    fn apply(self, criterion: Criterion) -> Criterion {
        let criterion = criterion
            .sample_size(self.samples)
            .warm_up_time(self.warmup)
            .measurement_time(self.measurement);
        match self.profile_hz {
            Some(hz) => criterion.with_profiler(PProfProfiler::new(hz, Output::Flamegraph(None))),
            None => criterion,
        }
    }
}

pub fn configured() -> Criterion {
    BenchSettings::from_env().apply(Criterion::default())
}
