// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! What the receiving side does with a manifest it has found.
//!
//! No I/O happens here; [`crate::sync::SyncAgent`] collects the inputs and executes the result.

use std::fmt;
use std::path::Path;

use crate::paths::{paths_match, sanitize_name};
use crate::store::{Manifest, Side};

/// Who asked for the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Background poll: consumed or already-handled manifests are skipped quietly.
    Poll,
    /// The user asked to import now: the hand-off marker is not required.
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Written by this side.
    OwnSource,
    /// `auto_import` is not set; the hand-off was consumed.
    NotArmed,
    /// This manifest path and hand-off time were acted on already.
    AlreadyHandled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The manifest pairs with a different document than the one open here.
    ForeignDocument,
    /// A force-new hand-off meant for another instance.
    TokenMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignDocument => f.write_str(
                "the export targets a different document; close the current one and import again",
            ),
            Self::TokenMismatch => {
                f.write_str("the export asked for a new instance of a different application window")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ignore(IgnoreReason),
    RejectForeign(RejectReason),
    /// Reload the open document's primary asset in place.
    Reload,
    /// Start a fresh document, closing the open one first when `close_current`.
    CreateNew { close_current: bool },
}

/// The document open on the receiving side.
#[derive(Debug, Clone, Copy)]
pub struct OpenSession<'a> {
    /// Real path, or the session placeholder when never saved.
    pub document: &'a Path,
    pub project_dir: Option<&'a Path>,
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalSession<'a> {
    pub side: Side,
    pub open: Option<OpenSession<'a>>,
    /// Force-new token this instance was launched with, until consumed.
    pub launch_token: Option<&'a str>,
    /// Manifest path and hand-off time of the last successful import.
    pub last_acted: Option<(&'a Path, f64)>,
}

#[derive(Debug, Clone, Copy)]
pub struct Incoming<'a> {
    pub manifest_path: &'a Path,
    pub project_dir: &'a Path,
    pub manifest: &'a Manifest,
    pub handoff_time: f64,
    /// Link-registry entry keyed by the document this manifest records for its source side.
    pub registry_partner: Option<&'a str>,
}

pub fn decide(local: &LocalSession<'_>, incoming: &Incoming<'_>, trigger: Trigger) -> Decision {
    let manifest = incoming.manifest;
    if manifest.source == local.side {
        return Decision::Ignore(IgnoreReason::OwnSource);
    }

    if trigger == Trigger::Poll {
        if !manifest.auto_import {
            return Decision::Ignore(IgnoreReason::NotArmed);
        }
        if let Some((path, time)) = local.last_acted {
            if paths_match(path, incoming.manifest_path) && incoming.handoff_time <= time {
                return Decision::Ignore(IgnoreReason::AlreadyHandled);
            }
        }
    }

    if manifest.requests_new_instance() {
        return if accepts_force_new(local, manifest) {
            Decision::CreateNew {
                close_current: local.open.is_some(),
            }
        } else {
            Decision::RejectForeign(RejectReason::TokenMismatch)
        };
    }

    match &local.open {
        None => Decision::CreateNew {
            close_current: false,
        },
        Some(open) if targets(open, local.side, incoming) => Decision::Reload,
        Some(_) => Decision::RejectForeign(RejectReason::ForeignDocument),
    }
}

/// A force-new manifest belongs to the instance holding its token, or to one with nothing open.
pub fn accepts_force_new(local: &LocalSession<'_>, manifest: &Manifest) -> bool {
    let token_matches = match (manifest.force_token(), local.launch_token) {
        (Some(theirs), Some(ours)) => theirs == ours.trim(),
        _ => false,
    };
    token_matches || local.open.is_none()
}

fn targets(open: &OpenSession<'_>, side: Side, incoming: &Incoming<'_>) -> bool {
    let manifest = incoming.manifest;
    if let Some(recorded) = manifest.document(side) {
        // A manifest naming another local document is never overridden by weaker signals.
        return paths_match(recorded, open.document);
    }
    if incoming
        .registry_partner
        .is_some_and(|partner| paths_match(partner, open.document))
    {
        return true;
    }
    if let Some(dir) = open.project_dir {
        return paths_match(dir, incoming.project_dir);
    }
    let ours = sanitize_name(open.name);
    let theirs = manifest.project_name();
    !manifest.project.trim().is_empty() && ours.eq_ignore_ascii_case(&theirs)
}

#[cfg(test)]
mod tests;
