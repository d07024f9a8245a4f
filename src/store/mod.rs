// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for the shared bridge area on disk.
//!
//! Everything both applications exchange lives here: the root hint, per-project folders with
//! their manifest/settings/log, the link registry and the active-session heartbeats. All writes
//! are whole-file replacements; all reads tolerate a torn or missing file by reporting it absent.

use std::path::PathBuf;

pub mod heartbeat;
pub mod io;
pub mod links;
pub mod manifest;
pub mod project;
pub mod resolver;
pub mod root;

pub use heartbeat::{ActiveSession, Heartbeat};
pub use self::io::now_secs;
pub use links::{LinkDirection, LinkRegistry, LinkTable, LinkWrite};
pub use manifest::{
    find_for_document, find_for_mesh_signature, find_latest, find_latest_matching, read_manifest,
    Manifest, ManifestHit, MeshSignature, NormalMapFormat, Side,
};
pub use project::{ProjectFolder, ProjectSettings};
pub use resolver::{Identity, Placeholder, ProjectResolver};
pub use root::{BridgeEnv, RootLocator};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("refusing to write through symlink at {path:?}")]
    SymlinkRefused { path: PathBuf },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable storage where
    /// possible. Useful when the bridge root sits on a network or cloud-synced volume.
    Durable,
}
