// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Locating the shared bridge root.
//!
//! Precedence for the root a side *writes* to: environment override, configured preference,
//! a previously written hint file, then `<Documents>/GoB_SP_Bridge`. When a side *searches* for
//! something it did not write itself, it walks [`RootLocator::candidate_roots`], which adds the
//! cloud-synced mirrors of the documents folder.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::io::{read_json, write_json_to_all};
use super::WriteDurability;
use crate::paths::{dedup_paths, expand_home};

pub const BRIDGE_ENV_VAR: &str = "GOB_SP_BRIDGE_DIR";
pub const ROOT_DIRNAME: &str = "GoB_SP_Bridge";
pub const HINT_FILENAME: &str = "bridge_root.json";
pub const SHARED_HINT_DIRNAME: &str = ".gob_sp_bridge";

const ONEDRIVE_VARS: [&str; 3] = ["OneDrive", "OneDriveConsumer", "OneDriveCommercial"];

/// Snapshot of the process environment relevant to root discovery.
///
/// Tests and embedders build one by hand; [`BridgeEnv::from_process`] reads the real thing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeEnv {
    pub override_root: Option<PathBuf>,
    pub preferred_root: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub icloud_documents: Option<PathBuf>,
    pub cloud_documents: Vec<PathBuf>,
}

impl BridgeEnv {
    pub fn from_process() -> Self {
        let override_root = env::var_os(BRIDGE_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let home = dirs_next::home_dir();
        let documents = dirs_next::document_dir();

        let icloud_documents = if cfg!(target_os = "macos") {
            home.as_ref()
                .map(|home| {
                    home.join("Library")
                        .join("Mobile Documents")
                        .join("com~apple~CloudDocs")
                        .join("Documents")
                })
                .filter(|dir| dir.is_dir())
        } else {
            None
        };

        let cloud_documents = ONEDRIVE_VARS
            .iter()
            .filter_map(|var| env::var_os(var).filter(|value| !value.is_empty()))
            .map(|value| PathBuf::from(value).join("Documents"))
            .collect();

        Self {
            override_root,
            preferred_root: None,
            home,
            documents,
            icloud_documents,
            cloud_documents,
        }
    }

    /// An environment rooted entirely under `home`, with `home/Documents` as documents folder.
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            documents: Some(home.join("Documents")),
            home: Some(home),
            ..Self::default()
        }
    }

    pub fn with_override_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.override_root = Some(root.into());
        self
    }

    pub fn with_preferred_root(mut self, root: Option<PathBuf>) -> Self {
        self.preferred_root = root;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RootHint {
    bridge_root: String,
}

#[derive(Debug, Clone)]
pub struct RootLocator {
    env: BridgeEnv,
    durability: WriteDurability,
}

impl RootLocator {
    pub fn new(env: BridgeEnv) -> Self {
        Self {
            env,
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn env(&self) -> &BridgeEnv {
        &self.env
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    /// The computed platform default: `<Documents>/GoB_SP_Bridge`.
    pub fn default_root(&self) -> PathBuf {
        if let Some(documents) = &self.env.documents {
            return documents.join(ROOT_DIRNAME);
        }
        match &self.env.home {
            Some(home) => home.join("Documents").join(ROOT_DIRNAME),
            None => PathBuf::from(ROOT_DIRNAME),
        }
    }

    /// Root used for records that must be found regardless of overrides (link registry,
    /// heartbeat replica). Prefers the iCloud documents mirror when it exists.
    pub fn documents_root(&self) -> PathBuf {
        match &self.env.icloud_documents {
            Some(docs) => docs.join(ROOT_DIRNAME),
            None => self.default_root(),
        }
    }

    /// Per-user hint first, shared cross-user hint second.
    pub fn hint_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.default_root().join(HINT_FILENAME)];
        if let Some(home) = &self.env.home {
            paths.push(home.join(SHARED_HINT_DIRNAME).join(HINT_FILENAME));
        }
        paths
    }

    pub fn read_hint(&self) -> Option<PathBuf> {
        self.hint_paths().iter().find_map(|path| {
            let hint: RootHint = read_json(path)?;
            let root = hint.bridge_root.trim();
            (!root.is_empty()).then(|| expand_home(Path::new(root)))
        })
    }

    /// Persists `root` to both hint locations. Failures are logged and swallowed.
    pub fn write_hint(&self, root: &Path) {
        if root.as_os_str().is_empty() {
            return;
        }
        let hint = RootHint {
            bridge_root: expand_home(root).to_string_lossy().into_owned(),
        };
        let paths = self.hint_paths();
        let written = write_json_to_all(paths.iter().map(PathBuf::as_path), &hint, self.durability);
        if written == 0 {
            tracing::debug!(root = %root.display(), "no bridge root hint could be written");
        }
    }

    /// The root this side reads and writes its own records under.
    pub fn resolve_root(&self) -> PathBuf {
        if let Some(root) = &self.env.override_root {
            return expand_home(root);
        }
        if let Some(root) = &self.env.preferred_root {
            return expand_home(root);
        }
        if let Some(root) = self.read_hint() {
            return root;
        }
        self.default_root()
    }

    /// Every plausible root, de-duplicated, in search order.
    pub fn candidate_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        roots.extend(self.env.override_root.as_deref().map(expand_home));
        roots.extend(self.env.preferred_root.as_deref().map(expand_home));
        roots.extend(self.read_hint());
        roots.push(self.default_root());
        if let Some(home) = &self.env.home {
            roots.push(home.join("Documents").join(ROOT_DIRNAME));
        }
        if let Some(docs) = &self.env.icloud_documents {
            roots.push(docs.join(ROOT_DIRNAME));
        }
        roots.extend(
            self.env
                .cloud_documents
                .iter()
                .map(|docs| docs.join(ROOT_DIRNAME)),
        );
        dedup_paths(roots)
    }
}
