// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Cross-reference between a texturing document and its mesh-editor document.
//!
//! The registry is a hint, not ground truth: entries go stale when documents move behind the
//! bridge's back, so callers corroborate a hit against a manifest before acting on it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::io::{read_json, write_json_atomic};
use super::manifest::Side;
use super::root::RootLocator;
use super::{StoreError, WriteDurability};
use crate::paths::{dedup_paths, path_key, paths_match};

pub const LINKS_FILENAME: &str = "project_links.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// `sp_to_blender`: texturing document → mesh-editor document.
    TexturingToMesh,
    /// `blender_to_sp`: mesh-editor document → texturing document.
    MeshToTexturing,
}

impl LinkDirection {
    /// Direction that starts at a document owned by `side`.
    pub fn from_side(side: Side) -> Self {
        match side {
            Side::Texturing => Self::TexturingToMesh,
            Side::MeshEditor => Self::MeshToTexturing,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::TexturingToMesh => Self::MeshToTexturing,
            Self::MeshToTexturing => Self::TexturingToMesh,
        }
    }
}

/// Whether an update also records the inverse pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkWrite {
    Both,
    /// Leaves the inverse map untouched. Used by force-new instances so the primary pairing
    /// already recorded for the mesh document survives.
    ForwardOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkTable {
    #[serde(default)]
    pub sp_to_blender: BTreeMap<String, String>,
    #[serde(default)]
    pub blender_to_sp: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LinkTable {
    fn map(&self, direction: LinkDirection) -> &BTreeMap<String, String> {
        match direction {
            LinkDirection::TexturingToMesh => &self.sp_to_blender,
            LinkDirection::MeshToTexturing => &self.blender_to_sp,
        }
    }

    fn map_mut(&mut self, direction: LinkDirection) -> &mut BTreeMap<String, String> {
        match direction {
            LinkDirection::TexturingToMesh => &mut self.sp_to_blender,
            LinkDirection::MeshToTexturing => &mut self.blender_to_sp,
        }
    }

    pub fn lookup(&self, path: &Path, direction: LinkDirection) -> Option<&str> {
        let key = path_key(path);
        if key.is_empty() {
            return None;
        }
        self.map(direction)
            .get(&key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn link(&mut self, direction: LinkDirection, from: &Path, to: &Path, write: LinkWrite) {
        self.map_mut(direction)
            .insert(path_key(from), to.to_string_lossy().into_owned());
        if write == LinkWrite::Both {
            self.map_mut(direction.reverse())
                .insert(path_key(to), from.to_string_lossy().into_owned());
        }
    }

    /// Rewrites every occurrence of `old` (a document owned by `side`) to `new`.
    ///
    /// Returns whether anything changed.
    pub fn rename(&mut self, side: Side, old: &Path, new: &Path) -> bool {
        let own = LinkDirection::from_side(side);
        let new_value = new.to_string_lossy().into_owned();
        let mut changed = false;

        if let Some(target) = self.map_mut(own).remove(&path_key(old)) {
            self.map_mut(own).insert(path_key(new), target);
            changed = true;
        }
        for value in self.map_mut(own.reverse()).values_mut() {
            if paths_match(value.as_str(), old) {
                *value = new_value.clone();
                changed = true;
            }
        }
        changed
    }
}

/// The registry file replicated under every known bridge root.
#[derive(Debug, Clone)]
pub struct LinkRegistry {
    paths: Vec<PathBuf>,
    durability: WriteDurability,
}

impl LinkRegistry {
    /// Registry files at explicit locations; the first is the primary.
    pub fn at(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            durability: WriteDurability::default(),
        }
    }

    /// Documents root first (always), then every candidate root that exists.
    pub fn for_locator(locator: &RootLocator) -> Self {
        let mut roots = vec![locator.documents_root()];
        roots.extend(
            locator
                .candidate_roots()
                .into_iter()
                .filter(|root| root.is_dir()),
        );
        let paths = dedup_paths(roots)
            .into_iter()
            .map(|root| root.join(LINKS_FILENAME))
            .collect();
        Self {
            paths,
            durability: locator.durability(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// First readable registry wins; copies are not merged.
    pub fn load(&self) -> LinkTable {
        self.paths
            .iter()
            .filter(|path| path.is_file())
            .find_map(|path| read_json(path))
            .unwrap_or_default()
    }

    /// Writes the primary file, then mirrors to every other copy that already exists.
    pub fn save(&self, table: &LinkTable) -> Result<(), StoreError> {
        let Some((primary, mirrors)) = self.paths.split_first() else {
            return Ok(());
        };
        write_json_atomic(primary, table, self.durability)?;
        for mirror in mirrors.iter().filter(|path| path.is_file()) {
            if let Err(err) = write_json_atomic(mirror, table, self.durability) {
                tracing::debug!(error = %err, "link registry mirror not updated");
            }
        }
        Ok(())
    }

    pub fn lookup(&self, path: &Path, direction: LinkDirection) -> Option<String> {
        self.load().lookup(path, direction).map(str::to_owned)
    }

    /// Upserts `from → to` in `direction`, plus the inverse unless `write` says otherwise.
    /// Empty paths are ignored.
    pub fn update(
        &self,
        direction: LinkDirection,
        from: &Path,
        to: &Path,
        write: LinkWrite,
    ) -> Result<(), StoreError> {
        if from.as_os_str().is_empty() || to.as_os_str().is_empty() {
            return Ok(());
        }
        let mut table = self.load();
        table.link(direction, from, to, write);
        self.save(&table)
    }

    pub fn rename(&self, side: Side, old: &Path, new: &Path) -> Result<bool, StoreError> {
        if old.as_os_str().is_empty() || new.as_os_str().is_empty() {
            return Ok(false);
        }
        let mut table = self.load();
        if !table.rename(side, old, new) {
            return Ok(false);
        }
        self.save(&table)?;
        Ok(true)
    }
}
