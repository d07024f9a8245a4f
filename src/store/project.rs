// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::io::{ensure_dir, read_json, write_json_atomic};
use super::manifest::{Manifest, Side};
use super::{StoreError, WriteDurability};
use crate::paths::paths_match;

pub const META_DIRNAME: &str = ".gob_meta";
pub const MANIFEST_FILENAME: &str = "bridge.json";
pub const SETTINGS_FILENAME: &str = "gob_sp_project_settings.json";
pub const LOG_FILENAME: &str = "sp_export_log.txt";

/// Per-project persisted state that is not part of the hand-off itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_blender_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_sp_project_file: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_new_project: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectSettings {
    /// The paired document on `side` recorded for this project, if any.
    pub fn linked_document(&self, side: Side) -> Option<&str> {
        let value = match side {
            Side::MeshEditor => self.linked_blender_file.as_deref(),
            Side::Texturing => self.linked_sp_project_file.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    pub fn set_linked_document(&mut self, side: Side, document: impl Into<String>) {
        let document = Some(document.into());
        match side {
            Side::MeshEditor => self.linked_blender_file = document,
            Side::Texturing => self.linked_sp_project_file = document,
        }
    }
}

/// One synced asset's directory under a bridge root.
///
/// ```text
/// <root>/<project>/
///   b2sp.fbx, b2sp_hi.fbx, sp2b.fbx, textures/...
///   .gob_meta/bridge.json                    manifest (legacy: <project>/bridge.json)
///   .gob_meta/gob_sp_project_settings.json   settings (legacy: <project>/...)
///   .gob_meta/sp_export_log.txt
///   .gob_meta/active_*.json                  heartbeat replica
/// ```
#[derive(Debug, Clone)]
pub struct ProjectFolder {
    root: PathBuf,
    durability: WriteDurability,
}

impl ProjectFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
        }
    }

    /// Project folder owning a manifest file, for either the metadata or the legacy layout.
    pub fn from_manifest_path(manifest_path: &Path) -> Option<Self> {
        let parent = manifest_path.parent()?;
        let root = if parent.file_name().is_some_and(|name| name == META_DIRNAME) {
            parent.parent()?
        } else {
            parent
        };
        Some(Self::new(root))
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIRNAME)
    }

    /// Where new manifests are written.
    pub fn manifest_path(&self) -> PathBuf {
        self.meta_dir().join(MANIFEST_FILENAME)
    }

    fn legacy_manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    /// The manifest to read: metadata layout first, legacy layout second, `None` if neither.
    pub fn find_manifest_path(&self) -> Option<PathBuf> {
        [self.manifest_path(), self.legacy_manifest_path()]
            .into_iter()
            .find(|path| path.is_file())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.meta_dir().join(SETTINGS_FILENAME)
    }

    fn legacy_settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILENAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.meta_dir().join(LOG_FILENAME)
    }

    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn load_manifest(&self) -> Option<Manifest> {
        self.find_manifest_path()
            .and_then(|path| super::manifest::read_manifest(&path))
    }

    /// Overwrites the manifest in the metadata layout.
    pub fn save_manifest(&self, manifest: &Manifest) -> Result<PathBuf, StoreError> {
        let path = self.manifest_path();
        write_json_atomic(&path, manifest, self.durability)?;
        Ok(path)
    }

    /// The document on `side` this folder is known to belong to, per its own manifest.
    pub fn owner(&self, side: Side) -> Option<String> {
        self.load_manifest()
            .and_then(|manifest| manifest.document(side).map(str::to_owned))
    }

    /// True when the folder's manifest records a *different* document for `side`.
    pub fn owned_by_other(&self, side: Side, document: &Path) -> bool {
        self.owner(side)
            .is_some_and(|owner| !paths_match(&owner, document))
    }

    pub fn load_settings(&self) -> ProjectSettings {
        [self.settings_path(), self.legacy_settings_path()]
            .iter()
            .find(|path| path.is_file())
            .and_then(|path| read_json(path))
            .unwrap_or_default()
    }

    pub fn save_settings(&self, settings: &ProjectSettings) -> Result<(), StoreError> {
        write_json_atomic(&self.settings_path(), settings, self.durability)
    }

    /// Read-modify-write of the settings record. Failures are logged, not returned.
    pub fn update_settings(&self, update: impl FnOnce(&mut ProjectSettings)) {
        let mut settings = self.load_settings();
        update(&mut settings);
        if let Err(err) = self.save_settings(&settings) {
            tracing::debug!(error = %err, "project settings not saved");
        }
    }

    pub fn is_force_new_project(&self) -> bool {
        self.load_manifest()
            .is_some_and(|manifest| manifest.force_new_project)
            || self.load_settings().force_new_project
    }

    /// Appends a timestamped line (and optional pretty JSON payload) to the project log.
    pub fn append_log(&self, message: &str, data: Option<&serde_json::Value>) {
        if let Err(err) = self.try_append_log(message, data) {
            tracing::debug!(error = %err, "project log not written");
        }
    }

    fn try_append_log(
        &self,
        message: &str,
        data: Option<&serde_json::Value>,
    ) -> Result<(), StoreError> {
        let path = self.log_path();
        ensure_dir(&self.meta_dir())?;
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        let mut entry = format!("[{:.3}] {message}\n", super::io::now_secs());
        if let Some(data) = data {
            let pretty = serde_json::to_string_pretty(data).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
            entry.push_str(&pretty);
            entry.push('\n');
        }
        file.write_all(entry.as_bytes()).map_err(io_err)
    }
}
