// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! "This process has document D open at project P" records.
//!
//! Each side rewrites its record on an interval and after load/save. The same record goes to
//! the bridge root, the documents root and the project's metadata folder, so a reader finds it
//! whichever root it happens to search. A record older than the max age means nobody home.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::io::{modified_secs, read_json, write_json_to_all};
use super::manifest::Side;
use super::project::ProjectFolder;
use super::root::RootLocator;
use super::WriteDurability;
use crate::paths::{dedup_paths, paths_match};

pub const MESH_EDITOR_HEARTBEAT: &str = "active_blender.json";
pub const TEXTURING_HEARTBEAT: &str = "active_sp.json";

pub fn heartbeat_filename(side: Side) -> &'static str {
    match side {
        Side::MeshEditor => MESH_EDITOR_HEARTBEAT,
        Side::Texturing => TEXTURING_HEARTBEAT,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default = "default_open")]
    pub project_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blender_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_project_file: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_open() -> bool {
    true
}

impl ActiveSession {
    /// A running process with nothing open.
    pub fn idle(now: f64) -> Self {
        Self {
            timestamp: Some(now),
            project_open: false,
            project_name: None,
            project_dir: None,
            blender_file: None,
            sp_project_file: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn open(now: f64, side: Side, document: &Path, project_dir: &Path) -> Self {
        let mut session = Self::idle(now);
        session.project_open = true;
        session.project_name = project_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        session.project_dir = Some(project_dir.to_path_buf());
        session.set_document(side, document.to_string_lossy());
        session
    }

    pub fn document(&self, side: Side) -> Option<&str> {
        let value = match side {
            Side::MeshEditor => self.blender_file.as_deref(),
            Side::Texturing => self.sp_project_file.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    pub fn set_document(&mut self, side: Side, document: impl Into<String>) {
        let document = Some(document.into());
        match side {
            Side::MeshEditor => self.blender_file = document,
            Side::Texturing => self.sp_project_file = document,
        }
    }

    pub fn names_document(&self, side: Side, document: &Path) -> bool {
        self.document(side)
            .is_some_and(|recorded| paths_match(recorded, document))
    }

    pub fn in_project(&self, project_dir: &Path) -> bool {
        self.project_dir
            .as_deref()
            .is_some_and(|dir| paths_match(dir, project_dir))
    }

    pub fn time(&self) -> f64 {
        self.timestamp.unwrap_or(0.0)
    }

    /// Live when `now - timestamp <= max_age`.
    pub fn is_fresh(&self, now: f64, max_age: Duration) -> bool {
        let ts = self.time();
        ts > 0.0 && now - ts <= max_age.as_secs_f64()
    }
}

/// One side's heartbeat record and the places it is replicated to.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    side: Side,
    root: PathBuf,
    documents_root: PathBuf,
    durability: WriteDurability,
}

impl Heartbeat {
    pub fn new(side: Side, root: impl Into<PathBuf>, documents_root: impl Into<PathBuf>) -> Self {
        Self {
            side,
            root: root.into(),
            documents_root: documents_root.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn for_locator(side: Side, locator: &RootLocator) -> Self {
        Self {
            durability: locator.durability(),
            ..Self::new(side, locator.resolve_root(), locator.documents_root())
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn paths(&self, project_dir: Option<&Path>) -> Vec<PathBuf> {
        let filename = heartbeat_filename(self.side);
        let mut paths = vec![self.root.join(filename), self.documents_root.join(filename)];
        if let Some(dir) = project_dir {
            paths.push(ProjectFolder::new(dir).meta_dir().join(filename));
        }
        dedup_paths(paths)
    }

    /// Writes `session` to every location. Returns how many were written.
    pub fn publish(&self, session: &ActiveSession) -> usize {
        let paths = self.paths(session.project_dir.as_deref());
        let written = write_json_to_all(paths.iter().map(PathBuf::as_path), session, self.durability);
        if written == 0 {
            tracing::debug!(side = %self.side, "heartbeat not written anywhere");
        }
        written
    }

    /// Most recent live record across all locations, ignoring closed sessions.
    ///
    /// A record without a timestamp is dated by its file's modification time.
    pub fn read_latest(
        &self,
        project_dir: Option<&Path>,
        max_age: Duration,
        now: f64,
    ) -> Option<ActiveSession> {
        self.read_fresh(project_dir, max_age, now)
            .filter(|session| session.project_open)
            .max_by(|a, b| a.time().total_cmp(&b.time()))
    }

    /// Like [`Heartbeat::read_latest`], but a running application with nothing open counts.
    pub fn read_latest_any(
        &self,
        project_dir: Option<&Path>,
        max_age: Duration,
        now: f64,
    ) -> Option<ActiveSession> {
        self.read_fresh(project_dir, max_age, now)
            .max_by(|a, b| a.time().total_cmp(&b.time()))
    }

    fn read_fresh(
        &self,
        project_dir: Option<&Path>,
        max_age: Duration,
        now: f64,
    ) -> impl Iterator<Item = ActiveSession> {
        self.paths(project_dir)
            .into_iter()
            .filter_map(|path| {
                let mut session: ActiveSession = read_json(&path)?;
                if session.time() <= 0.0 {
                    session.timestamp = modified_secs(&path);
                }
                Some(session)
            })
            .filter(move |session| session.is_fresh(now, max_age))
    }
}
