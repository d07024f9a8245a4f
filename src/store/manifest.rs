// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The hand-off record (`bridge.json`) and the scans that find it.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::io::{modified_secs, read_json};
use super::project::{ProjectFolder, MANIFEST_FILENAME, META_DIRNAME};
use crate::paths::{paths_match, sanitize_name};

/// `<root>/<project>/.gob_meta/bridge.json`; the legacy location sits one level higher.
const SCAN_DEPTH: usize = 3;

pub const MANIFEST_VERSION: u32 = 1;

/// Which application produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "blender")]
    MeshEditor,
    #[serde(rename = "substance_painter")]
    Texturing,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::MeshEditor => Self::Texturing,
            Self::Texturing => Self::MeshEditor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MeshEditor => "blender",
            Self::Texturing => "substance_painter",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blender" | "mesh" | "mesh-editor" => Ok(Self::MeshEditor),
            "substance_painter" | "painter" | "texturing" => Ok(Self::Texturing),
            other => Err(format!("unknown side {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalMapFormat {
    DirectX,
    OpenGl,
}

impl NormalMapFormat {
    /// Maps the loose spellings hosts report (`"DirectX"`, `"d3d"`, `"OpenGL"`, `"gl"`, ...).
    pub fn from_hint(value: &str) -> Option<Self> {
        let text = value.trim().to_lowercase();
        if text.contains("directx") || text.contains("d3d") || text == "dx" {
            Some(Self::DirectX)
        } else if text.contains("opengl") || text.contains("ogl") || text == "gl" {
            Some(Self::OpenGl)
        } else {
            None
        }
    }
}

/// Names of the exported low- and high-detail objects. Order never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshSignature {
    #[serde(default)]
    pub low: BTreeSet<String>,
    #[serde(default)]
    pub high: BTreeSet<String>,
}

impl MeshSignature {
    pub fn new<L, H>(low: L, high: H) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        H: IntoIterator,
        H::Item: Into<String>,
    {
        Self {
            low: low.into_iter().map(Into::into).collect(),
            high: high.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty() && self.high.is_empty()
    }

    /// Stable short text form, used as part of in-memory cache keys.
    pub fn digest(&self) -> String {
        let low: Vec<&str> = self.low.iter().map(String::as_str).collect();
        let high: Vec<&str> = self.high.iter().map(String::as_str).collect();
        format!("{}|{}", low.join(","), high.join(","))
    }
}

/// One side's last export, as found in a project folder.
///
/// Keys this crate does not model are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: u32,
    pub source: Side,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub timestamp: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_fbx: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_mesh_fbx: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_mesh_exported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_exported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_signature: Option<MeshSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blender_file: Option<String>,
    #[serde(
        default,
        alias = "sp_project_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub sp_project_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_sp_project_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textures_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_map_format: Option<NormalMapFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basecolor_has_opacity: Option<bool>,

    #[serde(default)]
    pub auto_import: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_import_at: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_new_project: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_new_token: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_version() -> u32 {
    MANIFEST_VERSION
}

impl Manifest {
    pub fn new(source: Side, project: impl Into<String>, timestamp: f64) -> Self {
        Self {
            version: MANIFEST_VERSION,
            source,
            project: project.into(),
            timestamp,
            mesh_fbx: None,
            high_mesh_fbx: None,
            high_mesh_exported: None,
            mesh_exported: None,
            mesh_signature: None,
            blender_file: None,
            sp_project_file: None,
            link_sp_project_file: None,
            textures_dir: None,
            textures: Vec::new(),
            normal_map_format: None,
            basecolor_has_opacity: None,
            auto_import: false,
            auto_import_at: None,
            force_new_project: false,
            force_new_token: None,
            extra: serde_json::Map::new(),
        }
    }

    /// The document path recorded for `side` (`blender_file` or `sp_project_file`).
    pub fn document(&self, side: Side) -> Option<&str> {
        let value = match side {
            Side::MeshEditor => self.blender_file.as_deref(),
            Side::Texturing => self.sp_project_file.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
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

    /// Marks this manifest as a fresh, single-use hand-off.
    pub fn arm_auto_import(&mut self, now: f64) {
        self.auto_import = true;
        self.auto_import_at = Some(now);
    }

    /// A mesh-editor hand-off meant for a freshly launched texturing instance.
    pub fn requests_new_instance(&self) -> bool {
        self.force_new_project && self.source == Side::MeshEditor
    }

    /// Sent back from a texturing document that was created by a force-new hand-off; the
    /// mesh document keeps its primary pairing.
    pub fn from_secondary_pairing(&self) -> bool {
        self.force_new_project && self.source == Side::Texturing
    }

    pub fn force_token(&self) -> Option<&str> {
        self.force_new_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Timestamp identifying this hand-off: `auto_import_at`, else `timestamp`, else `fallback`.
    pub fn handoff_time(&self, fallback: f64) -> f64 {
        self.auto_import_at
            .filter(|t| *t > 0.0)
            .or(Some(self.timestamp).filter(|t| *t > 0.0))
            .unwrap_or(fallback)
    }

    pub fn project_name(&self) -> String {
        sanitize_name(&self.project)
    }
}

/// Reads a manifest; missing or malformed content is `None`.
pub fn read_manifest(path: &Path) -> Option<Manifest> {
    read_json(path)
}

/// A manifest located by a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestHit {
    pub path: PathBuf,
    pub manifest: Manifest,
    pub modified: f64,
}

impl ManifestHit {
    pub fn load(path: PathBuf) -> Option<Self> {
        let manifest = read_manifest(&path)?;
        let modified = modified_secs(&path).unwrap_or(0.0);
        Some(Self {
            path,
            manifest,
            modified,
        })
    }

    pub fn folder(&self) -> ProjectFolder {
        ProjectFolder::from_manifest_path(&self.path)
            .unwrap_or_else(|| ProjectFolder::new(self.path.clone()))
    }

    pub fn project_dir(&self) -> PathBuf {
        self.folder().root().to_path_buf()
    }
}

fn manifest_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .max_depth(SCAN_DEPTH)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || entry.file_name() == META_DIRNAME
                || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry during manifest scan");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILENAME)
        .map(|entry| entry.into_path())
        .collect()
}

/// Scans every root for manifests accepted by `filter` and returns the most recently
/// modified one. Roots are scanned in parallel.
pub fn find_latest_matching(
    roots: &[PathBuf],
    filter: impl Fn(&Manifest) -> bool + Sync,
) -> Option<ManifestHit> {
    roots
        .par_iter()
        .flat_map_iter(|root| manifest_files(root))
        .filter_map(ManifestHit::load)
        .filter(|hit| filter(&hit.manifest))
        .reduce_with(|best, hit| {
            if hit.modified > best.modified {
                hit
            } else {
                best
            }
        })
}

/// Most recent manifest from `source` (or from anyone, when `None`).
pub fn find_latest(roots: &[PathBuf], source: Option<Side>) -> Option<ManifestHit> {
    find_latest_matching(roots, |manifest| {
        source.map_or(true, |source| manifest.source == source)
    })
}

/// Most recent manifest recording `document` as its `side` document.
pub fn find_for_document(
    roots: &[PathBuf],
    side: Side,
    document: &Path,
    source: Option<Side>,
) -> Option<ManifestHit> {
    if document.as_os_str().is_empty() {
        return None;
    }
    find_latest_matching(roots, |manifest| {
        source.map_or(true, |source| manifest.source == source)
            && manifest.names_document(side, document)
    })
}

/// Most recent manifest carrying exactly `signature`.
pub fn find_for_mesh_signature(
    roots: &[PathBuf],
    signature: &MeshSignature,
    source: Option<Side>,
) -> Option<ManifestHit> {
    if signature.is_empty() {
        return None;
    }
    find_latest_matching(roots, |manifest| {
        source.map_or(true, |source| manifest.source == source)
            && manifest.mesh_signature.as_ref() == Some(signature)
    })
}
