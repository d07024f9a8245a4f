// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use paintbridge::store::{Manifest, MeshSignature, ProjectFolder, Side};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("paintbridge_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    RootSmall,
    RootMedium,
    RootLarge,
}

impl Case {
    pub fn projects(self) -> usize {
        match self {
            Self::RootSmall => 8,
            Self::RootMedium => 64,
            Self::RootLarge => 512,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::RootSmall => "small",
            Self::RootMedium => "medium",
            Self::RootLarge => "large",
        }
    }
}

pub fn blender_file(index: usize) -> PathBuf {
    PathBuf::from(format!("/work/asset_{index:04}.blend"))
}

pub fn sp_project_file(index: usize) -> PathBuf {
    PathBuf::from(format!("/work/asset_{index:04}.spp"))
}

pub fn signature(index: usize) -> MeshSignature {
    MeshSignature::new(
        [format!("asset_{index:04}_low"), format!("asset_{index:04}_trim")],
        [format!("asset_{index:04}_high")],
    )
}

/// A bridge root holding `case.projects()` project folders.
///
/// Sources alternate between the two sides, every third hand-off is still armed, and every
/// fourth project carries a mesh signature. Timestamps increase with the index so the newest
/// project is always the last one.
pub fn bridge_root(root: &Path, case: Case) {
    for index in 0..case.projects() {
        let name = format!("asset_{index:04}");
        let source = if index % 2 == 0 {
            Side::MeshEditor
        } else {
            Side::Texturing
        };
        let at = 1_000.0 + index as f64;

        let mut manifest = Manifest::new(source, name.clone(), at);
        manifest.blender_file = Some(blender_file(index).display().to_string());
        manifest.sp_project_file = Some(sp_project_file(index).display().to_string());
        manifest.mesh_fbx = Some(root.join(&name).join("b2sp.fbx"));
        manifest.mesh_exported = Some(true);
        if index % 4 == 0 {
            manifest.mesh_signature = Some(signature(index));
        }
        if index % 3 == 0 {
            manifest.arm_auto_import(at);
        }

        ProjectFolder::new(root.join(&name))
            .save_manifest(&manifest)
            .expect("save manifest");
    }

    // Loose files at the root and inside projects that the scan must skip cheaply.
    std::fs::write(root.join("README.txt"), b"bridge").expect("write readme");
    for index in (0..case.projects()).step_by(8) {
        let dir = root.join(format!("asset_{index:04}"));
        std::fs::write(dir.join("b2sp.fbx"), vec![0u8; 4096]).expect("write mesh");
    }
}
