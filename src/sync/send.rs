// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The sending half: export into the project directory, write the armed manifest, wake the
//! other application.

use std::path::{Path, PathBuf};

use serde_json::json;

use super::agent::SyncAgent;
use super::host::{Exporter, Host, Launcher, Notice};
use super::SyncError;
use crate::paths::{paths_match, UNTITLED};
use crate::store::io::ensure_dir;
use crate::store::{ActiveSession, Identity, LinkDirection, LinkWrite, Manifest, MeshSignature, Side};

#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    /// Names of the exported objects; separates several assets sent from one document.
    pub mesh_signature: Option<MeshSignature>,
    /// Launch a separate instance when the running one is busy with an unrelated document.
    /// Only honored when sending from the mesh editor.
    pub new_instance: bool,
    /// Start the other application when it is not running.
    pub launch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakePlan {
    /// The other side has this pairing open and will reload in place.
    AlreadyOpen,
    /// Running with nothing open; it will create from the manifest.
    Idle,
    Launch,
    LaunchNewInstance { token: String },
    /// Running with an unrelated document; the hand-off waits for an explicit import.
    Occupied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub project_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub wake: WakePlan,
    pub launched: bool,
}

/// How to get the hand-off in front of the other application, given its heartbeat.
///
/// A dedicated instance is only ever launched on the texturing side; a busy mesh editor is
/// reported as occupied.
pub fn plan_wake(
    peer: Option<&ActiveSession>,
    peer_side: Side,
    linked: Option<&str>,
    project_dir: &Path,
    new_instance: bool,
) -> WakePlan {
    let Some(peer) = peer else {
        return WakePlan::Launch;
    };
    if !peer.project_open {
        return WakePlan::Idle;
    }
    let pairs = linked.is_some_and(|doc| peer.names_document(peer_side, Path::new(doc)))
        || peer.in_project(project_dir);
    if pairs {
        WakePlan::AlreadyOpen
    } else if new_instance && peer_side == Side::Texturing {
        WakePlan::LaunchNewInstance {
            token: uuid::Uuid::new_v4().to_string(),
        }
    } else {
        WakePlan::Occupied
    }
}

impl<H: Host> SyncAgent<H> {
    /// Exports the open document and hands it off to the other side.
    ///
    /// Only the manifest write is fatal; registry, settings, log and heartbeat updates are
    /// best-effort, and a failed launch is reported through the host.
    pub fn send(
        &mut self,
        request: SendRequest,
        exporter: &mut impl Exporter,
        launcher: Option<&mut dyn Launcher>,
        now: f64,
    ) -> Result<SendReport, SyncError> {
        let side = self.side();
        let other = side.other();
        let signature = request.mesh_signature.as_ref().filter(|s| !s.is_empty());

        let (document, name) = match self.host().open_document() {
            Some(open) => (
                self.placeholder().or_placeholder(side, open.path.as_deref()),
                open.name,
            ),
            None => (self.placeholder().touch(side), UNTITLED.to_owned()),
        };
        let project_dir =
            self.resolve_dir(&Identity::new(side, &document, &name).with_signature(signature));
        if let Some(parent) = project_dir.parent() {
            self.locator().write_hint(parent);
        }
        ensure_dir(&project_dir)?;

        let exported = exporter.export(&project_dir)?;

        let folder = self.folder(&project_dir);
        let existing = folder.load_manifest();
        let linked = self.linked_document(&document, &project_dir).or_else(|| {
            existing
                .as_ref()
                .and_then(|m| m.document(other))
                .map(str::to_owned)
        });
        // Only a texturing document created by force-new carries the marker back.
        let force_new = side == Side::Texturing
            && (existing.as_ref().is_some_and(|m| m.force_new_project)
                || folder.is_force_new_project());
        let primary = linked.as_deref().filter(|_| force_new).and_then(|mesh_doc| {
            self.registry()
                .lookup(Path::new(mesh_doc), LinkDirection::from_side(other))
                .filter(|primary| !paths_match(primary, &document))
        });

        let mut manifest = Manifest::new(side, folder.name(), now);
        if let Some(existing) = existing {
            manifest.extra = existing.extra;
        }
        manifest.set_document(side, document.to_string_lossy());
        if let Some(linked) = &linked {
            manifest.set_document(other, linked.clone());
        }
        manifest.link_sp_project_file = primary.clone();
        manifest.mesh_fbx = exported.mesh;
        manifest.mesh_exported = Some(manifest.mesh_fbx.is_some());
        manifest.high_mesh_fbx = exported.high_mesh;
        manifest.high_mesh_exported = exported.high_mesh_exported;
        manifest.mesh_signature = signature.cloned();
        manifest.textures_dir = exported.textures_dir;
        manifest.textures = exported.textures;
        manifest.normal_map_format = exported.normal_map_format;
        manifest.basecolor_has_opacity = exported.basecolor_has_opacity;
        manifest.force_new_project = force_new;
        manifest.arm_auto_import(now);

        let peer = self
            .peer_heartbeat()
            .read_latest_any(None, self.config().heartbeat_max_age, now);
        let wake = plan_wake(
            peer.as_ref(),
            other,
            linked.as_deref(),
            &project_dir,
            request.new_instance,
        );
        if request.new_instance && side == Side::Texturing {
            tracing::debug!("new-instance request ignored on the texturing side");
        }
        if let WakePlan::LaunchNewInstance { token } = &wake {
            manifest.force_new_project = true;
            manifest.force_new_token = Some(token.clone());
        }

        let manifest_path = folder.save_manifest(&manifest)?;

        if let Some(linked) = &linked {
            let registry = self.registry();
            let direction = LinkDirection::from_side(side);
            let linked = Path::new(linked);
            let result = match &primary {
                Some(primary) => registry
                    .update(direction, &document, linked, LinkWrite::ForwardOnly)
                    .and_then(|()| {
                        registry.update(direction, Path::new(primary), linked, LinkWrite::Both)
                    }),
                None if force_new => {
                    registry.update(direction, &document, linked, LinkWrite::ForwardOnly)
                }
                None => registry.update(direction, &document, linked, LinkWrite::Both),
            };
            if let Err(err) = result {
                tracing::debug!(error = %err, "link registry not updated");
            }
            let linked = linked.to_string_lossy().into_owned();
            folder.update_settings(|settings| settings.set_linked_document(other, linked));
        }

        folder.append_log(
            &format!("send to {other}"),
            Some(&json!({
                "manifest": manifest_path.display().to_string(),
                "mesh": manifest.mesh_fbx.as_ref().map(|p| p.display().to_string()),
                "high_mesh": manifest.high_mesh_fbx.as_ref().map(|p| p.display().to_string()),
                "wake": format!("{wake:?}"),
            })),
        );
        if signature.is_some() {
            self.remember_dir(&Identity::new(side, &document, &name), &project_dir);
        }
        self.publish_heartbeat(now);

        let launched = self.wake(&wake, request.launch, launcher);
        tracing::info!(
            project_dir = %project_dir.display(),
            ?wake,
            launched,
            "hand-off written"
        );
        Ok(SendReport {
            project_dir,
            manifest_path,
            wake,
            launched,
        })
    }

    fn wake(&mut self, plan: &WakePlan, launch: bool, launcher: Option<&mut dyn Launcher>) -> bool {
        let (new_instance, token) = match plan {
            WakePlan::Launch if launch => (false, None),
            WakePlan::LaunchNewInstance { token } => (true, Some(token.as_str())),
            _ => return false,
        };
        let Some(launcher) = launcher else {
            tracing::debug!("no launcher configured; the other side picks up on its next poll");
            return false;
        };
        match launcher.launch(new_instance, token) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "launch failed");
                self.host_mut()
                    .notify(Notice::Warning, &format!("Could not start the other application: {err}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
