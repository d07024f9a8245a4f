// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One side's protocol context: cache, markers, flags and the host it drives.
//!
//! Background paths (`tick`, `observe_document_path`, `publish_heartbeat`) never fail; they
//! log and carry on. `import_now` is user-initiated and reports through [`SyncError`] as well
//! as through [`Host::notify`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::json;

use super::decision::{decide, Incoming, LocalSession, OpenSession, RejectReason, Trigger};
use super::host::{Artifacts, Completion, Host, HostError, Notice};
use super::retry::{HighMeshRetry, RetryStatus, RetryTarget};
use super::{Decision, IgnoreReason, SyncError};
use crate::config::BridgeConfig;
use crate::paths::paths_match;
use crate::store::io::write_json_atomic;
use crate::store::{
    find_for_document, find_latest, find_latest_matching, read_manifest, ActiveSession,
    BridgeEnv, Heartbeat, Identity, LinkDirection, LinkRegistry, LinkWrite, Manifest,
    ManifestHit, Placeholder, ProjectFolder, ProjectResolver, RootLocator, Side,
};

pub const MESH_EDITOR_MESH: &str = "b2sp.fbx";
pub const MESH_EDITOR_HIGH_MESH: &str = "b2sp_hi.fbx";
pub const TEXTURING_MESH: &str = "sp2b.fbx";

/// Well-known artifact names written by `side`: (primary mesh, high-detail mesh).
pub fn default_artifacts(side: Side) -> (&'static str, Option<&'static str>) {
    match side {
        Side::MeshEditor => (MESH_EDITOR_MESH, Some(MESH_EDITOR_HIGH_MESH)),
        Side::Texturing => (TEXTURING_MESH, None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reload,
    Create,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reload => "reload",
            Self::Create => "create",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InProgress,
    Backoff,
    ScanCooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to look at.
    Idle,
    Skipped(SkipReason),
    Ignored(IgnoreReason),
    Rejected(RejectReason),
    Imported(Action),
    /// The host will report back through [`SyncAgent::finish_pending`].
    Pending(Action),
    Failed(Action),
}

#[derive(Debug, Clone, PartialEq)]
enum HighMeshPlan {
    Keep,
    Attach(PathBuf),
    Clear,
}

#[derive(Debug, Clone)]
struct PendingImport {
    action: Action,
    trigger: Trigger,
    manifest_path: PathBuf,
    manifest: Manifest,
    handoff_time: f64,
    project_dir: PathBuf,
    artifacts: Artifacts,
    high: HighMeshPlan,
    preserve: bool,
}

/// The open document as the protocol sees it.
#[derive(Debug, Clone)]
pub(super) struct Current {
    pub document: PathBuf,
    pub name: String,
    pub project_dir: PathBuf,
}

pub struct SyncAgent<H> {
    side: Side,
    config: BridgeConfig,
    locator: RootLocator,
    resolver: ProjectResolver,
    placeholder: Placeholder,
    launch_token: Option<String>,
    host: H,
    retry: HighMeshRetry,
    pending: Option<PendingImport>,
    in_progress: bool,
    backoff_until: f64,
    last_acted: Option<(PathBuf, f64)>,
    last_reported: Option<(PathBuf, f64)>,
    last_scan: Option<f64>,
    last_heartbeat: Option<f64>,
    last_document: Option<PathBuf>,
}

impl<H: Host> SyncAgent<H> {
    pub fn new(side: Side, config: BridgeConfig, env: BridgeEnv, host: H) -> Self {
        let env = match &config.preferred_root {
            Some(root) => env.with_preferred_root(Some(root.clone())),
            None => env,
        };
        let locator = RootLocator::new(env).with_durability(config.durability);
        let placeholder = Placeholder::new(&locator.resolve_root());
        let retry = HighMeshRetry::new(config.high_mesh_retry_count);
        Self {
            side,
            config,
            locator,
            resolver: ProjectResolver::new(),
            placeholder,
            launch_token: None,
            host,
            retry,
            pending: None,
            in_progress: false,
            backoff_until: 0.0,
            last_acted: None,
            last_reported: None,
            last_scan: None,
            last_heartbeat: None,
            last_document: None,
        }
    }

    pub fn with_launch_token(mut self, token: Option<String>) -> Self {
        self.launch_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn locator(&self) -> &RootLocator {
        &self.locator
    }

    pub fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn launch_token(&self) -> Option<&str> {
        self.launch_token.as_deref()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn retry_pending(&self) -> bool {
        self.retry.is_pending()
    }

    pub fn last_acted(&self) -> Option<(&Path, f64)> {
        self.last_acted.as_ref().map(|(path, time)| (path.as_path(), *time))
    }

    fn source(&self) -> Side {
        self.side.other()
    }

    pub(super) fn registry(&self) -> LinkRegistry {
        LinkRegistry::for_locator(&self.locator)
    }

    pub(super) fn folder(&self, dir: &Path) -> ProjectFolder {
        ProjectFolder::new(dir).with_durability(self.config.durability)
    }

    pub(super) fn own_heartbeat(&self) -> Heartbeat {
        Heartbeat::for_locator(self.side, &self.locator)
    }

    pub(super) fn peer_heartbeat(&self) -> Heartbeat {
        Heartbeat::for_locator(self.side.other(), &self.locator)
    }

    pub(super) fn resolve_dir(&mut self, identity: &Identity<'_>) -> PathBuf {
        let registry = self.registry();
        self.resolver.resolve_for(&self.locator, &registry, identity)
    }

    pub(super) fn remember_dir(&mut self, identity: &Identity<'_>, project_dir: &Path) {
        self.resolver.remember(identity, project_dir);
    }

    pub(super) fn current(&mut self) -> Option<Current> {
        let open = self.host.open_document()?;
        let document = self
            .placeholder
            .or_placeholder(self.side, open.path.as_deref());
        let project_dir = self.resolve_dir(&Identity::new(self.side, &document, &open.name));
        Some(Current {
            document,
            name: open.name,
            project_dir,
        })
    }

    /// The paired document on the other side.
    ///
    /// Registry first, unless a manifest recording `document` names a different partner; then
    /// that manifest; then the project directory's manifest when it does not belong to another
    /// local document; then the project settings.
    pub fn linked_document(&self, document: &Path, project_dir: &Path) -> Option<String> {
        let other = self.side.other();
        let candidates = self.locator.candidate_roots();
        let from_manifest = find_for_document(&candidates, self.side, document, None)
            .and_then(|hit| hit.manifest.document(other).map(str::to_owned));

        if let Some(linked) = self
            .registry()
            .lookup(document, LinkDirection::from_side(self.side))
        {
            match &from_manifest {
                Some(named) if !paths_match(named, &linked) => {
                    tracing::debug!(%linked, %named, "link registry disagrees with manifest");
                }
                _ => return Some(linked),
            }
        }
        if from_manifest.is_some() {
            return from_manifest;
        }

        let folder = self.folder(project_dir);
        if let Some(manifest) = folder.load_manifest() {
            let foreign = manifest
                .document(self.side)
                .is_some_and(|recorded| !paths_match(recorded, document));
            if !foreign {
                if let Some(linked) = manifest.document(other) {
                    return Some(linked.to_owned());
                }
            }
        }
        folder
            .load_settings()
            .linked_document(other)
            .map(str::to_owned)
    }

    /// Writes this side's heartbeat everywhere it is looked for.
    pub fn publish_heartbeat(&mut self, now: f64) {
        let session = match self.current() {
            Some(current) => {
                let mut session =
                    ActiveSession::open(now, self.side, &current.document, &current.project_dir);
                if let Some(linked) = self.linked_document(&current.document, &current.project_dir)
                {
                    session.set_document(self.side.other(), linked);
                }
                session
            }
            None => ActiveSession::idle(now),
        };
        self.own_heartbeat().publish(&session);
        self.last_heartbeat = Some(now);
    }

    /// Announces that nothing is open here anymore.
    pub fn shutdown(&mut self, now: f64) {
        self.retry.cancel();
        self.launch_token = None;
        self.own_heartbeat().publish(&ActiveSession::idle(now));
    }

    /// Notices when the open document gained a new real path and relinks its records.
    ///
    /// Only a first save of an unsaved document or a rename on disk counts; opening another
    /// document just starts tracking it. Returns whether anything was relinked.
    pub fn observe_document_path(&mut self) -> bool {
        let Some(open) = self.host.open_document() else {
            self.last_document = None;
            return false;
        };
        let current = self
            .placeholder
            .or_placeholder(self.side, open.path.as_deref());
        let previous = self.last_document.replace(current);
        let (Some(previous), Some(real)) = (previous, open.path) else {
            return false;
        };
        if paths_match(&previous, &real) {
            return false;
        }
        if !self.placeholder.is_placeholder(self.side, &previous) && !self.moved(&previous, &real)
        {
            tracing::debug!(
                from = %previous.display(),
                to = %real.display(),
                "another document opened; links left alone"
            );
            return false;
        }

        let old_identity = Identity::new(self.side, &previous, &open.name);
        let project_dir = match self.resolver.cached(&old_identity) {
            Some(dir) => dir,
            None => self.resolve_dir(&old_identity),
        };
        let folder = self.folder(&project_dir);
        let force_new = folder.is_force_new_project();
        let linked = self.linked_document(&previous, &project_dir);
        let registry = self.registry();

        if !force_new {
            if let Err(err) = registry.rename(self.side, &previous, &real) {
                tracing::debug!(error = %err, "link registry not renamed");
            }
        }
        if let Some(linked) = &linked {
            let write = if force_new {
                LinkWrite::ForwardOnly
            } else {
                LinkWrite::Both
            };
            if let Err(err) = registry.update(
                LinkDirection::from_side(self.side),
                &real,
                Path::new(linked),
                write,
            ) {
                tracing::debug!(error = %err, "link registry not updated");
            }
        }

        let candidates = self.locator.candidate_roots();
        if let Some(hit) = find_for_document(&candidates, self.side, &previous, None) {
            let mut manifest = hit.manifest.clone();
            manifest.set_document(self.side, real.to_string_lossy());
            let target = hit.folder().with_durability(self.config.durability);
            if let Err(err) = target.save_manifest(&manifest) {
                tracing::debug!(error = %err, "manifest document path not updated");
            }
        }

        self.resolver
            .remember(&Identity::new(self.side, &real, &open.name), &project_dir);
        tracing::info!(
            from = %previous.display(),
            to = %real.display(),
            "document saved under a new path; links updated"
        );
        true
    }

    /// A saved document renamed or moved on disk: the old file is gone, the new one exists and
    /// has no records of its own yet.
    fn moved(&self, previous: &Path, real: &Path) -> bool {
        if previous.exists() || !real.exists() {
            return false;
        }
        let paired = self
            .registry()
            .lookup(real, LinkDirection::from_side(self.side))
            .is_some();
        !paired
            && find_for_document(&self.locator.candidate_roots(), self.side, real, None).is_none()
    }

    /// One poll of the bridge.
    pub fn tick(&mut self, now: f64) -> TickOutcome {
        let relinked = self.observe_document_path();
        let heartbeat_due = self
            .last_heartbeat
            .map_or(true, |last| now - last >= self.config.heartbeat_interval.as_secs_f64());
        if relinked || heartbeat_due {
            self.publish_heartbeat(now);
        }

        if self.in_progress {
            return TickOutcome::Skipped(SkipReason::InProgress);
        }
        if now < self.backoff_until {
            return TickOutcome::Skipped(SkipReason::Backoff);
        }

        // A peer hit that does not apply here must not hold back armed hand-offs elsewhere.
        let mut passed_over = None;
        if let Some(hit) = self.hit_from_peer_heartbeat(now) {
            let manifest = hit.manifest.clone();
            match self.poll(hit, now) {
                outcome @ (TickOutcome::Rejected(_) | TickOutcome::Ignored(_)) => {
                    passed_over = Some((manifest, outcome));
                }
                outcome => return outcome,
            }
        }

        let cooling = self
            .last_scan
            .is_some_and(|last| now - last < self.config.scan_cooldown.as_secs_f64());
        if cooling {
            return passed_over.map_or(TickOutcome::Skipped(SkipReason::ScanCooldown), |(_, o)| o);
        }
        self.last_scan = Some(now);
        let source = self.source();
        let skip = passed_over.as_ref().map(|(manifest, _)| manifest);
        let scanned = find_latest_matching(&self.locator.candidate_roots(), |manifest| {
            manifest.source == source && skip != Some(manifest)
        });
        match (scanned, passed_over) {
            (Some(hit), _) => self.poll(hit, now),
            (None, Some((_, outcome))) => outcome,
            (None, None) => TickOutcome::Idle,
        }
    }

    fn poll(&mut self, hit: ManifestHit, now: f64) -> TickOutcome {
        // Background failures are logged and reported through the host already.
        self.handle(hit, Trigger::Poll, now)
            .unwrap_or_else(|err| {
                tracing::debug!(error = %err, "poll hand-off not completed");
                TickOutcome::Idle
            })
    }

    /// The armed manifest in the project the other side announces it has open.
    fn hit_from_peer_heartbeat(&self, now: f64) -> Option<ManifestHit> {
        let peer = self
            .peer_heartbeat()
            .read_latest(None, self.config.heartbeat_max_age, now)?;
        let project_dir = peer.project_dir?;
        let path = self.folder(&project_dir).find_manifest_path()?;
        ManifestHit::load(path)
            .filter(|hit| hit.manifest.source == self.source() && hit.manifest.auto_import)
    }

    /// User-initiated import, from `manifest_path` or from the best match on disk.
    pub fn import_now(
        &mut self,
        manifest_path: Option<&Path>,
        now: f64,
    ) -> Result<TickOutcome, SyncError> {
        if self.in_progress {
            return Err(SyncError::InProgress);
        }
        let hit = match manifest_path {
            Some(path) => ManifestHit::load(path.to_path_buf())
                .ok_or_else(|| SyncError::UnreadableManifest(path.to_path_buf())),
            None => self.find_for_explicit().ok_or(SyncError::NoManifest),
        };
        let hit = match hit {
            Ok(hit) => hit,
            Err(err) => {
                self.host.notify(Notice::Warning, &err.to_string());
                return Err(err);
            }
        };
        self.handle(hit, Trigger::Explicit, now)
    }

    fn find_for_explicit(&mut self) -> Option<ManifestHit> {
        let candidates = self.locator.candidate_roots();
        let source = self.source();
        if let Some(current) = self.current() {
            if let Some(hit) =
                find_for_document(&candidates, self.side, &current.document, Some(source))
            {
                return Some(hit);
            }
            let own = self
                .folder(&current.project_dir)
                .find_manifest_path()
                .and_then(ManifestHit::load)
                .filter(|hit| hit.manifest.source == source);
            if own.is_some() {
                return own;
            }
        }
        find_latest(&candidates, Some(source))
    }

    fn handle(
        &mut self,
        hit: ManifestHit,
        trigger: Trigger,
        now: f64,
    ) -> Result<TickOutcome, SyncError> {
        let project_dir = hit.project_dir();
        let handoff_time = hit.manifest.handoff_time(hit.modified);
        let current = self.current();
        let partner = hit.manifest.document(self.source()).and_then(|doc| {
            self.registry()
                .lookup(Path::new(doc), LinkDirection::from_side(self.source()))
        });

        let decision = {
            let local = LocalSession {
                side: self.side,
                open: current.as_ref().map(|c| OpenSession {
                    document: &c.document,
                    project_dir: Some(&c.project_dir),
                    name: &c.name,
                }),
                launch_token: self.launch_token.as_deref(),
                last_acted: self.last_acted(),
            };
            let incoming = Incoming {
                manifest_path: &hit.path,
                project_dir: &project_dir,
                manifest: &hit.manifest,
                handoff_time,
                registry_partner: partner.as_deref(),
            };
            decide(&local, &incoming, trigger)
        };
        tracing::debug!(manifest = %hit.path.display(), ?decision, "hand-off decision");

        let (action, close_current) = match decision {
            Decision::Ignore(reason) => return Ok(TickOutcome::Ignored(reason)),
            Decision::RejectForeign(reason) => {
                if trigger == Trigger::Explicit {
                    self.host.notify(Notice::Warning, &reason.to_string());
                    return Err(SyncError::Rejected(reason));
                }
                return Ok(TickOutcome::Rejected(reason));
            }
            Decision::Reload => (Action::Reload, false),
            Decision::CreateNew { close_current } => (Action::Create, close_current),
        };

        let (artifacts, high) = match self.resolve_artifacts(&hit, &project_dir) {
            Ok(resolved) => resolved,
            Err(missing) => {
                let err = SyncError::MissingArtifact(missing);
                self.fail_missing(&hit.path, handoff_time, trigger, &err, now);
                return match trigger {
                    Trigger::Explicit => Err(err),
                    Trigger::Poll => Ok(TickOutcome::Failed(action)),
                };
            }
        };

        let mut pending = PendingImport {
            action,
            trigger,
            manifest_path: hit.path,
            manifest: hit.manifest,
            handoff_time,
            project_dir,
            artifacts,
            high,
            preserve: true,
        };

        self.in_progress = true;
        let result = match action {
            Action::Reload => self.reload_with_fallback(&mut pending),
            Action::Create => {
                let closed = if close_current {
                    self.host.close()
                } else {
                    Ok(())
                };
                closed.and_then(|()| self.host.create(&pending.artifacts))
            }
        };
        self.conclude(pending, result, now)
    }

    fn reload_with_fallback(
        &mut self,
        pending: &mut PendingImport,
    ) -> Result<Completion, HostError> {
        match self.host.reload(&pending.artifacts, pending.preserve) {
            Err(HostError::PreserveUnsupported) if pending.preserve => {
                tracing::info!("reload cannot preserve authored state; retrying without");
                pending.preserve = false;
                self.host.reload(&pending.artifacts, false)
            }
            other => other,
        }
    }

    fn conclude(
        &mut self,
        pending: PendingImport,
        result: Result<Completion, HostError>,
        now: f64,
    ) -> Result<TickOutcome, SyncError> {
        let action = pending.action;
        match result {
            Ok(Completion::Done) => {
                self.in_progress = false;
                self.finish(pending, now);
                Ok(TickOutcome::Imported(action))
            }
            Ok(Completion::Pending) => {
                self.pending = Some(pending);
                Ok(TickOutcome::Pending(action))
            }
            Err(err) => {
                self.in_progress = false;
                let trigger = pending.trigger;
                self.fail(&pending, &err, now);
                match trigger {
                    Trigger::Explicit if err != HostError::Busy => Err(SyncError::Host(err)),
                    _ => Ok(TickOutcome::Failed(action)),
                }
            }
        }
    }

    /// Completes an import the host reported as [`Completion::Pending`].
    pub fn finish_pending(&mut self, result: Result<(), HostError>, now: f64) -> TickOutcome {
        let Some(mut pending) = self.pending.take() else {
            return TickOutcome::Idle;
        };
        let result = match result {
            Ok(()) => Ok(Completion::Done),
            Err(HostError::PreserveUnsupported)
                if pending.action == Action::Reload && pending.preserve =>
            {
                pending.preserve = false;
                self.host.reload(&pending.artifacts, false)
            }
            Err(err) => Err(err),
        };
        let action = pending.action;
        self.conclude(pending, result, now)
            .unwrap_or(TickOutcome::Failed(action))
    }

    fn resolve_artifacts(
        &self,
        hit: &ManifestHit,
        project_dir: &Path,
    ) -> Result<(Artifacts, HighMeshPlan), String> {
        let manifest = &hit.manifest;
        let project = manifest.project_name();
        let candidates = self.locator.candidate_roots();
        let (mesh_name, high_name) = default_artifacts(manifest.source);

        let mesh = resolve_artifact(
            manifest.mesh_fbx.as_deref(),
            project_dir,
            Some(mesh_name),
            &project,
            &candidates,
        )
        .ok_or_else(|| {
            manifest
                .mesh_fbx
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| mesh_name.to_owned())
        })?;

        let high = match manifest.high_mesh_fbx.as_deref() {
            Some(named) => {
                match resolve_artifact(Some(named), project_dir, high_name, &project, &candidates) {
                    Some(path) => HighMeshPlan::Attach(path),
                    None => HighMeshPlan::Clear,
                }
            }
            None if manifest.high_mesh_exported == Some(false) => HighMeshPlan::Clear,
            None => HighMeshPlan::Keep,
        };

        let textures = manifest
            .textures
            .iter()
            .map(|path| absolutize(path, manifest.textures_dir.as_deref().unwrap_or(project_dir)))
            .collect();
        let artifacts = Artifacts {
            project,
            project_dir: project_dir.to_path_buf(),
            mesh,
            high_mesh: match &high {
                HighMeshPlan::Attach(path) => Some(path.clone()),
                _ => None,
            },
            textures_dir: manifest
                .textures_dir
                .as_deref()
                .map(|dir| absolutize(dir, project_dir)),
            textures,
            normal_map_format: manifest.normal_map_format,
            basecolor_has_opacity: manifest.basecolor_has_opacity,
        };
        Ok((artifacts, high))
    }

    /// Bookkeeping after the host finished a reload/create.
    fn finish(&mut self, pending: PendingImport, now: f64) {
        let source = self.source();
        match &pending.high {
            HighMeshPlan::Attach(path) => self.retry.queue(RetryTarget::Attach(path.clone())),
            HighMeshPlan::Clear => self.retry.queue(RetryTarget::Clear),
            HighMeshPlan::Keep => {}
        }
        if self.retry.is_pending() {
            self.tick_retry();
        }

        let open = self.host.open_document();
        let local_doc = self
            .placeholder
            .or_placeholder(self.side, open.as_ref().and_then(|o| o.path.as_deref()));
        let name = open
            .map(|o| o.name)
            .unwrap_or_else(|| pending.artifacts.project.clone());
        // A send-back from a secondary pairing never moves this side's primary project.
        let secondary = pending.manifest.from_secondary_pairing();
        if !secondary {
            self.resolver.remember(
                &Identity::new(self.side, &local_doc, &name),
                &pending.project_dir,
            );
        }

        let folder = self.folder(&pending.project_dir);
        let force_new = pending.manifest.force_new_project;
        let linked = pending.manifest.document(source).map(str::to_owned);
        if linked.is_some() || force_new {
            folder.update_settings(|settings| {
                if let Some(linked) = &linked {
                    settings.set_linked_document(source, linked.clone());
                }
                if force_new {
                    settings.force_new_project = true;
                }
            });
        }
        if let Some(linked) = linked.as_deref().filter(|_| !secondary) {
            let write = if force_new {
                LinkWrite::ForwardOnly
            } else {
                LinkWrite::Both
            };
            if let Err(err) = self.registry().update(
                LinkDirection::from_side(self.side),
                &local_doc,
                Path::new(linked),
                write,
            ) {
                tracing::debug!(error = %err, "link registry not updated");
            }
        }

        self.consume_manifest(&pending, &local_doc, &folder);

        if pending.manifest.requests_new_instance()
            && pending.manifest.force_token().is_some()
            && pending.manifest.force_token() == self.launch_token.as_deref().map(str::trim)
        {
            tracing::debug!("force-new token consumed");
            self.launch_token = None;
        }

        self.last_acted = Some((pending.manifest_path.clone(), pending.handoff_time));
        self.last_document = Some(local_doc);
        self.backoff_until = 0.0;
        self.publish_heartbeat(now);

        folder.append_log(
            &format!("{} from {source}", pending.action),
            Some(&json!({
                "manifest": pending.manifest_path.display().to_string(),
                "mesh": pending.artifacts.mesh.display().to_string(),
                "high_mesh": pending.artifacts.high_mesh.as_ref().map(|p| p.display().to_string()),
                "preserve": pending.preserve,
                "force_new_project": force_new,
            })),
        );
        tracing::info!(
            action = %pending.action,
            project_dir = %pending.project_dir.display(),
            "hand-off imported"
        );
        let message = match pending.action {
            Action::Reload => format!("Mesh reloaded from {source}."),
            Action::Create => format!("Document created from {source} export."),
        };
        self.host.notify(Notice::Info, &message);
    }

    /// Clears the hand-off marker and records the local document, unless the sender has
    /// already replaced the manifest with a newer hand-off.
    fn consume_manifest(&self, pending: &PendingImport, local_doc: &Path, folder: &ProjectFolder) {
        let mut manifest = match read_manifest(&pending.manifest_path) {
            Some(on_disk) if on_disk.handoff_time(0.0) > pending.handoff_time => {
                tracing::debug!("newer hand-off arrived during import; leaving it armed");
                return;
            }
            Some(on_disk) => on_disk,
            None => pending.manifest.clone(),
        };
        manifest.auto_import = false;
        manifest.set_document(self.side, local_doc.to_string_lossy());

        if let Err(err) = write_json_atomic(&pending.manifest_path, &manifest, self.config.durability)
        {
            tracing::warn!(error = %err, "hand-off marker not cleared");
        }
        if !paths_match(&pending.manifest_path, folder.manifest_path()) {
            if let Err(err) = folder.save_manifest(&manifest) {
                tracing::debug!(error = %err, "manifest not migrated to metadata folder");
            }
        }
    }

    fn fail(&mut self, pending: &PendingImport, err: &HostError, now: f64) {
        if *err == HostError::Busy {
            tracing::debug!("receiving application busy; backing off");
            self.backoff_until = now + self.config.busy_backoff.as_secs_f64();
            return;
        }
        self.backoff_until = now + self.config.failure_backoff.as_secs_f64();
        tracing::warn!(action = %pending.action, error = %err, "hand-off import failed");
        self.folder(&pending.project_dir).append_log(
            &format!("{} failed: {err}", pending.action),
            None,
        );
        if self.should_report(&pending.manifest_path, pending.handoff_time, pending.trigger) {
            let message = format!("Mesh {} failed: {err}", pending.action);
            self.host.notify(Notice::Warning, &message);
        }
    }

    fn fail_missing(
        &mut self,
        manifest_path: &Path,
        handoff_time: f64,
        trigger: Trigger,
        err: &SyncError,
        now: f64,
    ) {
        self.backoff_until = now + self.config.failure_backoff.as_secs_f64();
        tracing::warn!(error = %err, "hand-off artifact missing");
        if self.should_report(manifest_path, handoff_time, trigger) {
            self.host.notify(Notice::Warning, &err.to_string());
        }
    }

    /// Explicit requests always report; a poll reports once per hand-off.
    fn should_report(&mut self, manifest_path: &Path, handoff_time: f64, trigger: Trigger) -> bool {
        if trigger == Trigger::Explicit {
            return true;
        }
        let seen = self
            .last_reported
            .as_ref()
            .is_some_and(|(path, time)| paths_match(path, manifest_path) && *time == handoff_time);
        self.last_reported = Some((manifest_path.to_path_buf(), handoff_time));
        !seen
    }

    /// One attempt at the pending high-mesh attach/clear.
    pub fn tick_retry(&mut self) -> RetryStatus {
        self.retry.tick(&mut self.host)
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Recorded path (relative ones against the project directory), then the default name in the
/// project directory, then `<root>/<project>/<default>` under every candidate root.
fn resolve_artifact(
    recorded: Option<&Path>,
    project_dir: &Path,
    default_name: Option<&str>,
    project: &str,
    candidates: &[PathBuf],
) -> Option<PathBuf> {
    if let Some(path) = recorded
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| absolutize(p, project_dir))
    {
        if path.is_file() {
            return Some(path);
        }
    }
    let default_name = default_name?;
    let local = project_dir.join(default_name);
    if local.is_file() {
        return Some(local);
    }
    candidates
        .iter()
        .map(|root| root.join(project).join(default_name))
        .find(|path| path.is_file())
}
