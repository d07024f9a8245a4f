// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Seams to the applications on either end.
//!
//! The protocol never converts meshes or builds materials itself. It asks a [`Host`] to
//! reload/create from artifacts on disk, an [`Exporter`] to produce them, and a [`Launcher`]
//! to start the other application.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{FORCE_NEW_TOKEN_ARG_PREFIXES, FORCE_NEW_TOKEN_ENV_VAR};
use crate::store::NormalMapFormat;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The application is mid-operation; try again shortly.
    #[error("application is busy")]
    Busy,

    /// Reload cannot keep side-specific authored state for this asset.
    #[error("reload cannot preserve authored state")]
    PreserveUnsupported,

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Warning,
}

/// The document a host currently has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    /// `None` until the document has been saved once.
    pub path: Option<PathBuf>,
    /// Display name, used to derive the natural project directory name.
    pub name: String,
}

impl OpenDocument {
    pub fn saved(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: Some(path),
            name,
        }
    }

    pub fn unsaved(name: impl Into<String>) -> Self {
        Self {
            path: None,
            name: name.into(),
        }
    }
}

/// Whether a reload/create finished inside the call or will report back later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    /// The host calls [`crate::sync::SyncAgent::finish_pending`] once the operation ends.
    Pending,
}

/// Resolved, existing files of one incoming hand-off.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub project: String,
    pub project_dir: PathBuf,
    pub mesh: PathBuf,
    pub high_mesh: Option<PathBuf>,
    pub textures_dir: Option<PathBuf>,
    pub textures: Vec<PathBuf>,
    pub normal_map_format: Option<NormalMapFormat>,
    pub basecolor_has_opacity: Option<bool>,
}

/// The receiving application.
pub trait Host {
    fn open_document(&self) -> Option<OpenDocument>;

    /// True once the open document accepts edits (e.g. secondary-mesh attachment).
    fn is_ready(&self) -> bool;

    fn reload(&mut self, artifacts: &Artifacts, preserve: bool) -> Result<Completion, HostError>;

    fn create(&mut self, artifacts: &Artifacts) -> Result<Completion, HostError>;

    fn close(&mut self) -> Result<(), HostError>;

    /// Idempotent. Returns `false` when the document is not ready yet.
    fn attach_high_mesh(&mut self, path: &Path) -> bool;

    /// Idempotent. Returns `false` when the document is not ready yet.
    fn clear_high_mesh(&mut self) -> bool;

    fn notify(&mut self, notice: Notice, message: &str);
}

/// What an exporter wrote into a project directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exported {
    pub mesh: Option<PathBuf>,
    pub high_mesh: Option<PathBuf>,
    pub high_mesh_exported: Option<bool>,
    pub textures_dir: Option<PathBuf>,
    pub textures: Vec<PathBuf>,
    pub normal_map_format: Option<NormalMapFormat>,
    pub basecolor_has_opacity: Option<bool>,
}

/// The sending application's export step.
pub trait Exporter {
    fn export(&mut self, project_dir: &Path) -> Result<Exported, HostError>;
}

impl<F> Exporter for F
where
    F: FnMut(&Path) -> Result<Exported, HostError>,
{
    fn export(&mut self, project_dir: &Path) -> Result<Exported, HostError> {
        self(project_dir)
    }
}

/// Starts the receiving application.
pub trait Launcher {
    fn launch(&mut self, new_instance: bool, token: Option<&str>) -> Result<(), HostError>;
}

/// Spawns an executable (or, on macOS, an `.app` bundle through `open`).
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    fn command(&self, new_instance: bool, token: Option<&str>) -> Command {
        let mut args = self.args.clone();
        if let Some(token) = token {
            args.push(format!("{}{token}", FORCE_NEW_TOKEN_ARG_PREFIXES[0]));
        }

        let is_bundle = self
            .program
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("app"));
        let mut command = if cfg!(target_os = "macos") && is_bundle {
            let mut open = Command::new("open");
            if new_instance {
                open.arg("-n");
            }
            open.arg("-a").arg(&self.program);
            if !args.is_empty() {
                open.arg("--args");
            }
            open
        } else {
            Command::new(&self.program)
        };
        command.args(args);
        if let Some(token) = token {
            command.env(FORCE_NEW_TOKEN_ENV_VAR, token);
        }
        command
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, new_instance: bool, token: Option<&str>) -> Result<(), HostError> {
        let child = self
            .command(new_instance, token)
            .spawn()
            .map_err(|err| HostError::Failed(format!("launch {}: {err}", self.program.display())))?;
        tracing::info!(pid = child.id(), new_instance, "launched receiving application");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Reloaded { mesh: PathBuf, preserve: bool },
    Created { mesh: PathBuf },
    Closed,
    AttachedHighMesh(PathBuf),
    ClearedHighMesh,
    Notified(Notice, String),
}

/// A host without an application behind it: every call is recorded and logged.
///
/// Used by the `watch` command to dry-run the protocol, and scriptable for tests through
/// [`RecordingHost::fail_next`] and [`RecordingHost::defer`].
#[derive(Debug)]
pub struct RecordingHost {
    pub document: Option<OpenDocument>,
    pub ready: bool,
    /// Report reload/create as [`Completion::Pending`] instead of finishing in the call.
    pub defer: bool,
    events: Vec<HostEvent>,
    failures: VecDeque<HostError>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            document: None,
            ready: true,
            defer: false,
            events: Vec::new(),
            failures: VecDeque::new(),
        }
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: OpenDocument) -> Self {
        self.document = Some(document);
        self
    }

    /// The next reload/create fails with `err`. Queued failures are consumed in order.
    pub fn fail_next(&mut self, err: HostError) {
        self.failures.push_back(err);
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) {
        self.document = Some(OpenDocument::saved(path));
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn count(&self, matches: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.iter().filter(|event| matches(event)).count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn outcome(&mut self) -> Result<Completion, HostError> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        Ok(if self.defer {
            Completion::Pending
        } else {
            Completion::Done
        })
    }
}

impl Host for RecordingHost {
    fn open_document(&self) -> Option<OpenDocument> {
        self.document.clone()
    }

    fn is_ready(&self) -> bool {
        self.ready && self.document.is_some()
    }

    fn reload(&mut self, artifacts: &Artifacts, preserve: bool) -> Result<Completion, HostError> {
        let outcome = self.outcome()?;
        tracing::info!(mesh = %artifacts.mesh.display(), preserve, "reload");
        self.events.push(HostEvent::Reloaded {
            mesh: artifacts.mesh.clone(),
            preserve,
        });
        Ok(outcome)
    }

    fn create(&mut self, artifacts: &Artifacts) -> Result<Completion, HostError> {
        let outcome = self.outcome()?;
        tracing::info!(mesh = %artifacts.mesh.display(), project = %artifacts.project, "create");
        self.document = Some(OpenDocument::unsaved(artifacts.project.clone()));
        self.events.push(HostEvent::Created {
            mesh: artifacts.mesh.clone(),
        });
        Ok(outcome)
    }

    fn close(&mut self) -> Result<(), HostError> {
        self.document = None;
        self.events.push(HostEvent::Closed);
        Ok(())
    }

    fn attach_high_mesh(&mut self, path: &Path) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.events.push(HostEvent::AttachedHighMesh(path.to_path_buf()));
        true
    }

    fn clear_high_mesh(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.events.push(HostEvent::ClearedHighMesh);
        true
    }

    fn notify(&mut self, notice: Notice, message: &str) {
        match notice {
            Notice::Info => tracing::info!("{message}"),
            Notice::Warning => tracing::warn!("{message}"),
        }
        self.events
            .push(HostEvent::Notified(notice, message.to_owned()));
    }
}
