// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{plan_wake, SendRequest, WakePlan};
use crate::config::BridgeConfig;
use crate::store::{
    ActiveSession, BridgeEnv, Heartbeat, LinkDirection, LinkRegistry, LinkWrite, Manifest,
    Placeholder, ProjectFolder, RootLocator, Side,
};
use crate::sync::agent::{SyncAgent, MESH_EDITOR_MESH, TEXTURING_MESH};
use crate::sync::host::{Exported, HostError, Launcher, OpenDocument, RecordingHost};
use crate::sync::SyncError;

#[derive(Debug, Default)]
struct RecordingLauncher {
    calls: Vec<(bool, Option<String>)>,
}

impl Launcher for RecordingLauncher {
    fn launch(&mut self, new_instance: bool, token: Option<&str>) -> Result<(), HostError> {
        self.calls.push((new_instance, token.map(str::to_owned)));
        Ok(())
    }
}

struct SendCtx {
    tmp: TempDir,
    root: PathBuf,
}

impl SendCtx {
    fn env(&self) -> BridgeEnv {
        BridgeEnv::for_home(self.tmp.path().join("home")).with_override_root(&self.root)
    }

    fn agent(&self, side: Side, document: &str) -> SyncAgent<RecordingHost> {
        let host = RecordingHost::new().with_document(OpenDocument::saved(document));
        SyncAgent::new(side, BridgeConfig::default(), self.env(), host)
            .with_placeholder(Placeholder::with_session(&self.root, "test"))
    }

    fn registry(&self) -> LinkRegistry {
        LinkRegistry::for_locator(&RootLocator::new(self.env()))
    }

    fn painter_heartbeat(&self, document: &str, project: &str) {
        self.heartbeat(Side::Texturing, document, project);
    }

    fn heartbeat(&self, side: Side, document: &str, project: &str) {
        Heartbeat::for_locator(side, &RootLocator::new(self.env())).publish(&ActiveSession::open(
            1_000.0,
            side,
            Path::new(document),
            &self.root.join(project),
        ));
    }
}

#[fixture]
fn ctx() -> SendCtx {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("bridge");
    SendCtx { tmp, root }
}

fn export_as(file: &'static str) -> impl FnMut(&Path) -> Result<Exported, HostError> {
    move |dir: &Path| {
        let mesh = dir.join(file);
        std::fs::write(&mesh, b"fbx").map_err(|err| HostError::Failed(err.to_string()))?;
        Ok(Exported {
            mesh: Some(mesh),
            ..Exported::default()
        })
    }
}

fn launch() -> SendRequest {
    SendRequest {
        launch: true,
        ..SendRequest::default()
    }
}

#[rstest]
fn no_heartbeat_means_launch() {
    assert_eq!(
        plan_wake(None, Side::Texturing, None, Path::new("/b/doc"), true),
        WakePlan::Launch
    );
}

#[rstest]
fn running_without_a_document_needs_no_launch() {
    let idle = ActiveSession::idle(10.0);
    assert_eq!(
        plan_wake(Some(&idle), Side::Texturing, None, Path::new("/b/doc"), true),
        WakePlan::Idle
    );
}

#[rstest]
#[case::by_linked_document(Some("/work/doc.spp"), "/b/elsewhere", WakePlan::AlreadyOpen)]
#[case::by_project_dir(None, "/b/doc", WakePlan::AlreadyOpen)]
#[case::unrelated(Some("/work/other.spp"), "/b/elsewhere", WakePlan::Occupied)]
fn open_peer_is_matched_against_the_pairing(
    #[case] linked: Option<&str>,
    #[case] peer_dir: &str,
    #[case] expected: WakePlan,
) {
    let peer = ActiveSession::open(
        10.0,
        Side::Texturing,
        Path::new("/work/doc.spp"),
        Path::new(peer_dir),
    );
    assert_eq!(
        plan_wake(Some(&peer), Side::Texturing, linked, Path::new("/b/doc"), false),
        expected
    );
}

#[rstest]
fn unrelated_peer_with_new_instance_mints_a_token() {
    let peer = ActiveSession::open(
        10.0,
        Side::Texturing,
        Path::new("/work/other.spp"),
        Path::new("/b/other"),
    );
    let WakePlan::LaunchNewInstance { token } =
        plan_wake(Some(&peer), Side::Texturing, None, Path::new("/b/doc"), true)
    else {
        panic!("expected a new-instance launch");
    };
    assert!(!token.is_empty());
}

#[rstest]
fn busy_mesh_editor_is_never_given_a_second_instance() {
    let peer = ActiveSession::open(
        10.0,
        Side::MeshEditor,
        Path::new("/work/other.blend"),
        Path::new("/b/other"),
    );
    assert_eq!(
        plan_wake(Some(&peer), Side::MeshEditor, None, Path::new("/b/doc"), true),
        WakePlan::Occupied
    );
}

#[rstest]
fn send_writes_an_armed_manifest_and_launches(ctx: SendCtx) {
    let mut agent = ctx.agent(Side::MeshEditor, "/work/doc.blend");
    let mut launcher = RecordingLauncher::default();

    let report = agent
        .send(
            launch(),
            &mut export_as(MESH_EDITOR_MESH),
            Some(&mut launcher as &mut dyn Launcher),
            1_000.0,
        )
        .unwrap();

    assert_eq!(report.project_dir, ctx.root.join("doc"));
    assert_eq!(report.wake, WakePlan::Launch);
    assert!(report.launched);
    assert_eq!(launcher.calls, [(false, None)]);

    let manifest = ProjectFolder::new(&report.project_dir).load_manifest().unwrap();
    assert_eq!(manifest.source, Side::MeshEditor);
    assert!(manifest.auto_import);
    assert_eq!(manifest.auto_import_at, Some(1_000.0));
    assert!(manifest.names_document(Side::MeshEditor, Path::new("/work/doc.blend")));
    assert_eq!(manifest.mesh_fbx, Some(report.project_dir.join(MESH_EDITOR_MESH)));
    assert!(!manifest.force_new_project);

    assert_eq!(RootLocator::new(ctx.env()).read_hint(), Some(ctx.root.clone()));
    let heartbeat = Heartbeat::for_locator(Side::MeshEditor, agent.locator())
        .read_latest(None, agent.config().heartbeat_max_age, 1_000.0)
        .unwrap();
    assert!(heartbeat.in_project(&report.project_dir));
}

#[rstest]
fn open_pairing_is_only_notified_through_the_manifest(ctx: SendCtx) {
    ctx.painter_heartbeat("/work/doc.spp", "doc");
    let mut agent = ctx.agent(Side::MeshEditor, "/work/doc.blend");
    let mut launcher = RecordingLauncher::default();

    let report = agent
        .send(
            launch(),
            &mut export_as(MESH_EDITOR_MESH),
            Some(&mut launcher as &mut dyn Launcher),
            1_000.0,
        )
        .unwrap();
    assert_eq!(report.wake, WakePlan::AlreadyOpen);
    assert!(!report.launched);
    assert!(launcher.calls.is_empty());
}

#[rstest]
fn busy_peer_with_new_instance_gets_a_tokened_launch(ctx: SendCtx) {
    ctx.painter_heartbeat("/work/other.spp", "other");
    let mut agent = ctx.agent(Side::MeshEditor, "/work/doc.blend");
    let mut launcher = RecordingLauncher::default();
    let request = SendRequest {
        new_instance: true,
        ..launch()
    };

    let report = agent
        .send(
            request,
            &mut export_as(MESH_EDITOR_MESH),
            Some(&mut launcher as &mut dyn Launcher),
            1_000.0,
        )
        .unwrap();
    let WakePlan::LaunchNewInstance { token } = &report.wake else {
        panic!("expected a new-instance launch, got {:?}", report.wake);
    };
    let manifest = ProjectFolder::new(&report.project_dir).load_manifest().unwrap();
    assert!(manifest.force_new_project);
    assert_eq!(manifest.force_token(), Some(token.as_str()));
    assert_eq!(launcher.calls, [(true, Some(token.clone()))]);
}

#[rstest]
fn new_instance_from_the_texturing_side_is_not_tokened(ctx: SendCtx) {
    ctx.heartbeat(Side::MeshEditor, "/work/other.blend", "other");
    let mut agent = ctx.agent(Side::Texturing, "/work/doc.spp");
    let mut launcher = RecordingLauncher::default();
    let request = SendRequest {
        new_instance: true,
        ..launch()
    };

    let report = agent
        .send(
            request,
            &mut export_as(TEXTURING_MESH),
            Some(&mut launcher as &mut dyn Launcher),
            1_000.0,
        )
        .unwrap();
    assert_eq!(report.wake, WakePlan::Occupied);
    assert!(launcher.calls.is_empty());

    let manifest = ProjectFolder::new(&report.project_dir).load_manifest().unwrap();
    assert_eq!(manifest.source, Side::Texturing);
    assert!(!manifest.force_new_project);
    assert_eq!(manifest.force_token(), None);
    assert!(!manifest.from_secondary_pairing());
    assert!(manifest.auto_import);
}

#[rstest]
fn failed_export_writes_nothing(ctx: SendCtx) {
    let mut agent = ctx.agent(Side::MeshEditor, "/work/doc.blend");
    let mut failing =
        |_: &Path| -> Result<Exported, HostError> { Err(HostError::Failed("no meshes".to_owned())) };

    let err = agent
        .send(launch(), &mut failing, None, 1_000.0)
        .unwrap_err();
    assert!(matches!(err, SyncError::Host(HostError::Failed(_))));
    assert!(ProjectFolder::new(ctx.root.join("doc")).load_manifest().is_none());
}

#[rstest]
fn secondary_pairing_send_back_keeps_the_primary_link(ctx: SendCtx) {
    let registry = ctx.registry();
    registry
        .update(
            LinkDirection::MeshToTexturing,
            Path::new("/work/doc.blend"),
            Path::new("/work/primary.spp"),
            LinkWrite::Both,
        )
        .unwrap();
    let mut created = Manifest::new(Side::MeshEditor, "doc", 100.0);
    created.blender_file = Some("/work/doc.blend".to_owned());
    created.sp_project_file = Some("/work/copy.spp".to_owned());
    created.force_new_project = true;
    ProjectFolder::new(ctx.root.join("doc"))
        .save_manifest(&created)
        .unwrap();

    let mut agent = ctx.agent(Side::Texturing, "/work/copy.spp");
    let report = agent
        .send(
            SendRequest::default(),
            &mut export_as(TEXTURING_MESH),
            None,
            1_000.0,
        )
        .unwrap();

    assert_eq!(report.project_dir, ctx.root.join("doc"));
    let manifest = ProjectFolder::new(&report.project_dir).load_manifest().unwrap();
    assert_eq!(manifest.source, Side::Texturing);
    assert!(manifest.force_new_project);
    assert_eq!(manifest.force_token(), None);
    assert_eq!(manifest.link_sp_project_file.as_deref(), Some("/work/primary.spp"));
    assert!(manifest.names_document(Side::MeshEditor, Path::new("/work/doc.blend")));

    assert_eq!(
        registry.lookup(Path::new("/work/doc.blend"), LinkDirection::MeshToTexturing),
        Some("/work/primary.spp".to_owned())
    );
    assert_eq!(
        registry.lookup(Path::new("/work/copy.spp"), LinkDirection::TexturingToMesh),
        Some("/work/doc.blend".to_owned())
    );
}
