// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Both applications driven against one shared bridge root.

use std::path::{Path, PathBuf};

use paintbridge::config::BridgeConfig;
use paintbridge::store::{
    BridgeEnv, LinkDirection, LinkRegistry, Placeholder, ProjectFolder, RootLocator, Side,
};
use paintbridge::sync::agent::default_artifacts;
use paintbridge::sync::{
    Action, Exported, HostError, HostEvent, IgnoreReason, OpenDocument, RecordingHost,
    RejectReason, SendRequest, SyncAgent, TickOutcome, WakePlan,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Bridge {
    tmp: TempDir,
    root: PathBuf,
}

impl Bridge {
    fn env(&self) -> BridgeEnv {
        BridgeEnv::for_home(self.tmp.path().join("home")).with_override_root(&self.root)
    }

    fn agent(&self, side: Side, session: &str, host: RecordingHost) -> SyncAgent<RecordingHost> {
        SyncAgent::new(side, BridgeConfig::default(), self.env(), host)
            .with_placeholder(Placeholder::with_session(&self.root, session))
    }

    fn blender(&self, document: &str) -> SyncAgent<RecordingHost> {
        self.agent(
            Side::MeshEditor,
            "blender",
            RecordingHost::new().with_document(OpenDocument::saved(document)),
        )
    }

    fn painter(&self, session: &str, host: RecordingHost) -> SyncAgent<RecordingHost> {
        self.agent(Side::Texturing, session, host)
    }

    fn registry(&self) -> LinkRegistry {
        LinkRegistry::for_locator(&RootLocator::new(self.env()))
    }

    fn folder(&self, project: &str) -> ProjectFolder {
        ProjectFolder::new(self.root.join(project))
    }
}

#[fixture]
fn bridge() -> Bridge {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("bridge");
    Bridge { tmp, root }
}

/// Writes the side's primary mesh into the project directory.
fn export(side: Side) -> impl FnMut(&Path) -> Result<Exported, HostError> {
    let (mesh_name, _) = default_artifacts(side);
    move |dir: &Path| {
        let mesh = dir.join(mesh_name);
        std::fs::write(&mesh, b"fbx").map_err(|err| HostError::Failed(err.to_string()))?;
        Ok(Exported {
            mesh: Some(mesh),
            ..Exported::default()
        })
    }
}

fn send(agent: &mut SyncAgent<RecordingHost>, request: SendRequest, now: f64) -> WakePlan {
    let side = agent.side();
    agent
        .send(request, &mut export(side), None, now)
        .unwrap()
        .wake
}

fn reloaded(agent: &SyncAgent<RecordingHost>) -> Vec<PathBuf> {
    agent
        .host()
        .events()
        .iter()
        .filter_map(|event| match event {
            HostEvent::Reloaded { mesh, .. } => Some(mesh.clone()),
            _ => None,
        })
        .collect()
}

#[rstest]
fn round_trip_between_both_applications(bridge: Bridge) {
    let mut blender = bridge.blender("/work/doc.blend");
    let mut painter = bridge.painter("painter", RecordingHost::new());

    // First send: nothing runs on the other side yet.
    assert_eq!(send(&mut blender, SendRequest::default(), 1_000.0), WakePlan::Launch);
    assert_eq!(painter.tick(1_001.0), TickOutcome::Imported(Action::Create));
    let placeholder = painter.placeholder().path(Side::Texturing);
    assert!(bridge
        .folder("doc")
        .load_manifest()
        .unwrap()
        .names_document(Side::Texturing, &placeholder));

    // The new texturing document gets its real path.
    painter.host_mut().save_as("/work/doc.spp");
    painter.tick(1_010.0);
    assert_eq!(
        bridge
            .registry()
            .lookup(Path::new("/work/doc.blend"), LinkDirection::MeshToTexturing),
        Some("/work/doc.spp".to_owned())
    );

    // Send back: the mesh editor reloads its open document in place.
    assert_eq!(
        send(&mut painter, SendRequest::default(), 1_020.0),
        WakePlan::AlreadyOpen
    );
    assert_eq!(blender.tick(1_030.0), TickOutcome::Imported(Action::Reload));
    assert_eq!(
        reloaded(&blender),
        [bridge.root.join("doc").join(default_artifacts(Side::Texturing).0)]
    );

    // Resend: the texturing side reloads rather than creating a second document.
    assert_eq!(
        send(&mut blender, SendRequest::default(), 1_040.0),
        WakePlan::AlreadyOpen
    );
    assert_eq!(painter.tick(1_050.0), TickOutcome::Imported(Action::Reload));
    assert_eq!(
        painter
            .host()
            .count(|event| matches!(event, HostEvent::Created { .. })),
        1
    );
    assert_eq!(
        reloaded(&painter),
        [bridge.root.join("doc").join(default_artifacts(Side::MeshEditor).0)]
    );
}

#[rstest]
fn consumed_handoffs_are_not_replayed(bridge: Bridge) {
    let mut blender = bridge.blender("/work/doc.blend");
    let mut painter = bridge.painter("painter", RecordingHost::new());

    send(&mut blender, SendRequest::default(), 1_000.0);
    assert_eq!(painter.tick(1_001.0), TickOutcome::Imported(Action::Create));
    assert_eq!(
        painter.tick(1_100.0),
        TickOutcome::Ignored(IgnoreReason::NotArmed)
    );

    // A fresh painter instance sees the same consumed hand-off.
    let mut restarted = bridge.painter("restarted", RecordingHost::new());
    assert_eq!(
        restarted.tick(1_200.0),
        TickOutcome::Ignored(IgnoreReason::NotArmed)
    );
    assert!(restarted.host().events().is_empty());
}

#[rstest]
fn busy_painter_leaves_unrelated_handoffs_alone(bridge: Bridge) {
    let mut painter = bridge.painter(
        "painter",
        RecordingHost::new().with_document(OpenDocument::saved("/work/other.spp")),
    );
    painter.publish_heartbeat(999.0);
    let mut blender = bridge.blender("/work/doc.blend");

    assert_eq!(
        send(&mut blender, SendRequest::default(), 1_000.0),
        WakePlan::Occupied
    );
    assert_eq!(
        painter.tick(1_001.0),
        TickOutcome::Rejected(RejectReason::ForeignDocument)
    );
    assert!(painter.host().events().is_empty());
    assert!(bridge.folder("doc").load_manifest().unwrap().auto_import);
}

#[rstest]
fn new_instance_handoff_reaches_only_the_tokened_instance(bridge: Bridge) {
    let mut busy = bridge.painter(
        "busy",
        RecordingHost::new().with_document(OpenDocument::saved("/work/other.spp")),
    );
    busy.publish_heartbeat(999.0);
    let mut blender = bridge.blender("/work/doc.blend");

    let request = SendRequest {
        new_instance: true,
        ..SendRequest::default()
    };
    let WakePlan::LaunchNewInstance { token } = send(&mut blender, request, 1_000.0) else {
        panic!("expected a new-instance launch");
    };

    assert_eq!(
        busy.tick(1_001.0),
        TickOutcome::Rejected(RejectReason::TokenMismatch)
    );
    assert!(busy.host().events().is_empty());

    let mut fresh = bridge
        .painter("fresh", RecordingHost::new())
        .with_launch_token(Some(token));
    assert_eq!(fresh.tick(1_002.0), TickOutcome::Imported(Action::Create));
    assert_eq!(fresh.launch_token(), None);
    assert!(bridge.folder("doc").is_force_new_project());
    assert!(!bridge.folder("doc").load_manifest().unwrap().auto_import);
}

#[rstest]
fn separate_documents_get_separate_projects(bridge: Bridge) {
    let mut first = bridge.blender("/work/a/asset.blend");
    let mut second = bridge.blender("/work/b/asset.blend");

    let first_dir = first
        .send(SendRequest::default(), &mut export(Side::MeshEditor), None, 1_000.0)
        .unwrap()
        .project_dir;
    let second_dir = second
        .send(SendRequest::default(), &mut export(Side::MeshEditor), None, 1_010.0)
        .unwrap()
        .project_dir;

    assert_ne!(first_dir, second_dir);
    assert_eq!(first_dir, bridge.root.join("asset"));
    let second_manifest = ProjectFolder::new(&second_dir).load_manifest().unwrap();
    assert!(second_manifest.names_document(Side::MeshEditor, Path::new("/work/b/asset.blend")));
    let first_manifest = ProjectFolder::new(&first_dir).load_manifest().unwrap();
    assert!(first_manifest.names_document(Side::MeshEditor, Path::new("/work/a/asset.blend")));
}

#[rstest]
fn opening_another_document_keeps_the_existing_pairing(bridge: Bridge) {
    let mut blender = bridge.blender("/work/a.blend");
    let mut painter = bridge.painter("painter", RecordingHost::new());
    send(&mut blender, SendRequest::default(), 1_000.0);
    painter.tick(1_001.0);
    painter.host_mut().save_as("/work/a.spp");
    painter.tick(1_010.0);
    blender.tick(1_020.0);

    blender.host_mut().document = Some(OpenDocument::saved("/work/b.blend"));
    assert!(!blender.observe_document_path());
    blender.tick(1_030.0);

    let registry = bridge.registry();
    assert_eq!(
        registry.lookup(Path::new("/work/a.blend"), LinkDirection::MeshToTexturing),
        Some("/work/a.spp".to_owned())
    );
    assert_eq!(
        registry.lookup(Path::new("/work/a.spp"), LinkDirection::TexturingToMesh),
        Some("/work/a.blend".to_owned())
    );
    assert_eq!(
        registry.lookup(Path::new("/work/b.blend"), LinkDirection::MeshToTexturing),
        None
    );
    let manifest = bridge.folder("a").load_manifest().unwrap();
    assert!(manifest.names_document(Side::MeshEditor, Path::new("/work/a.blend")));

    // The next send from the other document gets a project of its own.
    let report = blender
        .send(SendRequest::default(), &mut export(Side::MeshEditor), None, 1_040.0)
        .unwrap();
    assert_eq!(report.project_dir, bridge.root.join("b"));
}
