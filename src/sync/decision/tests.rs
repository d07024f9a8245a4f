// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::Path;

use rstest::rstest;

use super::{decide, Decision, IgnoreReason, Incoming, LocalSession, OpenSession, RejectReason, Trigger};
use crate::store::{Manifest, Side};

const MANIFEST_PATH: &str = "/bridge/doc/.gob_meta/bridge.json";
const PROJECT_DIR: &str = "/bridge/doc";

fn armed(blender_file: &str) -> Manifest {
    let mut manifest = Manifest::new(Side::MeshEditor, "doc", 100.0);
    manifest.blender_file = Some(blender_file.to_owned());
    manifest.arm_auto_import(100.0);
    manifest
}

fn incoming(manifest: &Manifest) -> Incoming<'_> {
    Incoming {
        manifest_path: Path::new(MANIFEST_PATH),
        project_dir: Path::new(PROJECT_DIR),
        manifest,
        handoff_time: manifest.handoff_time(0.0),
        registry_partner: None,
    }
}

fn nothing_open() -> LocalSession<'static> {
    LocalSession {
        side: Side::Texturing,
        open: None,
        launch_token: None,
        last_acted: None,
    }
}

fn with_open<'a>(document: &'a str, project_dir: Option<&'a str>) -> LocalSession<'a> {
    LocalSession {
        open: Some(OpenSession {
            document: Path::new(document),
            project_dir: project_dir.map(Path::new),
            name: "doc",
        }),
        ..nothing_open()
    }
}

#[rstest]
fn own_manifests_are_ignored() {
    let mut manifest = armed("/doc.blend");
    manifest.source = Side::Texturing;
    assert_eq!(
        decide(&nothing_open(), &incoming(&manifest), Trigger::Poll),
        Decision::Ignore(IgnoreReason::OwnSource)
    );
}

#[rstest]
fn consumed_hand_off_needs_explicit_import() {
    let mut manifest = armed("/doc.blend");
    manifest.auto_import = false;
    assert_eq!(
        decide(&nothing_open(), &incoming(&manifest), Trigger::Poll),
        Decision::Ignore(IgnoreReason::NotArmed)
    );
    assert_eq!(
        decide(&nothing_open(), &incoming(&manifest), Trigger::Explicit),
        Decision::CreateNew { close_current: false }
    );
}

#[rstest]
#[case(100.0, Decision::Ignore(IgnoreReason::AlreadyHandled))]
#[case(150.0, Decision::Ignore(IgnoreReason::AlreadyHandled))]
#[case(99.0, Decision::CreateNew { close_current: false })]
fn last_acted_marker_makes_polls_idempotent(#[case] acted_at: f64, #[case] expected: Decision) {
    let manifest = armed("/doc.blend");
    let local = LocalSession {
        last_acted: Some((Path::new(MANIFEST_PATH), acted_at)),
        ..nothing_open()
    };
    assert_eq!(decide(&local, &incoming(&manifest), Trigger::Poll), expected);
}

#[rstest]
fn acted_marker_for_another_manifest_does_not_block() {
    let manifest = armed("/doc.blend");
    let local = LocalSession {
        last_acted: Some((Path::new("/bridge/other/.gob_meta/bridge.json"), 500.0)),
        ..nothing_open()
    };
    assert_eq!(
        decide(&local, &incoming(&manifest), Trigger::Poll),
        Decision::CreateNew { close_current: false }
    );
}

#[rstest]
#[case(Some("T"), Some("T"), true, Decision::CreateNew { close_current: true })]
#[case(Some("T"), Some("other"), true, Decision::RejectForeign(RejectReason::TokenMismatch))]
#[case(Some("T"), None, true, Decision::RejectForeign(RejectReason::TokenMismatch))]
#[case(None, Some("T"), true, Decision::RejectForeign(RejectReason::TokenMismatch))]
#[case(Some("T"), None, false, Decision::CreateNew { close_current: false })]
#[case(Some("T"), Some("other"), false, Decision::CreateNew { close_current: false })]
fn force_new_isolation(
    #[case] manifest_token: Option<&str>,
    #[case] our_token: Option<&str>,
    #[case] document_open: bool,
    #[case] expected: Decision,
) {
    let mut manifest = armed("/doc.blend");
    manifest.force_new_project = true;
    manifest.force_new_token = manifest_token.map(str::to_owned);
    let mut local = if document_open {
        with_open("/work/doc.spp", Some(PROJECT_DIR))
    } else {
        nothing_open()
    };
    local.launch_token = our_token;
    assert_eq!(decide(&local, &incoming(&manifest), Trigger::Poll), expected);
}

#[rstest]
fn recorded_document_decides_before_project_dir() {
    let mut manifest = armed("/doc.blend");
    manifest.sp_project_file = Some("/work/doc.spp".to_owned());
    assert_eq!(
        decide(
            &with_open("/WORK/doc.spp", None),
            &incoming(&manifest),
            Trigger::Poll
        ),
        Decision::Reload
    );
    assert_eq!(
        decide(
            &with_open("/work/second.spp", Some(PROJECT_DIR)),
            &incoming(&manifest),
            Trigger::Poll
        ),
        Decision::RejectForeign(RejectReason::ForeignDocument)
    );
}

#[rstest]
fn registry_partner_identifies_the_open_document() {
    let manifest = armed("/doc.blend");
    let mut hit = incoming(&manifest);
    hit.registry_partner = Some("/work/doc.spp");
    assert_eq!(
        decide(&with_open("/work/doc.spp", Some("/bridge/elsewhere")), &hit, Trigger::Poll),
        Decision::Reload
    );
}

#[rstest]
#[case(PROJECT_DIR, Decision::Reload)]
#[case("/bridge/doc1", Decision::RejectForeign(RejectReason::ForeignDocument))]
fn project_dir_decides_without_recorded_document(
    #[case] open_dir: &str,
    #[case] expected: Decision,
) {
    let manifest = armed("/other.blend");
    assert_eq!(
        decide(
            &with_open("/work/doc.spp", Some(open_dir)),
            &incoming(&manifest),
            Trigger::Poll
        ),
        expected
    );
}

#[rstest]
#[case("doc", Decision::Reload)]
#[case("Doc", Decision::Reload)]
#[case("villain", Decision::RejectForeign(RejectReason::ForeignDocument))]
fn project_name_is_the_last_resort(#[case] project: &str, #[case] expected: Decision) {
    let mut manifest = armed("/doc.blend");
    manifest.project = project.to_owned();
    assert_eq!(
        decide(&with_open("/work/doc.spp", None), &incoming(&manifest), Trigger::Poll),
        expected
    );
}

#[rstest]
fn secondary_pairing_send_back_reloads_the_mesh_document() {
    let mut manifest = Manifest::new(Side::Texturing, "doc1", 100.0);
    manifest.blender_file = Some("/doc.blend".to_owned());
    manifest.sp_project_file = Some("/work/doc_copy.spp".to_owned());
    manifest.force_new_project = true;
    manifest.arm_auto_import(100.0);
    let local = LocalSession {
        side: Side::MeshEditor,
        open: Some(OpenSession {
            document: Path::new("/doc.blend"),
            project_dir: Some(Path::new(PROJECT_DIR)),
            name: "doc",
        }),
        launch_token: None,
        last_acted: None,
    };
    assert_eq!(decide(&local, &incoming(&manifest), Trigger::Poll), Decision::Reload);
}
