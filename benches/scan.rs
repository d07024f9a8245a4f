// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use paintbridge::store::{
    find_for_document, find_for_mesh_signature, find_latest, BridgeEnv, Identity, LinkRegistry,
    ProjectResolver, RootLocator, Side,
};

mod fixtures;
mod profiler;

use fixtures::{Case, TempDir};

const CASES: [Case; 3] = [Case::RootSmall, Case::RootMedium, Case::RootLarge];

fn locator_for(tmp: &TempDir) -> RootLocator {
    let root = tmp.path().join("bridge");
    std::fs::create_dir_all(&root).expect("create bridge root");
    RootLocator::new(BridgeEnv::for_home(tmp.path().join("home")).with_override_root(root))
}

// Benchmark identity (keep stable):
// - Group names in this file: `store.scan` and `store.resolve`
// - Case IDs are `<operation>_<size>` (e.g. `latest_small`, `by_document_large`); keep them
//   stable across refactors so results stay comparable over time.
fn benches_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("store.scan");

    for case in CASES {
        let tmp = TempDir::new(&format!("scan_{}", case.id()));
        let locator = locator_for(&tmp);
        fixtures::bridge_root(&locator.resolve_root(), case);
        let roots = locator.candidate_roots();

        // Oldest project: the scan cannot stop early.
        let document = fixtures::blender_file(0);
        let signature = fixtures::signature(0);

        group.bench_function(format!("latest_{}", case.id()), |b| {
            b.iter(|| {
                let hit = find_latest(black_box(&roots), Some(Side::Texturing));
                black_box(hit.map(|hit| hit.modified))
            })
        });
        group.bench_function(format!("by_document_{}", case.id()), |b| {
            b.iter(|| {
                let hit = find_for_document(
                    black_box(&roots),
                    Side::MeshEditor,
                    black_box(&document),
                    None,
                );
                black_box(hit.is_some())
            })
        });
        group.bench_function(format!("by_signature_{}", case.id()), |b| {
            b.iter(|| {
                let hit = find_for_mesh_signature(black_box(&roots), black_box(&signature), None);
                black_box(hit.is_some())
            })
        });
    }
    group.finish();
}

fn benches_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("store.resolve");

    for case in CASES {
        let tmp = TempDir::new(&format!("resolve_{}", case.id()));
        let locator = locator_for(&tmp);
        fixtures::bridge_root(&locator.resolve_root(), case);
        let registry = LinkRegistry::for_locator(&locator);

        let known = fixtures::blender_file(case.projects() / 2);
        let known_name = known
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unknown = std::path::PathBuf::from("/work/unknown.blend");

        group.bench_function(format!("known_cold_{}", case.id()), |b| {
            b.iter(|| {
                let mut resolver = ProjectResolver::new();
                let identity = Identity::new(Side::MeshEditor, &known, &known_name);
                black_box(resolver.resolve_for(&locator, &registry, black_box(&identity)))
            })
        });
        group.bench_function(format!("unknown_cold_{}", case.id()), |b| {
            b.iter(|| {
                let mut resolver = ProjectResolver::new();
                let identity = Identity::new(Side::MeshEditor, &unknown, "unknown");
                black_box(resolver.resolve_for(&locator, &registry, black_box(&identity)))
            })
        });

        let mut warm = ProjectResolver::new();
        let identity = Identity::new(Side::MeshEditor, &known, &known_name);
        warm.resolve_for(&locator, &registry, &identity);
        group.bench_function(format!("known_cached_{}", case.id()), |b| {
            b.iter(|| black_box(warm.resolve_for(&locator, &registry, black_box(&identity))))
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::configured();
    targets = benches_scan, benches_resolve
}
criterion_main!(benches);
