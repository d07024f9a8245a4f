// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Paintbridge CLI entrypoint.
//!
//! `root` and `status` inspect the bridge area, `send` hands existing artifact files to the
//! other side, and `watch` runs the receiving poll loop without an application attached.

use std::error::Error;
use std::path::{Path, PathBuf};

use paintbridge::config::{launch_token_from_process, BridgeConfig};
use paintbridge::store::{
    find_latest, now_secs, BridgeEnv, Heartbeat, RootLocator, Side, WriteDurability,
};
use paintbridge::sync::agent::default_artifacts;
use paintbridge::sync::{
    spawn_poll_loop, Exported, HostError, Launcher, OpenDocument, ProcessLauncher, RecordingHost,
    SendRequest, SyncAgent,
};
use tracing_subscriber::EnvFilter;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} root [--root <dir>]\n  {program} status [--root <dir>]\n  {program} send --side <blender|substance_painter> --mesh <file> [--high <file>] [--document <file> | --name <name>] [--new-instance] [--launch <exe>] [--root <dir>] [--durable-writes]\n  {program} watch [--side <side>] [--document <file> | --name <name>] [--root <dir>] [--durable-writes]\n\n--root overrides the bridge root (including GOB_SP_BRIDGE_DIR).\n`watch` defaults to --side substance_painter and logs every decision; RUST_LOG controls verbosity (default info).\n\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum CliCommand {
    #[default]
    Root,
    Status,
    Send,
    Watch,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    command: CliCommand,
    root: Option<String>,
    durable_writes: bool,
    side: Option<Side>,
    document: Option<String>,
    name: Option<String>,
    mesh: Option<String>,
    high: Option<String>,
    new_instance: bool,
    launch: Option<String>,
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(value);
    Ok(())
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let command = match args.next().as_deref() {
        Some("root") => CliCommand::Root,
        Some("status") => CliCommand::Status,
        Some("send") => CliCommand::Send,
        Some("watch") => CliCommand::Watch,
        _ => return Err(()),
    };
    let mut options = CliOptions {
        command,
        ..CliOptions::default()
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" => set_once(&mut options.root, args.next().ok_or(())?)?,
            "--side" => {
                let side = args.next().ok_or(())?.parse().map_err(|_| ())?;
                set_once(&mut options.side, side)?;
            }
            "--document" => set_once(&mut options.document, args.next().ok_or(())?)?,
            "--name" => set_once(&mut options.name, args.next().ok_or(())?)?,
            "--mesh" => set_once(&mut options.mesh, args.next().ok_or(())?)?,
            "--high" => set_once(&mut options.high, args.next().ok_or(())?)?,
            "--launch" => set_once(&mut options.launch, args.next().ok_or(())?)?,
            "--new-instance" => {
                if options.new_instance {
                    return Err(());
                }
                options.new_instance = true;
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            _ => return Err(()),
        }
    }

    let sends = options.mesh.is_some()
        || options.high.is_some()
        || options.launch.is_some()
        || options.new_instance;
    let opens = options.side.is_some() || options.document.is_some() || options.name.is_some();
    match options.command {
        CliCommand::Root | CliCommand::Status if sends || opens || options.durable_writes => {
            return Err(())
        }
        CliCommand::Send if options.side.is_none() || options.mesh.is_none() => return Err(()),
        CliCommand::Watch if sends => return Err(()),
        _ => {}
    }
    if options.document.is_some() && options.name.is_some() {
        return Err(());
    }

    Ok(options)
}

fn open_document(options: &CliOptions) -> Option<OpenDocument> {
    match (&options.document, &options.name) {
        (Some(document), _) => Some(OpenDocument::saved(document)),
        (None, Some(name)) => Some(OpenDocument::unsaved(name.clone())),
        (None, None) => None,
    }
}

fn print_root(locator: &RootLocator) {
    println!("root: {}", locator.resolve_root().display());
    if let Some(hint) = locator.read_hint() {
        println!("hint: {}", hint.display());
    }
    for candidate in locator.candidate_roots() {
        let marker = if candidate.is_dir() { "*" } else { " " };
        println!("{marker} {}", candidate.display());
    }
}

fn print_status(locator: &RootLocator, config: &BridgeConfig) {
    let now = now_secs();
    let candidates = locator.candidate_roots();
    for side in [Side::MeshEditor, Side::Texturing] {
        println!("[{side}]");
        match Heartbeat::for_locator(side, locator).read_latest_any(
            None,
            config.heartbeat_max_age,
            now,
        ) {
            Some(session) if session.project_open => println!(
                "  open: {} ({:.0}s ago) in {}",
                session.document(side).unwrap_or("-"),
                now - session.time(),
                session
                    .project_dir
                    .as_deref()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_else(|| "-".to_owned()),
            ),
            Some(session) => println!("  running, nothing open ({:.0}s ago)", now - session.time()),
            None => println!("  no live session"),
        }
        match find_latest(&candidates, Some(side)) {
            Some(hit) => println!(
                "  last hand-off: {} ({}, {:.0}s ago)",
                hit.path.display(),
                if hit.manifest.auto_import {
                    "armed"
                } else {
                    "consumed"
                },
                now - hit.manifest.handoff_time(hit.modified),
            ),
            None => println!("  no hand-off"),
        }
    }
}

/// Copies `source` into `project_dir` under `file_name` unless it already lives there.
fn stage(source: &Path, project_dir: &Path, file_name: &str) -> Result<PathBuf, HostError> {
    let target = project_dir.join(file_name);
    if source != target {
        std::fs::copy(source, &target)
            .map_err(|err| HostError::Failed(format!("copy {}: {err}", source.display())))?;
    }
    Ok(target)
}

fn run_send(
    options: CliOptions,
    side: Side,
    env: BridgeEnv,
    config: BridgeConfig,
) -> Result<(), Box<dyn Error>> {
    let mut host = RecordingHost::new();
    host.document = open_document(&options);
    let mut agent = SyncAgent::new(side, config, env, host);

    let (mesh_name, high_name) = default_artifacts(side);
    let mesh = PathBuf::from(options.mesh.unwrap_or_default());
    let high = options.high.map(PathBuf::from);
    let mut exporter = |project_dir: &Path| -> Result<Exported, HostError> {
        let high_mesh = match (&high, high_name) {
            (Some(high), Some(name)) => Some(stage(high, project_dir, name)?),
            _ => None,
        };
        Ok(Exported {
            mesh: Some(stage(&mesh, project_dir, mesh_name)?),
            high_mesh_exported: Some(high_mesh.is_some()),
            high_mesh,
            ..Exported::default()
        })
    };

    let mut launcher = options.launch.map(ProcessLauncher::new);
    let request = SendRequest {
        mesh_signature: None,
        new_instance: options.new_instance,
        launch: launcher.is_some(),
    };
    let report = agent.send(
        request,
        &mut exporter,
        launcher.as_mut().map(|l| l as &mut dyn Launcher),
        now_secs(),
    )?;

    println!("project: {}", report.project_dir.display());
    println!("manifest: {}", report.manifest_path.display());
    println!("wake: {:?} (launched: {})", report.wake, report.launched);
    Ok(())
}

fn run_watch(
    options: CliOptions,
    env: BridgeEnv,
    config: BridgeConfig,
) -> Result<(), Box<dyn Error>> {
    let side = options.side.unwrap_or(Side::Texturing);
    let mut host = RecordingHost::new();
    host.document = open_document(&options);
    let agent =
        SyncAgent::new(side, config, env, host).with_launch_token(launch_token_from_process());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let agent = runtime.block_on(async move {
        let handle = spawn_poll_loop(agent);
        tokio::signal::ctrl_c().await?;
        Ok::<_, std::io::Error>(handle.stop().await)
    })?;

    if let Some(agent) = agent {
        for event in agent.host().events() {
            println!("{event:?}");
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "paintbridge".to_owned());

        // Launch tokens may be appended by whoever started us; they are read separately.
        let args = args.filter(|arg| !arg.starts_with("--gob-force-new"));
        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let mut env = BridgeEnv::from_process();
        if let Some(root) = &options.root {
            env = env.with_override_root(root);
        }
        let mut config = BridgeConfig::from_env();
        if options.durable_writes {
            config = config.with_durability(WriteDurability::Durable);
        }
        let locator = RootLocator::new(env.clone()).with_durability(config.durability);

        match options.command {
            CliCommand::Root => print_root(&locator),
            CliCommand::Status => print_status(&locator, &config),
            CliCommand::Send => {
                let side = options.side.ok_or("send needs --side")?;
                run_send(options, side, env, config)?;
            }
            CliCommand::Watch => run_watch(options, env, config)?,
        }
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("paintbridge: {err}");
        std::process::exit(1);
    }
}
