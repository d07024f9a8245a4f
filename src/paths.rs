// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Path normalization and name sanitizing shared by both sides of the bridge.
//!
//! The two applications may spell the same file differently (`~` prefixes, relative segments,
//! backslashes, different letter case on case-insensitive volumes). Every identity comparison in
//! the crate goes through [`path_key`] so those spellings collapse to one key.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub(crate) const UNTITLED: &str = "untitled";

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs_next::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Returns an absolute, lexically cleaned version of `path`.
///
/// `.` segments are dropped and `..` pops the previous normal segment. Symlinks are not
/// resolved; the file does not need to exist.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = expand_home(path.as_ref());
    if path.as_os_str().is_empty() {
        return PathBuf::new();
    }

    let absolute = if path.is_absolute() {
        path
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path,
        }
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Comparison key for a path: normalized, `/`-separated, lowercase.
///
/// Empty input yields an empty key, which never matches anything.
pub fn path_key(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return String::new();
    }
    normalize_path(path)
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

/// True when both paths are non-empty and refer to the same normalized location.
pub fn paths_match(left: impl AsRef<Path>, right: impl AsRef<Path>) -> bool {
    let left = path_key(left);
    !left.is_empty() && left == path_key(right)
}

/// Turns a document or object name into a directory name both sides compute identically.
///
/// ASCII alphanumerics, `-` and `_` survive; everything else becomes `_`. Leading and trailing
/// underscores are trimmed. Names that Windows reserves for devices get a trailing `_` so the
/// directory can be created on every platform.
pub fn sanitize_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = safe.trim_matches('_');
    if trimmed.is_empty() {
        return UNTITLED.to_owned();
    }
    if is_windows_device_name(trimmed) {
        return format!("{trimmed}_");
    }
    trimmed.to_owned()
}

/// Sanitized file stem of a document path, used as the natural project directory name.
pub fn document_project_name(document: &Path) -> String {
    document
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(sanitize_name)
        .unwrap_or_else(|| UNTITLED.to_owned())
}

fn is_windows_device_name(base: &str) -> bool {
    let base = base.to_ascii_uppercase();
    match base.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => base
            .strip_prefix("COM")
            .or_else(|| base.strip_prefix("LPT"))
            .is_some_and(|num| matches!(num, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9")),
    }
}

/// Drops later entries whose [`path_key`] was already seen, keeping first-seen order.
pub fn dedup_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| !path.as_os_str().is_empty())
        .filter(|path| seen.insert(path_key(path)))
        .collect()
}
