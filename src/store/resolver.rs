// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document identity → project directory.
//!
//! Resolution order:
//! 1. in-memory cache (per agent, never shared between processes)
//! 2. link registry → the paired document's manifest, if it does not name someone else
//! 3. the natural `<root>/<sanitized name>` directory, if it exists and is ours or unowned
//! 4. any manifest under any candidate root that records this document
//! 5. the first free `<name>`, `<name>1`, `<name>2`, ... slot
//!
//! Resolving never touches the disk beyond reads. Directories are created by whoever writes
//! into them first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::io::{ensure_dir, now_secs};
use super::links::{LinkDirection, LinkRegistry};
use super::manifest::{
    find_for_document, find_for_mesh_signature, find_latest_matching, Manifest, MeshSignature, Side,
};
use super::project::ProjectFolder;
use super::root::RootLocator;
use crate::paths::{normalize_path, path_key, paths_match, sanitize_name};

pub const PLACEHOLDER_DIRNAME: &str = ".gob_temp";

const MESH_PLACEHOLDER_PREFIX: &str = "gob_unsaved_bl_";
const MESH_PLACEHOLDER_SUFFIX: &str = ".blend";
const TEXTURING_PLACEHOLDER_PREFIX: &str = "gob_unsaved_sp_";
const TEXTURING_PLACEHOLDER_SUFFIX: &str = ".spp";

fn placeholder_affixes(side: Side) -> (&'static str, &'static str) {
    match side {
        Side::MeshEditor => (MESH_PLACEHOLDER_PREFIX, MESH_PLACEHOLDER_SUFFIX),
        Side::Texturing => (TEXTURING_PLACEHOLDER_PREFIX, TEXTURING_PLACEHOLDER_SUFFIX),
    }
}

/// Stand-in path for a document that has never been saved.
///
/// Stable for the lifetime of the owning agent: the session id is minted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    dir: PathBuf,
    session: String,
}

impl Placeholder {
    pub fn new(root: &Path) -> Self {
        let session = format!("{}_{}", std::process::id(), now_secs() as u64);
        Self::with_session(root, session)
    }

    pub fn with_session(root: &Path, session: impl Into<String>) -> Self {
        Self {
            dir: root.join(PLACEHOLDER_DIRNAME),
            session: session.into(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn path(&self, side: Side) -> PathBuf {
        let (prefix, suffix) = placeholder_affixes(side);
        self.dir.join(format!("{prefix}{}{suffix}", self.session))
    }

    /// Placeholder path with an empty marker file behind it. Failure to touch is logged only.
    pub fn touch(&self, side: Side) -> PathBuf {
        let path = self.path(side);
        let touched = ensure_dir(&self.dir).and_then(|()| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map(drop)
                .map_err(|source| super::StoreError::Io {
                    path: path.clone(),
                    source,
                })
        });
        if let Err(err) = touched {
            tracing::debug!(error = %err, "placeholder marker not created");
        }
        path
    }

    /// True for any session's placeholder of `side` inside this root's placeholder folder.
    pub fn is_placeholder(&self, side: Side, path: &Path) -> bool {
        let (prefix, suffix) = placeholder_affixes(side);
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            return false;
        };
        name.starts_with(prefix)
            && name.ends_with(suffix)
            && path.parent().is_some_and(|parent| paths_match(parent, &self.dir))
    }

    /// `document` when it is a real path, this session's placeholder otherwise.
    pub fn or_placeholder(&self, side: Side, document: Option<&Path>) -> PathBuf {
        match document.filter(|doc| !doc.as_os_str().is_empty()) {
            Some(doc) => doc.to_path_buf(),
            None => self.touch(side),
        }
    }
}

/// What a project directory is resolved for.
#[derive(Debug, Clone, Copy)]
pub struct Identity<'a> {
    pub side: Side,
    pub document: &'a Path,
    /// Display name the natural directory is derived from.
    pub name: &'a str,
    /// Disambiguates several assets exported from one document.
    pub signature: Option<&'a MeshSignature>,
}

impl<'a> Identity<'a> {
    pub fn new(side: Side, document: &'a Path, name: &'a str) -> Self {
        Self {
            side,
            document,
            name,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Option<&'a MeshSignature>) -> Self {
        self.signature = signature.filter(|sig| !sig.is_empty());
        self
    }

    fn cache_key(&self) -> String {
        let key = path_key(self.document);
        match self.signature {
            Some(sig) => format!("{key}#{}", sig.digest()),
            None => key,
        }
    }

    /// The manifest records this document, and no conflicting mesh signature.
    pub fn matches(&self, manifest: &Manifest) -> bool {
        if !manifest.names_document(self.side, self.document) {
            return false;
        }
        match (self.signature, manifest.mesh_signature.as_ref()) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => true,
        }
    }

    /// The manifest records a different document for this side, or a different signature.
    fn conflicts(&self, manifest: &Manifest) -> bool {
        manifest.document(self.side).is_some() && !self.matches(manifest)
    }
}

/// Per-agent cache of resolved project directories.
#[derive(Debug, Default, Clone)]
pub struct ProjectResolver {
    cache: HashMap<String, PathBuf>,
}

impl ProjectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, identity: &Identity<'_>) -> Option<PathBuf> {
        self.cache.get(&identity.cache_key()).cloned()
    }

    pub fn remember(&mut self, identity: &Identity<'_>, project_dir: &Path) {
        let key = identity.cache_key();
        if key.is_empty() || project_dir.as_os_str().is_empty() {
            return;
        }
        self.cache.insert(key, normalize_path(project_dir));
    }

    pub fn forget(&mut self, identity: &Identity<'_>) {
        self.cache.remove(&identity.cache_key());
    }

    fn claimed_by_other(&self, dir: &Path, key: &str) -> bool {
        self.cache
            .iter()
            .any(|(owner, claimed)| owner != key && paths_match(claimed, dir))
    }

    /// Whether `dir` can hold `identity`'s records without stealing someone else's folder.
    fn available(&self, dir: &Path, identity: &Identity<'_>, key: &str) -> bool {
        match ProjectFolder::new(dir).load_manifest() {
            Some(manifest) if identity.matches(&manifest) => true,
            Some(manifest) if identity.conflicts(&manifest) => false,
            _ => !self.claimed_by_other(dir, key),
        }
    }

    pub fn resolve_for(
        &mut self,
        locator: &RootLocator,
        registry: &LinkRegistry,
        identity: &Identity<'_>,
    ) -> PathBuf {
        let root = locator.resolve_root();
        let natural = root.join(sanitize_name(identity.name));
        if identity.document.as_os_str().is_empty() {
            return natural;
        }
        if let Some(dir) = self.cached(identity) {
            return dir;
        }

        let candidates = locator.candidate_roots();
        let dir = self
            .from_registry(&candidates, registry, identity)
            .or_else(|| {
                let key = identity.cache_key();
                (natural.exists() && self.available(&natural, identity, &key))
                    .then(|| natural.clone())
            })
            .or_else(|| {
                // An exact asset match beats a newer untagged project of the same document.
                identity
                    .signature
                    .and_then(|signature| find_for_mesh_signature(&candidates, signature, None))
                    .filter(|hit| identity.matches(&hit.manifest))
                    .or_else(|| {
                        find_latest_matching(&candidates, |manifest| identity.matches(manifest))
                    })
                    .map(|hit| hit.project_dir())
            })
            .unwrap_or_else(|| self.unique_dir(&natural, identity));

        tracing::debug!(
            document = %identity.document.display(),
            project_dir = %dir.display(),
            "resolved project directory"
        );
        self.remember(identity, &dir);
        normalize_path(dir)
    }

    fn from_registry(
        &self,
        candidates: &[PathBuf],
        registry: &LinkRegistry,
        identity: &Identity<'_>,
    ) -> Option<PathBuf> {
        let paired = registry.lookup(identity.document, LinkDirection::from_side(identity.side))?;
        let hit = find_for_document(candidates, identity.side.other(), Path::new(&paired), None)?;
        if identity.conflicts(&hit.manifest) {
            return None;
        }
        Some(hit.project_dir())
    }

    /// First slot among `base`, `base1`, `base2`, ... that is free or already ours.
    ///
    /// Never returns a directory whose manifest records a different document, nor one this
    /// resolver has already handed to a different identity.
    pub fn unique_dir(&self, base: &Path, identity: &Identity<'_>) -> PathBuf {
        let key = identity.cache_key();
        let parent = base.parent().unwrap_or(base);
        let stem = base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut candidate = base.to_path_buf();
        let mut index = 1u32;
        loop {
            if self.available(&candidate, identity, &key) {
                return candidate;
            }
            candidate = parent.join(format!("{stem}{index}"));
            index += 1;
        }
    }
}
