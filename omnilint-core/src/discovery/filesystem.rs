//! Filesystem walk discovery.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use omnilint_config::FileDiscoveryConfig;
use tracing::warn;

use super::{resolve_against, DiscoveryStrategy};

/// Walk the configured roots, honoring gitignore files, the dotfile
/// policy, and the exclude globs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemDiscovery;

impl FilesystemDiscovery {
    pub fn new() -> Self {
        Self
    }

    fn exclude_set(config: &FileDiscoveryConfig) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.excludes {
            match Glob::new(pattern) {
                Ok(glob) => {
                    let _ = builder.add(glob);
                }
                Err(err) => warn!("ignoring exclude pattern '{pattern}': {err}"),
            }
        }
        builder.build().unwrap_or_else(|err| {
            warn!("exclude globs failed to compile as a set: {err}");
            GlobSet::empty()
        })
    }
}

impl DiscoveryStrategy for FilesystemDiscovery {
    fn discover(&self, config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf> {
        let excludes = Self::exclude_set(config);
        let mut found: BTreeSet<PathBuf> = BTreeSet::new();

        for entry_root in &config.roots {
            let walk_root = resolve_against(root, entry_root);
            if !walk_root.exists() {
                continue;
            }
            let walker = WalkBuilder::new(&walk_root)
                .hidden(!config.include_hidden)
                .git_ignore(true)
                .git_exclude(true)
                .follow_links(false)
                .build();
            for entry in walker.flatten() {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                let path = entry.path();
                let relative = path.strip_prefix(&walk_root).unwrap_or(path);
                if excludes.is_match(relative) || excludes.is_match(path) {
                    continue;
                }
                let _ = found.insert(resolve_against(root, path));
            }
        }

        for explicit in &config.explicit_files {
            let resolved = resolve_against(root, explicit);
            if resolved.is_file() {
                let _ = found.insert(resolved);
            }
        }

        found.into_iter().collect()
    }
}
