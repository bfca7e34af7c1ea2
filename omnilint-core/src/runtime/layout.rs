//! Deterministic on-disk layout for vendored tool installs.

use std::path::{Path, PathBuf};

/// Marker whose presence switches preparation into project mode.
pub const PROJECT_MARKER_FILENAME: &str = "project-installed.json";

/// Cache directories for one ecosystem.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub cache_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub work_dir: Option<PathBuf>,
}

impl RuntimePaths {
    fn directories(&self) -> Vec<PathBuf> {
        let mut entries = vec![
            self.cache_dir.clone(),
            self.bin_dir.clone(),
            self.meta_dir.clone(),
        ];
        if let Some(work) = &self.work_dir {
            entries.push(work.clone());
        }
        entries
    }
}

/// Layout rooted at the configured cache directory:
///
/// ```text
/// <cache>/tools/
///   uv/                    Python tools via uv
///   node/  npm/            Node installs + shared npm cache
///   go/{bin,meta,work}/
///   lua/{bin,meta,lua}/
///   rust/{bin,meta,work}/
///   perl/{bin,meta}/
///   project-installed.json
/// ```
#[derive(Debug, Clone)]
pub struct ToolCacheLayout {
    cache_dir: PathBuf,
}

impl ToolCacheLayout {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn tools_root(&self) -> PathBuf {
        self.cache_dir.join("tools")
    }

    pub fn uv_dir(&self) -> PathBuf {
        self.tools_root().join("uv")
    }

    pub fn node_cache_dir(&self) -> PathBuf {
        self.tools_root().join("node")
    }

    pub fn npm_cache_dir(&self) -> PathBuf {
        self.tools_root().join("npm")
    }

    pub fn go(&self) -> RuntimePaths {
        let base = self.tools_root().join("go");
        RuntimePaths {
            bin_dir: base.join("bin"),
            meta_dir: base.join("meta"),
            work_dir: Some(base.join("work")),
            cache_dir: base,
        }
    }

    pub fn lua(&self) -> RuntimePaths {
        let base = self.tools_root().join("lua");
        RuntimePaths {
            bin_dir: base.join("bin"),
            meta_dir: base.join("meta"),
            work_dir: Some(base.join("lua")),
            cache_dir: base,
        }
    }

    pub fn rust(&self) -> RuntimePaths {
        let base = self.tools_root().join("rust");
        RuntimePaths {
            bin_dir: base.join("bin"),
            meta_dir: base.join("meta"),
            work_dir: Some(base.join("work")),
            cache_dir: base,
        }
    }

    pub fn perl(&self) -> RuntimePaths {
        let base = self.tools_root().join("perl");
        RuntimePaths {
            bin_dir: base.join("bin"),
            meta_dir: base.join("meta"),
            work_dir: None,
            cache_dir: base,
        }
    }

    pub fn project_marker(&self) -> PathBuf {
        self.tools_root().join(PROJECT_MARKER_FILENAME)
    }

    /// Older releases wrote the marker at the cache root; both spellings
    /// keep working.
    pub fn legacy_project_marker(&self) -> PathBuf {
        self.cache_dir.join(PROJECT_MARKER_FILENAME)
    }

    pub fn project_mode(&self) -> bool {
        self.project_marker().is_file() || self.legacy_project_marker().is_file()
    }

    /// Every directory the runtimes rely on, deduplicated in a stable
    /// order.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.tools_root(),
            self.uv_dir(),
            self.node_cache_dir(),
            self.npm_cache_dir(),
        ];
        for runtime in [self.go(), self.lua(), self.rust(), self.perl()] {
            paths.extend(runtime.directories());
        }
        let mut seen = std::collections::HashSet::new();
        paths.retain(|path| seen.insert(path.clone()));
        paths
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for path in self.directories() {
            std::fs::create_dir_all(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_deterministic() {
        let layout = ToolCacheLayout::new("/cache");
        assert_eq!(layout.tools_root(), PathBuf::from("/cache/tools"));
        assert_eq!(layout.uv_dir(), PathBuf::from("/cache/tools/uv"));
        assert_eq!(layout.go().bin_dir, PathBuf::from("/cache/tools/go/bin"));
        assert_eq!(
            layout.lua().work_dir.as_deref(),
            Some(Path::new("/cache/tools/lua/lua"))
        );
        assert_eq!(
            layout.project_marker(),
            PathBuf::from("/cache/tools/project-installed.json")
        );
        assert_eq!(
            layout.legacy_project_marker(),
            PathBuf::from("/cache/project-installed.json")
        );
    }

    #[test]
    fn ensure_directories_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ToolCacheLayout::new(dir.path());
        layout.ensure_directories().expect("first");
        layout.ensure_directories().expect("second");
        assert!(layout.go().bin_dir.is_dir());
        assert!(layout.perl().meta_dir.is_dir());
    }

    #[test]
    fn either_marker_location_enables_project_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ToolCacheLayout::new(dir.path());
        layout.ensure_directories().expect("dirs");
        assert!(!layout.project_mode());

        std::fs::write(layout.legacy_project_marker(), "{}").expect("write");
        assert!(layout.project_mode());

        std::fs::remove_file(layout.legacy_project_marker()).expect("remove");
        std::fs::write(layout.project_marker(), "{}").expect("write");
        assert!(layout.project_mode());
    }
}
