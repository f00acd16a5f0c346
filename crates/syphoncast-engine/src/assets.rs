//! Asset directory discovery and file helpers.
//!
//! Config files and images referenced by `server.json` live under one `assets/` directory.
//! Paths inside config files are relative to it.

use std::path::{Path, PathBuf};

use crate::error::EngineError;

pub const ASSETS_ENV: &str = "SYPHONCAST_ASSETS";

/// Short OS name used for per-platform config overrides (`server.<os>.json`).
pub fn platform_tag() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "other"
    }
}

/// The root of the runtime assets.
#[derive(Debug, Clone)]
pub struct AssetsRoot {
    path: PathBuf,
}

impl AssetsRoot {
    /// `$SYPHONCAST_ASSETS` when it names a directory, otherwise the nearest `assets/` directory
    /// at or above `start_dir`.
    pub fn discover(start_dir: &Path) -> Result<Self, EngineError> {
        if let Some(p) = std::env::var_os(ASSETS_ENV).map(PathBuf::from) {
            if p.is_dir() {
                return Ok(Self { path: p });
            }
        }

        start_dir
            .ancestors()
            .map(|dir| dir.join("assets"))
            .find(|cand| cand.is_dir())
            .map(|path| Self { path })
            .ok_or_else(|| EngineError::AssetsNotFound {
                start_dir: start_dir.to_path_buf(),
            })
    }

    /// Use `path` directly, without searching.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.path.join(rel)
    }

    /// Resolve a path from a config file. Absolute paths are kept as they are.
    pub fn resolve(&self, s: &str) -> PathBuf {
        let p = Path::new(s);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.path.join(p)
        }
    }

    /// `<stem>.<os>.json` if it exists, otherwise `<stem>.json`.
    pub fn pick_platform_json(&self, stem: &str) -> PathBuf {
        let platform = self.path.join(format!("{stem}.{}.json", platform_tag()));
        if platform.exists() {
            platform
        } else {
            self.path.join(format!("{stem}.json"))
        }
    }
}

pub fn read_to_string_result(path: &Path) -> Result<String, EngineError> {
    std::fs::read_to_string(path).map_err(|e| EngineError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_json_result<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let s = read_to_string_result(path)?;
    serde_json::from_str(&s).map_err(|e| EngineError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("syphoncast-assets-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn discover_walks_up_to_assets() {
        let root = temp_dir("walk");
        std::fs::create_dir_all(root.join("assets")).unwrap();
        let deep = root.join("a").join("b");
        std::fs::create_dir_all(&deep).unwrap();

        if std::env::var_os(ASSETS_ENV).is_none() {
            let found = AssetsRoot::discover(&deep).unwrap();
            assert_eq!(found.path(), root.join("assets"));
        }
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn platform_override_wins() {
        let root = temp_dir("platform");
        let assets = AssetsRoot::at(&root);
        assert_eq!(assets.pick_platform_json("server"), root.join("server.json"));

        let over = root.join(format!("server.{}.json", platform_tag()));
        std::fs::write(&over, "{}").unwrap();
        assert_eq!(assets.pick_platform_json("server"), over);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let assets = AssetsRoot::at("/srv/assets");
        assert_eq!(assets.resolve("images/a.png"), PathBuf::from("/srv/assets/images/a.png"));
        if cfg!(unix) {
            assert_eq!(assets.resolve("/tmp/b.png"), PathBuf::from("/tmp/b.png"));
        }
    }

    #[test]
    fn json_errors_carry_the_path() {
        let root = temp_dir("json");
        let p = root.join("bad.json");
        std::fs::write(&p, "{ nope").unwrap();
        let err = load_json_result::<serde_json::Value>(&p).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
        let _ = std::fs::remove_dir_all(&root);
    }
}
