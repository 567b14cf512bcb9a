//! Asset access for WAV files and soundscripts.
//!
//! Assets are addressed by file name plus an optional resource group. A
//! group maps to a sub-directory for [`FsAssets`]. Without a group every
//! group is searched, root first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use roadnoise_common::{AudioError, AudioResult};
use tracing::{debug, warn};

/// A named asset together with the group it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetName {
    /// Resource group, `None` for the root.
    pub group: Option<String>,
    /// File name inside the group.
    pub name: String,
}

/// Read-only access to audio assets.
pub trait AssetLoader {
    /// Read a whole asset into memory.
    fn read(&self, name: &str, group: Option<&str>) -> AudioResult<Vec<u8>>;

    /// List every asset whose name ends with `suffix`, sorted.
    fn list(&self, suffix: &str) -> Vec<AssetName>;
}

fn not_found(name: &str) -> AudioError {
    AudioError::IoFailed {
        path: name.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "asset not found in any group"),
    }
}

/// Assets stored in a directory tree.
#[derive(Debug, Clone)]
pub struct FsAssets {
    root: PathBuf,
}

impl FsAssets {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this loader reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn groups(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut groups: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        groups.sort();
        groups
    }

    fn dir_of(&self, group: Option<&str>) -> PathBuf {
        match group {
            Some(g) => self.root.join(g),
            None => self.root.clone(),
        }
    }

    fn read_file(path: &Path, name: &str) -> AudioResult<Vec<u8>> {
        fs::read(path).map_err(|source| AudioError::IoFailed {
            path: name.to_string(),
            source,
        })
    }
}

impl AssetLoader for FsAssets {
    fn read(&self, name: &str, group: Option<&str>) -> AudioResult<Vec<u8>> {
        if let Some(group) = group {
            return Self::read_file(&self.dir_of(Some(group)).join(name), name);
        }

        let direct = self.root.join(name);
        if direct.is_file() {
            return Self::read_file(&direct, name);
        }

        for group in self.groups() {
            let candidate = self.dir_of(Some(&group)).join(name);
            if candidate.is_file() {
                debug!("Found {name} in group {group}");
                return Self::read_file(&candidate, name);
            }
        }

        Err(not_found(name))
    }

    fn list(&self, suffix: &str) -> Vec<AssetName> {
        let mut found = Vec::new();
        let mut scan = |group: Option<String>| {
            let dir = self.dir_of(group.as_deref());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Cannot list {}: {e}", dir.display());
                    return;
                },
            };
            for entry in entries.filter_map(Result::ok) {
                if !entry.path().is_file() {
                    continue;
                }
                if let Ok(name) = entry.file_name().into_string() {
                    if name.ends_with(suffix) {
                        found.push(AssetName {
                            group: group.clone(),
                            name,
                        });
                    }
                }
            }
        };

        scan(None);
        for group in self.groups() {
            scan(Some(group));
        }

        found.sort();
        found
    }
}

/// Assets held in memory, keyed by group and name.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: AHashMap<(Option<String>, String), Vec<u8>>,
}

impl MemoryAssets {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset to the root group.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert((None, name.into()), bytes.into());
    }

    /// Add an asset to a named group.
    pub fn insert_in(&mut self, group: impl Into<String>, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files
            .insert((Some(group.into()), name.into()), bytes.into());
    }

    /// Builder form of [`MemoryAssets::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl AssetLoader for MemoryAssets {
    fn read(&self, name: &str, group: Option<&str>) -> AudioResult<Vec<u8>> {
        if let Some(group) = group {
            return self
                .files
                .get(&(Some(group.to_string()), name.to_string()))
                .cloned()
                .ok_or_else(|| not_found(name));
        }

        if let Some(bytes) = self.files.get(&(None, name.to_string())) {
            return Ok(bytes.clone());
        }

        let mut grouped: Vec<_> = self
            .files
            .iter()
            .filter(|((g, n), _)| g.is_some() && n == name)
            .collect();
        grouped.sort_by(|a, b| a.0.cmp(b.0));
        grouped
            .first()
            .map(|(_, bytes)| (*bytes).clone())
            .ok_or_else(|| not_found(name))
    }

    fn list(&self, suffix: &str) -> Vec<AssetName> {
        let mut found: Vec<AssetName> = self
            .files
            .keys()
            .filter(|(_, name)| name.ends_with(suffix))
            .map(|(group, name)| AssetName {
                group: group.clone(),
                name: name.clone(),
            })
            .collect();
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_assets_groups() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("root.wav"), b"root").expect("write");
        fs::create_dir(dir.path().join("trucks")).expect("mkdir");
        fs::write(dir.path().join("trucks").join("horn.wav"), b"horn").expect("write");
        fs::write(dir.path().join("trucks").join("a.soundscript"), b"x").expect("write");

        let assets = FsAssets::new(dir.path());
        assert_eq!(assets.read("root.wav", None).expect("read"), b"root");
        assert_eq!(assets.read("horn.wav", None).expect("search"), b"horn");
        assert_eq!(assets.read("horn.wav", Some("trucks")).expect("group"), b"horn");
        assert!(assets.read("horn.wav", Some("planes")).is_err());

        let scripts = assets.list(".soundscript");
        assert_eq!(
            scripts,
            vec![AssetName {
                group: Some("trucks".into()),
                name: "a.soundscript".into()
            }]
        );
    }

    #[test]
    fn test_missing_asset_is_io_error() {
        let dir = TempDir::new().expect("temp dir");
        let err = FsAssets::new(dir.path()).read("nope.wav", None).unwrap_err();
        assert!(matches!(err, AudioError::IoFailed { .. }));
    }

    #[test]
    fn test_memory_assets() {
        let mut assets = MemoryAssets::new().with("a.wav", vec![1u8, 2]);
        assets.insert_in("zz", "b.wav", vec![3u8]);
        assets.insert_in("aa", "b.wav", vec![4u8]);

        assert_eq!(assets.read("a.wav", None).expect("root"), vec![1, 2]);
        assert_eq!(assets.read("b.wav", None).expect("first group"), vec![4]);
        assert_eq!(assets.read("b.wav", Some("zz")).expect("group"), vec![3]);
        assert_eq!(assets.list(".wav").len(), 3);
    }
}
