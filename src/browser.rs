//! Directory listing used to pick a module.

use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::error::{Error, Result};

/// Name of the entry leading to the parent directory.
pub const PARENT_ENTRY: &str = "/";
const MOD_PREFIX: &str = "MOD.";
const MOD_SUFFIX: &str = ".MOD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn is_parent(&self) -> bool {
        self.name == PARENT_ENTRY
    }

    /// Modules are recognized by name only: "MOD.name" or "name.MOD", in any case.
    pub fn is_module(&self) -> bool {
        if self.is_dir {
            return false;
        }
        let name = self.name.to_uppercase();
        name.len() > MOD_PREFIX.len()
            && (name.starts_with(MOD_PREFIX) || name.ends_with(MOD_SUFFIX))
    }
}

/// Parent entry first, then directories, then files, each sorted by name ignoring case.
fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.is_parent()
        .cmp(&a.is_parent())
        .then(b.is_dir.cmp(&a.is_dir))
        .then_with(|| a.name.to_uppercase().cmp(&b.name.to_uppercase()))
}

#[derive(Debug)]
pub struct DirList {
    path: PathBuf,
    entries: Vec<DirEntry>,
}

impl DirList {
    /// Lists the directories and modules in `path`.
    pub fn read(path: &Path) -> Result<DirList> {
        let invalid = |source| Error::InvalidPath {
            path: path.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        if path.parent().is_some() {
            entries.push(DirEntry {
                name: PARENT_ENTRY.to_string(),
                is_dir: true,
            });
        }

        for entry in fs::read_dir(path).map_err(invalid)? {
            let entry = entry.map_err(invalid)?;
            let dir_entry = DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().map_err(invalid)?.is_dir(),
            };
            if dir_entry.is_dir || dir_entry.is_module() {
                entries.push(dir_entry);
            } else {
                debug!("skipping {}", dir_entry.name);
            }
        }
        entries.sort_by(compare_entries);

        Ok(DirList {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Lists `path`, or the root directory if `path` cannot be listed.
    pub fn read_or_root(path: &Path) -> DirList {
        DirList::read(path).unwrap_or_else(|e| {
            warn!("{}, listing the root directory instead", e);
            let root = Path::new("/");
            DirList::read(root).unwrap_or_else(|_| DirList {
                path: root.to_path_buf(),
                entries: Vec::new(),
            })
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Path reached by selecting `entry`.
    pub fn open(&self, entry: &DirEntry) -> PathBuf {
        if entry.is_parent() {
            self.path.parent().unwrap_or(&self.path).to_path_buf()
        } else {
            self.path.join(&entry.name)
        }
    }
}
