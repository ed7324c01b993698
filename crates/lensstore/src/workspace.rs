// On-disk workspace: cloned repositories and project file trees

use crate::error::{Result, StoreError};
use lenscore::{detect_language, ProjectFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Result of scanning a directory tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryScan {
    /// Files in walk order, paths relative to the scanned root
    pub files: Vec<ProjectFile>,
    /// Sum of file sizes in bytes
    pub size_bytes: u64,
    /// Sorted set of detected languages
    pub languages: Vec<String>,
}

impl DirectoryScan {
    /// Number of files found.
    pub fn file_count(&self) -> u64 {
        self.files.len() as u64
    }

    /// Total size in whole KiB.
    pub fn size_kb(&self) -> u64 {
        self.size_bytes / 1024
    }
}

/// Roots for cloned repositories and project files
#[derive(Debug, Clone)]
pub struct Workspace {
    clone_root: PathBuf,
    files_root: PathBuf,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

impl Workspace {
    /// Create a workspace over the two roots. Nothing is created on disk.
    pub fn new(clone_root: impl Into<PathBuf>, files_root: impl Into<PathBuf>) -> Self {
        Self {
            clone_root: clone_root.into(),
            files_root: files_root.into(),
        }
    }

    /// Create both roots if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.clone_root)?;
        fs::create_dir_all(&self.files_root)?;
        Ok(())
    }

    /// Directory holding the clone of a repository
    pub fn clone_dir(&self, repository_id: &str) -> PathBuf {
        self.clone_root.join(repository_id)
    }

    /// Directory holding the files of a project
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.files_root.join(project_id)
    }

    /// Walk `dir` and collect every regular file outside hidden entries.
    pub fn scan_directory(dir: &Path) -> Result<DirectoryScan> {
        let mut scan = DirectoryScan::default();
        let mut languages = BTreeSet::new();

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = relative_slash_path(dir, entry.path()) else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let language = detect_language(entry.path()).map(str::to_string);
            if let Some(lang) = &language {
                languages.insert(lang.clone());
            }
            scan.size_bytes += size_bytes;
            scan.files.push(ProjectFile {
                path,
                size_bytes,
                language,
            });
        }

        scan.languages = languages.into_iter().collect();
        debug!(
            "Scanned {}: {} files, {} languages",
            dir.display(),
            scan.files.len(),
            scan.languages.len()
        );
        Ok(scan)
    }

    /// Copy every non-hidden file of `src` into `dst`. Returns the number of files copied.
    pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
        fs::create_dir_all(dst)?;
        let mut copied = 0;
        let walker = WalkDir::new(src)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                StoreError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "directory loop")
                }))
            })?;
            let Ok(rel) = entry.path().strip_prefix(src) else {
                continue;
            };
            let target = dst.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Join a client-supplied relative path onto `root`, rejecting escapes.
    pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let mut out = root.to_path_buf();
        let mut depth = 0usize;
        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    out.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StoreError::PathEscape(rel.to_path_buf()));
                }
            }
        }
        if depth == 0 {
            return Err(StoreError::PathEscape(rel.to_path_buf()));
        }
        Ok(out)
    }

    /// Read a project file as text, decoding Latin-1 when it is not UTF-8.
    pub fn read_file(&self, project_id: &str, relative: &str) -> Result<String> {
        let path = Self::resolve(&self.project_dir(project_id), relative)?;
        if !path.is_file() {
            return Err(StoreError::not_found("File", relative));
        }
        let bytes = fs::read(&path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        })
    }

    /// Write an uploaded file under the project directory.
    pub fn write_file(&self, project_id: &str, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = Self::resolve(&self.project_dir(project_id), relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Remove a project directory. Missing directories are fine.
    pub fn remove_project_dir(&self, project_id: &str) -> Result<()> {
        remove_dir_if_exists(&self.project_dir(project_id))
    }

    /// Remove a clone directory. Missing directories are fine.
    pub fn remove_clone_dir(&self, repository_id: &str) -> Result<()> {
        remove_dir_if_exists(&self.clone_dir(repository_id))
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    fn sample_tree() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/main.py", "print('hi')\n");
        write(dir.path(), "src/util.rs", "fn util() {}\n");
        write(dir.path(), "README", "docs\n");
        write(dir.path(), ".env", "SECRET=1\n");
        write(dir.path(), ".git/config", "[core]\n");
        write(dir.path(), ".github/workflows/ci.yml", "on: push\n");
        dir
    }

    #[test]
    fn scan_skips_hidden_entries() {
        let dir = sample_tree();
        let scan = Workspace::scan_directory(dir.path()).expect("scan");

        let paths: Vec<&str> = scan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README", "src/main.py", "src/util.rs"]);
        assert_eq!(scan.languages, vec!["Python", "Rust"]);
        assert_eq!(scan.file_count(), 3);
        assert_eq!(scan.size_bytes, 12 + 13 + 5);
        assert_eq!(scan.size_kb(), 0);
    }

    #[test]
    fn copy_tree_leaves_hidden_files_behind() {
        let src = sample_tree();
        let dst = TempDir::new().expect("tempdir");
        let copied = Workspace::copy_tree(src.path(), &dst.path().join("out")).expect("copy");
        assert_eq!(copied, 3);
        assert!(dst.path().join("out/src/main.py").is_file());
        assert!(!dst.path().join("out/.git").exists());
        assert!(!dst.path().join("out/.env").exists());
    }

    #[test]
    fn resolve_rejects_escapes() {
        let root = Path::new("/data/files/p1");
        assert_eq!(
            Workspace::resolve(root, "src/./a.py").expect("inside"),
            root.join("src/a.py")
        );
        assert!(Workspace::resolve(root, "../p2/secret").is_err());
        assert!(Workspace::resolve(root, "src/../../x").is_err());
        assert!(Workspace::resolve(root, "/etc/passwd").is_err());
        assert!(Workspace::resolve(root, "").is_err());
    }

    #[test]
    fn write_then_read_with_latin1_fallback() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::new(dir.path().join("repos"), dir.path().join("files"));
        ws.ensure_dirs().expect("dirs");

        ws.write_file("p1", "notes/a.txt", "héllo".as_bytes())
            .expect("write utf8");
        assert_eq!(ws.read_file("p1", "notes/a.txt").expect("read"), "héllo");

        ws.write_file("p1", "b.txt", &[0x63, 0x61, 0x66, 0xe9])
            .expect("write latin1");
        assert_eq!(ws.read_file("p1", "b.txt").expect("read"), "café");

        assert!(ws.read_file("p1", "missing.txt").expect_err("missing").is_not_found());
        assert!(ws.write_file("p1", "../escape.txt", b"x").is_err());

        ws.remove_project_dir("p1").expect("remove");
        ws.remove_project_dir("p1").expect("remove twice");
        assert!(!ws.project_dir("p1").exists());
    }
}
