//! Filesystem capability.
//!
//! Every compile reads and writes through a [`FileSystem`] handle, so the
//! same pipeline runs against the disk ([`RealFs`]) or an in-memory tree
//! ([`MemoryFs`]). The handle is picked once when options are resolved.
//!
//! ```text
//! FileSystem
//! ├── RealFs    std::fs + notify
//! └── MemoryFs  BTreeMap tree, watch via write notifications
//! ```

mod memory;
mod real;

use std::any::Any;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub use memory::MemoryFs;
pub use real::RealFs;

/// Callback receiving the absolute path of every changed entry.
pub type ChangeCallback = Box<dyn Fn(PathBuf) + Send + Sync>;

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Keeps a change listener alive. Dropping it closes the listener.
pub struct FsWatcher {
    _inner: Box<dyn Any + Send>,
}

impl FsWatcher {
    pub fn new<T: Any + Send>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl fmt::Debug for FsWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsWatcher").finish_non_exhaustive()
    }
}

/// Read, write, remove, make-directory and watch.
///
/// Paths are absolute. `write` requires the parent directory to exist.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Whether this filesystem is invisible to external processes.
    fn is_virtual(&self) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory tree. A missing directory is not an error.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn file_size(&self, path: &Path) -> io::Result<u64>;

    /// List direct children, sorted by path.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Report changes anywhere below `root` until the returned guard drops.
    fn watch(&self, root: &Path, on_change: ChangeCallback) -> io::Result<FsWatcher>;
}

/// Recursively copy `src` on `src_fs` to `dst` on `dst_fs`.
///
/// Dot-prefixed entries are skipped.
pub fn copy_dir(
    src_fs: &dyn FileSystem,
    src: &Path,
    dst_fs: &dyn FileSystem,
    dst: &Path,
) -> io::Result<()> {
    dst_fs.create_dir_all(dst)?;
    for entry in src_fs.read_dir(src)? {
        let Some(name) = entry.path.file_name() else {
            continue;
        };
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let target = dst.join(name);
        if entry.is_dir {
            copy_dir(src_fs, &entry.path, dst_fs, &target)?;
        } else {
            let bytes = src_fs.read(&entry.path)?;
            dst_fs.write(&target, &bytes)?;
        }
    }
    Ok(())
}

/// Collect every file below `root`, skipping dot-prefixed entries.
pub fn walk_files(fs: &dyn FileSystem, root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs.read_dir(&dir)? {
            let hidden = entry
                .path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if hidden {
                continue;
            }
            if entry.is_dir {
                stack.push(entry.path);
            } else {
                files.push(entry.path);
            }
        }
    }
    files.sort();
    Ok(files)
}
