use std::fs;
use std::io;
use std::path::Path;

use notify::{EventKind, RecursiveMode, Watcher};

use super::{ChangeCallback, DirEntry, FileSystem, FsWatcher};

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn is_virtual(&self) -> bool {
        false
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| {
                let entry = entry?;
                Ok(DirEntry {
                    path: entry.path(),
                    is_dir: entry.file_type()?.is_dir(),
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn watch(&self, root: &Path, on_change: ChangeCallback) -> io::Result<FsWatcher> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    crate::log!("watch"; "notify error: {}", e);
                    return;
                }
            };
            // Metadata-only changes (mtime/atime/chmod) may trigger endless rebuild loops
            match event.kind {
                EventKind::Create(_) | EventKind::Remove(_) => {}
                EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
                EventKind::Modify(_) => {}
                _ => return,
            }
            for path in event.paths {
                on_change(path);
            }
        })
        .map_err(io::Error::other)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(io::Error::other)?;

        Ok(FsWatcher::new(watcher))
    }
}
