use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{ChangeCallback, DirEntry, FileSystem, FsWatcher};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

struct Subscriber {
    id: u64,
    root: PathBuf,
    on_change: Arc<ChangeCallback>,
}

type Subscribers = Arc<Mutex<Vec<Subscriber>>>;

/// In-memory filesystem.
///
/// Writes, removals and directory creation are reported to watchers whose
/// root contains the touched path.
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    subscribers: Subscribers,
    next_id: AtomicU64,
}

impl std::fmt::Debug for MemoryFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFs")
            .field("entries", &self.nodes.lock().len())
            .finish()
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            nodes: Mutex::new(nodes),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .lock()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn notify(&self, path: &Path) {
        let callbacks: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .filter(|s| path.starts_with(&s.root))
            .map(|s| Arc::clone(&s.on_change))
            .collect();
        for callback in callbacks {
            callback(path.to_path_buf());
        }
    }
}

fn check_absolute(path: &Path) -> io::Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path `{}` is not absolute", path.display()),
        ))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: `{}`", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn is_virtual(&self) -> bool {
        true
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.nodes.lock().get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("`{}` is a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        check_absolute(path)?;
        {
            let mut nodes = self.nodes.lock();
            let parent = path.parent().ok_or_else(|| not_found(path))?;
            if !matches!(nodes.get(parent), Some(Node::Dir)) {
                return Err(not_found(parent));
            }
            if matches!(nodes.get(path), Some(Node::Dir)) {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("`{}` is a directory", path.display()),
                ));
            }
            nodes.insert(path.to_path_buf(), Node::File(contents.to_vec()));
        }
        self.notify(path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        {
            let mut nodes = self.nodes.lock();
            match nodes.get(path) {
                Some(Node::File(_)) => {
                    nodes.remove(path);
                }
                Some(Node::Dir) => {
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("`{}` is a directory", path.display()),
                    ));
                }
                None => return Err(not_found(path)),
            }
        }
        self.notify(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        check_absolute(path)?;
        let removed = {
            let mut nodes = self.nodes.lock();
            let doomed: Vec<_> = nodes
                .keys()
                .filter(|p| p.starts_with(path))
                .cloned()
                .collect();
            for p in &doomed {
                nodes.remove(p);
            }
            nodes.insert(PathBuf::from("/"), Node::Dir);
            !doomed.is_empty()
        };
        if removed {
            self.notify(path);
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        check_absolute(path)?;
        let created = {
            let mut nodes = self.nodes.lock();
            let mut created = false;
            for ancestor in path.ancestors() {
                match nodes.get(ancestor) {
                    Some(Node::Dir) => break,
                    Some(Node::File(_)) => {
                        return Err(io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            format!("`{}` is a file", ancestor.display()),
                        ));
                    }
                    None => {
                        nodes.insert(ancestor.to_path_buf(), Node::Dir);
                        created = true;
                    }
                }
            }
            created
        };
        if created {
            self.notify(path);
        }
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.lock().get(path), Some(Node::Dir))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.nodes.lock().get(path), Some(Node::File(_)))
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        match self.nodes.lock().get(path) {
            Some(Node::File(bytes)) => Ok(bytes.len() as u64),
            Some(Node::Dir) => Ok(0),
            None => Err(not_found(path)),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let nodes = self.nodes.lock();
        if !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(not_found(path));
        }
        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, node)| DirEntry {
                path: p.clone(),
                is_dir: matches!(node, Node::Dir),
            })
            .collect())
    }

    fn watch(&self, root: &Path, on_change: ChangeCallback) -> io::Result<FsWatcher> {
        if !self.is_dir(root) {
            return Err(not_found(root));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push(Subscriber {
            id,
            root: root.to_path_buf(),
            on_change: Arc::new(on_change),
        });
        Ok(FsWatcher::new(Unsubscribe {
            id,
            subscribers: Arc::clone(&self.subscribers),
        }))
    }
}

struct Unsubscribe {
    id: u64,
    subscribers: Subscribers,
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.subscribers.lock().retain(|s| s.id != self.id);
    }
}
