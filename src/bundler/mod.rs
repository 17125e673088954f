//! Bundler adapter.
//!
//! The merged, import-rewritten source is written to a temporary entry file
//! inside the input directory, so relative imports (`./style.css`,
//! `./res/img.png`) resolve as the author wrote them. The entry is removed
//! again whether the bundler succeeds or not.
//!
//! ```text
//! <input>/.tmp.<uuid>.tsx  --Bundler-->  <output>/blog-bundle/
//!                                         ├── blog-bundle.js
//!                                         ├── blog-bundle.css
//!                                         └── res/
//! ```

mod esbuild;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::fs::FileSystem;

pub use esbuild::EsbuildBundler;

/// Script file name inside the bundle directory.
pub const BUNDLE_JS: &str = "blog-bundle.js";

/// Extensions treated as binary assets, inlined or emitted under `res/`.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "avif", "webp", "svg", "ico", "woff", "woff2", "ttf",
    "otf", "eot", "mp3", "mp4", "webm",
];

/// One bundler invocation.
pub struct BundleJob<'a> {
    pub input_fs: &'a dyn FileSystem,
    pub input_dir: &'a Path,
    /// Temporary entry file, inside `input_dir`
    pub entry: &'a Path,
    pub output_fs: &'a dyn FileSystem,
    /// Bundle directory, `<output>/blog-bundle`
    pub output_dir: &'a Path,
    /// Assets smaller than this are inlined as data URLs
    pub inline_limit: u64,
}

impl fmt::Debug for BundleJob<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleJob")
            .field("input_dir", &self.input_dir)
            .field("entry", &self.entry)
            .field("output_dir", &self.output_dir)
            .field("inline_limit", &self.inline_limit)
            .finish_non_exhaustive()
    }
}

/// Packages an entry file and its imports into `blog-bundle.js` and
/// `blog-bundle.css`, minified.
pub trait Bundler: Send + Sync + fmt::Debug {
    fn bundle(&self, job: &BundleJob<'_>) -> Result<()>;
}

/// Temporary entry file; removed on drop.
pub struct TempEntry<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
}

impl<'a> TempEntry<'a> {
    /// Write `source` to `.tmp.<uuid>.tsx` in `dir`.
    pub fn create(fs: &'a dyn FileSystem, dir: &Path, source: &str) -> Result<Self> {
        let path = dir.join(format!(".tmp.{}.tsx", uuid::Uuid::new_v4().simple()));
        fs.write(&path, source.as_bytes())
            .with_context(|| format!("failed to write temporary entry `{}`", path.display()))?;
        Ok(Self { fs, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempEntry<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.remove_file(&self.path) {
            crate::log!("bundle"; "failed to remove `{}`: {}", self.path.display(), e);
        }
    }
}

/// Bundle `source` as if it lived in `input_dir`.
pub fn bundle_source(
    bundler: &dyn Bundler,
    input_fs: &dyn FileSystem,
    input_dir: &Path,
    source: &str,
    output_fs: &dyn FileSystem,
    output_dir: &Path,
    inline_limit: u64,
) -> Result<()> {
    let entry = TempEntry::create(input_fs, input_dir, source)?;
    let job = BundleJob {
        input_fs,
        input_dir,
        entry: entry.path(),
        output_fs,
        output_dir,
        inline_limit,
    };
    bundler.bundle(&job)
}

/// Pick a loader per asset extension found below `input_dir`.
///
/// An extension is inlined (`dataurl`) only when every file with it is
/// smaller than `inline_limit`; otherwise all of them are emitted as files.
pub fn asset_loaders(
    fs: &dyn FileSystem,
    input_dir: &Path,
    inline_limit: u64,
) -> Result<Vec<(&'static str, &'static str)>> {
    let files = crate::fs::walk_files(fs, input_dir)
        .with_context(|| format!("failed to scan `{}`", input_dir.display()))?;

    let mut loaders = Vec::new();
    for ext in ASSET_EXTENSIONS {
        let mut seen = false;
        let mut all_small = true;
        for file in files.iter().filter(|f| has_extension(f, ext)) {
            seen = true;
            if fs.file_size(file)? >= inline_limit {
                all_small = false;
                break;
            }
        }
        if seen {
            loaders.push((*ext, if all_small { "dataurl" } else { "file" }));
        }
    }
    Ok(loaders)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use anyhow::bail;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Recording {
        entries: Mutex<Vec<(PathBuf, String)>>,
        fail: bool,
    }

    impl Bundler for Recording {
        fn bundle(&self, job: &BundleJob<'_>) -> Result<()> {
            let source = job.input_fs.read_to_string(job.entry)?;
            self.entries.lock().push((job.entry.to_path_buf(), source));
            if self.fail {
                bail!("bundler exploded");
            }
            Ok(())
        }
    }

    fn input() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.create_dir_all(Path::new("/in")).unwrap();
        fs
    }

    #[test]
    fn test_entry_written_then_removed() {
        let fs = input();
        let out = MemoryFs::new();
        let bundler = Recording::default();
        bundle_source(&bundler, &fs, Path::new("/in"), "code", &out, Path::new("/out"), 10)
            .unwrap();

        let entries = bundler.entries.lock();
        assert_eq!(entries.len(), 1);
        let (path, source) = &entries[0];
        assert_eq!(source, "code");
        assert!(path.starts_with("/in"));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".tmp.") && name.ends_with(".tsx"));
        assert!(fs.files().is_empty());
    }

    #[test]
    fn test_entry_removed_on_failure() {
        let fs = input();
        let out = MemoryFs::new();
        let bundler = Recording {
            fail: true,
            ..Default::default()
        };
        let err = bundle_source(&bundler, &fs, Path::new("/in"), "x", &out, Path::new("/out"), 10)
            .unwrap_err();
        assert!(err.to_string().contains("exploded"));
        assert!(fs.files().is_empty());
    }

    #[test]
    fn test_entry_names_are_unique() {
        let fs = input();
        let a = TempEntry::create(&fs, Path::new("/in"), "").unwrap();
        let b = TempEntry::create(&fs, Path::new("/in"), "").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(fs.files().len(), 2);
    }

    #[test]
    fn test_asset_loaders_by_size() {
        let fs = input();
        fs.create_dir_all(Path::new("/in/res")).unwrap();
        fs.write(Path::new("/in/res/small.png"), &[0; 10]).unwrap();
        fs.write(Path::new("/in/res/tiny.png"), &[0; 5]).unwrap();
        fs.write(Path::new("/in/res/big.jpg"), &[0; 100]).unwrap();
        fs.write(Path::new("/in/res/small.JPG"), &[0; 1]).unwrap();
        fs.write(Path::new("/in/article.md"), &[0; 500]).unwrap();

        let loaders = asset_loaders(&fs, Path::new("/in"), 50).unwrap();
        assert_eq!(loaders, vec![("png", "dataurl"), ("jpg", "file")]);
    }
}
