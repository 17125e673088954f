//! esbuild as an external process.
//!
//! esbuild only sees the real disk, so a virtual input tree is mirrored into
//! a staging directory first, and output always lands in a staging directory
//! before being copied to the output filesystem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use super::{BUNDLE_JS, BundleJob, Bundler, asset_loaders};
use crate::fs::{RealFs, copy_dir};
use crate::utils::exec::Cmd;

/// Runs `esbuild` (or a configured wrapper like `npx esbuild`).
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    command: Vec<String>,
}

impl EsbuildBundler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Command line for one build, without the program prefix.
    fn build_args(
        entry: &Path,
        outfile: &Path,
        loaders: &[(&str, &str)],
    ) -> Vec<String> {
        let mut args = vec![
            entry.display().to_string(),
            "--bundle".to_string(),
            "--minify".to_string(),
            "--format=iife".to_string(),
            "--target=es2018".to_string(),
            "--charset=utf8".to_string(),
            "--jsx=transform".to_string(),
            "--define:process.env.NODE_ENV=\"production\"".to_string(),
            "--log-level=warning".to_string(),
            format!("--outfile={}", outfile.display()),
            "--asset-names=res/[name].[hash]".to_string(),
            "--public-path=./".to_string(),
        ];
        args.extend(
            loaders
                .iter()
                .map(|(ext, loader)| format!("--loader:.{ext}={loader}")),
        );
        args
    }
}

impl Bundler for EsbuildBundler {
    fn bundle(&self, job: &BundleJob<'_>) -> Result<()> {
        let Some(program) = self.command.first() else {
            bail!("bundle command is empty");
        };
        if which::which(program).is_err() {
            bail!("`{program}` not found in PATH; install esbuild or set `bundle.command`");
        }

        let loaders = asset_loaders(job.input_fs, job.input_dir, job.inline_limit)?;

        let input_stage = if job.input_fs.is_virtual() {
            Some(stage_input(job)?)
        } else {
            None
        };
        let entry_name = job.entry.file_name().unwrap_or(job.entry.as_os_str());
        let (input_root, entry): (PathBuf, PathBuf) = match &input_stage {
            Some(stage) => (stage.path().to_path_buf(), stage.path().join(entry_name)),
            None => (job.input_dir.to_path_buf(), job.entry.to_path_buf()),
        };

        let output_stage = TempDir::new().context("failed to create output staging directory")?;
        let outfile = output_stage.path().join(BUNDLE_JS);

        let output = Cmd::from_slice(&self.command)
            .args(Self::build_args(&entry, &outfile, &loaders))
            .cwd(&input_root)
            .run()
            .context("bundler failed")?;

        let warnings = String::from_utf8_lossy(&output.stderr);
        if !warnings.trim().is_empty() {
            crate::log!("bundle"; "{}", warnings.trim());
        }

        copy_dir(&RealFs, output_stage.path(), job.output_fs, job.output_dir).with_context(
            || format!("failed to write bundle to `{}`", job.output_dir.display()),
        )?;
        Ok(())
    }
}

/// Mirror a virtual input directory, entry included, onto the real disk.
fn stage_input(job: &BundleJob<'_>) -> Result<TempDir> {
    let stage = TempDir::new().context("failed to create input staging directory")?;
    copy_dir(job.input_fs, job.input_dir, &RealFs, stage.path())
        .context("failed to mirror input directory")?;
    let entry_name = job.entry.file_name().unwrap_or(job.entry.as_os_str());
    std::fs::write(stage.path().join(entry_name), job.input_fs.read(job.entry)?)
        .context("failed to stage bundle entry")?;
    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, MemoryFs};

    #[test]
    fn test_build_args() {
        let args = EsbuildBundler::build_args(
            Path::new("/in/.tmp.x.tsx"),
            Path::new("/stage/blog-bundle.js"),
            &[("png", "dataurl"), ("jpg", "file")],
        );
        assert_eq!(args[0], "/in/.tmp.x.tsx");
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--minify".to_string()));
        assert!(args.contains(&"--outfile=/stage/blog-bundle.js".to_string()));
        assert!(args.contains(&"--loader:.png=dataurl".to_string()));
        assert!(args.contains(&"--loader:.jpg=file".to_string()));
    }

    #[test]
    fn test_missing_program_is_error() {
        let fs = MemoryFs::new();
        fs.create_dir_all(Path::new("/in")).unwrap();
        let bundler = EsbuildBundler::new(vec!["justmark-no-such-bundler".into()]);
        let job = BundleJob {
            input_fs: &fs,
            input_dir: Path::new("/in"),
            entry: Path::new("/in/.tmp.x.tsx"),
            output_fs: &fs,
            output_dir: Path::new("/out/blog-bundle"),
            inline_limit: 10,
        };
        let err = bundler.bundle(&job).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    /// A stand-in "bundler" shell script that copies the entry to the outfile.
    #[cfg(unix)]
    #[test]
    fn test_virtual_input_staged_and_output_copied() {
        let script_dir = TempDir::new().unwrap();
        let script = script_dir.path().join("fake-esbuild.sh");
        std::fs::write(
            &script,
            "entry=\"$1\"\nfor a in \"$@\"; do case \"$a\" in --outfile=*) out=\"${a#--outfile=}\";; esac; done\ncp \"$entry\" \"$out\"\n",
        )
        .unwrap();

        let fs = MemoryFs::new();
        fs.create_dir_all(Path::new("/in")).unwrap();
        fs.write(Path::new("/in/.tmp.x.tsx"), b"bundle me").unwrap();
        fs.create_dir_all(Path::new("/out/blog-bundle")).unwrap();

        let bundler = EsbuildBundler::new(vec!["sh".into(), script.display().to_string()]);
        let job = BundleJob {
            input_fs: &fs,
            input_dir: Path::new("/in"),
            entry: Path::new("/in/.tmp.x.tsx"),
            output_fs: &fs,
            output_dir: Path::new("/out/blog-bundle"),
            inline_limit: 10,
        };
        bundler.bundle(&job).unwrap();
        assert_eq!(
            fs.read_to_string(Path::new("/out/blog-bundle/blog-bundle.js")).unwrap(),
            "bundle me"
        );
    }
}
