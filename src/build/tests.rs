use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use parking_lot::Mutex;

use super::*;
use crate::bundler::{BundleJob, Bundler};
use crate::fs::{FileSystem, MemoryFs};
use crate::options::{CompileOptions, resolve};

const ARTICLE_TSX_SRC: &str = "\
import React from '#react';
import './style.css';

declare function blog(): Blog;

registerBlog(blog());
";

const ARTICLE_MD_SRC: &str = "\
```blog
title = \"Hello\"
topics = [\"rust\"]
```

Some *text*.

```tsx embed
<Counter />
```
";

/// Writes the entry source as the bundle, plus a stylesheet.
#[derive(Debug, Default)]
struct FakeBundler {
    calls: Mutex<Vec<PathBuf>>,
}

impl Bundler for FakeBundler {
    fn bundle(&self, job: &BundleJob<'_>) -> Result<()> {
        self.calls.lock().push(job.entry.to_path_buf());
        let source = job.input_fs.read(job.entry)?;
        job.output_fs
            .write(&job.output_dir.join("blog-bundle.js"), &source)?;
        job.output_fs
            .write(&job.output_dir.join("blog-bundle.css"), b"body{}")?;
        Ok(())
    }
}

#[derive(Debug)]
struct FailingBundler;

impl Bundler for FailingBundler {
    fn bundle(&self, _job: &BundleJob<'_>) -> Result<()> {
        bail!("esbuild: syntax error")
    }
}

struct Fixture {
    input: Arc<MemoryFs>,
    output: Arc<MemoryFs>,
    bundler: Arc<FakeBundler>,
}

impl Fixture {
    fn new(markdown: &str, tsx: &str) -> Self {
        let input = Arc::new(MemoryFs::new());
        input.create_dir_all(Path::new("/blog/post/res")).unwrap();
        input
            .write(Path::new("/blog/post/article.md"), markdown.as_bytes())
            .unwrap();
        input
            .write(Path::new("/blog/post/article.tsx"), tsx.as_bytes())
            .unwrap();
        input
            .write(Path::new("/blog/post/res/cover.png"), b"png")
            .unwrap();
        Self {
            input,
            output: Arc::new(MemoryFs::new()),
            bundler: Arc::new(FakeBundler::default()),
        }
    }

    fn options(&self, targets: &[Target]) -> CompileOptions {
        let mut opts = CompileOptions::new("/blog/post", "/out", targets.iter().copied());
        opts.input_fs = Some(self.input.clone());
        opts.output_fs = Some(self.output.clone());
        opts.bundler = Some(self.bundler.clone());
        opts.silent = true;
        opts
    }

    fn build(&self, opts: CompileOptions) -> Result<()> {
        let resolved = resolve(opts)?;
        rebuild(&resolved, &mut CompilerContext::new())
    }

    fn read(&self, path: &str) -> String {
        self.output.read_to_string(Path::new(path)).unwrap()
    }
}

#[test]
fn test_resolve_targets_order() {
    let set = |ts: &[Target]| ts.iter().copied().collect::<BTreeSet<_>>();
    assert_eq!(
        resolve_targets(&set(&[Target::BlogBundle])),
        vec![Target::BlogTsx, Target::BlogBundle]
    );
    assert_eq!(resolve_targets(&set(&[Target::BlogTsx])), vec![Target::BlogTsx]);
    assert_eq!(
        resolve_targets(&set(&[Target::ExportMd, Target::BlogTsx, Target::BlogBundle])),
        vec![Target::BlogTsx, Target::BlogBundle, Target::ExportMd]
    );
    assert_eq!(resolve_targets(&set(&[Target::ExportMd])), vec![Target::ExportMd]);
}

#[test]
fn test_bundle_only_output() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    fx.build(fx.options(&[Target::BlogBundle])).unwrap();

    assert_eq!(
        fx.output.files(),
        vec![
            PathBuf::from("/out/blog-bundle/blog-bundle.css"),
            PathBuf::from("/out/blog-bundle/blog-bundle.js"),
            PathBuf::from("/out/blog-bundle/info.json"),
            PathBuf::from("/out/blog-bundle/res/cover.png"),
        ]
    );
    assert_eq!(fx.read("/out/blog-bundle/info.json"), r#"{"needModule":["react"]}"#);

    let bundled = fx.read("/out/blog-bundle/blog-bundle.js");
    assert!(bundled.starts_with("const React = giveme('react');"));
    assert!(bundled.contains("import './style.css';"));
    assert!(bundled.contains("function blog(): Blog { return { ...{"));
    assert!(bundled.contains("\"title\": \"Hello\""));
    assert!(bundled.contains("<Counter />"));
    assert!(!bundled.contains("tsxembed"));
}

#[test]
fn test_temporary_entry_removed() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    fx.build(fx.options(&[Target::BlogBundle])).unwrap();

    let calls = fx.bundler.calls.lock();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("/blog/post"));
    assert!(!fx.input.is_file(&calls[0]));
}

#[test]
fn test_blog_tsx_kept_and_formatted_when_requested() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    fx.build(fx.options(&[Target::BlogTsx])).unwrap();

    assert_eq!(fx.output.files(), vec![PathBuf::from("/out/blog.tsx")]);
    let tsx = fx.read("/out/blog.tsx");
    assert!(tsx.contains("function blog(): Blog"));
    assert!(!tsx.contains("declare function blog"));
    assert!(fx.bundler.calls.lock().is_empty());
}

#[test]
fn test_rebuild_is_idempotent() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    let targets = [Target::BlogBundle, Target::BlogTsx];

    fx.build(fx.options(&targets)).unwrap();
    let first_files = fx.output.files();
    let first_info = fx.read("/out/blog-bundle/info.json");

    fx.build(fx.options(&targets)).unwrap();
    assert_eq!(fx.output.files(), first_files);
    assert_eq!(fx.read("/out/blog-bundle/info.json"), first_info);
}

#[test]
fn test_output_dir_recreated() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    fx.output.create_dir_all(Path::new("/out/stale")).unwrap();
    fx.output.write(Path::new("/out/stale/old.js"), b"").unwrap();

    fx.build(fx.options(&[Target::BlogTsx])).unwrap();
    assert!(!fx.output.is_dir(Path::new("/out/stale")));
}

#[test]
fn test_callback_invoked_once_on_success() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let mut opts = fx.options(&[Target::BlogBundle]);
    opts.on_build_complete = Some(Arc::new(move || -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    fx.build(opts).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_not_invoked_on_failure() {
    let fx = Fixture::new(ARTICLE_MD_SRC, "export default 1;\n");
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let mut opts = fx.options(&[Target::BlogBundle]);
    opts.on_build_complete = Some(Arc::new(move || -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    let err = fx.build(opts).unwrap_err();
    assert!(err.to_string().contains("declare function blog(): Blog;"));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_bundler_failure_propagates() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    let mut opts = fx.options(&[Target::BlogBundle]);
    opts.bundler = Some(Arc::new(FailingBundler));

    let err = fx.build(opts).unwrap_err();
    assert!(format!("{err:#}").contains("syntax error"));
    // no temporary entry left behind
    assert_eq!(
        fx.input
            .files()
            .iter()
            .filter(|p| p.to_string_lossy().contains(".tmp."))
            .count(),
        0
    );
}

#[test]
fn test_rejected_import_aborts() {
    let tsx = "import React from 'react';\ndeclare function blog(): Blog;\n";
    let fx = Fixture::new(ARTICLE_MD_SRC, tsx);
    let err = fx.build(fx.options(&[Target::BlogBundle])).unwrap_err();
    assert!(err.to_string().contains("non-relative import"));
    assert!(fx.bundler.calls.lock().is_empty());
}

#[test]
fn test_missing_source_is_error() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    fx.input.remove_file(Path::new("/blog/post/article.md")).unwrap();
    let err = fx.build(fx.options(&[Target::BlogTsx])).unwrap_err();
    assert!(err.to_string().contains("article.md"));
}

#[test]
fn test_export_markdown_target() {
    let md = "```blog\ntitle = \"Hello\"\n```\n\nBody\n\n```tsx embed\n<X />\n```\n";
    let fx = Fixture::new(md, ARTICLE_TSX_SRC);
    fx.build(fx.options(&[Target::ExportMd])).unwrap();

    assert_eq!(fx.output.files(), vec![PathBuf::from("/out/export.md")]);
    assert_eq!(fx.read("/out/export.md"), "# Hello\n\nBody\n\n");
}

#[test]
fn test_add_path_to_meta() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    let mut opts = fx.options(&[Target::BlogBundle]);
    opts.bundle.add_path_to_meta = true;
    opts.bundle.blog_root_dir = Some(PathBuf::from("/blog"));

    fx.build(opts).unwrap();
    let bundled = fx.read("/out/blog-bundle/blog-bundle.js");
    assert!(bundled.contains("\"path\": \"post\""));
}

#[test]
fn test_add_path_to_meta_outside_root() {
    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    let mut opts = fx.options(&[Target::BlogTsx]);
    opts.bundle.add_path_to_meta = true;
    opts.bundle.blog_root_dir = Some(PathBuf::from("/elsewhere"));

    let err = fx.build(opts).unwrap_err();
    assert!(err.to_string().contains("not inside blog root"));
}

/// A step that never continues the chain.
struct Stop;

impl BuildStep for Stop {
    fn target(&self) -> Target {
        Target::BlogTsx
    }

    fn run(&self, _ctx: &mut BuildContext<'_>, _next: Next<'_>) -> Result<()> {
        Ok(())
    }
}

/// Records that it ran, then continues.
struct Mark(&'static AtomicUsize);

impl BuildStep for Mark {
    fn target(&self) -> Target {
        Target::ExportMd
    }

    fn run(&self, ctx: &mut BuildContext<'_>, next: Next<'_>) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        next.run(ctx)
    }
}

#[test]
fn test_step_not_calling_next_truncates_chain() {
    static RAN: AtomicUsize = AtomicUsize::new(0);
    static STOP: Stop = Stop;
    static MARK: Mark = Mark(&RAN);

    let fx = Fixture::new(ARTICLE_MD_SRC, ARTICLE_TSX_SRC);
    let resolved = resolve(fx.options(&[Target::BlogTsx])).unwrap();
    let sources = Sources {
        markdown: String::new(),
        tsx: String::new(),
    };
    let mut compiler = CompilerContext::new();
    let mut ctx = BuildContext::new(&resolved, &sources, &mut compiler);

    let chain: [&'static dyn BuildStep; 3] = [&MARK, &STOP, &MARK];
    Next::new(&chain).run(&mut ctx).unwrap();
    assert_eq!(RAN.load(Ordering::SeqCst), 1);
}
