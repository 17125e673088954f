//! `blog-bundle/`: rewrite host imports, bundle, write the manifest and
//! copy static resources.

use anyhow::{Context, Result};

use crate::build::{BLOG_TSX, BUNDLE_DIR, BuildContext, BuildStep, INFO_JSON, Next, RES_DIR};
use crate::bundler::bundle_source;
use crate::compiler::rewrite_imports;
use crate::fs::copy_dir;
use crate::options::Target;

#[derive(Debug, Clone, Copy)]
pub struct BundleStep;

impl BuildStep for BundleStep {
    fn target(&self) -> Target {
        Target::BlogBundle
    }

    fn run(&self, ctx: &mut BuildContext<'_>, next: Next<'_>) -> Result<()> {
        let options = ctx.options;
        let output_fs = options.output_fs.as_ref();

        let merged_path = ctx.output_path(BLOG_TSX);
        let merged = output_fs
            .read_to_string(&merged_path)
            .with_context(|| format!("cannot read `{}`", merged_path.display()))?;
        let transpiled = rewrite_imports(&merged)?;

        let bundle_dir = ctx.output_path(BUNDLE_DIR);
        output_fs
            .create_dir_all(&bundle_dir)
            .with_context(|| format!("cannot create `{}`", bundle_dir.display()))?;

        crate::log!("bundle"; "bundling {}", options.input_dir.display());
        bundle_source(
            options.bundler.as_ref(),
            options.input_fs.as_ref(),
            &options.input_dir,
            &transpiled.code,
            output_fs,
            &bundle_dir,
            options.bundle.inline_limit,
        )?;

        let info = serde_json::to_string(&transpiled.manifest)?;
        let info_path = bundle_dir.join(INFO_JSON);
        output_fs
            .write(&info_path, info.as_bytes())
            .with_context(|| format!("cannot write `{}`", info_path.display()))?;

        let res = options.input_dir.join(RES_DIR);
        if options.input_fs.is_dir(&res) {
            copy_dir(options.input_fs.as_ref(), &res, output_fs, &bundle_dir.join(RES_DIR))
                .with_context(|| format!("cannot copy `{}`", res.display()))?;
        }

        next.run(ctx)
    }
}
