//! `blog.tsx`: markdown compiled and merged into `article.tsx`.
//!
//! The merged file is always written, because the bundle step reads it
//! back. After the rest of the chain has run it is either pretty-printed
//! (when `blog.tsx` was requested) or removed again.

use anyhow::{Context, Result};

use crate::build::{BLOG_TSX, BuildContext, BuildStep, Next};
use crate::compiler::{add_path_to_meta, blog_object, format_tsx, inject_blog_object};
use crate::options::Target;

#[derive(Debug, Clone, Copy)]
pub struct ContentViewStep;

impl BuildStep for ContentViewStep {
    fn target(&self) -> Target {
        Target::BlogTsx
    }

    fn run(&self, ctx: &mut BuildContext<'_>, next: Next<'_>) -> Result<()> {
        let options = ctx.options;
        let compiled = ctx.compiled()?.clone();

        let mut meta = compiled.meta;
        if options.bundle.add_path_to_meta
            && let Some(root) = &options.bundle.blog_root_dir
        {
            add_path_to_meta(&mut meta, &options.input_dir, root)?;
        }

        let object = blog_object(&meta, &compiled.content)?;
        let code = inject_blog_object(&ctx.sources.tsx, &object)?;

        let path = ctx.output_path(BLOG_TSX);
        options
            .output_fs
            .write(&path, code.as_bytes())
            .with_context(|| format!("cannot write `{}`", path.display()))?;

        next.run(ctx)?;

        if options.wants(Target::BlogTsx) {
            match format_tsx(&code) {
                Some(formatted) => options
                    .output_fs
                    .write(&path, formatted.as_bytes())
                    .with_context(|| format!("cannot write `{}`", path.display()))?,
                None => crate::log!("error"; "failed to format {}; keeping it as merged", BLOG_TSX),
            }
        } else {
            options
                .output_fs
                .remove_file(&path)
                .with_context(|| format!("cannot remove `{}`", path.display()))?;
        }

        Ok(())
    }
}
