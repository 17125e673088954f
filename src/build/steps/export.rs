//! `export.md`: the article as plain markdown, for publishing elsewhere.
//!
//! The metadata and embed fences only make sense to this compiler, so they
//! are dropped. A title set only in metadata becomes a `# heading`.

use anyhow::{Context, Result};

use crate::build::{BuildContext, BuildStep, EXPORT_MD, Next};
use crate::compiler::markdown::{Fence, is_authoring_fence};
use crate::options::Target;

#[derive(Debug, Clone, Copy)]
pub struct ExportStep;

impl BuildStep for ExportStep {
    fn target(&self) -> Target {
        Target::ExportMd
    }

    fn run(&self, ctx: &mut BuildContext<'_>, next: Next<'_>) -> Result<()> {
        let options = ctx.options;
        let compiled = ctx.compiled()?;
        let title = (compiled.first_heading.is_none() && compiled.meta.has_title())
            .then(|| compiled.meta.title.clone());

        let exported = export_markdown(&ctx.sources.markdown, title.as_deref());
        let path = ctx.output_path(EXPORT_MD);
        options
            .output_fs
            .write(&path, exported.as_bytes())
            .with_context(|| format!("cannot write `{}`", path.display()))?;

        next.run(ctx)
    }
}

/// Strip `blog` and `tsx embed` fences, optionally prepending `# title`.
///
/// Runs of blank lines left behind by removed blocks collapse to one.
pub fn export_markdown(source: &str, title: Option<&str>) -> String {
    let mut out = String::with_capacity(source.len());
    let mut blank_run = 0;
    if let Some(title) = title {
        out.push_str("# ");
        out.push_str(title.trim());
        out.push_str("\n\n");
        blank_run = 1;
    }

    let mut open: Option<(Fence<'_>, bool)> = None;
    for line in source.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if let Some((fence, skipping)) = open {
            if fence.is_closed_by(content) {
                open = None;
            }
            if !skipping {
                out.push_str(line);
            }
            continue;
        }

        if let Some(fence) = Fence::parse(content) {
            let skipping = is_authoring_fence(fence.info);
            open = Some((fence, skipping));
            if !skipping {
                blank_run = 0;
                out.push_str(line);
            }
            continue;
        }

        if content.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authoring_fences_removed() {
        let src = "```blog\ntitle = \"T\"\n```\n\nIntro\n\n```tsx embed\n<X />\n```\n\nOutro\n";
        assert_eq!(export_markdown(src, None), "Intro\n\nOutro\n");
    }

    #[test]
    fn test_other_fences_kept() {
        let src = "Text\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(export_markdown(src, None), src);
    }

    #[test]
    fn test_title_prepended() {
        let src = "```blog\ntitle = \"Hello\"\n```\nBody\n";
        assert_eq!(export_markdown(src, Some("Hello")), "# Hello\n\nBody\n");
    }

    #[test]
    fn test_blank_runs_collapsed_outside_fences() {
        assert_eq!(export_markdown("a\n\n\n\nb\n", None), "a\n\nb\n");
        let src = "```\nx\n\n\ny\n```\n";
        assert_eq!(export_markdown(src, None), src);
    }
}
