//! Build steps, one per target.

mod bundle;
mod content_view;
mod export;

use super::BuildStep;
use crate::options::Target;

pub use bundle::BundleStep;
pub use content_view::ContentViewStep;
pub use export::ExportStep;

static CONTENT_VIEW: ContentViewStep = ContentViewStep;
static BUNDLE: BundleStep = BundleStep;
static EXPORT: ExportStep = ExportStep;

/// The step producing `target`.
pub fn step_for(target: Target) -> &'static dyn BuildStep {
    match target {
        Target::BlogTsx => &CONTENT_VIEW,
        Target::BlogBundle => &BUNDLE,
        Target::ExportMd => &EXPORT,
    }
}
