//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::options::{CompileOptions, Target};

/// Compile a markdown article and its TSX component into a blog bundle
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Suppress all output
    #[arg(short, long, global = true)]
    pub silent: bool,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: justmark.toml in the input directory)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: CompileArgs,
    },

    /// Compile, then recompile whenever the input directory changes
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: CompileArgs,
    },
}

/// Shared arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone)]
pub struct CompileArgs {
    /// Article directory containing article.md and article.tsx
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub input: PathBuf,

    /// Output directory (recreated on every compile)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,

    /// Targets to produce: blog.tsx, blog-bundle, export.md
    #[arg(short, long = "target", value_delimiter = ',')]
    pub targets: Vec<Target>,

    /// Bundler command line, e.g. "npx esbuild"
    #[arg(short, long)]
    pub bundler: Option<String>,

    /// Inline assets smaller than this many bytes
    #[arg(long)]
    pub inline_limit: Option<u64>,

    /// Record the input directory relative to --blog-root as `meta.path`
    #[arg(short = 'p', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub add_path_to_meta: Option<bool>,

    /// Root directory of all articles
    #[arg(short = 'r', long, value_hint = clap::ValueHint::DirPath)]
    pub blog_root: Option<PathBuf>,
}

impl CompileArgs {
    /// Override `options` with every flag given on the command line.
    pub fn apply(&self, options: &mut CompileOptions) {
        if !self.targets.is_empty() {
            options.targets = self.targets.clone();
        }
        if let Some(bundler) = &self.bundler {
            options.bundle.command = bundler.split_whitespace().map(str::to_string).collect();
        }
        if let Some(limit) = self.inline_limit {
            options.bundle.inline_limit = limit;
        }
        if let Some(enabled) = self.add_path_to_meta {
            options.bundle.add_path_to_meta = enabled;
        }
        if let Some(root) = &self.blog_root {
            options.bundle.blog_root_dir = Some(root.clone());
        }
    }
}

#[allow(unused)]
impl Cli {
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }

    pub fn compile_args(&self) -> &CompileArgs {
        match &self.command {
            Commands::Build { args } | Commands::Watch { args } => args,
        }
    }
}
