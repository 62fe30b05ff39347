// src/cli.rs

use crate::cache_mode::CacheMode;
use crate::compile::Compiler;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Builds LaTeX documents straight from a git repository through a remote
/// compile worker, and tracks per-file content hashes of their dependencies.
///
/// The worker is configured through PAPERSYNC_WORKER_URL. Provider
/// credentials are read from GITHUB_TOKEN, GITLAB_TOKEN, OVERLEAF_USERNAME and
/// OVERLEAF_PASSWORD.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub worker: WorkerArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Base URL of the compile worker.
    #[arg(long, global = true, env = "PAPERSYNC_WORKER_URL", value_name = "URL")]
    pub worker_url: Option<String>,

    /// Base URL of the site that receives progress callbacks.
    #[arg(long, global = true, env = "PAPERSYNC_SITE_URL", value_name = "URL")]
    pub site_url: Option<String>,

    /// Self-hosted GitLab origin and token, as `URL=TOKEN` (repeatable).
    #[arg(long = "gitlab-instance", global = true, value_name = "URL=TOKEN", value_parser = parse_instance)]
    pub gitlab_instances: Vec<(String, String)>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a document and print the build result as JSON.
    Compile(CompileArgs),

    /// Drop the worker's cached auxiliary state for one or more papers.
    ClearCache {
        /// Paper identifiers whose cache should be dropped.
        #[arg(required = true, value_name = "PAPER_ID")]
        paper_ids: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Repository URL (GitHub, GitLab, self-hosted GitLab or an Overleaf project link).
    pub git_url: String,

    /// Repository-relative path of the document to compile.
    #[arg(short = 't', long, default_value = "main.tex", value_name = "PATH")]
    pub target: String,

    /// Branch to build instead of the repository default.
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// TeX engine: pdflatex, xelatex or lualatex.
    #[arg(short = 'c', long, default_value_t = Compiler::Pdflatex)]
    pub compiler: Compiler,

    /// Paper identifier used for progress callbacks and worker-side caching.
    #[arg(long, value_name = "ID")]
    pub paper_id: Option<String>,

    /// Preferred auxiliary cache mode: off or aux.
    #[arg(long, value_name = "MODE")]
    pub cache_mode: Option<CacheMode>,

    /// Force caching off regardless of --cache-mode.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub no_cache: bool,

    /// Build result JSON from an earlier run, used to reuse dependency hashes.
    #[arg(short = 'p', long, value_name = "FILE")]
    pub previous: Option<PathBuf>,

    /// Directory the compiled PDF is stored in.
    #[arg(short = 'o', long, default_value = "papersync-out", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Timeout for the compile request, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

fn parse_instance(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((url, token)) if !url.trim().is_empty() => {
            Ok((url.trim().to_string(), token.trim().to_string()))
        }
        _ => Err(format!("expected URL=TOKEN, got '{}'", value)),
    }
}
