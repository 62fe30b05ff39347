// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use papersync::cache_mode::CacheSettings;
use papersync::cli::{Cli, Commands, CompileArgs, WorkerArgs};
use papersync::compile::{BuildResult, CompileOrchestrator, CompileRequest, WorkerClient};
use papersync::config::ConfigBuilder;
use papersync::errors::{io_error_with_path, Error};
use papersync::git::GitCli;
#[cfg(feature = "progress")]
use papersync::progress::IndicatifProgress;
use papersync::progress::Progress;
use papersync::provider::EnvCredentialStore;
use papersync::signal::setup_signal_handler;
use papersync::storage::FsArtifactStore;
use papersync::Config;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    // Initialize logging. Default to 'info' if RUST_LOG is not set.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                if cfg!(debug_assertions) {
                    "papersync=debug".parse()?
                } else {
                    "papersync=info".parse()?
                },
            ),
        )
        .init();

    log::info!("Starting papersync v{}...", env!("CARGO_PKG_VERSION"));

    let args = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let result = match args.command {
        Commands::Compile(compile_args) => runtime.block_on(compile(&args.worker, compile_args)),
        Commands::ClearCache { paper_ids } => runtime.block_on(clear_cache(&args.worker, &paper_ids)),
    };

    // --- Error Handling ---
    if let Err(e) = result {
        match e {
            Error::Interrupted => {
                eprintln!("\nOperation cancelled.");
                std::process::exit(130);
            }
            Error::StructuredCompile {
                ref message,
                log: Some(ref log),
            } => {
                eprintln!("Compilation failed: {}\n\n{}", message, log);
                std::process::exit(1);
            }
            _ => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn build_config(worker: &WorkerArgs, timeout: Option<u64>) -> papersync::Result<Config> {
    let mut builder = ConfigBuilder::from_env();
    if let Some(url) = &worker.worker_url {
        builder = builder.worker_url(url);
    }
    if let Some(url) = &worker.site_url {
        builder = builder.site_url(url);
    }
    for (url, token) in &worker.gitlab_instances {
        builder = builder.self_hosted_instance(url, token);
    }
    if let Some(secs) = timeout {
        builder = builder.compile_timeout(Duration::from_secs(secs));
    }
    builder.build()
}

fn progress_sink() -> Progress {
    #[cfg(feature = "progress")]
    {
        if atty::is(atty::Stream::Stderr) {
            return Progress::new(Arc::new(IndicatifProgress::new()));
        }
    }
    Progress::default()
}

fn read_previous(path: &std::path::Path) -> papersync::Result<BuildResult> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error_with_path(e, path))?;
    serde_json::from_str(&text).map_err(|e| {
        io_error_with_path(
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            path,
        )
    })
}

async fn compile(worker: &WorkerArgs, args: CompileArgs) -> papersync::Result<()> {
    let config = build_config(worker, args.timeout)?;
    config.require_worker_url()?;

    let previous = args.previous.as_deref().map(read_previous).transpose()?;
    let store = FsArtifactStore::new(&args.out_dir).map_err(Error::Storage)?;
    let orchestrator = CompileOrchestrator::new(
        config,
        Arc::new(GitCli::new()?),
        Arc::new(EnvCredentialStore),
        Arc::new(store.clone()),
    )?;

    let request = CompileRequest {
        branch: args.branch,
        compiler: args.compiler,
        paper_id: args.paper_id,
        cache: CacheSettings {
            repo_mode: None,
            user_mode: args.cache_mode,
            cache_allowed: args.no_cache.then_some(false),
        },
        ..CompileRequest::new(args.git_url, args.target)
    };

    let token = setup_signal_handler().map_err(|e| {
        Error::ConfigurationMissing(format!("cannot install signal handler: {:#}", e))
    })?;
    let result = orchestrator
        .compile(&request, previous.as_ref(), &progress_sink(), &token)
        .await?;

    log::info!("PDF written to '{}'", store.path_of(&result.storage_id).display());
    print_json(&result)
}

async fn clear_cache(worker: &WorkerArgs, paper_ids: &[String]) -> papersync::Result<()> {
    let config = build_config(worker, None)?;
    let outcome = WorkerClient::new(&config)?.clear_cache(paper_ids).await?;
    print_json(&outcome)
}

fn print_json<T: serde::Serialize>(value: &T) -> papersync::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        io_error_with_path(std::io::Error::new(std::io::ErrorKind::InvalidData, e), "<stdout>")
    })?;
    println!("{}", json);
    Ok(())
}
