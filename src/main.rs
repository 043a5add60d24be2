#![allow(clippy::missing_errors_doc, clippy::needless_pass_by_value)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use findex::analysis::{AnalysisClient, AnalysisDispatcher, AnalysisOutcome, InFlight};
use findex::cli::commands::{Cli, Command};
use findex::cli::output::{self, SearchOutput};
use findex::cli::session;
use findex::config::Config;
use findex::db::Database;
use findex::error::FindexError;
use findex::filetime;
use findex::live::LiveSearch;
use findex::store::RecordStore;
use findex::sync;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn run(cli: Cli) -> CmdResult {
    let config = match &cli.root {
        Some(root) => Config::new(root),
        None => Config::from_cwd().map_err(map_err)?,
    };

    match cli.command.unwrap_or(Command::Interactive {
        no_bootstrap: false,
    }) {
        Command::Interactive { no_bootstrap } => cmd_interactive(&config, !no_bootstrap),
        Command::Search { keyword } => cmd_search(&config, &keyword),
        Command::Show { path } => cmd_show(&config, &path),
        Command::Delete { path, yes } => cmd_delete(&config, &path, yes),
        Command::Rename { path, new_name } => cmd_rename(&config, &path, &new_name),
        Command::Analyze { paths } => cmd_analyze(&config, &paths),
        Command::Open { path } => cmd_open(&path),
        Command::Stats => cmd_stats(&config),
        Command::Init => cmd_init(&config),
    }
}

type CmdResult = Result<(), Box<dyn std::fmt::Display>>;

fn map_err(e: impl std::fmt::Display + 'static) -> Box<dyn std::fmt::Display> {
    Box::new(e.to_string())
}

fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::fmt::Display>> {
    tokio::runtime::Runtime::new().map_err(map_err)
}

fn store(config: &Config) -> Result<RecordStore, Box<dyn std::fmt::Display>> {
    if !config.index_exists() {
        return Err(map_err(FindexError::IndexNotFound {
            path: config.db_path.display().to_string(),
        }));
    }
    Ok(RecordStore::new(&config.db_path))
}

fn cmd_interactive(config: &Config, bootstrap: bool) -> CmdResult {
    runtime()?.block_on(async { session::run(config, bootstrap).await.map_err(map_err) })
}

fn cmd_search(config: &Config, keyword: &str) -> CmdResult {
    let mut view = LiveSearch::new(store(config)?);
    let rows = view.on_query_changed(keyword);
    println!(
        "{}",
        output::format_json(&SearchOutput {
            count: rows.len(),
            results: rows,
        })
    );
    Ok(())
}

fn cmd_show(config: &Config, path: &str) -> CmdResult {
    let record = store(config)?
        .get_by_path(path)
        .ok_or_else(|| map_err(FindexError::RecordNotFound { path: path.into() }))?;
    println!("{}", output::format_json(&record));
    Ok(())
}

fn cmd_delete(config: &Config, path: &str, yes: bool) -> CmdResult {
    let store = store(config)?;
    if !yes && !confirm(&format!("delete {path}? [y/N] "))? {
        println!("{{\"deleted\":false}}");
        return Ok(());
    }

    let mut view = LiveSearch::new(store);
    let outcome = sync::delete_path(&mut view, path);
    println!("{}", output::format_json(&outcome));
    match outcome.file_error {
        Some(err) => Err(map_err(format!("could not delete {path}: {err}"))),
        None => Ok(()),
    }
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::fmt::Display>> {
    eprint!("{prompt}");
    std::io::stderr().flush().map_err(map_err)?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer).map_err(map_err)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn cmd_rename(config: &Config, path: &str, new_name: &str) -> CmdResult {
    let mut view = LiveSearch::new(store(config)?);
    let new_path = sync::rename_path(&mut view, path, new_name).map_err(map_err)?;

    #[derive(Serialize)]
    struct RenameOutput<'a> {
        old_path: &'a str,
        new_path: String,
    }

    println!(
        "{}",
        output::format_json(&RenameOutput {
            old_path: path,
            new_path: new_path.to_string_lossy().into_owned(),
        })
    );
    Ok(())
}

fn cmd_analyze(config: &Config, paths: &[String]) -> CmdResult {
    let store = store(config)?;
    let client = AnalysisClient::new(config.analysis_client_config()).map_err(map_err)?;

    #[derive(Serialize)]
    struct AnalyzeOutput<'a> {
        path: &'a str,
        #[serde(flatten)]
        outcome: &'a AnalysisOutcome,
    }

    runtime()?.block_on(async {
        let (mut dispatcher, mut events) = AnalysisDispatcher::new(Arc::new(client));
        let mut inflight = InFlight::new();
        for path in paths {
            match store.get_by_path(path) {
                Some(record) => inflight.show(dispatcher.submit(record), path.as_str()),
                None => {
                    let outcome = AnalysisOutcome::Failure(
                        FindexError::RecordNotFound { path: path.clone() }.to_string(),
                    );
                    println!(
                        "{}",
                        output::format_json(&AnalyzeOutput {
                            path,
                            outcome: &outcome,
                        })
                    );
                }
            }
        }

        while !inflight.is_empty() {
            let Some(event) = events.recv().await else {
                break;
            };
            inflight.finish(&event);
            println!(
                "{}",
                output::format_json(&AnalyzeOutput {
                    path: &event.path,
                    outcome: &event.outcome,
                })
            );
        }
    });
    Ok(())
}

fn cmd_open(path: &str) -> CmdResult {
    sync::open_path(Path::new(path)).map_err(map_err)
}

fn cmd_stats(config: &Config) -> CmdResult {
    let stats = store(config)?
        .stats()
        .ok_or_else(|| map_err("index could not be read"))?;

    #[derive(Serialize)]
    struct StatsOutput {
        index: String,
        files: u64,
        total_bytes: u64,
        newest_write: String,
    }

    println!(
        "{}",
        output::format_json(&StatsOutput {
            index: config.db_path.display().to_string(),
            files: stats.file_count,
            total_bytes: stats.total_bytes,
            newest_write: filetime::decode(stats.newest_write_time),
        })
    );
    Ok(())
}

fn cmd_init(config: &Config) -> CmdResult {
    Database::create(&config.db_path).map_err(map_err)?;

    #[derive(Serialize)]
    struct InitOutput {
        index: String,
    }

    println!(
        "{}",
        output::format_json(&InitOutput {
            index: config.db_path.display().to_string(),
        })
    );
    Ok(())
}
