//! Line-driven interactive session standing in for the search window.
//!
//! Every plain input line replaces the query text and re-renders the rows.
//! Lines starting with `:` act on a displayed row. The session is the only
//! owner of the displayed rows and of the analysis progress indicators.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::analysis::{AnalysisClient, AnalysisDispatcher, AnalysisEvent, InFlight};
use crate::bootstrap::Bootstrap;
use crate::cli::output::format_rows;
use crate::config::Config;
use crate::error::Result;
use crate::live::LiveSearch;
use crate::store::RecordStore;
use crate::sync;

const PATH_WIDTH: usize = 60;

const HELP: &str = "type to search | :open N | :del N | :ren N NAME | :ai N | :help | :q";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// New query text.
    Query(String),
    Open(usize),
    Delete(usize),
    Rename(usize, String),
    Analyze(usize),
    Help,
    Quit,
    Invalid(String),
}

/// Parse a line. Row numbers are 1-based on screen and 0-based here.
/// A leading `::` searches for text starting with `:`.
#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("::") {
        return Input::Query(format!(":{rest}"));
    }
    let Some(command) = line.strip_prefix(':') else {
        return Input::Query(line.to_string());
    };

    let mut parts = command.trim().splitn(3, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let row = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1));
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match (verb, row) {
        ("q" | "quit", _) => Input::Quit,
        ("h" | "help", _) => Input::Help,
        ("open" | "o", Some(i)) => Input::Open(i),
        ("del" | "d", Some(i)) => Input::Delete(i),
        ("ai" | "analyze", Some(i)) => Input::Analyze(i),
        ("ren" | "r", Some(i)) if !rest.is_empty() => Input::Rename(i, rest.to_string()),
        _ => Input::Invalid(line.to_string()),
    }
}

/// What the loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub quit: bool,
}

impl Reply {
    fn show(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

/// Session state driven by input lines and analysis completions.
pub struct Session {
    view: LiveSearch,
    dispatcher: AnalysisDispatcher,
    inflight: InFlight,
    pending_delete: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(view: LiveSearch, dispatcher: AnalysisDispatcher) -> Self {
        Self {
            view,
            dispatcher,
            inflight: InFlight::new(),
            pending_delete: None,
        }
    }

    #[must_use]
    pub fn view(&self) -> &LiveSearch {
        &self.view
    }

    #[must_use]
    pub fn inflight(&self) -> &InFlight {
        &self.inflight
    }

    /// Run the current query again and render it.
    pub fn refresh(&mut self) -> String {
        self.view.refresh();
        self.render()
    }

    fn render(&self) -> String {
        format_rows(self.view.rows(), PATH_WIDTH)
    }

    /// Handle one input line.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        if let Some(path) = self.pending_delete.take() {
            return Reply::show(self.confirm_delete(&path, line));
        }

        match parse_input(line) {
            Input::Query(text) => {
                self.view.on_query_changed(&text);
                Reply::show(self.render())
            }
            Input::Help => Reply::show(HELP),
            Input::Quit => Reply {
                text: String::new(),
                quit: true,
            },
            Input::Invalid(raw) => Reply::show(format!("unrecognised command {raw:?}; {HELP}")),
            Input::Open(i) => Reply::show(self.with_row(i, |_, path| {
                match sync::open_path(Path::new(path)) {
                    Ok(()) => format!("opened {path}"),
                    Err(e) => format!("cannot open {path}: {e}"),
                }
            })),
            Input::Delete(i) => Reply::show(self.with_row(i, |session, path| {
                session.pending_delete = Some(path.to_string());
                format!("delete {path}? [y/N]")
            })),
            Input::Rename(i, name) => Reply::show(self.with_row(i, |session, path| {
                match sync::rename_path(&mut session.view, path, &name) {
                    Ok(new_path) => format!("renamed to {}", new_path.display()),
                    Err(e) => format!("rename failed: {e}"),
                }
            })),
            Input::Analyze(i) => Reply::show(self.with_row(i, Self::start_analysis)),
        }
    }

    /// Handle a finished analysis: dismiss its indicator and show the result.
    pub fn handle_event(&mut self, event: &AnalysisEvent) -> String {
        if !self.inflight.finish(event) {
            tracing::debug!(id = event.id, "completion for unknown request");
        }
        let mut text = format!("── analysis #{} {} ──\n{}", event.id, event.path, event.outcome);
        if !self.inflight.is_empty() {
            let running: Vec<&str> = self.inflight.paths().collect();
            text.push_str(&format!("\n(still analysing: {})", running.join(", ")));
        }
        text
    }

    fn with_row(&mut self, index: usize, f: impl FnOnce(&mut Self, &str) -> String) -> String {
        match self.view.row(index).map(|r| r.full_path.clone()) {
            Some(path) => f(self, &path),
            None => format!("no row {}", index + 1),
        }
    }

    fn confirm_delete(&mut self, path: &str, answer: &str) -> String {
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return "delete cancelled".to_string();
        }
        let outcome = sync::delete_path(&mut self.view, path);
        let mut text = match &outcome.file_error {
            Some(err) => format!("could not delete {path}: {err}"),
            None => format!("deleted {path}"),
        };
        if !outcome.index_removed {
            text.push_str(" (no index row)");
        }
        text.push('\n');
        text.push_str(&self.render());
        text
    }

    fn start_analysis(&mut self, path: &str) -> String {
        let Some(record) = self.view.store().get_by_path(path) else {
            return format!("no index record for {path}");
        };
        let id = self.dispatcher.submit(record);
        self.inflight.show(id, path);
        format!("analysing #{id} {path} ...")
    }
}

/// Run the interactive session on stdin/stdout until `:q`, end of input
/// or Ctrl-C.
pub async fn run(config: &Config, bootstrap: bool) -> Result<()> {
    let client = Arc::new(AnalysisClient::new(config.analysis_client_config())?);
    let (dispatcher, events) = AnalysisDispatcher::new(client);
    let boot = bootstrap.then(|| Bootstrap::spawn(config));

    let store = RecordStore::new(&config.db_path);
    if !store.exists() {
        tracing::info!(path = %config.db_path.display(), "index not built yet, results will be empty until it is");
    } else if let Some(files) = store.count() {
        tracing::info!(path = %config.db_path.display(), files, "index opened");
    }
    let mut session = Session::new(LiveSearch::new(store), dispatcher);
    println!("{HELP}");
    println!("{}", session.refresh());

    let input = BufReader::new(tokio::io::stdin());
    serve(session, events, boot, input, ctrl_c()).await;
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Drive `session` from `input` and analysis completions until the user
/// quits, input ends, reading fails or `interrupt` resolves. Every exit
/// shuts `boot` down.
pub async fn serve<R, F>(
    mut session: Session,
    mut events: UnboundedReceiver<AnalysisEvent>,
    boot: Option<Bootstrap>,
    input: R,
    interrupt: F,
) where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "reading input failed");
                        break;
                    }
                };
                let reply = session.handle_line(&line);
                if reply.quit {
                    break;
                }
                println!("{}", reply.text);
            }
            Some(event) = events.recv() => {
                println!("{}", session.handle_event(&event));
            }
            () = &mut interrupt => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    if let Some(boot) = boot {
        boot.shutdown().await;
    }
}
