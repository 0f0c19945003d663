use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use cue_expander::config::{self, Config};
use cue_expander::error::ResultExt;
use cue_expander::expand_manager::{EditEvent, ExpandManager};
use cue_expander::logging;
use cue_expander::protocol;
use cue_expander::state::{
    DocumentStore, JsonFileStore, StateCache, StateSnapshot, VariableValue,
};
use cue_expander::template_variables::{bindings_for, render, template_inputs, Binding};
use cue_expander::text_injector::{PlainSurface, Surface, TextField};
use cue_expander::watcher::StoreWatcher;

#[derive(Parser, Debug)]
#[command(name = "cue-expander", version, about = "Trigger-based text expansion")]
struct Cli {
    /// Config file (default: ~/.cuekit/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// State document, overrides the config's storePath
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template against the stored variables
    Render {
        template: String,
        /// Runtime value, repeatable: --var name=value
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },

    /// Run one expansion cycle on a line of text and print the result
    Expand {
        text: String,
        /// Caret position in characters (default: end of text)
        #[arg(long)]
        caret: Option<usize>,
    },

    /// Read or replace the state document
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Answer GET_STATE / SET_STATE requests as JSON lines on stdin/stdout
    Serve,

    /// Follow changes to the state document
    Watch,
}

#[derive(Subcommand, Debug)]
enum StateAction {
    /// Print the stored document
    Get,
    /// Replace the document with JSON from a file, or stdin when omitted
    Set { file: Option<PathBuf> },
    /// Create the document with defaults if it doesn't exist
    Init,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let _log_guard = logging::init(config.get_log_filter());

    let store_path = cli.store.clone().unwrap_or_else(|| config.get_store_path());
    let store = JsonFileStore::new(&store_path);

    match cli.command {
        Commands::Render { template, vars } => run_render(store, &template, vars),
        Commands::Expand { text, caret } => run_expand(store, text, caret),
        Commands::State { action } => run_state(store, action),
        Commands::Serve => run_serve(store, &config),
        Commands::Watch => run_watch(store, &config),
    }
}

fn run_render(store: JsonFileStore, template: &str, vars: Vec<(String, String)>) -> Result<()> {
    let snapshot = store
        .get()
        .with_context(|| format!("Failed to read {}", store.path().display()))?
        .unwrap_or_default();

    let overrides: HashMap<String, VariableValue> = vars
        .into_iter()
        .map(|(name, value)| (name, VariableValue::from(value)))
        .collect();
    for name in template_inputs(template) {
        if snapshot.variable(&name).is_none() && !overrides.contains_key(&name) {
            warn!(variable = %name, "No value for template variable, it will render empty");
        }
    }

    let mut bindings = bindings_for(&snapshot.variables, &overrides);
    // Values for names the document doesn't define still render
    for (name, value) in overrides {
        bindings
            .entry(name)
            .or_insert_with(|| Binding::from(value));
    }

    println!("{}", render(template, &bindings));
    Ok(())
}

fn run_expand(store: JsonFileStore, text: String, caret: Option<usize>) -> Result<()> {
    let cache = StateCache::load(store).context("Failed to load state")?;
    let mut manager = ExpandManager::new(Arc::new(cache));

    let mut field = TextField::with_text(text);
    if let Some(caret) = caret {
        field = field.with_caret(caret);
    }

    let outcome = manager.handle_edit(EditEvent::typed(), Surface::Plain(&mut field));
    info!(outcome = ?outcome, caret = field.caret(), "Expand finished");

    println!("{}", field.as_str());
    Ok(())
}

fn run_state(store: JsonFileStore, action: StateAction) -> Result<()> {
    match action {
        StateAction::Get => {
            let snapshot = store.get()?.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        StateAction::Set { file } => {
            let json = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            let snapshot: StateSnapshot =
                serde_json::from_str(&json).context("Input is not a valid state document")?;
            let stored = store.set(snapshot)?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        StateAction::Init => {
            let snapshot = store.ensure_initialized()?;
            info!(
                path = %store.path().display(),
                cues = snapshot.cues.len(),
                "State document ready"
            );
        }
    }
    Ok(())
}

/// Apply watcher events to `cache` on a background thread
fn spawn_reloader(
    cache: Arc<StateCache<JsonFileStore>>,
    config: &Config,
) -> Result<StoreWatcher> {
    let (mut watcher, rx) = StoreWatcher::new(cache.store().path(), config.get_watch_debounce());
    watcher.start()?;

    thread::spawn(move || {
        for event in rx {
            if cache.handle_event(event).warn_on_err().is_none() {
                continue;
            }
            let state = cache.current();
            info!(
                generation = cache.generation(),
                triggers = ?state.index.triggers(),
                "State reloaded"
            );
        }
    });
    Ok(watcher)
}

fn run_serve(store: JsonFileStore, config: &Config) -> Result<()> {
    let cache = Arc::new(StateCache::load(store).context("Failed to load state")?);
    let _watcher = spawn_reloader(Arc::clone(&cache), config)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let answered = protocol::serve(cache.as_ref(), stdin.lock(), stdout.lock())?;
    info!(answered, "Control stream closed");
    Ok(())
}

fn run_watch(store: JsonFileStore, config: &Config) -> Result<()> {
    let path = store.path().to_path_buf();
    let cache = Arc::new(StateCache::load(store).context("Failed to load state")?);
    info!(
        path = %path.display(),
        triggers = cache.current().index.len(),
        "Watching state document"
    );

    let _watcher = spawn_reloader(cache, config)?;
    loop {
        thread::park();
    }
}
