//! # Docs Agent CLI (`docs`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docs init [dir]` | Create the `.docs` layout (idempotent) |
//! | `docs add <tool> [<version>]...` | Acquire and store documentation |
//! | `docs config <option> [<value>]` | Show or persist a setting |
//! | `docs ask [--stream] <prompt>` | One question to the chat model |
//! | `docs chat` | Interactive session, ends on `/done` |
//! | `docs update [--force]` | Refresh stale elements (alias `pull`) |
//!
//! Global flags: `-i/--interactive`, `-n/--non-interactive`, `--silent`,
//! `--verbose`, `--global-config <path>`.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use docs_agent::acquire::UrlOrPathSource;
use docs_agent::add::{pair_arguments, run_add};
use docs_agent::agent::{self, OllamaClient};
use docs_agent::config::{get_or_set_option, Config, ConfigPaths};
use docs_agent::logging::init_tracing;
use docs_agent::manifest::Manifest;
use docs_agent::setup::{ensure_directory, prompt_settings, store_dir};
use docs_agent::store::sqlite::SqliteVectorStore;
use docs_agent::store::{VectorStore, DEFAULT_COLLECTION};
use docs_agent::update::{run_update, UpdateOptions};

/// Docs Agent: versioned documentation for the tools in your project, with a
/// local chat model to ask about them.
#[derive(Parser)]
#[command(name = "docs", version)]
struct Cli {
    /// Prompt for input where a command supports it (default when stdin is a terminal).
    #[arg(short = 'i', long, global = true, conflicts_with = "non_interactive")]
    interactive: bool,

    /// Never prompt.
    #[arg(short = 'n', long, global = true)]
    non_interactive: bool,

    /// Only print errors.
    #[arg(long, global = true, conflicts_with = "verbose")]
    silent: bool,

    /// Print debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    /// Use this global config file instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    global_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create `.docs/`, its config and manifest files, and the vector store
    /// directory. Existing files are kept.
    Init {
        /// Project directory (defaults to the current directory).
        dir: Option<PathBuf>,
    },

    /// Add documentation for one or more tools.
    ///
    /// Arguments alternate tool and version. The version is also the URL or
    /// file path the documentation is read from. A tool without a version is
    /// skipped.
    Add {
        #[arg(required = true, value_name = "TOOL [VERSION]")]
        entries: Vec<String>,
    },

    /// Show a setting and where it came from, or set it in the local config.
    Config {
        option: String,
        value: Option<String>,
    },

    /// Ask the chat model a single question.
    Ask {
        /// Print the answer as it is generated.
        #[arg(long)]
        stream: bool,

        #[arg(required = true)]
        prompt: Vec<String>,
    },

    /// Start an interactive chat session. Type `/done` to quit.
    Chat,

    /// Refresh stored documentation whose version changed.
    #[command(alias = "pull")]
    Update {
        /// Refresh every element regardless of version.
        #[arg(long)]
        force: bool,
    },
}

/// Everything a command needs, built once at startup.
struct App {
    root: PathBuf,
    paths: ConfigPaths,
    config: Config,
    silent: bool,
    interactive: bool,
}

impl App {
    fn load(root: &Path, cli: &Cli) -> Self {
        let paths = ConfigPaths::for_project(root, cli.global_config.clone());
        let config = Config::load(&paths);
        let interactive = if cli.non_interactive {
            false
        } else {
            cli.interactive || atty::is(atty::Stream::Stdin)
        };
        Self {
            root: root.to_path_buf(),
            paths,
            config,
            silent: cli.silent,
            interactive,
        }
    }

    async fn open_store(&self) -> Result<SqliteVectorStore> {
        SqliteVectorStore::open(&store_dir(&self.root, &self.config), DEFAULT_COLLECTION).await
    }

    fn manifest(&self) -> Manifest {
        Manifest::for_project(&self.root)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.silent);

    let cwd = std::env::current_dir()?;
    let root = match &cli.command {
        Commands::Init { dir: Some(dir) } => cwd.join(dir),
        _ => cwd,
    };
    let mut app = App::load(&root, &cli);

    match cli.command {
        Commands::Init { .. } => cmd_init(&mut app),
        Commands::Add { entries } => cmd_add(&app, &entries).await,
        Commands::Config { option, value } => cmd_config(&mut app, &option, value),
        Commands::Ask { stream, prompt } => {
            let client = OllamaClient::connect(&app.config).await?;
            agent::ask(&client, &app.config, &prompt.join(" "), stream).await
        }
        Commands::Chat => {
            let client = OllamaClient::connect(&app.config).await?;
            agent::chat(&client, &app.config).await
        }
        Commands::Update { force } => cmd_update(&app, force).await,
    }
}

fn cmd_init(app: &mut App) -> Result<()> {
    let report = ensure_directory(&app.root, &app.config)?;

    if app.interactive {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        if prompt_settings(&mut app.config, &mut input, &mut output)? {
            app.config.save(&app.paths.local)?;
            tracing::info!("Saved settings to {}", app.paths.local.display());
        }
    }

    if !app.silent {
        println!("init {}", app.root.display());
        if report.created.is_empty() {
            println!("  already initialized");
        }
        for path in &report.created {
            println!("  created: {}", path.display());
        }
        println!("ok");
    }
    Ok(())
}

async fn cmd_add(app: &App, entries: &[String]) -> Result<()> {
    let store = app.open_store().await?;
    let source = UrlOrPathSource::new()?;
    let result = run_add(&pair_arguments(entries), &app.manifest(), &store, &source).await;
    let total = stored_total(store.count().await);
    store.close().await;
    let report = result?;

    if !app.silent {
        println!("add");
        println!("  added: {}", report.added.len());
        println!("  skipped: {}", report.skipped.len());
        println!("  failed: {}", report.failed.len());
        if let Some(total) = total {
            println!("  elements stored: {}", total);
        }
    }
    if !report.failed.is_empty() {
        bail!("{} tool(s) could not be added", report.failed.len());
    }
    if !app.silent {
        println!("ok");
    }
    Ok(())
}

/// Element count for the summary. A failed count is logged and left out.
fn stored_total(count: Result<usize>) -> Option<usize> {
    match count {
        Ok(total) => Some(total),
        Err(e) => {
            tracing::warn!("Could not count stored elements: {:#}", e);
            None
        }
    }
}

async fn cmd_update(app: &App, force: bool) -> Result<()> {
    let store = app.open_store().await?;
    let source = UrlOrPathSource::new()?;
    let options = UpdateOptions {
        force,
        ..Default::default()
    };
    let result = run_update(&options, &store, &app.manifest(), &source).await;
    store.close().await;
    let report = result?;

    if !app.silent {
        println!("update{}", if force { " (force)" } else { "" });
        println!("  updated: {}", report.updated.len());
        println!("  up to date: {}", report.up_to_date.len());
        println!("  failed: {}", report.failed.len());
    }
    if !report.failed.is_empty() {
        bail!("{} element(s) could not be updated", report.failed.len());
    }
    if !app.silent {
        println!("ok");
    }
    Ok(())
}

fn cmd_config(app: &mut App, option: &str, value: Option<String>) -> Result<()> {
    let entry = get_or_set_option(&mut app.config, option, value, &app.paths.local)?;
    if app.silent {
        return Ok(());
    }
    match entry {
        Some(entry) => println!(
            "{} = {} (defined in: {})",
            option, entry.value, entry.defined_in
        ),
        None => println!("{} is not set", option),
    }
    Ok(())
}
