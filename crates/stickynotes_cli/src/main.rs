//! Command-line access to a sticky notes storage root.
//!
//! # Responsibility
//! - Run single note operations against a root and print JSON results.
//! - Resolve the root the same way the UI does (env override, then settings).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use stickynotes_core::{
    init_logging, Geometry, NoteId, NotePatch, NotesClient, RootManager, SearchQuery,
    SettingsFile,
};

#[derive(Parser)]
#[command(name = "stickynotes")]
#[command(version)]
#[command(about = "Manage sticky notes from the terminal")]
struct Cli {
    /// Storage root; overrides the `data_path` setting
    #[arg(long, env = "STICKYNOTES_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Application directory holding user_config.json
    #[arg(long, default_value = ".")]
    app_dir: PathBuf,

    /// Write rolling logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level used with --log-dir
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core linkage info
    Ping,

    /// List notes, pinned first
    List {
        /// Include hidden notes
        #[arg(long)]
        all: bool,
    },

    /// Show one note
    Get { id: NoteId },

    /// Create a note
    Create {
        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Change the supplied fields of a note
    Update {
        id: NoteId,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        /// Pin (true) or unpin (false)
        #[arg(long)]
        pinned: Option<bool>,

        /// Window geometry is replaced whole; pass all four of x, y, width, height
        #[arg(long, requires_all = ["y", "width", "height"])]
        x: Option<f64>,

        #[arg(long, requires_all = ["x", "width", "height"])]
        y: Option<f64>,

        #[arg(long, requires_all = ["x", "y", "height"])]
        width: Option<f64>,

        #[arg(long, requires_all = ["x", "y", "width"])]
        height: Option<f64>,
    },

    /// Move a note to the trash
    Delete { id: NoteId },

    /// Hide a visible note or show a hidden one
    ToggleHidden { id: NoteId },

    /// Make every hidden note visible
    UnhideAll,

    /// Case-insensitive search over titles and content
    Search {
        query: String,

        /// Include hidden notes
        #[arg(long)]
        all: bool,
    },

    /// Bring a note back from the trash
    Restore { id: NoteId },

    /// List trashed notes, most recent first
    Trash,

    /// Show settings, or update them with KEY=JSON pairs
    Settings {
        #[arg(long = "set", value_name = "KEY=JSON")]
        set: Vec<String>,

        /// Remove user_config.json and return to defaults
        #[arg(long, conflicts_with = "set")]
        reset: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let log_dir = std::path::absolute(log_dir)
            .with_context(|| format!("invalid log dir {}", log_dir.display()))?;
        init_logging(&cli.log_level, &log_dir.to_string_lossy())?;
    }

    let settings_file = SettingsFile::new(&cli.app_dir);
    match &cli.command {
        Commands::Ping => {
            println!("stickynotes_core ping={}", stickynotes_core::ping());
            println!("stickynotes_core version={}", stickynotes_core::core_version());
            return Ok(());
        }
        Commands::Settings { set, reset } => {
            return run_settings(&settings_file, set, *reset);
        }
        _ => {}
    }

    let root = match cli.data_dir {
        Some(root) => root,
        None => settings_file.load().resolve_data_dir(&cli.app_dir),
    };
    let manager = RootManager::open(&root)
        .with_context(|| format!("failed to open notes at {}", root.display()))?;
    if let Some(recovered) = manager.recovered_from() {
        eprintln!(
            "warning: unreadable notes file preserved at {}",
            recovered.display()
        );
    }

    run_command(&manager.client(), cli.command)
}

fn run_command(client: &NotesClient, command: Commands) -> Result<()> {
    match command {
        Commands::List { all } => print_json(&client.get_notes(all)?),
        Commands::Get { id } => print_json(&client.get_note(id)?),
        Commands::Create { title, content } => print_json(&client.create_note(title, content)?),
        Commands::Update {
            id,
            title,
            content,
            pinned,
            x,
            y,
            width,
            height,
        } => {
            let geometry = match (x, y, width, height) {
                (Some(position_x), Some(position_y), Some(width), Some(height)) => Some(Geometry {
                    position_x,
                    position_y,
                    width,
                    height,
                }),
                _ => None,
            };
            let patch = NotePatch {
                title,
                content,
                is_pinned: pinned,
                geometry,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            print_json(&client.update_note(id, patch)?)
        }
        Commands::Delete { id } => {
            client.delete_note(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::ToggleHidden { id } => {
            let is_hidden = client.toggle_hidden(id)?;
            print_json(&serde_json::json!({ "id": id, "is_hidden": is_hidden }))
        }
        Commands::UnhideAll => {
            let count = client.unhide_all()?;
            print_json(&serde_json::json!({ "count": count }))
        }
        Commands::Search { query, all } => {
            let mut query = SearchQuery::new(query);
            query.include_hidden = all;
            print_json(&client.search(&query)?)
        }
        Commands::Restore { id } => print_json(&client.restore_note(id)?),
        Commands::Trash => print_json(&client.list_trash()?),
        Commands::Ping | Commands::Settings { .. } => Ok(()),
    }
}

fn run_settings(file: &SettingsFile, set: &[String], reset: bool) -> Result<()> {
    if reset {
        return print_json(&file.reset()?);
    }
    if set.is_empty() {
        return print_json(&file.load());
    }

    let mut updates = Map::new();
    for pair in set {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected KEY=JSON, got `{pair}`");
        };
        // Bare words are taken as strings so `--set theme=ink` works.
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        updates.insert(key.trim().to_string(), value);
    }
    print_json(&file.update(updates)?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
