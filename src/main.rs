//! Binary entrypoint for the escapekit CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and the starter catalog under `data/seeds/`
//! - `play --player <name> [--fresh]` - play an interactive session on stdin
//! - `status --player <name>` - print lifetime progress and achievements
//! - `validate [--catalog <path>]` - check a catalog (and achievement) file
//!
//! See the library crate docs for module-level details: `escapekit::`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use escapekit::config::Config;
use escapekit::escape::commands::{
    describe_command, describe_solve, format_examine_view, format_inventory_view,
    format_puzzle_view, format_session_status, play_help,
};
use escapekit::escape::{
    format_achievement_list, format_clock, format_room_map, format_transcript,
    load_achievements_from_json, load_catalog_from_json, parse_play_command,
    seed_starter_achievements, starter_catalog, starter_room_graph, write_achievements_json,
    write_catalog_json, AchievementEvaluator, AchievementRecord, EscapeStore, EscapeStoreBuilder,
    GameSession, PlayCommand, PuzzleCatalog, RoomGraph, SessionEvent, SessionHandle,
    SessionRunner, SessionSink, SessionState,
};
use escapekit::validation::validate_player_name;

#[derive(Parser)]
#[command(name = "escapekit")]
#[command(about = "A timed escape-room puzzle engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and the starter room content
    Init,
    /// Play a session in this terminal
    Play {
        /// Player name (progress and achievements are kept per player)
        #[arg(short, long)]
        player: String,
        /// Ignore any saved session and start over
        #[arg(long)]
        fresh: bool,
    },
    /// Show a player's progress and achievements
    Status {
        #[arg(short, long)]
        player: String,
    },
    /// Validate a catalog file
    Validate {
        /// Catalog JSON (defaults to the configured catalog)
        #[arg(long)]
        catalog: Option<String>,
        /// Achievements JSON (defaults to the configured achievements)
        #[arg(long)]
        achievements: Option<String>,
    },
}

/// Puzzles, rooms and achievement rules for a run.
struct Content {
    catalog: Arc<PuzzleCatalog>,
    rooms: RoomGraph,
    achievements: Vec<AchievementRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init runs before a config exists
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Some(
            Config::load(&cli.config)
                .await
                .context("run `escapekit init` to create a configuration")?,
        ),
    };
    init_logging(&pre_config, cli.verbose);

    match (cli.command, pre_config) {
        (Commands::Init, _) => run_init(&cli.config).await,
        (Commands::Play { player, fresh }, Some(config)) => run_play(&config, &player, fresh).await,
        (Commands::Status { player }, Some(config)) => run_status(&config, &player),
        (
            Commands::Validate {
                catalog,
                achievements,
            },
            Some(config),
        ) => run_validate(&config, catalog, achievements),
        (_, None) => Err(anyhow!("configuration not loaded")),
    }
}

async fn run_init(config_path: &str) -> Result<()> {
    info!("Initializing escapekit configuration");
    if Path::new(config_path).exists() {
        warn!("{} already exists; leaving it unchanged", config_path);
    } else {
        Config::create_default(config_path).await?;
        info!("Configuration file created at {}", config_path);
    }

    let cfg = Config::default();
    tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
    if let Some(path) = &cfg.game.catalog_path {
        if !Path::new(path).exists() {
            write_catalog_json(path, &starter_catalog()?, &starter_room_graph()?)?;
            info!("Starter catalog written to {}", path);
        }
    }
    if let Some(path) = &cfg.game.achievements_path {
        if !Path::new(path).exists() {
            write_achievements_json(path, &seed_starter_achievements())?;
            info!("Starter achievements written to {}", path);
        }
    }
    println!("Ready. Start with: escapekit play --player <name>");
    Ok(())
}

fn load_content(
    config: &Config,
    catalog_override: Option<&str>,
    achievements_override: Option<&str>,
) -> Result<Content> {
    let (catalog, rooms) = match catalog_override.or(config.game.catalog_path.as_deref()) {
        Some(path) => {
            let loaded = load_catalog_from_json(path)
                .with_context(|| format!("loading catalog {}", path))?;
            (loaded.catalog, loaded.rooms)
        }
        None => (starter_catalog()?, starter_room_graph()?),
    };
    let achievements = match achievements_override.or(config.game.achievements_path.as_deref()) {
        Some(path) => load_achievements_from_json(path)
            .with_context(|| format!("loading achievements {}", path))?,
        None => seed_starter_achievements(),
    };
    Ok(Content {
        catalog: Arc::new(catalog),
        rooms,
        achievements,
    })
}

fn open_store(config: &Config) -> Result<EscapeStore> {
    let mut builder = EscapeStoreBuilder::new(config.storage.db_path());
    if config.storage.export_summaries {
        builder = builder.with_summary_export(config.storage.results_dir());
    }
    builder
        .open()
        .with_context(|| format!("opening store in {}", config.storage.data_dir))
}

async fn run_play(config: &Config, player: &str, fresh: bool) -> Result<()> {
    let player = validate_player_name(player)?;
    let content = load_content(config, None, None)?;
    let store = Arc::new(open_store(config)?);
    let progress = store.load_or_new_progress(&player)?;
    let evaluator = AchievementEvaluator::new(content.achievements.clone(), progress);
    let session_config = config.game.session_config();

    let saved = if fresh {
        store.delete_snapshot(&player)?;
        None
    } else {
        store.get_snapshot(&player)?
    };
    let session = match saved {
        Some(snapshot) => {
            match GameSession::restore(
                snapshot,
                Arc::clone(&content.catalog),
                session_config.clone(),
                evaluator.clone(),
            ) {
                Ok(mut session) => {
                    if session.state() == SessionState::InProgress {
                        session.pause()?;
                    }
                    session.take_events();
                    if session.state() == SessionState::Paused {
                        println!("Saved session restored. Type RESUME to continue.");
                    }
                    session
                }
                Err(e) => {
                    warn!("discarding saved session for {}: {}", player, e);
                    GameSession::new(&player, Arc::clone(&content.catalog), session_config, evaluator)
                }
            }
        }
        None => GameSession::new(&player, Arc::clone(&content.catalog), session_config, evaluator),
    };

    let sink: Arc<dyn SessionSink> = store.clone();
    let (handle, mut events, join) =
        SessionRunner::spawn(session, config.game.tick_interval(), Some(sink));

    let catalog = Arc::clone(&content.catalog);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                SessionEvent::ItemAcquired { item_id, .. } => {
                    let name = catalog.item(item_id).map(|i| i.name.as_str()).unwrap_or(item_id.as_str());
                    println!("* You obtained: {}", name);
                }
                SessionEvent::StateChanged { .. } => {}
                other => println!("* {}", other.describe()),
            }
        }
    });

    println!("{}", play_help());
    println!("{}", format_puzzle_view(&handle.snapshot().await?, &content.catalog));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse_play_command(&line);
        if command == PlayCommand::Quit {
            break;
        }
        if let Err(e) = dispatch(&handle, &content, command).await {
            println!("{}", e);
        }
    }

    handle.quit().await?;
    let session = join.await?;
    drop(handle);
    printer.await?;
    println!(
        "Session {}: {} used, {}/{} puzzles solved.",
        session.state(),
        format_clock(session.time_used()),
        session.puzzles_solved(),
        session.catalog().len()
    );
    Ok(())
}

async fn dispatch(handle: &SessionHandle, content: &Content, command: PlayCommand) -> Result<()> {
    let catalog = &content.catalog;
    match command {
        PlayCommand::Start => {
            handle.start().await?;
            println!("{}", format_puzzle_view(&handle.snapshot().await?, catalog));
        }
        PlayCommand::Solve(answer) => {
            let snapshot = handle.snapshot().await?;
            let puzzle = catalog
                .get(snapshot.current_puzzle_index)
                .ok_or_else(|| anyhow!("no puzzle on screen"))?;
            let outcome = handle.solve(puzzle.id, &answer).await?;
            if let Some(msg) = describe_solve(&outcome, catalog) {
                println!("{}", msg);
            }
            let after = handle.snapshot().await?;
            if after.current_puzzle_index != snapshot.current_puzzle_index {
                println!("{}", format_puzzle_view(&after, catalog));
            }
        }
        PlayCommand::Hint => {
            let snapshot = handle.snapshot().await?;
            let puzzle = catalog
                .get(snapshot.current_puzzle_index)
                .ok_or_else(|| anyhow!("no puzzle on screen"))?;
            match handle.hint(puzzle.id).await? {
                Some(text) if text.is_empty() => println!("No hint for this puzzle."),
                Some(text) => println!("Hint: {}", text),
                None => println!("Hints are only available while the clock is running."),
            }
        }
        PlayCommand::Go(index) => {
            if handle.navigate(index).await? {
                println!("{}", format_puzzle_view(&handle.snapshot().await?, catalog));
            } else {
                println!("Puzzle {} is locked.", index + 1);
            }
        }
        PlayCommand::Look => {
            println!("{}", format_puzzle_view(&handle.snapshot().await?, catalog));
        }
        PlayCommand::Inventory => {
            println!("{}", format_inventory_view(&handle.snapshot().await?, catalog));
        }
        PlayCommand::Examine(target) => {
            println!("{}", format_examine_view(&handle.snapshot().await?, catalog, &target));
        }
        PlayCommand::Map => println!("{}", format_room_map(&content.rooms)),
        PlayCommand::Pause => {
            handle.pause().await?;
            println!("Paused. Progress saved.");
        }
        PlayCommand::Resume => {
            handle.resume().await?;
            println!("Resumed.");
        }
        PlayCommand::Restart => {
            handle.restart().await?;
            println!("The room resets. Type START when ready.");
        }
        PlayCommand::Terminal(line) => {
            let before = handle.snapshot().await?.terminal_transcript.len();
            let outcome = handle.terminal(&line).await?;
            if let Some(msg) = describe_command(&outcome, catalog) {
                println!("{}", msg);
            } else {
                let after = handle.snapshot().await?;
                let start = before.min(after.terminal_transcript.len());
                println!("{}", format_transcript(&after.terminal_transcript[start..]));
            }
        }
        PlayCommand::Status => {
            println!("{}", format_session_status(&handle.snapshot().await?, catalog));
        }
        PlayCommand::Achievements => {
            let progress = handle.progress().await?;
            let evaluator = AchievementEvaluator::new(content.achievements.clone(), progress);
            println!("{}", format_achievement_list(&evaluator));
        }
        PlayCommand::Help => println!("{}", play_help()),
        PlayCommand::Quit => {}
        PlayCommand::Unknown(msg) => println!("{}", msg),
    }
    Ok(())
}

fn run_status(config: &Config, player: &str) -> Result<()> {
    let player = validate_player_name(player)?;
    let content = load_content(config, None, None)?;
    let store = open_store(config)?;
    let progress = store.load_or_new_progress(&player)?;

    println!("Player: {}", progress.player);
    println!(
        "Sessions: {} started, {} escaped, {} timed out",
        progress.sessions_started, progress.sessions_completed, progress.sessions_expired
    );
    println!("Puzzles solved: {}", progress.puzzles_solved);
    if let Some(best) = progress.best_time_secs {
        println!("Best time: {}", format_clock(best));
    }
    if store.get_snapshot(&player)?.is_some() {
        println!("A saved session is waiting.");
    }
    let summaries = store.list_summaries(&player)?;
    for summary in summaries.iter().rev().take(5) {
        println!(
            "  {} {} in {} ({} hints, {}/{} puzzles)",
            summary.finished_at.format("%Y-%m-%d %H:%M"),
            summary.outcome,
            format_clock(summary.time_used),
            summary.hints_used,
            summary.puzzles_solved,
            summary.puzzle_count
        );
    }
    let evaluator = AchievementEvaluator::new(content.achievements, progress);
    println!("{}", format_achievement_list(&evaluator));
    Ok(())
}

fn run_validate(config: &Config, catalog: Option<String>, achievements: Option<String>) -> Result<()> {
    let content = load_content(config, catalog.as_deref(), achievements.as_deref())?;
    println!(
        "OK: {} puzzles, {} items, {} rooms, {} achievements",
        content.catalog.len(),
        content.catalog.item_count(),
        content.rooms.rooms().len(),
        content.achievements.len()
    );
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when asked for (-v) on a terminal; the
        // game output shares stdout.
        let mirror = verbosity > 0 && atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if mirror {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
