use std::env;
use std::fs;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    self as term, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;
use tracing_subscriber::EnvFilter;

use queue_lens::config::{ConfigFile, default_config_path, expand_tilde};
use queue_lens::keymap::action_for_key;
use queue_lens::queue::QueueClient;
use queue_lens::render;
use queue_lens::sqs::SqsQueue;
use queue_lens::{Behaviours, Dispatcher, Event, Session, SessionTimings};

const DEFAULT_LOG_FILE: &str = "queue-lens.log";

#[derive(Parser)]
#[command(
    name = "queue-lens",
    version,
    about = "Inspect messages in an AWS SQS queue in a simple and deliberate manner"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse a queue interactively
    Tui(TuiArgs),
    /// Inspect the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args)]
struct TuiArgs {
    /// Profile to use from the config file
    profile: String,
    /// Delete messages after reading them
    #[arg(short = 'd', long)]
    delete: bool,
    /// Persist messages to disk as they are read
    #[arg(short = 'p', long)]
    persist: bool,
    /// Consume messages without listing them
    #[arg(short = 's', long)]
    skip: bool,
    /// Path to the config file
    #[arg(short = 'c', long, env = "QUEUE_LENS_CONFIG")]
    config: Option<PathBuf>,
    /// Where debug logs go when QUEUE_LENS_LOG or DEBUG is set
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate every profile in the config file
    Validate {
        #[arg(short = 'c', long, env = "QUEUE_LENS_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print a resolved profile
    Show {
        profile: String,
        #[arg(short = 'c', long, env = "QUEUE_LENS_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Tui(args) => run_tui(args),
        Commands::Config { command } => match command {
            ConfigCommand::Validate { config } => validate_config(config),
            ConfigCommand::Show { profile, config } => show_profile(&profile, config),
        },
    }
}

fn run_tui(args: TuiArgs) -> Result<()> {
    let path = config_path(args.config)?;
    let file = ConfigFile::load(&path)?;
    let config = file.profile(&args.profile)?;
    init_logging(args.log_file.as_deref())?;

    let behaviours = Behaviours {
        delete_after_read: args.delete,
        persist_to_disk: args.persist,
        skip_population: args.skip,
        ..Behaviours::default()
    };
    let timings = SessionTimings::default();
    let persist_dir = file
        .persist_root()
        .join(&config.queue_name)
        .join(Local::now().format("%Y-%m-%d-%H-%M-%S").to_string());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let client: Arc<dyn QueueClient> = Arc::new(
        runtime.block_on(SqsQueue::connect(&config, timings.visibility_timeout_secs)),
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let config = Arc::new(config);
    let dispatcher = Dispatcher::new(
        client,
        Arc::clone(&config),
        events_tx,
        runtime.handle().clone(),
    );
    let mut session = Session::new(config.as_ref().clone(), behaviours, persist_dir, timings);
    info!(profile = %config.profile_name, queue = %config.queue_name, ?behaviours, "session starting");

    let mut tui = Tui::new()?;
    let run_result = run_app(&mut tui, &mut session, &dispatcher, &mut events_rx);
    let restore_result = tui.restore();

    // Give in-flight deletes a moment before the runtime goes away.
    runtime.shutdown_timeout(Duration::from_millis(500));

    run_result?;
    restore_result?;
    Ok(())
}

/// The single writer: every state change happens on this loop.
fn run_app(
    tui: &mut Tui,
    session: &mut Session,
    dispatcher: &Dispatcher,
    events: &mut UnboundedReceiver<Event>,
) -> Result<()> {
    dispatcher.dispatch_all(session.init());
    let (width, height) = term::size().context("failed to read terminal size")?;
    dispatcher.dispatch_all(session.update(Event::Resize { width, height }));

    loop {
        tui.draw(session)?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                TermEvent::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        if let Some(action) = action_for_key(session.active_view(), key) {
                            dispatcher.dispatch_all(session.update(Event::Action(action)));
                        }
                    }
                }
                TermEvent::Resize(width, height) => {
                    dispatcher.dispatch_all(session.update(Event::Resize { width, height }));
                }
                _ => {}
            }
        }

        while let Ok(event) = events.try_recv() {
            dispatcher.dispatch_all(session.update(event));
        }

        if session.should_quit() {
            return Ok(());
        }
    }
}

fn validate_config(config: Option<PathBuf>) -> Result<()> {
    let path = config_path(config)?;
    let file = ConfigFile::load(&path)?;
    let problems = file.validate();
    if problems.is_empty() {
        println!("config {} looks good", path.display());
        return Ok(());
    }

    for problem in &problems {
        eprintln!("{problem}");
    }
    bail!("config {} has {} problem(s)", path.display(), problems.len())
}

fn show_profile(profile: &str, config: Option<PathBuf>) -> Result<()> {
    let path = config_path(config)?;
    let file = ConfigFile::load(&path)?;
    let resolved = file.profile(profile)?;
    println!("{}", resolved.describe());
    Ok(())
}

fn config_path(arg: Option<PathBuf>) -> Result<PathBuf> {
    match arg {
        Some(path) => Ok(expand_tilde(path.to_string_lossy().trim())),
        None => default_config_path(),
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let directive = match (env::var("QUEUE_LENS_LOG"), env::var("DEBUG")) {
        (Ok(directive), _) if !directive.trim().is_empty() => directive,
        (_, Ok(debug)) if !debug.trim().is_empty() => String::from("debug"),
        _ => return Ok(()),
    };

    let path = log_file.map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), Path::to_path_buf);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    fn new() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).context("failed to create terminal")?;
        Ok(Self { terminal })
    }

    fn draw(&mut self, session: &Session) -> Result<()> {
        self.terminal
            .draw(|frame| render::draw(frame, session))?;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        disable_raw_mode().context("failed to disable raw mode")?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .context("failed to leave alternate screen")?;
        self.terminal
            .show_cursor()
            .context("failed to show cursor")?;
        Ok(())
    }
}
