// Rewave - Command line front end for the action engine
//
// Loads a WAV file, performs one action (or a recorded macro) on a selection,
// optionally undoes it again and writes the result back out.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ringbuf::traits::Consumer;
use rewave::action::{ActionError, ActionFactory, ActionParams, ParamValue, PerformOptions, PerformStatus, UndoOutcome};
use rewave::config::{ConfigError, CrossfadeEdges, EditorConfig};
use rewave::edits::{MacroFactory, standard};
use rewave::messaging::{NotificationConsumer, NotificationLevel};
use rewave::recorder::{Macro, MacroError};
use rewave::sound::wav::{WavEncoding, WavError, load_wav, save_wav};
use rewave::sound::{ChannelMask, SoundBuffer};
use rewave::{ActionEngine, Document, NotificationFrontend, create_notification_channel};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(author, version, about = "Undoable edits on WAV files", long_about = None)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Editor configuration (RON). Defaults to the per-user config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Perform one action, e.g. `apply in.wav out.wav gain factor=0.5`.
    Apply {
        #[command(flatten)]
        edit: EditArgs,
        /// Action name; "change-rate" finds "Change Rate".
        action: String,
        /// Action parameters as name=value.
        #[arg(value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
    },
    /// Replay a recorded macro file.
    Macro {
        #[command(flatten)]
        edit: EditArgs,
        /// Macro file written by the recorder.
        file: PathBuf,
    },
    /// List the built-in actions.
    List,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// WAV file to read.
    input: PathBuf,
    /// WAV file to write.
    output: PathBuf,
    /// First selected sample.
    #[arg(long)]
    start: Option<usize>,
    /// Last selected sample (inclusive).
    #[arg(long)]
    stop: Option<usize>,
    /// Channels to edit, e.g. 0,1. All channels when omitted.
    #[arg(long, value_delimiter = ',')]
    channels: Vec<usize>,
    /// Override the configured crossfade edges.
    #[arg(long, value_enum)]
    crossfade: Option<CrossfadeArg>,
    /// Undo the action again before writing.
    #[arg(long)]
    undo: bool,
    /// Write 16-bit PCM instead of 32-bit float.
    #[arg(long)]
    pcm16: bool,
    /// Write a JSON summary here.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum CrossfadeArg {
    None,
    Inner,
    Outer,
}

impl From<CrossfadeArg> for CrossfadeEdges {
    fn from(arg: CrossfadeArg) -> Self {
        match arg {
            CrossfadeArg::None => CrossfadeEdges::None,
            CrossfadeArg::Inner => CrossfadeEdges::Inner,
            CrossfadeArg::Outer => CrossfadeEdges::Outer,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Wav(#[from] WavError),

    #[error("Macro error: {0}")]
    Macro(#[from] MacroError),

    #[error("{0}")]
    Action(#[from] ActionError),

    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary written with `--report`
#[derive(Debug, Serialize)]
struct Report {
    action: String,
    status: String,
    undone: bool,
    went_on_undo_stack: bool,
    length: usize,
    channels: usize,
    sample_rate: u32,
    selection: (usize, usize),
    history: Vec<String>,
    notifications: Vec<String>,
}

fn parse_value(raw: &str) -> ParamValue {
    if let Ok(value) = raw.parse::<i64>() {
        ParamValue::Int(value)
    } else if let Ok(value) = raw.parse::<f64>() {
        ParamValue::Float(value)
    } else if let Ok(value) = raw.parse::<bool>() {
        ParamValue::Bool(value)
    } else {
        ParamValue::Text(raw.to_string())
    }
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), parse_value(value))),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

/// "change-rate" and "Change Rate" both find the "Change Rate" factory
fn find_factory(name: &str) -> Result<Arc<dyn ActionFactory>, CliError> {
    let registry = standard();
    let wanted = name.replace(['-', '_'], " ");
    let found = registry
        .names()
        .find(|candidate| candidate.eq_ignore_ascii_case(&wanted))
        .and_then(|candidate| registry.get(candidate));
    found.ok_or_else(|| {
        let known: Vec<&str> = registry.names().collect();
        CliError::Usage(format!("unknown action '{}' (known: {})", name, known.join(", ")))
    })
}

fn drain_notifications(consumer: &mut NotificationConsumer) -> Vec<String> {
    let mut messages = Vec::new();
    while let Some(notification) = consumer.try_pop() {
        let prefix = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        messages.push(format!("{}: {}", prefix, notification.message));
    }
    messages
}

fn load_config(path: Option<&Path>, crossfade: Option<CrossfadeArg>) -> Result<EditorConfig, CliError> {
    let mut config = match path.map(Path::to_path_buf).or_else(EditorConfig::default_path) {
        Some(path) => EditorConfig::load_or_default(&path)?,
        None => EditorConfig::default(),
    };
    if let Some(edges) = crossfade.map(CrossfadeEdges::from) {
        config.crossfade.apply = edges != CrossfadeEdges::None;
        config.crossfade.edges = edges;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Apply { edit, action, params } => {
            let factory = find_factory(&action)?;
            let mut action_params = ActionParams::new();
            for (name, value) in params {
                action_params.set(&name, value);
            }
            run_edit(cli.config.as_deref(), &edit, factory, action_params)
        }
        Commands::Macro { edit, file } => {
            let factory = Arc::new(MacroFactory::new(Arc::new(standard()), Macro::load(&file)?));
            run_edit(cli.config.as_deref(), &edit, factory, ActionParams::new())
        }
        Commands::List => {
            for name in standard().names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn run_edit(
    config_path: Option<&Path>,
    edit: &EditArgs,
    factory: Arc<dyn ActionFactory>,
    mut params: ActionParams,
) -> Result<(), CliError> {
    let config = load_config(config_path, edit.crossfade)?;

    let sound = load_wav(&edit.input)?;
    log::info!(
        "loaded {} ({} channels, {} samples at {} Hz)",
        edit.input.display(),
        sound.channel_count(),
        sound.len(),
        sound.sample_rate()
    );
    let name = edit
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut document = Document::new(name, Box::new(sound)).with_undo_limit(config.undo_limit);
    if !edit.channels.is_empty() {
        document.set_active_channels(ChannelMask::from_channels(edit.channels.iter().copied()));
    }
    let (start, stop) = document.selection();
    document.set_selection(edit.start.unwrap_or(start), edit.stop.unwrap_or(stop));

    let (sender, mut receiver) = create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let mut engine = ActionEngine::new(config, Box::new(NotificationFrontend::new(sender)));

    let outcome = engine.perform_action(
        factory.as_ref(),
        Some(&mut document),
        &mut params,
        PerformOptions::with_params(),
    )?;
    let status = match &outcome.status {
        PerformStatus::Success => "success".to_string(),
        PerformStatus::Cancelled => "cancelled".to_string(),
        PerformStatus::Failed(reason) => format!("failed: {}", reason),
    };
    log::info!("{}: {}", factory.name(), status);

    let mut undone = false;
    if edit.undo && outcome.succeeded() {
        match engine.undo(&mut document)? {
            UndoOutcome::Undone(name) => {
                log::info!("undid {}", name);
                undone = true;
            }
            UndoOutcome::NothingToUndo => log::warn!("nothing to undo"),
            UndoOutcome::Failed(reason) => log::error!("undo failed: {}", reason),
        }
    }

    let encoding = if edit.pcm16 {
        WavEncoding::Pcm16
    } else {
        WavEncoding::Float32
    };
    save_wav(document.sound(), &edit.output, encoding)?;
    log::info!("wrote {}", edit.output.display());

    let notifications = drain_notifications(&mut receiver);
    for message in &notifications {
        eprintln!("{}", message);
    }

    if let Some(path) = &edit.report {
        let report = Report {
            action: factory.name().to_string(),
            status,
            undone,
            went_on_undo_stack: outcome.went_on_undo_stack,
            length: document.sound().len(),
            channels: document.sound().channel_count(),
            sample_rate: document.sound().sample_rate(),
            selection: document.selection(),
            history: document.history().descriptions().map(str::to_string).collect(),
            notifications,
        };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
