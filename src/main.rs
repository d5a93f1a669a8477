use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use typist::banner::{BannerInfo, print_banner, print_session_summary};
use typist::consts::{
    DEFAULT_PANEL_EXPAND, DEFAULT_PANEL_SETTLE, DEFAULT_PANEL_SWAP, DEFAULT_TEXT, default_db_path,
};
use typist::events::{Event, EventBus};
use typist::panel::{Form, PanelController, PanelTimings, PanelView};
use typist::presets::PresetStore;
use typist::render::terminal::{CursorBlink, TerminalRenderer};
use typist::scheduler::runtime::TokioScheduler;
use typist::sequencer::{Granularity, Phase, SequenceConfig, TextSequencer};

#[derive(Parser)]
#[command(name = "typist", version, about = "Letters in, letters out.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    sequence: SequenceArgs,

    /// Start from a saved preset
    #[arg(short, long)]
    preset: Option<String>,

    /// Stop after this many seconds (default: when done, or Ctrl+C)
    #[arg(short, long)]
    seconds: Option<u64>,

    /// SQLite database for presets (default: ~/.typist/typist.db)
    #[arg(short, long, global = true)]
    db: Option<String>,

    /// Log phase changes to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

/// Overrides layered on top of the defaults or a preset.
#[derive(Args, Debug, Default)]
struct SequenceArgs {
    /// Text to type
    #[arg(long)]
    text: Option<String>,

    /// Wait before the first character, in ms
    #[arg(long, allow_negative_numbers = true)]
    start_delay: Option<i64>,

    /// Delay between typed characters, in ms
    #[arg(long, allow_negative_numbers = true)]
    type_ms: Option<i64>,

    /// Delay between deleted characters, in ms
    #[arg(long, allow_negative_numbers = true)]
    delete_ms: Option<i64>,

    /// How long the full text stays before deletion, in ms
    #[arg(long, allow_negative_numbers = true)]
    hold_ms: Option<i64>,

    /// Pause before typing starts over, in ms
    #[arg(long, allow_negative_numbers = true)]
    restart_ms: Option<i64>,

    /// Type once and stop instead of looping
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Print the full text without animating
    #[arg(long = "static", default_value_t = false)]
    still: bool,

    /// Step through grapheme clusters instead of code points
    #[arg(long, default_value_t = false)]
    graphemes: bool,

    /// Randomize intervals by up to this fraction (0 to 1)
    #[arg(long, allow_negative_numbers = true)]
    jitter: Option<f64>,
}

impl SequenceArgs {
    fn apply(self, base: SequenceConfig) -> SequenceConfig {
        let mut config = base;
        if let Some(text) = self.text {
            config.text = text;
        }
        if let Some(ms) = self.start_delay {
            config.start_delay_ms = ms;
        }
        if let Some(ms) = self.type_ms {
            config.type_interval_ms = ms;
        }
        if let Some(ms) = self.delete_ms {
            config.delete_interval_ms = ms;
        }
        if let Some(ms) = self.hold_ms {
            config.hold_ms = ms;
        }
        if let Some(ms) = self.restart_ms {
            config.restart_pause_ms = ms;
        }
        if let Some(jitter) = self.jitter {
            config.jitter = jitter;
        }
        if self.once {
            config.looping = false;
        }
        if self.still {
            config.enabled = false;
        }
        if self.graphemes {
            config.granularity = Granularity::Grapheme;
        }
        config
    }
}

#[derive(Subcommand)]
enum Command {
    /// Play the sliding login/signup panel transition
    Panel {
        /// Form to switch to
        #[arg(long, value_enum, default_value_t = FormArg::Signup)]
        to: FormArg,

        /// Panel expand time, in ms
        #[arg(long, default_value_t = DEFAULT_PANEL_EXPAND.as_millis() as u64)]
        expand_ms: u64,

        /// Covered swap time, in ms
        #[arg(long, default_value_t = DEFAULT_PANEL_SWAP.as_millis() as u64)]
        swap_ms: u64,

        /// Settle time before content shows, in ms
        #[arg(long, default_value_t = DEFAULT_PANEL_SETTLE.as_millis() as u64)]
        settle_ms: u64,
    },
    /// Manage saved presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save a preset from the given options
    Save {
        name: String,
        #[command(flatten)]
        sequence: SequenceArgs,
    },
    /// List saved presets
    List,
    /// Print a preset as JSON
    Show { name: String },
    /// Delete a preset
    Remove { name: String },
}

#[derive(Debug, Clone, ValueEnum)]
enum FormArg {
    Login,
    Signup,
}

impl From<FormArg> for Form {
    fn from(arg: FormArg) -> Self {
        match arg {
            FormArg::Login => Form::Login,
            FormArg::Signup => Form::Signup,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        sequence,
        preset,
        seconds,
        db,
        verbose,
    } = Cli::parse();

    init_tracing(verbose);

    match command {
        Some(Command::Panel {
            to,
            expand_ms,
            swap_ms,
            settle_ms,
        }) => {
            let timings = PanelTimings {
                expand: Duration::from_millis(expand_ms),
                swap: Duration::from_millis(swap_ms),
                settle: Duration::from_millis(settle_ms),
            };
            run_panel(to.into(), timings).await
        }
        Some(Command::Preset { action }) => {
            let store = open_store(db.as_deref())?;
            handle_preset(&store, action)
        }
        None => run_play(sequence, preset.as_deref(), seconds, db.as_deref()).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("typist=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_store(db: Option<&str>) -> Result<PresetStore> {
    let path = match db {
        Some(path) => PathBuf::from(path),
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let path = path.to_str().context("database path is not valid UTF-8")?;
    PresetStore::open(path)
}

async fn run_play(
    sequence: SequenceArgs,
    preset: Option<&str>,
    seconds: Option<u64>,
    db: Option<&str>,
) -> Result<()> {
    let base = match preset {
        Some(name) => open_store(db)?
            .get(name)?
            .with_context(|| format!("no preset named '{name}'"))?,
        None => SequenceConfig::new(DEFAULT_TEXT),
    };
    let config = sequence.apply(base);
    config.timings()?;

    print_banner(&BannerInfo {
        config: &config,
        preset,
    });

    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let sequencer =
        TextSequencer::new(Arc::new(TokioScheduler::current()?)).with_events(Arc::clone(&bus));
    let renderer = Arc::new(TerminalRenderer::stdout());
    let blink = CursorBlink::start(Arc::clone(&renderer));
    let handle = sequencer.start(&config, renderer.clone())?;

    let limit = async {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(limit);

    // Runs until the sequence reports Finished (after its last frame), the
    // time limit, or Ctrl+C
    let mut running = !handle.is_finished();
    while running {
        tokio::select! {
            event = events.recv() => running = match event {
                Ok(Event::PhaseChanged { phase: Phase::Finished, .. }) => false,
                Ok(_) => true,
                Err(RecvError::Closed) => false,
                Err(RecvError::Lagged(_)) => !handle.is_finished(),
            },
            _ = &mut limit => running = false,
            _ = tokio::signal::ctrl_c() => running = false,
        }
    }

    let last = handle.visible();
    handle.cancel();
    blink.stop().await;

    if config.looping && config.enabled {
        println!();
    } else {
        println!("{last}");
    }
    print_session_summary(renderer.frames(), renderer.cycles());
    Ok(())
}

async fn run_panel(to: Form, timings: PanelTimings) -> Result<()> {
    let from = match to {
        Form::Login => Form::Signup,
        Form::Signup => Form::Login,
    };
    let started = tokio::time::Instant::now();
    let observer = Arc::new(move |view: PanelView| {
        println!("{:>6}ms  {}", started.elapsed().as_millis(), describe(view));
    });

    let controller = PanelController::new(
        from,
        timings,
        Arc::new(TokioScheduler::current()?),
        observer,
    );
    println!("{:>6}ms  {}", 0, describe(controller.view()));
    controller.switch_to(to);

    tokio::select! {
        _ = tokio::time::sleep(timings.total() + Duration::from_millis(50)) => {}
        _ = tokio::signal::ctrl_c() => println!("\ninterrupted"),
    }
    Ok(())
}

fn describe(view: PanelView) -> String {
    let content = if view.content_visible {
        "shown"
    } else {
        "hidden"
    };
    format!(
        "panel {:>3}% at {:>2}%  content {:<6}  form {}",
        view.width_pct, view.offset_pct, content, view.form
    )
}

fn handle_preset(store: &PresetStore, action: PresetAction) -> Result<()> {
    match action {
        PresetAction::Save { name, sequence } => {
            let config = sequence.apply(SequenceConfig::new(DEFAULT_TEXT));
            store.save(&name, &config)?;
            println!("✓ saved preset '{name}'");
        }
        PresetAction::List => {
            let names = store.list()?;
            if names.is_empty() {
                println!("no presets saved");
            }
            for name in names {
                println!("  {name}");
            }
        }
        PresetAction::Show { name } => {
            let config = store
                .get(&name)?
                .with_context(|| format!("no preset named '{name}'"))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        PresetAction::Remove { name } => {
            store.remove(&name)?;
            println!("✓ removed preset '{name}'");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_on_top_of_base() {
        let cli = Cli::parse_from([
            "typist", "--text", "Hi", "--type-ms", "-5", "--once", "--graphemes",
        ]);
        let config = cli.sequence.apply(SequenceConfig::new("base"));
        assert_eq!(config.text, "Hi");
        assert_eq!(config.type_interval_ms, -5);
        assert!(!config.looping);
        assert_eq!(config.granularity, Granularity::Grapheme);
        assert!(config.timings().is_err());
    }

    #[test]
    fn no_overrides_keeps_base() {
        let cli = Cli::parse_from(["typist"]);
        let base = SequenceConfig::new("base");
        assert_eq!(cli.sequence.apply(base.clone()), base);
    }

    #[test]
    fn preset_save_accepts_sequence_options() {
        let cli = Cli::parse_from(["typist", "preset", "save", "hero", "--hold-ms", "900"]);
        match cli.command {
            Some(Command::Preset {
                action: PresetAction::Save { name, sequence },
            }) => {
                assert_eq!(name, "hero");
                assert_eq!(sequence.hold_ms, Some(900));
            }
            _ => panic!("expected preset save"),
        }
    }

    #[test]
    fn describe_panel_view() {
        let text = describe(PanelView {
            width_pct: 100,
            offset_pct: 0,
            content_visible: false,
            form: Form::Login,
        });
        assert!(text.contains("100%"));
        assert!(text.contains("hidden"));
        assert!(text.contains("login"));
    }
}
