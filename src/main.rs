//! Claude Log Tail - Follow Claude Code conversation logs as they are written.

use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use claude_log_tail::config::{ColorMode, ConfigError, ConfigLoader, TailConfig};
use claude_log_tail::display;
use claude_log_tail::watcher::{TailEngine, TailEvent};

#[derive(Parser)]
#[command(
    name = "claude-log-tail",
    about = "Follow Claude Code JSONL conversation logs with compact colored output",
    version
)]
struct Cli {
    /// Directory to watch for log files.
    directory: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How often to read new lines, in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// How often to look for new files, in seconds.
    #[arg(long)]
    scan_interval_secs: Option<u64>,

    /// When to use colors.
    #[arg(long, value_enum)]
    color: Option<ColorMode>,

    /// Wait for a trailing line's newline before parsing it.
    #[arg(long)]
    hold_partial_lines: bool,
}

impl Cli {
    fn load_config(&self) -> Result<TailConfig, ConfigError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::with_path(path.clone()),
            None => ConfigLoader::new(),
        };
        let mut config = loader.load()?;

        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(secs) = self.scan_interval_secs {
            config.scan_interval_secs = secs;
        }
        if let Some(color) = self.color {
            config.color = color;
        }
        if self.hold_partial_lines {
            config.hold_partial_lines = true;
        }
        Ok(config)
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Resolve `path` against the current directory without touching symlinks.
///
/// `.` components are dropped and `..` pops the preceding component, so the
/// root shown in the banner and used for project names is canonical in form.
fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_lexically(&joined)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(directory) = cli.directory.as_deref() else {
        println!("{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let styled = config.color.should_style();

    let mut engine = match TailEngine::new(absolutize(directory), config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = engine.config();
    display::print_startup(
        engine.root(),
        &config.suffix,
        config.poll_interval(),
        config.scan_interval(),
    );
    let suffix = config.suffix.clone();
    let count = engine.initial_scan();
    display::print_file_count(count, &suffix);

    engine
        .run(
            |event| match event {
                TailEvent::Record(record) => display::print_record(&record, styled),
                TailEvent::Discovered { project, time, .. } => {
                    display::print_discovery(&time, &project, styled);
                }
            },
            shutdown_signal(),
        )
        .await;

    display::print_shutdown(styled);
    ExitCode::SUCCESS
}
