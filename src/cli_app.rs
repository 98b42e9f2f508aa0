//! Top-level CLI definition and dispatch.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use crossbeam_channel::{Receiver, bounded};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use tundash::core::cancel::Canceller;
use tundash::core::config::Config;
use tundash::core::errors::{SessionError, TunError};
use tundash::core::mode::TunnelMode;
use tundash::daemon::signals::{SIGNAL_POLL_INTERVAL, SignalHandler};
use tundash::logger::{LogCapture, LogRingBuffer, LogSink, init_tracing};
use tundash::tui::preferences::load_or_default;
use tundash::tui::{
    ColorMode, CounterTelemetry, FilePreferencesStore, PreferencesStore, RuntimeActivation,
    Session, SessionDeps, SessionHandle, SessionOptions, ThemeId,
};

/// Operator dashboard for a network-tunnel daemon.
#[derive(Debug, Parser)]
#[command(
    name = "tundash",
    author,
    version,
    about = "Tunnel operator dashboard",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the dashboard against a simulated data plane.
    Run(RunArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Start with this theme (saved to preferences).
    #[arg(long, value_name = "NAME")]
    theme: Option<String>,
    /// Fail the data plane permanently after SECS seconds.
    #[arg(long, value_name = "SECS")]
    fail_after: Option<u64>,
    /// Drop the data-plane connection every SECS seconds.
    #[arg(long, value_name = "SECS")]
    drop_every: Option<u64>,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Tun(#[from] TunError),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Tun(_) => 2,
            Self::Session(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_dashboard(cli, args),
        Command::Config => run_config(cli),
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::User(format!("invalid config: {e}")))
}

fn run_config(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let toml_str = config.to_toml()?;
    println!("{toml_str}");
    Ok(())
}

// ──────────────────── run ────────────────────

fn run_dashboard(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;

    let sink = LogSink::stderr();
    init_tracing(&sink, &config.logging.level)?;
    let buffer = Arc::new(LogRingBuffer::new(config.logging.capacity));
    let capture = LogCapture::new(sink, buffer);

    let store = Arc::new(FilePreferencesStore::new(config.paths.preferences_file.clone()));
    if let Some(name) = &args.theme {
        let mut prefs = load_or_default(store.as_ref());
        prefs.theme = ThemeId::from_name(name);
        if let Err(e) = store.save(&prefs) {
            warn!(error = %e, "could not persist theme override");
        }
    }

    let signals = SignalHandler::new();
    let shutdown = signals.watch(SIGNAL_POLL_INTERVAL)?;
    let color = if cli.no_color {
        ColorMode::Disabled
    } else {
        ColorMode::from_environment()
    };

    let options = SessionOptions::interactive(config)
        .with_context(shutdown.token())
        .with_color(color);
    let deps = SessionDeps {
        preferences: store,
        logs: None,
        capture: Some(capture),
    };
    let session = Session::start(options, deps)?;

    let plan = FailurePlan {
        fail_at: args.fail_after.map(|secs| Instant::now() + Duration::from_secs(secs)),
        drop_every: args.drop_every.map(Duration::from_secs),
    };
    let result = drive(&session, &plan);
    session.close();
    session.join();

    match result {
        Ok(()) | Err(SessionError::UserExit) => Ok(()),
        Err(SessionError::SessionClosed) if shutdown.fired() => {
            info!("dashboard closed by signal");
            Ok(())
        }
        Err(e) => {
            println!("{} {e}", "dashboard stopped:".yellow());
            Err(e.into())
        }
    }
}

/// Select a mode, run the data plane, reconnect on drops, show the fatal
/// screen when it fails for good.
fn drive(session: &SessionHandle, plan: &FailurePlan) -> Result<(), SessionError> {
    loop {
        let mode = session.wait_mode_selected()?;
        info!(mode = mode.id(), "mode selected");
        let mut backoff = Backoff::default();

        loop {
            let mut plane = SimulatedDataPlane::start(mode, plan)?;
            session.activate_runtime(plane.activation())?;
            let started = Instant::now();

            match session.wait_runtime_exit() {
                Ok(_) => {
                    info!(mode = mode.id(), "operator requested reconfigure");
                    plane.stop();
                    break;
                }
                Err(SessionError::RuntimeDisconnected) => {
                    plane.stop();
                    if plane.failed() {
                        return session.show_fatal(format!(
                            "{} data plane failed: tunnel device lost. Restart the daemon to recover.",
                            mode.title()
                        ));
                    }
                    if started.elapsed() > Backoff::RESET_AFTER {
                        backoff = Backoff::default();
                    }
                    let delay = backoff.next_delay();
                    warn!(delay_ms = delay.as_millis(), "data plane disconnected; reconnecting");
                    thread::sleep(delay);
                }
                Err(e) => {
                    plane.stop();
                    return Err(e);
                }
            }
        }
    }
}

// ──────────────────── backoff ────────────────────

/// Exponential reconnect delay: 250 ms doubling up to 4 s.
#[derive(Debug, Default)]
struct Backoff {
    attempt: u32,
}

impl Backoff {
    const BASE: Duration = Duration::from_millis(250);
    const MAX: Duration = Duration::from_secs(4);
    /// A connection that lasted this long resets the backoff.
    const RESET_AFTER: Duration = Duration::from_secs(10);

    fn next_delay(&mut self) -> Duration {
        let factor = 1u32 << self.attempt.min(5);
        self.attempt = self.attempt.saturating_add(1);
        (Self::BASE * factor).min(Self::MAX)
    }
}

// ──────────────────── simulated data plane ────────────────────

#[derive(Debug, Clone, Copy)]
struct FailurePlan {
    fail_at: Option<Instant>,
    drop_every: Option<Duration>,
}

/// Stand-in for the real tunnel: random traffic, a ready signal after a short
/// handshake, and scripted drops or failure.
struct SimulatedDataPlane {
    mode: TunnelMode,
    context: Arc<Canceller>,
    failed: Arc<AtomicBool>,
    telemetry: Arc<CounterTelemetry>,
    ready: Option<Receiver<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SimulatedDataPlane {
    const SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

    fn start(mode: TunnelMode, plan: &FailurePlan) -> Result<Self, TunError> {
        let context = Arc::new(Canceller::new());
        let failed = Arc::new(AtomicBool::new(false));
        let telemetry = Arc::new(CounterTelemetry::new());
        let (ready_tx, ready_rx) = bounded(1);

        let ctx = Arc::clone(&context);
        let fail_flag = Arc::clone(&failed);
        let counters = Arc::clone(&telemetry);
        let plan = *plan;
        let thread = thread::Builder::new()
            .name("tundash-dataplane".to_string())
            .spawn(move || {
                let token = ctx.token();
                let mut rng = rand::rng();
                info!(mode = mode.id(), "bringing up data plane");
                let handshake = Duration::from_millis(rng.random_range(400..1200));
                if !token.sleep(handshake) {
                    return;
                }
                let _ = ready_tx.send(());
                info!(mode = mode.id(), "data plane connected");

                let drop_at = plan.drop_every.map(|every| Instant::now() + every);
                loop {
                    if !token.sleep(Self::SAMPLE_INTERVAL) {
                        debug!("data plane stopped");
                        return;
                    }
                    counters.record_rx(rng.random_range(20_000..2_000_000));
                    counters.record_tx(rng.random_range(5_000..400_000));
                    if rng.random_ratio(1, 20) {
                        info!(peers = rng.random_range(1..8), "keepalive ok");
                    }
                    if rng.random_ratio(1, 60) {
                        warn!(rtt_ms = rng.random_range(180..900), "high round-trip time");
                    }
                    let now = Instant::now();
                    if plan.fail_at.is_some_and(|at| now >= at) {
                        error!("tunnel device lost; giving up");
                        fail_flag.store(true, Ordering::SeqCst);
                        ctx.cancel();
                        return;
                    }
                    if drop_at.is_some_and(|at| now >= at) {
                        warn!("peer unreachable; connection dropped");
                        ctx.cancel();
                        return;
                    }
                }
            })
            .map_err(|e| TunError::Runtime {
                details: format!("failed to spawn data plane: {e}"),
            })?;

        Ok(Self {
            mode,
            context,
            failed,
            telemetry,
            ready: Some(ready_rx),
            thread: Some(thread),
        })
    }

    fn activation(&mut self) -> RuntimeActivation {
        let telemetry: Arc<dyn tundash::tui::TrafficSource> = self.telemetry.clone();
        let activation = RuntimeActivation::new(self.mode, self.context.token(), telemetry);
        match self.ready.take() {
            Some(ready) => activation.with_ready(ready),
            None => activation,
        }
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.context.cancel();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("data plane thread panicked");
        }
    }
}

impl Drop for SimulatedDataPlane {
    fn drop(&mut self) {
        self.stop();
    }
}
