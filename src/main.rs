mod app;
mod cli;
mod config;
mod diagnosis;
mod input;
mod k8s;
mod kubectl;
mod model;
mod pipeline;
mod registry;
mod ui;
mod view;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppEvent};
use clap::Parser;
use cli::CliArgs;
use config::Settings;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use k8s::KubeGateway;
use kubectl::KubectlLauncher;
use model::WorkloadKey;
use pipeline::{FetchEvent, Pipeline};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use registry::ProcessRegistry;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let settings = Settings::load(&args)?;
    info!(
        config = ?settings.config_source,
        refresh_ms = settings.refresh.as_millis() as u64,
        namespace = %settings.namespace,
        "starting"
    );

    let gateway = KubeGateway::connect(settings.kubeconfig.as_deref()).await?;
    let version = timeout(CONNECT_TIMEOUT, gateway.verify())
        .await
        .with_context(|| {
            format!(
                "timed out after {}s reaching cluster {}",
                CONNECT_TIMEOUT.as_secs(),
                gateway.cluster()
            )
        })??;
    info!(cluster = gateway.cluster(), %version, "connected");

    let (tx, rx) = mpsc::unbounded_channel::<FetchEvent>();
    let pipeline = Pipeline::new(gateway, tx, &settings);
    let registry = ProcessRegistry::new(Box::new(KubectlLauncher::new(
        settings.kubeconfig.clone(),
    )));
    let app = App::new(
        settings.namespace.clone(),
        settings.forward_local_port,
        registry,
    );

    run(app, pipeline, rx, &settings).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(
    app: App,
    mut pipeline: Pipeline,
    mut rx: mpsc::UnboundedReceiver<FetchEvent>,
    settings: &Settings,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    // On error the app is dropped and kill_on_drop reaps remaining port-forwards.
    let run_result = run_loop(&mut terminal, app, &mut pipeline, &mut rx, settings)
        .await
        .map(|mut app| {
            // Quit already shut the app down; only stream closure gets here running.
            if app.is_running() {
                let stopped = app.shutdown();
                debug!(stopped, "event stream ended, port-forwards stopped");
            }
        });
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    mut app: App,
    pipeline: &mut Pipeline,
    rx: &mut mpsc::UnboundedReceiver<FetchEvent>,
    settings: &Settings,
) -> Result<App> {
    let size = terminal.size().context("failed to read terminal size")?;
    let initial = AppEvent::Resize {
        width: size.width,
        height: size.height,
    };
    app = dispatch(terminal, app, pipeline, settings, initial).await?;

    let mut reader = EventStream::new();
    let mut ticker = interval(settings.refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal
            .draw(|frame| ui::render(frame, &app))
            .context("failed to render terminal frame")?;

        if !app.is_running() {
            break;
        }

        let event = tokio::select! {
            maybe_event = reader.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match input::map_key(app.input_mode(), key) {
                        Some(action) => AppEvent::Input(action),
                        None => continue,
                    }
                }
                Some(Ok(Event::Resize(width, height))) => AppEvent::Resize { width, height },
                Some(Ok(_)) => continue,
                Some(Err(error)) => {
                    app.set_status(format!("terminal event error: {error}"));
                    continue;
                }
                None => {
                    info!("terminal event stream closed");
                    break;
                }
            },
            _ = ticker.tick() => AppEvent::Tick,
            Some(fetched) = rx.recv() => AppEvent::Fetched(fetched),
        };

        app = dispatch(terminal, app, pipeline, settings, event).await?;
    }

    Ok(app)
}

/// Feeds one event through the reducer and performs the resulting command,
/// looping while commands produce follow-up events.
async fn dispatch(
    terminal: &mut TuiTerminal,
    mut app: App,
    pipeline: &mut Pipeline,
    settings: &Settings,
    event: AppEvent,
) -> Result<App> {
    let mut next = Some(event);
    while let Some(event) = next.take() {
        let (updated, command) = app.update(event);
        app = updated;
        next = execute_app_command(terminal, &app, pipeline, settings, command).await?;
    }
    Ok(app)
}

async fn execute_app_command(
    terminal: &mut TuiTerminal,
    app: &App,
    pipeline: &mut Pipeline,
    settings: &Settings,
    command: AppCommand,
) -> Result<Option<AppEvent>> {
    match command {
        AppCommand::None => {}
        AppCommand::RefreshAll => pipeline.refresh_all(),
        AppCommand::RefreshWorkloads => pipeline.refresh_workloads(),
        AppCommand::LoadLogs { key, container } => pipeline.load_logs(key, container),
        AppCommand::Diagnose(record) => pipeline.diagnose(record),
        AppCommand::LoadManifest(key) => pipeline.load_manifest(key),
        AppCommand::DeleteWorkload { key, restart } => pipeline.delete(key, restart),
        AppCommand::CleanseNamespace(namespace) => pipeline.cleanse(namespace),
        AppCommand::OpenShell { key, container } => {
            terminal
                .draw(|frame| ui::render(frame, app))
                .context("failed to render terminal frame")?;
            let error = run_kubectl_shell(terminal, settings.kubeconfig.as_ref(), &key, &container)
                .await
                .err()
                .map(|error| compact_error(&error));
            return Ok(Some(AppEvent::ShellExited { key, error }));
        }
    }
    Ok(None)
}

async fn run_kubectl_shell(
    terminal: &mut TuiTerminal,
    kubeconfig: Option<&PathBuf>,
    key: &WorkloadKey,
    container: &str,
) -> Result<()> {
    suspend_terminal_for_subprocess(terminal)?;

    let run_result = kubectl::shell_command(kubeconfig, key, container)
        .status()
        .await
        .with_context(|| format!("failed to run kubectl shell for {key}"));
    let restore_result = resume_terminal_after_subprocess(terminal);

    let status = match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => {
            return Err(anyhow::anyhow!(
                "{run_error:#}\nterminal resume error: {restore_error:#}"
            ));
        }
        (Err(error), _) => return Err(error),
        (_, Err(error)) => return Err(error),
        (Ok(status), Ok(())) => status,
    };

    if status.success() {
        Ok(())
    } else {
        warn!(workload = %key, %status, "shell exited unsuccessfully");
        Err(anyhow::anyhow!("kubectl shell exited with {status}"))
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

/// First line of the error plus up to two causes.
pub(crate) fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
