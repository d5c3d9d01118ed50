//! Quill entrypoint: a headless host that replays an event script.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::load_from;
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry, TickEventSource};
use core_model::{EditorModel, Flow};
use core_plugin::StaticPluginHost;
use core_text::TextBuffer;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod script;

use script::{ScriptEventSource, parse_script};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Quill headless editor host")]
struct Args {
    /// Optional path to open at startup (UTF-8 text). If omitted the buffer starts empty.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `quill.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Key-binding rule file (overrides `[keymap] path`).
    #[arg(long = "keymap")]
    pub keymap: Option<PathBuf>,
    /// Event script to replay; `-` reads standard input.
    #[arg(long = "script")]
    pub script: Option<PathBuf>,
    /// Editor locale as a BCP-47 tag (overrides `[editor] locale`).
    #[arg(long = "locale")]
    pub locale: Option<String>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

struct RuntimeContext {
    model: EditorModel,
    script: Vec<Event>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn run(&mut self, args: Args) -> Result<RuntimeContext> {
        self.configure_logging()?;
        Self::install_panic_hook();
        info!(target: "runtime", "startup");

        let script = match args.script.as_deref() {
            Some(path) => parse_script(&read_script(path)?)?,
            None => Vec::new(),
        };
        let model = Self::load_model(&args)?;
        info!(
            target: "runtime.startup",
            path = args.path.as_ref().map(|p| p.display().to_string()).as_deref(),
            script_events = script.len(),
            config_override = args.config.is_some(),
            "bootstrap_complete"
        );
        Ok(RuntimeContext { model, script })
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("quill.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "quill.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }

    fn load_model(args: &Args) -> Result<EditorModel> {
        let buffer = match args.path.as_ref() {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(content) => {
                    tracing::debug!(target: "io", file = %path.display(), size_bytes = content.len(), "file_read_ok");
                    TextBuffer::from_str(&content)
                }
                Err(e) => {
                    error!(target: "io", ?e, "file_open_error");
                    TextBuffer::new()
                }
            },
            None => TextBuffer::new(),
        };

        let mut config = load_from(args.config.clone())?;
        config.apply_overrides(args.locale.clone(), args.keymap.clone());

        let mut model = EditorModel::configured(buffer, &config);
        let mut host = match config.enabled_plugins() {
            Some(ids) => StaticPluginHost::with_enabled(ids.iter().cloned()),
            None => StaticPluginHost::all(),
        };
        let report = model.load_plugins(&mut host)?;
        for (id, reason) in &report.failed {
            warn!(target: "runtime.startup", id = id.as_str(), reason = reason.as_str(), "plugin_not_started");
        }
        Ok(model)
    }
}

fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut src = String::new();
        std::io::stdin()
            .read_to_string(&mut src)
            .context("reading script from stdin")?;
        return Ok(src);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    CommandQuit,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CommandQuit => "command_quit",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

struct EditorRuntime {
    model: EditorModel,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl EditorRuntime {
    fn new(
        model: EditorModel,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<tokio::task::JoinHandle<()>>,
    ) -> Self {
        Self {
            model,
            rx,
            tx: Some(tx),
            source_handles,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let loop_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = loop_span.enter();

        // The runtime keeps no sender of its own; sources own theirs.
        self.tx.take();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            let is_shutdown = event == Event::Shutdown;
            if self.model.handle(event) == Flow::Quit {
                shutdown_reason = if is_shutdown {
                    ShutdownReason::ShutdownEvent
                } else {
                    ShutdownReason::CommandQuit
                };
                break;
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        // Operations submitted off-thread right before shutdown still land.
        self.model.pump_remote();

        while let Some(handle) = self.source_handles.pop() {
            let abort = handle.abort_handle();
            match tokio::time::timeout(TICK_INTERVAL * 2, handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => {
                    warn!(
                        target: "runtime.shutdown",
                        reason = reason.as_str(),
                        "event_source_task_timeout"
                    );
                    abort.abort();
                }
            }
        }

        log_shutdown_stage(reason, "complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    let context = startup.run(args)?;
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(ScriptEventSource::new(context.script));
    registry.register(TickEventSource::new(TICK_INTERVAL));
    let source_handles = registry.spawn_all(&tx);

    let mut runtime = EditorRuntime::new(context.model, tx, rx, source_handles);
    runtime.run().await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(runtime.model.buffer().text().as_bytes())?;
    stdout.flush()?;
    Ok(())
}
