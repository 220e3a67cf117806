use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

mod app;
mod commands;
mod controller;
mod error;
mod notify;
mod pomodoro;
mod storage;
mod tasks;
mod ws;

use app::App;
use commands::{HELP, parse_line};
use controller::{Controller, Snapshot};
use pomodoro::pomodoro::format_clock;
use storage::{FileStore, Persistence};

#[derive(Parser, Debug)]
#[command(author, version, about = "🍅 pomotask - Pomodoro timer with a task list")]
struct Args {
    /// Run the WebSocket daemon instead of the interactive prompt
    #[arg(long)]
    daemon: bool,

    /// Address the WebSocket daemon listens on
    #[arg(long, default_value = "127.0.0.1:8765")]
    addr: SocketAddr,

    /// Directory holding settings, timer state and tasks
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Also write logs to this file, rotated daily
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    /// Disable desktop notifications when a session ends
    #[arg(long)]
    no_notify: bool,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("pomotask"))
        .unwrap_or_else(|| PathBuf::from(".pomotask"))
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_directive = if verbose { "pomotask=debug" } else { "info" };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("log path {} has no file name", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.verbose, args.log.as_deref())?;

    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    info!("using data directory {}", data_dir.display());
    let controller = Controller::load(Persistence::new(FileStore::new(&data_dir)));
    let app = App::new(controller, !args.no_notify);

    if args.daemon {
        return run_daemon_mode(app, args.addr).await;
    }
    run_interactive(app).await
}

fn print_banner(snapshot: &Snapshot) {
    println!("🍅 pomotask - Pomodoro Timer & Task List");
    println!("======================================================");
    println!(
        "Pomodoro settings: {}min work / {}min break",
        snapshot.settings.work_minutes(),
        snapshot.settings.break_minutes()
    );
}

/// Interactive prompt: one command per line until `quit` or end of input.
async fn run_interactive(app: App) -> anyhow::Result<()> {
    let snapshot = app.snapshot();
    print_banner(&snapshot);
    println!("Type `help` for commands.\n");
    println!("{}", render_status(&snapshot));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "help" | "?" => println!("{HELP}"),
            "quit" | "exit" | "q" => break,
            input => match parse_line(input).and_then(|command| app.apply_typed(command)) {
                Ok(snapshot) => println!("{}", render_status(&snapshot)),
                Err(e) => println!("{e}"),
            },
        }
    }

    println!("{}", render_stats(&app.snapshot()));
    Ok(())
}

/// Run in daemon mode - WebSocket server driving the same controller.
async fn run_daemon_mode(app: App, addr: SocketAddr) -> anyhow::Result<()> {
    print_banner(&app.snapshot());
    println!("Running WebSocket server on ws://{addr}\n");

    tokio::select! {
        result = ws::websocket_server::start_websocket_server(addr, app.clone()) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
    }

    println!("{}", render_stats(&app.snapshot()));
    Ok(())
}

fn render_status(snapshot: &Snapshot) -> String {
    let timer = &snapshot.timer;
    let mut out = format!(
        "{} {} {} {}",
        timer.mode.emoji(),
        timer.mode.as_str(),
        format_clock(timer.remaining),
        if timer.running { "(running)" } else { "(paused)" }
    );

    if snapshot.tasks.is_empty() {
        out.push_str("\n  no tasks yet (`add <name>`)");
    }
    for (position, task) in snapshot.tasks.iter().enumerate() {
        let selected = snapshot.selected_task_id.as_deref() == Some(task.id.as_str());
        out.push_str(&format!(
            "\n{} {:>2}. [{}] {} - {} 🍅  ({})",
            if selected { "▶" } else { " " },
            position + 1,
            if task.done { "x" } else { " " },
            task.name,
            task.pomodoros,
            task.id.chars().take(8).collect::<String>()
        ));
    }
    out
}

fn render_stats(snapshot: &Snapshot) -> String {
    let mut sorted: Vec<_> = snapshot
        .tasks
        .iter()
        .filter(|task| task.pomodoros > 0)
        .collect();
    sorted.sort_by(|a, b| b.pomodoros.cmp(&a.pomodoros));

    let mut out = String::from("\n--- Session Statistics ---\nPomodoros per task:");
    if sorted.is_empty() {
        out.push_str("\n  none yet");
    }
    for task in sorted {
        out.push_str(&format!("\n  {} - {}", task.name, task.pomodoros));
    }
    out.push_str("\n------------------------\n");
    out
}
