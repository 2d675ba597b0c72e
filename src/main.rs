use std::{
    fs::OpenOptions,
    process::ExitCode,
    sync::{
        mpsc::{sync_channel, SyncSender, TrySendError},
        Mutex,
    },
    thread,
};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use netrate::app::{Control, PollLoop};
use netrate::config::{Args, Config};
use netrate::constants::CONTROL_QUEUE_DEPTH;
use netrate::error::{Error, Result};
use netrate::procnet::ProcNetSource;
use netrate::ui::{TerminalGuard, TerminalUi};

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    init_logging(args)?;

    // Everything that can fail on configuration happens before the terminal is touched
    let config = Config::from_args(args)?;
    info!(
        freq = %humantime::format_duration(config.frequency),
        buckets = config.windows.len(),
        proc_dir = %config.proc_dir.display(),
        "configuration accepted"
    );
    let source = ProcNetSource::new(&config.proc_dir);
    let mut poll = PollLoop::new(&config, source)?;

    let (tx, rx) = sync_channel(CONTROL_QUEUE_DEPTH);
    let interrupt_tx = tx.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        forward(&interrupt_tx, Control::Interrupt);
    }) {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }

    let _guard = TerminalGuard::enter()?;
    let mut ui = TerminalUi::stdout(format!("netrate [{}]", config.proc_dir.display()))?;
    spawn_input_task(tx);

    let result = poll.run(&mut ui, &rx);
    info!(state = ?poll.state(), "poll loop finished");
    result
}

fn init_logging(args: &Args) -> Result<()> {
    // The terminal belongs to the UI, so logs only ever go to a file
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| Error::LogFile { path: path.clone(), error })?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("netrate={}", args.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Blocks on keyboard input and forwards keys; abandoned when the loop exits.
fn spawn_input_task(tx: SyncSender<Control>) {
    thread::spawn(move || loop {
        let control = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                // Raw mode swallows SIGINT, so Ctrl-C arrives as a key
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Control::Interrupt,
                KeyCode::Char(c) => Control::Key(c),
                _ => continue,
            },
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(error = %err, "input task stopped");
                return;
            }
        };
        if !forward(&tx, control) {
            return;
        }
    });
}

/// Never blocks the producer; returns false once the loop has gone away.
fn forward(tx: &SyncSender<Control>, control: Control) -> bool {
    match tx.try_send(control) {
        Ok(()) | Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Disconnected(_)) => false,
    }
}
