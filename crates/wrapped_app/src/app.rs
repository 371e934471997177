use std::io::{self, BufRead};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use wrapped_core::{update, AppState, Msg, StatusView};
use wrapped_engine::{JobStore, MemoryJobStore, RestJobStore};
use wrapped_logging::{wrapped_info, wrapped_warn};

use crate::config::{AppConfig, StoreConfig};
use crate::effects::EffectRunner;
use crate::render::render;
use crate::simulator::{Simulator, SimulatorHandle};

const INPUT_LATENCY: Duration = Duration::from_millis(50);
const HELP: &str = "Commands: connect <wallet>, disconnect, start, retry, dismiss, help, quit";

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Msg),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("connect", Some(wallet)) => Command::Send(Msg::WalletConnected(wallet.to_string())),
        ("disconnect", None) => Command::Send(Msg::WalletDisconnected),
        ("start", None) => Command::Send(Msg::StartClicked),
        ("retry", None) => Command::Send(Msg::RetryClicked),
        ("dismiss", None) => Command::Send(Msg::DismissNotice),
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit" | "q", None) => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Runs the message loop until the user quits or stdin closes.
pub fn run(config: AppConfig, wallet: Option<String>, start: bool) -> anyhow::Result<()> {
    let (store, _simulator) = build_store(&config)?;
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(store, config.engine_settings(), msg_tx);

    let (input_tx, input_rx) = mpsc::channel::<Command>();
    spawn_stdin_reader(input_tx);

    let mut state = AppState::new();
    if let Some(wallet) = wallet {
        dispatch(&mut state, &runner, Msg::WalletConnected(wallet));
    }
    if start {
        dispatch(&mut state, &runner, Msg::StartClicked);
    }
    println!("{HELP}");
    println!("{}", render(&state.view()));
    state.consume_dirty();

    let mut input_open = true;
    loop {
        // User input first; engine messages are drained in batches so a burst
        // of updates renders once.
        match input_rx.try_recv() {
            Ok(Command::Send(msg)) => dispatch(&mut state, &runner, msg),
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Err(mpsc::TryRecvError::Disconnected) if input_open => {
                wrapped_info!("Input closed; running until the report settles");
                input_open = false;
            }
            Err(_) => {}
        }
        if let Ok(msg) = msg_rx.recv_timeout(INPUT_LATENCY) {
            dispatch(&mut state, &runner, msg);
            while let Ok(msg) = msg_rx.try_recv() {
                dispatch(&mut state, &runner, msg);
            }
        }
        if state.consume_dirty() {
            println!("{}", render(&state.view()));
        }
        if !input_open && is_settled(&state.view()) {
            break;
        }
    }

    dispatch(&mut state, &runner, Msg::WalletDisconnected);
    wrapped_info!("Shutting down");
    Ok(())
}

/// Nothing further can happen without user input: no wallet, or a finished
/// job with no create outstanding.
pub fn is_settled(view: &StatusView) -> bool {
    view.wallet.is_none() || (!view.creating && view.status.is_terminal())
}

fn dispatch(state: &mut AppState, runner: &EffectRunner, msg: Msg) {
    let (next, effects) = update(std::mem::take(state), msg);
    *state = next;
    runner.enqueue(effects);
}

fn build_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn JobStore>, Option<SimulatorHandle>)> {
    match &config.store {
        StoreConfig::Memory {
            unique_active,
            simulate,
        } => {
            let memory = Arc::new(MemoryJobStore::new().with_unique_active(*unique_active));
            let simulator = simulate
                .then(|| Simulator::new(memory.clone(), config.simulator.clone()).spawn());
            let store: Arc<dyn JobStore> = memory;
            Ok((store, simulator))
        }
        StoreConfig::Rest(settings) => {
            let store: Arc<dyn JobStore> = Arc::new(
                RestJobStore::new(settings).context("could not set up REST store")?,
            );
            Ok((store, None))
        }
    }
}

fn spawn_stdin_reader(tx: mpsc::Sender<Command>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let command = parse_command(&line).unwrap_or_else(|| {
                wrapped_warn!("Unknown command: {}", line.trim());
                Command::Help
            });
            let quit = command == Command::Quit;
            if tx.send(command).is_err() || quit {
                break;
            }
        }
    });
}
