//! The host's single-threaded command loop and the handle other tasks use
//! to reach it.
//!
//! The loop thread owns the [`Interpreter`]. Everything else (the network
//! task, the stdin reader) submits [`HostTask`]s over a channel and awaits a
//! oneshot reply.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use async_trait::async_trait;
use conduit_commands::{CommandNode, CommandRegistrar, Interpreter, Outcome, Sender};
use conduit_core::HostError;
use conduit_rpc::Host;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::console::{BUILTIN_NAMES, Builtin};
use crate::roster::Roster;

/// Work submitted to the host loop.
#[derive(Debug)]
pub enum HostTask {
    /// Run one command line.
    Execute {
        /// Input line.
        line: String,
        /// Who runs it.
        sender: Sender,
        /// Captured output or failure.
        reply: oneshot::Sender<Result<String, HostError>>,
    },
    /// Broadcast a chat message.
    Broadcast {
        /// Message text.
        message: String,
        /// Completion.
        reply: oneshot::Sender<()>,
    },
    /// Install a command tree.
    Install(CommandNode),
    /// Leave the loop.
    Stop,
}

/// Liveness shared by the loop and its handles.
#[derive(Debug, Default)]
struct HostState {
    stopped: AtomicBool,
    stopping: CancellationToken,
}

impl HostState {
    fn request_stop(&self) {
        if !self.stopping.is_cancelled() {
            info!("host stop requested");
        }
        self.stopped.store(true, Ordering::SeqCst);
        self.stopping.cancel();
    }
}

/// Cloneable access to the host loop.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostTask>,
    state: Arc<HostState>,
}

impl HostHandle {
    /// Run a line and wait for its output.
    pub async fn run(&self, line: &str, sender: Sender) -> Result<String, HostError> {
        let (reply, rx) = oneshot::channel();
        self.submit(HostTask::Execute {
            line: line.to_string(),
            sender,
            reply,
        })?;
        rx.await.map_err(|_| HostError::Dropped)?
    }

    /// Resolves once a stop was requested, by `stop` or by [`Host::shutdown`].
    pub async fn stopping(&self) {
        self.state.stopping.cancelled().await;
    }

    /// Tell the loop to exit after the queued tasks.
    pub fn stop_loop(&self) {
        self.state.request_stop();
        let _ = self.tx.send(HostTask::Stop);
    }

    fn submit(&self, task: HostTask) -> Result<(), HostError> {
        if self.state.stopped.load(Ordering::SeqCst) {
            return Err(HostError::NotRunning);
        }
        self.tx.send(task).map_err(|_| HostError::NotRunning)
    }
}

#[async_trait]
impl Host for HostHandle {
    async fn execute(&self, command: &str) -> Result<String, HostError> {
        self.run(command, Sender::console()).await
    }

    async fn broadcast(&self, message: &str) -> Result<(), HostError> {
        let (reply, rx) = oneshot::channel();
        self.submit(HostTask::Broadcast {
            message: message.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| HostError::Dropped)
    }

    fn shutdown(&self) {
        self.state.request_stop();
    }
}

impl CommandRegistrar for HostHandle {
    fn is_live(&self) -> bool {
        !self.state.stopped.load(Ordering::SeqCst)
    }

    fn register(&self, node: CommandNode) {
        let name = node.name.clone();
        if self.submit(HostTask::Install(node)).is_err() {
            warn!(name, "host is not running, command not installed");
        }
    }
}

/// State owned by the loop thread.
pub struct HostLoop {
    interpreter: Interpreter,
    roster: Arc<Roster>,
    state: Arc<HostState>,
}

impl HostLoop {
    fn new(interpreter: Interpreter, roster: Arc<Roster>, state: Arc<HostState>) -> Self {
        Self {
            interpreter,
            roster,
            state,
        }
    }

    fn run(mut self, mut rx: mpsc::UnboundedReceiver<HostTask>) {
        info!(commands = self.interpreter.commands().count(), "host loop started");
        while let Some(task) = rx.blocking_recv() {
            match task {
                HostTask::Execute {
                    line,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.execute(&line, &sender));
                }
                HostTask::Broadcast { message, reply } => {
                    broadcast(&message);
                    let _ = reply.send(());
                }
                HostTask::Install(node) => self.install(node),
                HostTask::Stop => break,
            }
        }
        self.state.stopped.store(true, Ordering::SeqCst);
        info!("host loop stopped");
    }

    /// Run one line: built-ins first, then installed commands.
    fn execute(&mut self, line: &str, sender: &Sender) -> Result<String, HostError> {
        let line = line.trim();
        let line = line.strip_prefix('/').unwrap_or(line);
        if line.is_empty() {
            return Err(HostError::Rejected("Empty command".to_string()));
        }
        debug!(sender = %sender.name, line, "executing");

        if let Some(builtin) = Builtin::parse(line) {
            let builtin = builtin.map_err(HostError::Rejected)?;
            return Ok(self.run_builtin(builtin, sender));
        }

        match self.interpreter.execute(line, sender) {
            Ok(Outcome::Dispatched(_status)) => Ok(String::new()),
            Ok(Outcome::Feedback(text)) => Ok(text),
            Err(e) => Err(HostError::Rejected(e.to_string())),
        }
    }

    fn run_builtin(&self, builtin: Builtin, sender: &Sender) -> String {
        match builtin {
            Builtin::Help => {
                let mut names: Vec<&str> = BUILTIN_NAMES.to_vec();
                names.extend(self.interpreter.commands());
                names.sort_unstable();
                names.dedup();
                names.iter().map(|n| format!("/{n}")).collect::<Vec<_>>().join("\n")
            }
            Builtin::List => {
                let players = self.roster.players();
                format!(
                    "There are {} players online: {}",
                    players.len(),
                    players.join(", ")
                )
            }
            Builtin::Join(name) => {
                if self.roster.join(&name) {
                    broadcast(&format!("{name} joined the game"));
                }
                format!("{name} is online")
            }
            Builtin::Leave(name) => {
                if self.roster.leave(&name) {
                    broadcast(&format!("{name} left the game"));
                }
                format!("{name} is offline")
            }
            Builtin::Say(message) => {
                let line = format!("[{}] {message}", sender.name);
                broadcast(&line);
                line
            }
            Builtin::Stop => {
                self.state.request_stop();
                "Stopping the server".to_string()
            }
        }
    }

    fn install(&mut self, node: CommandNode) {
        if Builtin::is_reserved(&node.name) {
            warn!(name = %node.name, "custom command is shadowed by a built-in");
        }
        debug!(name = %node.name, "installing command");
        self.interpreter.install(node);
    }
}

fn broadcast(message: &str) {
    info!(target: "chat", "{message}");
}

/// Start the loop thread.
pub fn spawn(
    interpreter: Interpreter,
    roster: Arc<Roster>,
) -> std::io::Result<(HostHandle, JoinHandle<()>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(HostState::default());
    let handle = HostHandle {
        tx,
        state: Arc::clone(&state),
    };
    let host = HostLoop::new(interpreter, roster, state);
    let thread = std::thread::Builder::new()
        .name("conduit-host-loop".to_string())
        .spawn(move || host.run(rx))?;
    Ok((handle, thread))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use conduit_commands::{Dispatcher, compile, placeholder};
    use conduit_core::{ArgumentSpec, ArgumentType, CommandSpec, EventSink, OutboundEvent};
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Events(Mutex<Vec<OutboundEvent>>);

    impl EventSink for Events {
        fn emit(&self, event: OutboundEvent) {
            self.0.lock().push(event);
        }
    }

    fn interpreter(events: &Arc<Events>, roster: &Arc<Roster>) -> Interpreter {
        let mut interp = Interpreter::new(Dispatcher::new(events.clone()), roster.clone());
        interp.install(compile(
            &CommandSpec::new("heal")
                .with_arguments(vec![ArgumentSpec::new("target", ArgumentType::Player)]),
        ));
        interp
    }

    fn host_loop() -> (HostLoop, Arc<Events>) {
        let events = Arc::new(Events::default());
        let roster = Arc::new(Roster::new(["Steve".to_string()]));
        let interp = interpreter(&events, &roster);
        (
            HostLoop::new(interp, roster, Arc::new(HostState::default())),
            events,
        )
    }

    #[test]
    fn custom_command_dispatches_event() {
        let (mut host, events) = host_loop();
        assert_eq!(host.execute("/heal steve", &Sender::console()).unwrap(), "");

        let events = events.0.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].data,
            Some(json!({
                "command": "heal",
                "sender": "Server",
                "senderType": "console",
                "arguments": {"target": "Steve"}
            }))
        );
    }

    #[test]
    fn interpreter_errors_are_rejections() {
        let (mut host, _) = host_loop();
        assert_matches!(
            host.execute("heal Herobrine", &Sender::console()),
            Err(HostError::Rejected(msg)) if msg.contains("No player was found")
        );
        assert_matches!(
            host.execute("fly", &Sender::console()),
            Err(HostError::Rejected(msg)) if msg == "Unknown command: fly"
        );
        assert_matches!(host.execute("  ", &Sender::console()), Err(HostError::Rejected(_)));
    }

    #[test]
    fn builtins() {
        let (mut host, _) = host_loop();
        let help = host.execute("help", &Sender::console()).unwrap();
        assert!(help.lines().any(|l| l == "/heal"));
        assert!(help.lines().any(|l| l == "/say"));

        assert_eq!(
            host.execute("join Alex", &Sender::console()).unwrap(),
            "Alex is online"
        );
        assert_eq!(
            host.execute("list", &Sender::console()).unwrap(),
            "There are 2 players online: Alex, Steve"
        );
        assert_eq!(
            host.execute("say hi all", &Sender::player("Alex")).unwrap(),
            "[Alex] hi all"
        );
        assert_matches!(
            host.execute("say", &Sender::console()),
            Err(HostError::Rejected(msg)) if msg == "Usage: say <message>"
        );
    }

    #[test]
    fn installed_placeholder_gives_feedback() {
        let (mut host, _) = host_loop();
        host.install(placeholder(&CommandSpec::new("warp")));
        assert_eq!(
            host.execute("warp", &Sender::console()).unwrap(),
            conduit_commands::PLACEHOLDER_FEEDBACK
        );
    }

    #[test]
    fn stop_builtin_requests_stop() {
        let (mut host, _) = host_loop();
        let _ = host.execute("stop", &Sender::console()).unwrap();
        assert!(host.state.stopping.is_cancelled());
        assert!(host.state.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn handle_round_trips_through_loop_thread() {
        let events = Arc::new(Events::default());
        let roster = Arc::new(Roster::new(["Steve".to_string()]));
        let (handle, thread) = spawn(interpreter(&events, &roster), roster).unwrap();

        assert!(handle.is_live());
        handle.register(placeholder(&CommandSpec::new("warp")));
        assert_eq!(
            handle.execute("warp").await.unwrap(),
            conduit_commands::PLACEHOLDER_FEEDBACK
        );
        handle.broadcast("hello").await.unwrap();
        assert_eq!(handle.run("heal Steve", Sender::console()).await.unwrap(), "");
        assert_eq!(events.0.lock().len(), 1);

        handle.stop_loop();
        tokio::task::spawn_blocking(move || thread.join().unwrap())
            .await
            .unwrap();
        assert!(!handle.is_live());
        assert_matches!(handle.execute("list").await, Err(HostError::NotRunning));
    }

    #[tokio::test]
    async fn shutdown_marks_not_live_and_wakes_waiters() {
        let events = Arc::new(Events::default());
        let roster = Arc::new(Roster::default());
        let (handle, thread) = spawn(interpreter(&events, &roster), roster).unwrap();

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.stopping().await })
        };
        handle.shutdown();
        waiter.await.unwrap();
        assert!(!handle.is_live());

        handle.stop_loop();
        tokio::task::spawn_blocking(move || thread.join().unwrap())
            .await
            .unwrap();
    }
}
