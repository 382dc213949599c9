//! Playback controller task
//!
//! Runs the orchestrator on its own tokio task. Commands from any number of
//! callers arrive over a channel and run one at a time; between commands
//! a frame interval drives the progress scheduler. While hidden, frames
//! stop and backend notifications are drained on a slower cadence.

use crate::command::PlaybackCommand;
use crate::error::{PlaybackError, Result};
use crate::orchestrator::PlaybackOrchestrator;
use crate::session::PlaybackSnapshot;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

const HIDDEN_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

enum ControlMessage {
    Command {
        command: PlaybackCommand,
        reply: oneshot::Sender<Result<bool>>,
    },
    Visibility(bool),
    Shutdown(oneshot::Sender<PlaybackOrchestrator>),
}

/// Cloneable handle for sending commands to the controller task
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<ControlMessage>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackHandle {
    /// Run a command and wait for its outcome
    pub async fn execute(&self, command: PlaybackCommand) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlMessage::Command { command, reply })
            .map_err(|_| PlaybackError::ControllerClosed)?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    /// Pause or resume frame ticks (e.g. window hidden)
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.tx
            .send(ControlMessage::Visibility(visible))
            .map_err(|_| PlaybackError::ControllerClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Latest committed snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the active instance, end the task and get the orchestrator back
    pub async fn shutdown(self) -> Result<PlaybackOrchestrator> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlMessage::Shutdown(reply))
            .map_err(|_| PlaybackError::ControllerClosed)?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)
    }
}

/// Spawns and runs the controller task
pub struct PlaybackController;

impl PlaybackController {
    /// Move the orchestrator onto a new task
    ///
    /// The task ends on [`PlaybackHandle::shutdown`] or once every handle
    /// is dropped.
    pub fn spawn(orchestrator: PlaybackOrchestrator) -> (PlaybackHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PlaybackHandle {
            tx,
            snapshots: orchestrator.subscribe(),
        };
        let task = tokio::spawn(Self::run(orchestrator, rx));
        (handle, task)
    }

    async fn run(
        mut orchestrator: PlaybackOrchestrator,
        mut rx: mpsc::UnboundedReceiver<ControlMessage>,
    ) {
        let mut frames = tokio::time::interval(orchestrator.config().frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut hidden_drain = tokio::time::interval(HIDDEN_DRAIN_INTERVAL);
        hidden_drain.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut visible = true;

        info!("Playback controller started");

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(ControlMessage::Command { command, reply }) => {
                        let result = orchestrator.dispatch(command).await;
                        if let Err(e) = &result {
                            debug!("Command failed: {}", e);
                        }
                        let _ = reply.send(result);
                    }
                    Some(ControlMessage::Visibility(now_visible)) => {
                        debug!("Frame ticks {}", if now_visible { "resumed" } else { "suspended" });
                        visible = now_visible;
                        orchestrator.drain_notifications();
                    }
                    Some(ControlMessage::Shutdown(reply)) => {
                        orchestrator.shutdown().await;
                        info!("Playback controller stopped");
                        let _ = reply.send(orchestrator);
                        return;
                    }
                    None => {
                        orchestrator.shutdown().await;
                        info!("All playback handles dropped, controller stopped");
                        return;
                    }
                },
                _ = frames.tick(), if visible => {
                    if let Err(e) = orchestrator.on_frame().await {
                        error!("Progress tick failed: {}", e);
                    }
                }
                _ = hidden_drain.tick(), if !visible => {
                    orchestrator.drain_notifications();
                }
            }
        }
    }
}
