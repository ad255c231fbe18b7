//! Plumbing between the scan task and the display surface.
//!
//! Frames flow scan → UI over a small bounded channel: the scan loop's
//! preview is best-effort, so when the UI cannot keep up the frame is
//! dropped rather than blocking the loop and perturbing device timing.
//! Commands flow UI → scan over an unbounded tokio channel; the receiver
//! is polled through `&mut`, which keeps the scan future spawnable onto a
//! runtime worker. A disconnected command channel means the window is gone
//! and is treated as an exit request.

use crate::viewport::{ColorFrame, ViewCommand};
use std::sync::mpsc;
use tokio::sync::mpsc::{
    error::TryRecvError, unbounded_channel, UnboundedReceiver, UnboundedSender,
};
use tracing::trace;

/// Maximum preview frame queue depth. Only the latest frame matters to the
/// viewer, so a few slots of jitter headroom are enough.
pub const MAX_QUEUED_FRAMES: usize = 4;

/// Sender half for rendered frames.
pub type FrameSender = mpsc::SyncSender<ColorFrame>;
/// Receiver half for rendered frames.
pub type FrameReceiver = mpsc::Receiver<ColorFrame>;

/// Scan-side endpoints: publishes frames, consumes commands.
pub struct DisplayLink {
    frames: FrameSender,
    commands: UnboundedReceiver<ViewCommand>,
}

/// UI-side endpoints: consumes frames, publishes commands.
pub struct UiLink {
    /// Rendered frames, newest last; drain and keep the latest.
    pub frames: FrameReceiver,
    /// Navigation and exit commands for the scan task.
    pub commands: UnboundedSender<ViewCommand>,
}

/// Result of a non-blocking command poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPoll {
    /// A command was waiting.
    Command(ViewCommand),
    /// No command pending.
    Empty,
    /// The UI side is gone; treat as exit.
    Closed,
}

/// Create the connected channel pair between scan task and UI.
pub fn display_channels() -> (DisplayLink, UiLink) {
    let (frame_tx, frame_rx) = mpsc::sync_channel(MAX_QUEUED_FRAMES);
    let (command_tx, command_rx) = unbounded_channel();
    (
        DisplayLink {
            frames: frame_tx,
            commands: command_rx,
        },
        UiLink {
            frames: frame_rx,
            commands: command_tx,
        },
    )
}

impl DisplayLink {
    /// Publish a preview frame, dropping it if the queue is full.
    pub fn present(&self, frame: ColorFrame) {
        match self.frames.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => trace!("preview frame dropped"),
            Err(mpsc::TrySendError::Disconnected(_)) => trace!("display surface gone"),
        }
    }

    /// Non-blocking poll for the next pending command.
    pub fn poll_command(&mut self) -> CommandPoll {
        match self.commands.try_recv() {
            Ok(command) => CommandPoll::Command(command),
            Err(TryRecvError::Empty) => CommandPoll::Empty,
            Err(TryRecvError::Disconnected) => CommandPoll::Closed,
        }
    }
}
