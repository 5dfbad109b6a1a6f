//! Async keyboard input task.
//!
//! Wraps crossterm's `EventStream` in a Tokio task that normalizes key
//! events into [`KeyInput`] and forwards them over the session channel.
//! A `Notify`-based shutdown handle lets the controller stop the task
//! without tearing the stream down from another thread.

use crate::events::{Event, KeyInput};
use crossterm::event::{
    Event as CEvent, EventStream, KeyCode as CKeyCode, KeyEventKind as CKind, KeyModifiers,
};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tokio_stream::StreamExt;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct InputShutdown {
    notify: Arc<Notify>,
}

impl InputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    ShutdownSignal,
    ChannelClosed,
    StreamEnded,
    StreamError,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::StreamEnded => "stream_ended",
            ExitReason::StreamError => "stream_error",
        }
    }
}

/// Spawn the input task. The task ends on shutdown signal, closed channel,
/// or exhausted stream, and logs which.
pub fn spawn_input_task(tx: Sender<Event>) -> (task::JoinHandle<()>, InputShutdown) {
    let notify = Arc::new(Notify::new());
    let shutdown = InputShutdown {
        notify: notify.clone(),
    };
    let handle = task::spawn(async move {
        info!(target: "session.input", "input_task_started");
        let mut stream = EventStream::new();
        let reason = loop {
            let maybe_event = tokio::select! {
                biased;
                _ = notify.notified() => break ExitReason::ShutdownSignal,
                ev = stream.next() => ev,
            };
            let Some(result) = maybe_event else {
                break ExitReason::StreamEnded;
            };
            let event = match result {
                Ok(ev) => ev,
                Err(e) => {
                    debug!(target: "session.input", error = %e, "stream_error");
                    break ExitReason::StreamError;
                }
            };
            let outgoing = match event {
                CEvent::Key(key) if key.kind != CKind::Release => translate_key(
                    key.code,
                    key.modifiers,
                )
                .map(Event::Key),
                CEvent::Resize(w, h) => Some(Event::Resize(w, h)),
                _ => None,
            };
            if let Some(event) = outgoing {
                if tx.send(event).await.is_err() {
                    break ExitReason::ChannelClosed;
                }
            }
        };
        info!(target: "session.input", reason = reason.as_str(), "input_task_stopped");
    });
    (handle, shutdown)
}

fn translate_key(code: CKeyCode, modifiers: KeyModifiers) -> Option<KeyInput> {
    match code {
        CKeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(KeyInput::CtrlC),
        CKeyCode::Char(c) => Some(KeyInput::Char(c)),
        CKeyCode::Enter => Some(KeyInput::Enter),
        CKeyCode::Esc => Some(KeyInput::Esc),
        CKeyCode::Backspace | CKeyCode::Delete => Some(KeyInput::Backspace),
        _ => None,
    }
}
