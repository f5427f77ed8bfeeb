//! Async boundary: feeds a `Session` from a stream of frame-delivery events.
//!
//! Each event is handled to completion before the next one is awaited.

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::pose::Frame;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{FrameReport, Session};
use crate::view::View;

#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Frame(Frame),
    /// The pose estimator failed on this frame.
    PoseFailed,
    /// A new source was opened.
    LoadSource,
    SetView(View),
}

impl From<ClientMessage> for FrameEvent {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Frame { frame } => FrameEvent::Frame(frame),
            ClientMessage::PoseFailed => FrameEvent::PoseFailed,
            ClientMessage::LoadSource => FrameEvent::LoadSource,
            ClientMessage::SetView { view } => FrameEvent::SetView(view),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Report(Box<FrameReport>),
    /// Duplicate frame index, nothing ran.
    Skipped { frame_index: Option<u64> },
    /// Control event with no per-frame output.
    Applied,
}

impl EventOutcome {
    /// Reply to send back over the wire, if any.
    pub fn into_message(self) -> Option<ServerMessage> {
        match self {
            EventOutcome::Report(report) => Some(ServerMessage::Report(report)),
            EventOutcome::Skipped { frame_index } => Some(ServerMessage::Skipped { frame_index }),
            EventOutcome::Applied => None,
        }
    }
}

/// Applies one event to the session.
pub fn handle_event(session: &mut Session, event: FrameEvent) -> EventOutcome {
    match event {
        FrameEvent::Frame(frame) => match session.process(&frame) {
            Some(report) => EventOutcome::Report(Box::new(report)),
            None => EventOutcome::Skipped {
                frame_index: frame.frame_index(),
            },
        },
        FrameEvent::PoseFailed => {
            session.pose_failed();
            EventOutcome::Applied
        }
        FrameEvent::LoadSource => {
            session.reset();
            EventOutcome::Applied
        }
        FrameEvent::SetView(view) => {
            session.set_view(view);
            EventOutcome::Applied
        }
    }
}

/// Drives `session` until `events` ends or the receiver goes away.
/// Returns the number of reports delivered.
pub async fn drive<S>(session: &mut Session, mut events: S, tx: mpsc::Sender<FrameReport>) -> u64
where
    S: Stream<Item = FrameEvent> + Unpin,
{
    let mut delivered = 0;
    while let Some(event) = events.next().await {
        if let EventOutcome::Report(report) = handle_event(session, event) {
            if tx.send(*report).await.is_err() {
                debug!("report receiver dropped, stopping");
                break;
            }
            delivered += 1;
        }
    }
    delivered
}
