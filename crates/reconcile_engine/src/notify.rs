//! Conflict resolution notifications.
//!
//! Notices are informational: a resolved conflict is a successful save. The
//! orchestrator posts each notice explicitly to a [`ConflictNotifier`], and
//! [`ChannelNotifier`] forwards them to the single consumer that owns the
//! receiving end (typically a UI task), so subscribers never hop threads.

use reconcile_protocol::RecordId;
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use tracing::debug;

/// Summary of conflicts resolved by one orchestrator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionNotice {
    /// Number of records whose conflicts were resolved.
    pub count: usize,
    /// Types of the affected records.
    pub record_types: BTreeSet<String>,
    /// Ids of the affected records, in resolution order.
    pub record_ids: Vec<RecordId>,
}

/// Receives resolution notices from the orchestrator.
pub trait ConflictNotifier: Send + Sync {
    /// Posts a notice. Must not block.
    fn post(&self, notice: ResolutionNotice);
}

/// Drops every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ConflictNotifier for NoopNotifier {
    fn post(&self, _notice: ResolutionNotice) {}
}

/// Delivers notices over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<ResolutionNotice>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver its consumer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResolutionNotice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ConflictNotifier for ChannelNotifier {
    fn post(&self, notice: ResolutionNotice) {
        if self.sender.send(notice).is_err() {
            debug!("notice receiver dropped, discarding resolution notice");
        }
    }
}
