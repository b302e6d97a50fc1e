//! Change feed behind the live tracking and admin views.

use log::{log, Level};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::schema::db::Report;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportEvent {
    pub kind: ChangeKind,
    pub report: Report,
}

pub struct ChangeFeed {
    tx: broadcast::Sender<ReportEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeFeed { tx }
    }

    pub fn publish(&self, kind: ChangeKind, report: Report) {
        let id = report.id;
        match self.tx.send(ReportEvent { kind, report }) {
            Ok(n) => log!(Level::Trace, "report {id} {kind:?} fanned out to {n} subscribers"),
            // Nobody is watching; the store already has the write.
            Err(_) => log!(Level::Trace, "report {id} {kind:?} had no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(256)
    }
}

/// Encode one Server-Sent Events frame.
pub fn sse_frame<T: Serialize>(event: &str, id: Option<i32>, payload: &T) -> String {
    match serde_json::to_string(payload) {
        Ok(json) => {
            let mut frame = String::with_capacity(json.len() + 32);
            frame.push_str("event: ");
            frame.push_str(event);
            frame.push('\n');
            if let Some(id) = id {
                frame.push_str("id: ");
                frame.push_str(&id.to_string());
                frame.push('\n');
            }
            frame.push_str("data: ");
            frame.push_str(&json);
            frame.push_str("\n\n");
            frame
        }
        Err(err) => format!("event: error\ndata: {}\n\n", err),
    }
}
