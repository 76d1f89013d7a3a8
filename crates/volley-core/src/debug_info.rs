use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, OnceLock,
    },
};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::Vector3;

/// Number of queued records after which publishing folds the queue into the map.
const MAX_PENDING: usize = 64;

static DEBUG_SINK: OnceLock<DebugSink> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugColor {
    #[default]
    Red,
    Green,
    Orange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DebugShape {
    Cross {
        center: Vector3,
        color: DebugColor,
    },
    Polyline {
        points: Vec<Vector3>,
        color: DebugColor,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DebugValue {
    Shape(DebugShape),
    Number(f64),
    String(String),
}

/// A map of debug messages.
///
/// # Key format
///
/// The keys should always be `snake_case` and should only contain alphanumerical
/// characters. The `.` character is reserved for separating different parts of the
/// key, eg. `strike.flight_path`.
pub type DebugMap = HashMap<String, DebugValue>;

#[derive(Debug)]
enum UpdateMsg {
    InsertRecord { key: String, value: DebugValue },
    RemoveRecord { key: String },
}

struct DebugSink {
    record_tx: mpsc::UnboundedSender<UpdateMsg>,
    record_rx: Mutex<mpsc::UnboundedReceiver<UpdateMsg>>,
    /// Records sent but not yet folded into `map`.
    pending: AtomicUsize,
    map: Mutex<DebugMap>,
}

impl DebugSink {
    fn publish(&self, record: UpdateMsg) {
        // Counted before sending so a concurrent drain never sees more records than
        // were counted
        let pending = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        if self.record_tx.send(record).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return;
        }
        if pending >= MAX_PENDING {
            self.drain();
        }
    }

    fn drain(&self) {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        let mut record_rx = self.record_rx.lock().unwrap_or_else(|e| e.into_inner());
        let mut received = 0;
        while let Ok(record) = record_rx.try_recv() {
            received += 1;
            match record {
                UpdateMsg::RemoveRecord { key } => {
                    map.remove(&key);
                }
                UpdateMsg::InsertRecord { key, value } => {
                    map.insert(key, value);
                }
            }
        }
        self.pending.fetch_sub(received, Ordering::AcqRel);
    }
}

/// Collects the debug records published anywhere in the process.
///
/// Records are queued in a channel and folded into the map whenever a copy is
/// requested, or as soon as [`MAX_PENDING`] of them are waiting.
#[derive(Clone, Copy)]
pub struct DebugSubscriber {
    sink: &'static DebugSink,
}

impl DebugSubscriber {
    /// Installs the process-wide debug subscriber.
    ///
    /// Fails if another debug subscriber has already been installed.
    pub fn install() -> Result<Self> {
        let (record_tx, record_rx) = mpsc::unbounded_channel();
        DEBUG_SINK
            .set(DebugSink {
                record_tx,
                record_rx: Mutex::new(record_rx),
                pending: AtomicUsize::new(0),
                map: Mutex::new(HashMap::new()),
            })
            .map_err(|_| anyhow!("Only one debug subscriber can be created"))?;
        let sink = DEBUG_SINK
            .get()
            .ok_or_else(|| anyhow!("Debug subscriber was not installed"))?;
        Ok(Self { sink })
    }

    /// Get a copy of the current debug map.
    pub fn get_copy(&self) -> DebugMap {
        self.sink.drain();
        self.sink
            .map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of published records not yet folded into the map.
    pub fn backlog(&self) -> usize {
        self.sink.pending.load(Ordering::Acquire)
    }
}

/// Record a debug message.
pub fn debug_record(key: impl Into<String>, value: DebugValue) {
    if let Some(sink) = DEBUG_SINK.get() {
        sink.publish(UpdateMsg::InsertRecord {
            key: key.into(),
            value,
        });
    }
}

/// Remove a debug message.
pub fn debug_remove(key: impl Into<String>) {
    if let Some(sink) = DEBUG_SINK.get() {
        sink.publish(UpdateMsg::RemoveRecord { key: key.into() });
    }
}

/// Record a debug message with a cross.
pub fn debug_cross(key: impl Into<String>, center: Vector3, color: DebugColor) {
    debug_record(
        key.into(),
        DebugValue::Shape(DebugShape::Cross { center, color }),
    );
}

/// Record a debug message with a polyline through `points`.
pub fn debug_polyline(key: impl Into<String>, points: &[Vector3], color: DebugColor) {
    // Skip the copy when nobody is listening
    if DEBUG_SINK.get().is_none() {
        return;
    }
    debug_record(
        key.into(),
        DebugValue::Shape(DebugShape::Polyline {
            points: points.to_vec(),
            color,
        }),
    );
}

/// Record a debug message with a numeric value.
pub fn debug_value(key: impl Into<String>, value: f64) {
    debug_record(key, DebugValue::Number(value));
}

/// Record a debug message with a string.
pub fn debug_string(key: impl Into<String>, value: impl Into<String>) {
    debug_record(key, DebugValue::String(value.into()));
}
