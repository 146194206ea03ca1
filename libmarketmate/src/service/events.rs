//! Pipeline progress events
//!
//! An in-process bus over `tokio::sync::broadcast`. Emitting never blocks: with no
//! subscribers the event is dropped, and a lagging subscriber misses the oldest
//! events instead of slowing the pipeline down.
//!
//! ```no_run
//! use libmarketmate::service::events::{Event, EventBus};
//! use libmarketmate::service::pipeline::PipelineStage;
//!
//! # async fn example() {
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(Event::StageEntered {
//!     run_id: "abc123".to_string(),
//!     platform: "facebook".to_string(),
//!     stage: PipelineStage::Generating,
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::pipeline::PipelineStage;

pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer before lagging subscribers drop events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Events emitted while a publish request moves through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The run moved to a new stage
    StageEntered {
        run_id: String,
        platform: String,
        stage: PipelineStage,
    },

    /// A non-fatal problem, such as a failed ad after a successful publish
    Warning {
        run_id: String,
        message: String,
    },

    /// The run reached `Done`
    Completed {
        run_id: String,
        platform: String,
        success: bool,
        post_id: Option<String>,
    },

    /// The run reached `Failed`
    Failed {
        run_id: String,
        stage: PipelineStage,
        error: String,
    },
}
