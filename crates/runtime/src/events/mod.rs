//! Topic-based event bus for runtime events.
//!
//! Sheet changes and autosave results are published to separate topics so a
//! view can follow the sheet while a webhook sink only listens for saves.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{PersistenceEvent, SheetEvent};
