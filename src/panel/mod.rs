//! Panel
//!
//! The headless panel core:
//! - `state`: what the panel shows
//! - `event`: notifications, gestures and notices
//! - `debounce`: single-slot latest-wins scheduling for the auto toggle
//! - `sync`: the marker-layer state machine
//! - `driver`: serialized event loop around the state machine

pub mod debounce;
pub mod driver;
pub mod event;
pub mod state;
pub mod sync;

pub use debounce::Debouncer;
pub use driver::{channel, PanelDriver, PanelHandle};
pub use event::{HostNotification, Notice, NoticeLevel, PanelEvent};
pub use state::{MarkerState, Mode, PanelState};
pub use sync::WhiteBalanceSync;
