mod persist;
mod progress;
mod service;
mod state;
mod ticker;
mod view;

pub mod format;

// Public API of the session subsystem.
pub use crate::error::EngineError;
pub use persist::seed_bank;
pub use progress::SessionProgress;
pub use service::{BankUpdate, SessionEngine, Tick};
pub use state::{RunningSession, SessionState};
pub use ticker::{DeadlineTicker, SharedEngine, TickerHandle};
pub use view::{IdleView, NavigatorCell, ResultView, RunningView, SessionView};
