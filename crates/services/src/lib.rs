#![forbid(unsafe_code)]

pub mod app_services;
pub mod bank_source;
pub mod config;
pub mod error;
pub mod guest;
pub mod sessions;

pub use cbt_core::Clock;

pub use app_services::AppServices;
pub use bank_source::{BankSource, FileBankSource, HttpBankSource, StaticBankSource, fetch_bank};
pub use config::{load_test_config, save_test_config};
pub use error::{BootstrapError, EngineError};
pub use guest::GuestId;
pub use sessions::format::{format_completed_at, format_countdown, format_time_taken};

pub use sessions::{
    BankUpdate, DeadlineTicker, IdleView, NavigatorCell, ResultView, RunningSession, RunningView,
    SessionEngine, SessionProgress, SessionState, SessionView, SharedEngine, Tick, TickerHandle,
    seed_bank,
};
