pub mod call;
pub mod config;
pub mod decision_engine;
pub mod normalization;
pub mod notify;
pub mod reputation;
pub mod screener;
pub mod transport;

pub use call::{CallContext, CallControl, LoggingCall};
pub use config::ScreenerConfig;
pub use decision_engine::{CallState, DecisionEngine, NegativeRatings, Outcome};
pub use normalization::{normalize_to_e164, LookupCandidates};
pub use notify::NotificationDispatcher;
pub use reputation::{LookupResult, ReputationClient};
pub use screener::CallScreener;
