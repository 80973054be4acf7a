//! Emoji log prefixes for the multi-path strategy
//!
//! Every module logs through these macros so scan, execution and rollback
//! lines can be grepped by prefix.

pub struct LogEmoji;

impl LogEmoji {
    pub const SUCCESS: &'static str = "✅";
    pub const ERROR: &'static str = "❌";
    pub const WARNING: &'static str = "⚠️";

    pub const SEARCH: &'static str = "🔍"; // path generation and scanning
    pub const CHART: &'static str = "📊"; // stats
    pub const EXECUTE: &'static str = "⚡"; // forward hops
    pub const MONEY: &'static str = "💰";
    pub const ROLLBACK: &'static str = "↩️"; // reverse swaps
}

#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SUCCESS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!("{} {}", $crate::logging::LogEmoji::ERROR, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::WARNING, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_search {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SEARCH, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_metrics {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CHART, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_execution {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::EXECUTE, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_profit {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::MONEY, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_rollback {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::ROLLBACK, format!($($arg)*))
    };
}
