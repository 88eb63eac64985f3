//! rsm-alert
//!
//! Operational alerts for error and critical events.
//!
//! Alerts are collected in an [`AlertBuffer`] and flushed as one combined
//! notification per window, so a failing upstream produces one message every
//! few minutes instead of one per tick. Delivery is best-effort: a failed
//! `notify` is logged and the text is dropped.

mod buffer;
mod sink;

pub use buffer::{AlertBuffer, AlertLevel};
pub use sink::{AlertError, AlertSink, LogAlertSink, TelegramAlertSink};
