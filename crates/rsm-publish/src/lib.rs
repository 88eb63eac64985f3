//! rsm-publish
//!
//! Turns region reports into status cards and keeps a fixed set of chat
//! messages (slots) up to date with them.
//!
//! Architectural decisions:
//! - Slot count equals the configured region count; a persisted table of any
//!   other size is discarded and N fresh messages are created
//! - Slots are positional: slot `i` shows the `i`-th region of this tick's
//!   presentation order
//! - A slot's region binding changes only after a successful update; its
//!   message id never changes outside initialization
//! - Transient failures are retried with a fixed backoff; permanent ones are
//!   not, and the slot is left stale
//! - One slot's failure never stops the others
//! - The table is persisted by the caller after the whole pass

mod publisher;
mod render;
mod retry;
mod slots;

pub use publisher::{
    ChatPublisher, PublishError, PublishReport, SlotFailure, SlotFailureKind, SlotPublisher,
};
pub use render::{
    region_flag, render_card, CardField, CardStyle, EmojiSet, StatusCard, COLOR_OFFLINE,
    COLOR_ONLINE, EMOJI_FALLBACK, FIELD_VALUE_LIMIT,
};
pub use retry::{with_retry, RetryError, RetryPolicy};
pub use slots::{SlotRecord, SlotStore, SlotTable};
