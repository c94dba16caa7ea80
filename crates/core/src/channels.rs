//! Well-known notification channel name constants.
//!
//! Encoder workers LISTEN on these Postgres channels; the API side only
//! ever publishes. Delivery is at-least-once -- workers must treat every
//! notification as a wake-up and re-scan for queued rows.

/// Channel carrying clip-export ids for the encoder worker pool.
pub const CHANNEL_CLIP_EXPORTS: &str = "clip_exports";
