//! Screensaver ("dream") content pipeline for a Jellyfin/Emby TV client.
//!
//! [`dream::DreamViewModel`] merges the currently playing item and a
//! randomly sampled library showcase into a single [`DisplayContent`] value,
//! preferring playback over the showcase and the showcase over the logo.
//!
//! [`DisplayContent`]: dream_proto::protocol::DisplayContent

pub mod catalog;
pub mod dream;
pub mod http;
pub mod images;
pub mod merge;
pub mod now_playing;
pub mod playback;
pub mod playing;
pub mod prefs;
pub mod sampler;

#[cfg(test)]
mod test_support;
