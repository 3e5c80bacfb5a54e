//! Postcraft: drafts on-brand social posts in two contrasting styles.
//!
//! A layered prompt (brand voice, platform rules, recent approvals, task) is
//! sent to a text backend that must return exactly two labelled options.
//! The user picks one, and the pick feeds back into the next prompt. A
//! guided conversation engine drives single posts, content calendars, and
//! brand voice updates; Telegram and the CLI are thin transports over it.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod brand;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod generation;
pub mod logging;
pub mod memory;
pub mod platform;
pub mod prompt;
pub mod providers;
pub mod telegram;
pub mod types;
