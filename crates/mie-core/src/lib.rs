//! Core domain + application logic for mie, the video re-hosting bot.
//!
//! This crate is framework-agnostic. The chat platforms, yt-dlp and object
//! storage live behind ports (traits) implemented in adapter crates.

pub mod command;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handler;
pub mod job;
pub mod links;
pub mod logging;
pub mod media;
pub mod messaging;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
