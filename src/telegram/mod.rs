//! # telegram
//!
//! Chat front-end: Bot API [`client`], command [`commands`] and the
//! long-poll [`poller`] that connects the two.

pub mod client;
pub mod commands;
pub mod poller;

pub use client::TelegramClient;
