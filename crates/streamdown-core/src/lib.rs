//! Core streamdown library (markdown parser, stream consumer, chat transcript, config).

pub mod chat;
pub mod config;
pub mod document;
pub mod markdown;
pub mod stream;
