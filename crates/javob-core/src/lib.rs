//! # javob-core
//!
//! Core types, traits, configuration, error handling, and the retry
//! policy shared by every javob crate.

pub mod config;
pub mod error;
pub mod html;
pub mod message;
pub mod persona;
pub mod retry;
pub mod traits;
