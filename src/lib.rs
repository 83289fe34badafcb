// src/lib.rs

//! Telegram health-check publisher library
//!
//! Forwards health reports produced by an external scheduler to a single
//! Telegram chat through the Bot API.
//!
//! - [`publisher`]: change detection, rendering, delivery and state
//! - [`transport`]: outbound HTTP with retry, backoff and timeout
//! - [`models`]: health reports and configuration
//! - [`error`]: unified error type

pub mod error;
pub mod models;
pub mod publisher;
pub mod transport;
pub mod utils;
