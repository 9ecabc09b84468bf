//! Core types and trait definitions for the Hamkor marketplace backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends, the chat bot and the HTTP layer all depend on it.

// Native `async fn` in traits; the returned futures are declared `Send`
// explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod dispatch;
pub mod error;
pub mod identity;
pub mod message;
pub mod phone;
pub mod review;
pub mod store;

pub use error::{Error, Result};
