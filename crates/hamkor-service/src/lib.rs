//! Application services of the Hamkor marketplace.
//!
//! Each service is generic over the store and the outbound collaborators it
//! needs, so the HTTP layer and the chat bot share one implementation of the
//! authentication and messaging rules.

pub mod binder;
pub mod config;
pub mod error;
pub mod notice;
pub mod otp;
pub mod relay;
pub mod reviews;
pub mod session;

mod deliver;

pub use config::ServiceSettings;
pub use error::{Error, Result};

#[cfg(test)]
mod testing;
