//! Client core for sending SMS through a webhook bridge.
//!
//! Front ends call [`app::BridgeApp`]; the modules underneath are usable on
//! their own and take their persistence through [`store::KeyValueStore`].

pub mod activity;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod protocol;
pub mod recipient;
pub mod session;
pub mod store;

pub use error::{BridgeError, BridgeResult};
