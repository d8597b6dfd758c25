//! Live event channel from the server.
//!
//! This module provides:
//! - `Event`: a named payload pushed by the server
//! - `EventDispatcher`: keyed subscribers called in registration order
//! - `EventSocket`: the token-authenticated WebSocket feeding events in
//! - `ReconnectPolicy`: how often the socket is re-issued its token

pub mod dispatcher;
pub mod error;
pub mod model;
pub mod reconnect;
pub mod socket;

pub use dispatcher::EventDispatcher;
pub use error::EventError;
pub use model::{Event, SYSTEM_CREATED, SYSTEM_REMOVED, SYSTEM_UPDATED, UPDATE_TOKEN};
pub use reconnect::ReconnectPolicy;
pub use socket::EventSocket;
