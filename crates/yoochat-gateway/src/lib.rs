//! Websocket relay. Clients connect with the same bearer token as the HTTP
//! API and receive friend-request and message events for their user.

pub mod connection;
pub mod dispatcher;

pub use dispatcher::Dispatcher;
