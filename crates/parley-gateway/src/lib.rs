//! Change feed for parley clients: a broadcast [`Dispatcher`] that the HTTP
//! layer publishes mutation events into, and the WebSocket connection loop
//! that forwards them to clients subscribed to the affected workspace.

pub mod connection;
pub mod dispatcher;

pub use connection::handle_connection;
pub use dispatcher::Dispatcher;
