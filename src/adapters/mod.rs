// Adapters layer: concrete implementations of the domain ports.

pub mod storage;
pub mod websocket;

pub use storage::{FileStore, MemoryStore};
pub use websocket::WebSocketConnector;
