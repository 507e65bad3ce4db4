//! Market data feeds - WebSocket streaming + REST collaborators

pub mod disconnect;
pub mod message;
pub mod rest_client;
pub mod rest_model;
pub mod ws_client;

pub use disconnect::DisconnectState;
pub use message::SubscribeRequest;
pub use rest_client::RestClient;
pub use ws_client::WsFeed;
