pub mod chat_client;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod message;
pub mod name_capture;
pub mod pipeline;
pub mod session;
