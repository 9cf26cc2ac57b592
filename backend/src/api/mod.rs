pub mod channel;
pub mod download;
pub mod videos;
