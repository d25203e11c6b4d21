pub mod buffer;
pub mod handles;
pub mod manager;
pub mod texture;
