pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gpu;
pub mod layout;
pub mod loader;
pub mod render;
pub mod viewer;
