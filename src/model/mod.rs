pub mod config;
pub mod mapper;
pub mod pitch;
pub mod song;
