pub mod api;
pub mod app;
pub mod config;
pub mod handler;
pub mod logging;
pub mod message;
pub mod state;
pub mod store;
pub mod tui;
pub mod ui;
