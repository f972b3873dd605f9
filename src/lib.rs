pub mod app;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod spoonacular;
pub mod ui;
pub mod utils;
