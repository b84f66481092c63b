pub mod app_state;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extract;
pub mod startup;
