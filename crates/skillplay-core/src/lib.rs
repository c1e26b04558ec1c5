pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod history;
pub mod io;
pub mod paths;
pub mod ports;
pub mod resolve;
pub mod result;
pub mod run_config;
pub mod script;
pub mod share;

pub use error::{PlaygroundError, Result};
