pub mod cli;
pub mod config;
pub mod constants;
pub mod containerfile;
pub mod engine;
pub mod flavor;
pub mod process;
pub mod project;
pub mod service;

pub use anyhow::Result;
