pub mod common;
pub mod completions;
pub mod config;
pub mod push;
pub mod site;
pub mod status;
