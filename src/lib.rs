pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod install;
pub mod manifest;
pub mod module;
pub mod package;
pub mod recipe;
pub mod runtime;
