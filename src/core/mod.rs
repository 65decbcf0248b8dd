pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod paths;
