pub mod api;
pub mod app;
pub mod banner;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod global;
pub mod join;
pub mod page;
pub mod playback;
pub mod session;
pub mod token;
pub mod upload;

#[cfg(test)]
mod testing;

pub use error::MicCheckError;
