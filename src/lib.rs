pub mod account;
pub mod app;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod editor;
pub mod logging;
pub mod output;
pub mod records;
pub mod store;
pub mod view;

#[cfg(test)]
mod tests;
