//! Product image upload workflow for the shop's admin panel, together with
//! the asset store and product routes it talks to.

pub mod catalog;
pub mod client;
pub mod config;
pub mod editor;
pub mod errors;
pub mod form;
pub mod server;
pub mod storage;
pub mod upload;
pub mod wire;

#[cfg(test)]
mod testing;
