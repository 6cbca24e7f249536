//! HTTP surface for health, metrics and read-only inspection

mod handlers;
mod server;

pub use server::run_server;
