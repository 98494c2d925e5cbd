mod dispatch;
mod runtime;
mod server;

pub use server::{Client, client_request, run_daemon};
