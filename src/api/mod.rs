pub mod handler;
pub mod middleware;
pub mod payment;
pub mod server;
