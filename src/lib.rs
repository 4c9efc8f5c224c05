//! Ferry - minimal file transfer over TCP
//!
//! A client that fetches one file per invocation and a server that answers
//! each connection from its own worker.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod server;
