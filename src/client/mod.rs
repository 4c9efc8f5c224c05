//! Retrieval client.
//!
//! Resolves the target, connects to the first endpoint that accepts, sends
//! one request and persists the response.

pub mod connector;
pub mod endpoint;
pub mod fetch;
pub mod target;

pub use connector::{Connected, connect_first};
pub use endpoint::{AddressFamily, Endpoint, resolve};
pub use fetch::{BodyReport, Client, FetchReport};
pub use target::Target;
