//! Wire protocol shared by the client and the server.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection worker implementing the request-response state machine
//! - **`parser`**: Parses request lines and response header blocks from byte buffers
//! - **`request`**: Request line representation and the client's request encoder
//! - **`response`**: Status codes, outgoing response heads and parsed incoming headers
//! - **`writer`**: Serializes response heads and streams file bodies
//! - **`files`**: Maps request paths onto files under the serving root
//! - **`framing`**: Client-side plain and length-prefixed response readers
//!
//! # Connection State Machine
//!
//! Each accepted connection carries exactly one exchange:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← One receive of at most 2048 bytes
//!        └──────┬──────┘
//!               │ Request line parsed (or 400 on garbage, Closed on EOF)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Method check, file lookup
//!        └──────┬───────────┘
//!               │ Reply chosen: 200 + file, 400, 403 or 404
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Head, then body in 4096-byte chunks
//!        └──────┬───────────┘
//!               │
//!               ▼
//!            Closed
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod files;
pub mod framing;
