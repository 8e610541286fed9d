//! Minimal HTTP-like protocol handling for the update endpoint.
//!
//! This is not a general HTTP implementation. The receiver understands
//! exactly enough of the protocol for one operation: a client opens a
//! connection, sends a request line, a handful of headers and a
//! base64-encoded payload, and the server either installs the payload and
//! acknowledges or silently closes the connection.
//!
//! # Pipeline
//!
//! ```text
//! socket bytes
//!      │
//!      ▼
//! ┌──────────────┐  header block   ┌──────────────┐
//! │ FramedReader │ ───────────────▶│    parser    │
//! └──────┬───────┘                 └──────┬───────┘
//!        │ payload bytes                  │ path, headers,
//!        │ (content-length)               │ declared digest
//!        ▼                                ▼
//! ┌─────────────────────────────────────────────┐
//! │ connection: decode → verify → install → ack │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - **`framing`**: incremental delimiter- and length-based framing over the
//!   raw byte stream
//! - **`parser`**: turns the header block into a [`request::Request`]
//! - **`request`**: parsed request line and header map
//! - **`connection`**: drives one connection from first byte to close

pub mod connection;
pub mod framing;
pub mod parser;
pub mod request;
