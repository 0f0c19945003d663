//! Control protocol for the record-editing layer
//!
//! Editing screens read and replace the whole state document through two
//! requests, exchanged as newline-delimited JSON (JSONL) and tagged by a
//! `type` field:
//!
//! - `GET_STATE` -> `STATE`: fetch the persisted snapshot
//! - `SET_STATE` -> `STATE`: replace it, answered with the stored (stamped) copy
//!
//! Failures are answered with `ERROR`.
//!
//! # Module Structure
//!
//! - `message`: Request / Response enums and the request handler
//! - `io`: JSONL parsing, serialization and the serve loop

mod io;
mod message;

pub use io::{parse_request, serialize_response, serve};
pub use message::{handle_request, Request, Response};
