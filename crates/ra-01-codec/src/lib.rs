//! # Operation Codec Set
//!
//! Turns each remote accelerator call into a self-describing JSON message
//! and each reply back into a typed result.
//!
//! ## Contract
//!
//! - `encode_*` is a deterministic serialization of a well-formed message.
//! - `decode_*` is all-or-nothing: a missing or mistyped field, an
//!   out-of-range integer or an over-capacity string yields a `CodecError`
//!   and no partially populated output.
//! - The operation name in the header selects the body codec.
//! - A response always carries a `ResultCode` and decodes whether or not it
//!   reports success.
//!
//! ## Example
//!
//! ```rust
//! use ra_01_codec::{decode_request, encode_request, Request, RequestBody};
//! use ra_01_codec::requests::MapMmioRequest;
//! use shared_types::{HostName, RemoteId, WireFormat};
//!
//! let host = HostName::new("agent-0").unwrap();
//! let body = RequestBody::MapMmio(MapMmioRequest {
//!     handle_id: RemoteId::new(host, 42),
//!     mmio_num: 0,
//! });
//! let request = Request::new(1, 1, HostName::new("client").unwrap(), body);
//!
//! let text = encode_request(&request, WireFormat::Compact).unwrap();
//! assert_eq!(decode_request(&text).unwrap(), request);
//! ```

pub mod error;
pub mod message;
pub mod ops;
pub mod requests;
pub mod responses;

pub use error::CodecError;
pub use message::{
    decode_request, decode_request_envelope, decode_response, encode_request, encode_response,
    Request, RequestEnvelope, Response,
};
pub use ops::{OpTag, RequestBody, ResponseBody, Validate};
