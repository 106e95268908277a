//! # Operation Set
//!
//! The closed set of remote operations. Each operation owns a numeric tag,
//! a wire name, a request body type and a success body type. Tags and names
//! are part of the compatibility surface: new operations are appended, never
//! renumbered.

use crate::error::CodecError;
use crate::requests::*;
use crate::responses::*;
use serde_json::Value;

/// Cross-field checks applied after a body parses.
pub trait Validate {
    fn validate(&self) -> Result<(), CodecError> {
        Ok(())
    }
}

macro_rules! operations {
    ($( $tag:literal => $variant:ident, $name:literal, $req:ty, $resp:ty; )*) => {
        /// Operation tag.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum OpTag {
            $( $variant = $tag, )*
        }

        impl OpTag {
            /// Every operation, in tag order.
            pub const ALL: &'static [OpTag] = &[ $( OpTag::$variant, )* ];

            pub fn code(self) -> u8 {
                self as u8
            }

            /// Wire name carried in the header.
            pub fn name(self) -> &'static str {
                match self {
                    $( OpTag::$variant => $name, )*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(OpTag::$variant), )*
                    _ => None,
                }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $( $tag => Some(OpTag::$variant), )*
                    _ => None,
                }
            }
        }

        /// Request payload, one variant per operation.
        #[derive(Debug, Clone, PartialEq)]
        pub enum RequestBody {
            $( $variant($req), )*
        }

        impl RequestBody {
            pub fn tag(&self) -> OpTag {
                match self {
                    $( RequestBody::$variant(_) => OpTag::$variant, )*
                }
            }

            pub(crate) fn to_value(&self) -> Result<Value, serde_json::Error> {
                match self {
                    $( RequestBody::$variant(body) => serde_json::to_value(body), )*
                }
            }

            pub(crate) fn from_value(tag: OpTag, value: Value) -> Result<Self, CodecError> {
                let body = match tag {
                    $( OpTag::$variant => RequestBody::$variant(serde_json::from_value::<$req>(value)?), )*
                };
                body.validate()?;
                Ok(body)
            }

            fn validate(&self) -> Result<(), CodecError> {
                match self {
                    $( RequestBody::$variant(body) => body.validate(), )*
                }
            }
        }

        /// Success payload, one variant per operation.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ResponseBody {
            $( $variant($resp), )*
        }

        impl ResponseBody {
            pub fn tag(&self) -> OpTag {
                match self {
                    $( ResponseBody::$variant(_) => OpTag::$variant, )*
                }
            }

            /// The body sent alongside a failure result.
            pub fn default_for(tag: OpTag) -> Self {
                match tag {
                    $( OpTag::$variant => ResponseBody::$variant(<$resp>::default()), )*
                }
            }

            pub(crate) fn to_value(&self) -> Result<Value, serde_json::Error> {
                match self {
                    $( ResponseBody::$variant(body) => serde_json::to_value(body), )*
                }
            }

            pub(crate) fn from_value(tag: OpTag, value: Value) -> Result<Self, CodecError> {
                let body = match tag {
                    $( OpTag::$variant => ResponseBody::$variant(serde_json::from_value::<$resp>(value)?), )*
                };
                body.validate()?;
                Ok(body)
            }

            fn validate(&self) -> Result<(), CodecError> {
                match self {
                    $( ResponseBody::$variant(body) => body.validate(), )*
                }
            }
        }
    };
}

operations! {
    0 => Enumerate, "enumerate", EnumerateRequest, EnumerateResponse;
    1 => DestroyToken, "destroy_token", TokenRequest, Empty;
    2 => CloneToken, "clone_token", CloneTokenRequest, TokenResponse;
    3 => GetProperties, "get_properties", TokenRequest, PropertiesResponse;
    4 => UpdateProperties, "update_properties", TokenRequest, PropertiesResponse;
    5 => Open, "open", OpenRequest, OpenResponse;
    6 => Close, "close", HandleRequest, Empty;
    7 => Reset, "reset", HandleRequest, Empty;
    8 => GetPropertiesFromHandle, "get_properties_from_handle", HandleRequest, PropertiesResponse;
    9 => MapMmio, "map_mmio", MapMmioRequest, MmioIdResponse;
    10 => UnmapMmio, "unmap_mmio", UnmapMmioRequest, Empty;
    11 => ReadMmio32, "read_mmio32", MmioReadRequest, Value32Response;
    12 => WriteMmio32, "write_mmio32", WriteMmio32Request, Empty;
    13 => ReadMmio64, "read_mmio64", MmioReadRequest, Value64Response;
    14 => WriteMmio64, "write_mmio64", WriteMmio64Request, Empty;
    15 => WriteMmio512, "write_mmio512", WriteMmio512Request, Empty;
    16 => PrepareBuffer, "prepare_buffer", PrepareBufferRequest, BufferIdResponse;
    17 => ReleaseBuffer, "release_buffer", BufferRequest, Empty;
    18 => GetIoAddress, "get_io_address", BufferRequest, IoAddressResponse;
    19 => ReadError, "read_error", ErrorRequest, Value64Response;
    20 => GetErrorInfo, "get_error_info", ErrorRequest, ErrorInfoResponse;
    21 => ClearError, "clear_error", ErrorRequest, Empty;
    22 => ClearAllErrors, "clear_all_errors", TokenRequest, Empty;
    23 => TokenGetObject, "token_get_object", TokenGetObjectRequest, ObjectIdResponse;
    24 => DestroyObject, "destroy_object", ObjectRequest, Empty;
    25 => ObjectGetType, "object_get_type", ObjectRequest, ObjectTypeResponse;
    26 => ObjectGetName, "object_get_name", ObjectRequest, NameResponse;
    27 => ObjectGetSize, "object_get_size", ObjectFlagsRequest, Value32Response;
    28 => ObjectRead, "object_read", ObjectReadRequest, ObjectReadResponse;
    29 => ObjectRead64, "object_read64", ObjectFlagsRequest, Value64Response;
    30 => ObjectWrite64, "object_write64", ObjectWrite64Request, Empty;
    31 => HandleGetObject, "handle_get_object", HandleGetObjectRequest, ObjectIdResponse;
    32 => ObjectGetObject, "object_get_object", ObjectGetObjectRequest, ObjectIdResponse;
    33 => ObjectGetObjectAt, "object_get_object_at", ObjectGetObjectAtRequest, ObjectIdResponse;
}

impl std::fmt::Display for OpTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
