//! # Messages
//!
//! A request is `{"header": .., "body": ..}`; a response additionally
//! carries `"result"`. Decoding is two-phase on the request side so the
//! agent can answer a malformed body with a protocol failure that still
//! echoes the header.

use crate::error::CodecError;
use crate::ops::{OpTag, RequestBody, ResponseBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{HostName, OpName, RequestHeader, ResponseHeader, ResultCode, WireFormat};
use tracing::trace;

/// A fully decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub header: RequestHeader,
    pub body: RequestBody,
}

impl Request {
    /// Builds a request whose header names the body's operation.
    pub fn new(request_id: u64, serial: u64, from: HostName, body: RequestBody) -> Self {
        Self {
            header: RequestHeader {
                request_id,
                request_name: op_name(body.tag()),
                serial,
                from,
            },
            body,
        }
    }

    pub fn op(&self) -> OpTag {
        self.body.tag()
    }
}

/// A fully decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub header: ResponseHeader,
    pub result: ResultCode,
    pub body: ResponseBody,
}

impl Response {
    /// Successful response to `request`.
    pub fn success(request: &RequestHeader, from: HostName, body: ResponseBody) -> Self {
        Self {
            header: ResponseHeader::answering(request, from),
            result: ResultCode::Ok,
            body,
        }
    }

    /// Failed response to `request` with a default body for `op`.
    pub fn failure(request: &RequestHeader, from: HostName, op: OpTag, result: ResultCode) -> Self {
        Self {
            header: ResponseHeader::answering(request, from),
            result,
            body: ResponseBody::default_for(op),
        }
    }

    pub fn op(&self) -> OpTag {
        self.body.tag()
    }
}

fn op_name(op: OpTag) -> OpName {
    // Every name fits REQUEST_NAME_MAX; see the ops tests.
    OpName::new(op.name()).unwrap_or_default()
}

#[derive(Serialize)]
struct WireRequestOut<'a> {
    header: &'a RequestHeader,
    body: Value,
}

#[derive(Deserialize)]
struct WireRequestIn {
    header: RequestHeader,
    #[serde(default)]
    body: Value,
}

#[derive(Serialize)]
struct WireResponseOut<'a> {
    header: &'a ResponseHeader,
    result: ResultCode,
    body: Value,
}

#[derive(Deserialize)]
struct WireResponseIn {
    header: ResponseHeader,
    result: ResultCode,
    #[serde(default)]
    body: Option<Value>,
}

fn render<T: Serialize>(value: &T, format: WireFormat) -> Result<String, CodecError> {
    let text = match format {
        WireFormat::Compact => serde_json::to_string(value),
        WireFormat::Pretty => serde_json::to_string_pretty(value),
    };
    text.map_err(|e| CodecError::Serialize(e.to_string()))
}

fn check_tag(name: &OpName, op: OpTag) -> Result<(), CodecError> {
    if name.as_str() != op.name() {
        return Err(CodecError::TagMismatch {
            header: name.to_string(),
            body: op.name(),
        });
    }
    Ok(())
}

/// Encodes a request.
pub fn encode_request(request: &Request, format: WireFormat) -> Result<String, CodecError> {
    check_tag(&request.header.request_name, request.op())?;
    let body = request
        .body
        .to_value()
        .map_err(|e| CodecError::Serialize(e.to_string()))?;
    render(
        &WireRequestOut {
            header: &request.header,
            body,
        },
        format,
    )
}

/// Encodes a response.
pub fn encode_response(response: &Response, format: WireFormat) -> Result<String, CodecError> {
    check_tag(&response.header.response_name, response.op())?;
    let body = response
        .body
        .to_value()
        .map_err(|e| CodecError::Serialize(e.to_string()))?;
    render(
        &WireResponseOut {
            header: &response.header,
            result: response.result,
            body,
        },
        format,
    )
}

/// A request whose header has been decoded and whose operation is known,
/// with the body not yet interpreted.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub header: RequestHeader,
    pub op: OpTag,
    body: Value,
}

impl RequestEnvelope {
    /// Decodes the body. Nothing is produced unless the whole body is valid.
    pub fn into_request(self) -> Result<Request, CodecError> {
        let body = RequestBody::from_value(self.op, self.body)?;
        Ok(Request {
            header: self.header,
            body,
        })
    }
}

/// Decodes the header of a request and resolves its operation.
pub fn decode_request_envelope(text: &str) -> Result<RequestEnvelope, CodecError> {
    let wire: WireRequestIn = serde_json::from_str(text)?;
    let name = wire.header.request_name;
    let op = OpTag::from_name(name.as_str())
        .ok_or_else(|| CodecError::UnknownOperation(name.to_string()))?;
    trace!(op = %op, request_id = wire.header.request_id, "decoded request envelope");
    Ok(RequestEnvelope {
        header: wire.header,
        op,
        body: wire.body,
    })
}

/// Decodes a complete request.
pub fn decode_request(text: &str) -> Result<Request, CodecError> {
    decode_request_envelope(text)?.into_request()
}

/// Decodes a response.
///
/// A successful result requires a valid body. A failure result decodes
/// regardless of its body: a missing or unreadable body becomes the
/// operation's default.
pub fn decode_response(text: &str) -> Result<Response, CodecError> {
    let wire: WireResponseIn = serde_json::from_str(text)?;
    let name = wire.header.response_name;
    let op = OpTag::from_name(name.as_str())
        .ok_or_else(|| CodecError::UnknownOperation(name.to_string()))?;

    let body = if wire.result.is_ok() {
        let value = wire.body.ok_or_else(|| {
            CodecError::Malformed(format!("successful {op} response has no body"))
        })?;
        ResponseBody::from_value(op, value)?
    } else {
        wire.body
            .and_then(|value| ResponseBody::from_value(op, value).ok())
            .unwrap_or_else(|| ResponseBody::default_for(op))
    };

    Ok(Response {
        header: wire.header,
        result: wire.result,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::*;
    use crate::responses::*;
    use proptest::prelude::*;
    use shared_types::{
        AcceleratorState, ErrorInfo, ErrorName, Guid, HandleHeader, ObjectType, Properties, RemoteId,
        SysobjectName, SysobjectType, TokenHeader,
    };

    fn host(name: &str) -> HostName {
        HostName::new(name).unwrap()
    }

    fn rid(n: u64) -> RemoteId {
        RemoteId::new(host("agent"), n)
    }

    fn request(body: RequestBody) -> Request {
        Request::new(7, 1, host("client"), body)
    }

    #[test]
    fn test_request_wire_shape() {
        let req = request(RequestBody::MapMmio(MapMmioRequest {
            handle_id: rid(3),
            mmio_num: 0,
        }));
        let text = encode_request(&req, WireFormat::Compact).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["header"]["request_name"], "map_mmio");
        assert_eq!(json["header"]["request_id"], 7);
        assert_eq!(json["body"]["mmio_num"], 0);
        assert_eq!(json["body"]["handle_id"]["unique_id"], 3);
    }

    #[test]
    fn test_pretty_and_compact_decode_identically() {
        let req = request(RequestBody::Open(OpenRequest {
            token_id: rid(1),
            flags: 1,
        }));
        let compact = encode_request(&req, WireFormat::Compact).unwrap();
        let pretty = encode_request(&req, WireFormat::Pretty).unwrap();
        assert_ne!(compact, pretty);
        assert_eq!(decode_request(&compact).unwrap(), decode_request(&pretty).unwrap());
    }

    #[test]
    fn test_zero_filter_enumerate() {
        let req = request(RequestBody::Enumerate(EnumerateRequest::new(vec![], 4).unwrap()));
        let text = encode_request(&req, WireFormat::Compact).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["body"]["num_filters"], 0);
        assert_eq!(decode_request(&text).unwrap(), req);

        let resp = Response::success(
            &req.header,
            host("agent"),
            ResponseBody::Enumerate(EnumerateResponse::default()),
        );
        let decoded = decode_response(&encode_response(&resp, WireFormat::Compact).unwrap()).unwrap();
        assert_eq!(decoded.result, ResultCode::Ok);
        match decoded.body {
            ResponseBody::Enumerate(body) => assert!(body.tokens.is_empty()),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_unknown_operation_is_rejected_before_body() {
        let text = r#"{"header":{"request_id":1,"request_name":"reflash","serial":1,"from":"c"},"body":{}}"#;
        assert_eq!(
            decode_request_envelope(text).unwrap_err(),
            CodecError::UnknownOperation("reflash".into())
        );
    }

    #[test]
    fn test_malformed_body_keeps_header() {
        let text = r#"{"header":{"request_id":5,"request_name":"open","serial":2,"from":"c"},"body":{"token_id":7}}"#;
        let envelope = decode_request_envelope(text).unwrap();
        assert_eq!(envelope.op, OpTag::Open);
        assert_eq!(envelope.header.request_id, 5);
        assert!(matches!(envelope.into_request(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_missing_body_fails() {
        let text = r#"{"header":{"request_id":5,"request_name":"close","serial":2,"from":"c"}}"#;
        assert!(decode_request(text).is_err());
    }

    #[test]
    fn test_unparseable_header_fails() {
        assert!(decode_request_envelope("not json").is_err());
        assert!(decode_request_envelope(r#"{"body":{}}"#).is_err());
    }

    #[test]
    fn test_sysobject_name_over_capacity_fails_decode() {
        let long = "n".repeat(shared_types::SYSOBJECT_NAME_MAX + 1);
        let text = format!(
            r#"{{"header":{{"request_id":1,"request_name":"token_get_object","serial":1,"from":"c"}},"body":{{"token_id":{{"hostname":"a","unique_id":1}},"name":"{long}","flags":0}}}}"#
        );
        assert!(matches!(decode_request(&text), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_sysobject_name_at_capacity_round_trips() {
        let name = SysobjectName::new(&"n".repeat(shared_types::SYSOBJECT_NAME_MAX)).unwrap();
        let req = request(RequestBody::TokenGetObject(TokenGetObjectRequest {
            token_id: rid(1),
            name,
            flags: 0,
        }));
        let text = encode_request(&req, WireFormat::Compact).unwrap();
        assert_eq!(decode_request(&text).unwrap(), req);
    }

    #[test]
    fn test_tag_mismatch_refuses_to_encode() {
        let mut req = request(RequestBody::Close(HandleRequest { handle_id: rid(1) }));
        req.header.request_name = OpName::new("reset").unwrap();
        assert!(matches!(
            encode_request(&req, WireFormat::Compact),
            Err(CodecError::TagMismatch { .. })
        ));
    }

    #[test]
    fn test_failure_response_decodes_without_body() {
        let text = r#"{"header":{"request_id":9,"response_name":"open","serial":3,"from":"a"},"result":"NOT_FOUND"}"#;
        let resp = decode_response(text).unwrap();
        assert_eq!(resp.result, ResultCode::NotFound);
        assert_eq!(resp.header.request_id, 9);
        assert_eq!(resp.body, ResponseBody::Open(OpenResponse::default()));
    }

    #[test]
    fn test_failure_response_tolerates_garbage_body() {
        let text = r#"{"header":{"request_id":9,"response_name":"read_mmio32","serial":3,"from":"a"},"result":"INVALID_PARAM","body":{"value":"nope"}}"#;
        let resp = decode_response(text).unwrap();
        assert_eq!(resp.result, ResultCode::InvalidParam);
        assert_eq!(resp.body, ResponseBody::ReadMmio32(Value32Response::default()));
    }

    #[test]
    fn test_success_response_requires_body() {
        let text = r#"{"header":{"request_id":9,"response_name":"open","serial":3,"from":"a"},"result":"OK"}"#;
        assert!(decode_response(text).is_err());
    }

    #[test]
    fn test_response_without_result_fails() {
        let text = r#"{"header":{"request_id":9,"response_name":"close","serial":3,"from":"a"},"body":{}}"#;
        assert!(decode_response(text).is_err());
    }

    #[test]
    fn test_failure_helper_uses_default_body() {
        let req = request(RequestBody::Open(OpenRequest {
            token_id: rid(1),
            flags: 0,
        }));
        let resp = Response::failure(&req.header, host("agent"), OpTag::Open, ResultCode::Busy);
        let decoded = decode_response(&encode_response(&resp, WireFormat::Compact).unwrap()).unwrap();
        assert_eq!(decoded, resp);
    }

    // -------------------------------------------------------------------------
    // Round-trip law
    // -------------------------------------------------------------------------

    fn any_host() -> impl Strategy<Value = HostName> {
        "[a-z0-9.-]{0,64}".prop_map(|s| HostName::new(&s).unwrap())
    }

    fn any_id() -> impl Strategy<Value = RemoteId> {
        (any_host(), any::<u64>()).prop_map(|(h, n)| RemoteId::new(h, n))
    }

    fn any_name() -> impl Strategy<Value = SysobjectName> {
        "[a-z_/]{0,256}".prop_map(|s| SysobjectName::new(&s).unwrap())
    }

    fn any_properties() -> impl Strategy<Value = Properties> {
        use proptest::option::of;
        let location = (
            of(any_id()),
            of(prop_oneof![Just(ObjectType::Device), Just(ObjectType::Accelerator)]),
            of(any::<u16>()),
            of(any::<u8>()),
            of(any::<u8>()),
            of(any::<u8>()),
            of(any::<u8>()),
        );
        let identity = (
            of(any::<u16>()),
            of(any::<u16>()),
            of(any::<[u8; 16]>()),
            of(any::<u32>()),
            of(any::<u32>()),
            of(any::<u64>()),
            of(prop_oneof![Just(AcceleratorState::Assigned), Just(AcceleratorState::Unassigned)]),
            of(any::<u32>()),
            of(any::<u32>()),
        );
        (location, identity).prop_map(
            |(
                (parent, object_type, segment, bus, device, function, socket_id),
                (vendor_id, device_id, guid, num_errors, num_slots, bbs_id, accelerator_state, num_mmio, num_interrupts),
            )| Properties {
                parent,
                object_type,
                segment,
                bus,
                device,
                function,
                socket_id,
                vendor_id,
                device_id,
                guid: guid.map(Guid),
                num_errors,
                num_slots,
                bbs_id,
                accelerator_state,
                num_mmio,
                num_interrupts,
            },
        )
    }

    fn any_token_header() -> impl Strategy<Value = TokenHeader> {
        (any_id(), any_properties()).prop_map(|(token_id, properties)| TokenHeader { token_id, properties })
    }

    fn any_handle_header() -> impl Strategy<Value = HandleHeader> {
        (any_id(), any_id(), any::<i32>()).prop_map(|(handle_id, token_id, flags)| HandleHeader {
            handle_id,
            token_id,
            flags,
        })
    }

    fn token_ops() -> impl Strategy<Value = RequestBody> {
        prop_oneof![
            (prop::collection::vec(any_properties(), 0..4), any::<u32>())
                .prop_map(|(f, max)| RequestBody::Enumerate(EnumerateRequest::new(f, max).unwrap())),
            any_id().prop_map(|token_id| RequestBody::DestroyToken(TokenRequest { token_id })),
            any_id().prop_map(|src_token_id| RequestBody::CloneToken(CloneTokenRequest { src_token_id })),
            any_id().prop_map(|token_id| RequestBody::GetProperties(TokenRequest { token_id })),
            any_id().prop_map(|token_id| RequestBody::UpdateProperties(TokenRequest { token_id })),
            (any_id(), any::<i32>())
                .prop_map(|(token_id, flags)| RequestBody::Open(OpenRequest { token_id, flags })),
            (any_id(), any::<u32>()).prop_map(|(token_id, error_num)| {
                RequestBody::ReadError(ErrorRequest { token_id, error_num })
            }),
            (any_id(), any::<u32>()).prop_map(|(token_id, error_num)| {
                RequestBody::GetErrorInfo(ErrorRequest { token_id, error_num })
            }),
            (any_id(), any::<u32>()).prop_map(|(token_id, error_num)| {
                RequestBody::ClearError(ErrorRequest { token_id, error_num })
            }),
            any_id().prop_map(|token_id| RequestBody::ClearAllErrors(TokenRequest { token_id })),
        ]
    }

    fn handle_ops() -> impl Strategy<Value = RequestBody> {
        prop_oneof![
            any_id().prop_map(|handle_id| RequestBody::Close(HandleRequest { handle_id })),
            any_id().prop_map(|handle_id| RequestBody::Reset(HandleRequest { handle_id })),
            any_id().prop_map(|handle_id| {
                RequestBody::GetPropertiesFromHandle(HandleRequest { handle_id })
            }),
            (any_id(), any::<u32>())
                .prop_map(|(handle_id, mmio_num)| RequestBody::MapMmio(MapMmioRequest { handle_id, mmio_num })),
            (any_id(), any_id(), any::<u32>()).prop_map(|(handle_id, mmio_id, mmio_num)| {
                RequestBody::UnmapMmio(UnmapMmioRequest { handle_id, mmio_id, mmio_num })
            }),
            (any_id(), any::<u32>(), any::<u64>()).prop_map(|(handle_id, mmio_num, offset)| {
                RequestBody::ReadMmio32(MmioReadRequest { handle_id, mmio_num, offset })
            }),
            (any_id(), any::<u32>(), any::<u64>()).prop_map(|(handle_id, mmio_num, offset)| {
                RequestBody::ReadMmio64(MmioReadRequest { handle_id, mmio_num, offset })
            }),
            (any_id(), any::<u32>(), any::<u64>(), any::<u32>()).prop_map(
                |(handle_id, mmio_num, offset, value)| {
                    RequestBody::WriteMmio32(WriteMmio32Request { handle_id, mmio_num, offset, value })
                }
            ),
            (any_id(), any::<u32>(), any::<u64>(), any::<u64>()).prop_map(
                |(handle_id, mmio_num, offset, value)| {
                    RequestBody::WriteMmio64(WriteMmio64Request { handle_id, mmio_num, offset, value })
                }
            ),
            (any_id(), any::<u32>(), any::<u64>(), any::<[u64; 8]>()).prop_map(
                |(handle_id, mmio_num, offset, values)| {
                    RequestBody::WriteMmio512(WriteMmio512Request { handle_id, mmio_num, offset, values })
                }
            ),
        ]
    }

    fn buffer_and_object_ops() -> impl Strategy<Value = RequestBody> {
        prop_oneof![
            (any_id(), any::<u64>(), proptest::option::of(any::<u64>()), any::<i32>()).prop_map(
                |(handle_id, len, pre_allocated_addr, flags)| {
                    RequestBody::PrepareBuffer(PrepareBufferRequest {
                        handle_id,
                        len,
                        pre_allocated_addr,
                        flags,
                    })
                }
            ),
            (any_id(), any_id())
                .prop_map(|(handle_id, buf_id)| RequestBody::ReleaseBuffer(BufferRequest { handle_id, buf_id })),
            (any_id(), any_id())
                .prop_map(|(handle_id, buf_id)| RequestBody::GetIoAddress(BufferRequest { handle_id, buf_id })),
            (any_id(), any_name(), any::<i32>()).prop_map(|(token_id, name, flags)| {
                RequestBody::TokenGetObject(TokenGetObjectRequest { token_id, name, flags })
            }),
            (any_id(), any_name(), any::<i32>()).prop_map(|(handle_id, name, flags)| {
                RequestBody::HandleGetObject(HandleGetObjectRequest { handle_id, name, flags })
            }),
            (any_id(), any_name(), any::<i32>()).prop_map(|(object_id, name, flags)| {
                RequestBody::ObjectGetObject(ObjectGetObjectRequest { object_id, name, flags })
            }),
            (any_id(), any::<u64>()).prop_map(|(object_id, idx)| {
                RequestBody::ObjectGetObjectAt(ObjectGetObjectAtRequest { object_id, idx })
            }),
            any_id().prop_map(|object_id| RequestBody::DestroyObject(ObjectRequest { object_id })),
            any_id().prop_map(|object_id| RequestBody::ObjectGetType(ObjectRequest { object_id })),
            any_id().prop_map(|object_id| RequestBody::ObjectGetName(ObjectRequest { object_id })),
        ]
    }

    fn object_value_ops() -> impl Strategy<Value = RequestBody> {
        prop_oneof![
            (any_id(), any::<i32>())
                .prop_map(|(object_id, flags)| RequestBody::ObjectGetSize(ObjectFlagsRequest { object_id, flags })),
            (any_id(), any::<i32>())
                .prop_map(|(object_id, flags)| RequestBody::ObjectRead64(ObjectFlagsRequest { object_id, flags })),
            (any_id(), any::<u64>(), any::<u64>(), any::<i32>()).prop_map(
                |(object_id, offset, len, flags)| {
                    RequestBody::ObjectRead(ObjectReadRequest { object_id, offset, len, flags })
                }
            ),
            (any_id(), any::<u64>(), any::<i32>()).prop_map(|(object_id, value, flags)| {
                RequestBody::ObjectWrite64(ObjectWrite64Request { object_id, value, flags })
            }),
        ]
    }

    fn any_request_body() -> impl Strategy<Value = RequestBody> {
        prop_oneof![token_ops(), handle_ops(), buffer_and_object_ops(), object_value_ops()]
    }

    fn token_responses() -> impl Strategy<Value = ResponseBody> {
        prop_oneof![
            (prop::collection::vec(any_token_header(), 0..4), any::<u16>()).prop_map(|(tokens, extra)| {
                let num_matches = tokens.len() as u32 + u32::from(extra);
                ResponseBody::Enumerate(EnumerateResponse { tokens, num_matches })
            }),
            Just(ResponseBody::DestroyToken(Empty {})),
            any_token_header().prop_map(|token| ResponseBody::CloneToken(TokenResponse { token })),
            any_properties().prop_map(|properties| ResponseBody::GetProperties(PropertiesResponse { properties })),
            any_properties().prop_map(|properties| ResponseBody::UpdateProperties(PropertiesResponse { properties })),
            any_handle_header().prop_map(|handle| ResponseBody::Open(OpenResponse { handle })),
            any::<u64>().prop_map(|value| ResponseBody::ReadError(Value64Response { value })),
            ("[a-z_]{0,64}", any::<bool>()).prop_map(|(name, can_clear)| {
                ResponseBody::GetErrorInfo(ErrorInfoResponse {
                    error_info: ErrorInfo { name: ErrorName::new(&name).unwrap(), can_clear },
                })
            }),
            Just(ResponseBody::ClearError(Empty {})),
            Just(ResponseBody::ClearAllErrors(Empty {})),
        ]
    }

    fn handle_responses() -> impl Strategy<Value = ResponseBody> {
        prop_oneof![
            Just(ResponseBody::Close(Empty {})),
            Just(ResponseBody::Reset(Empty {})),
            any_properties().prop_map(|properties| {
                ResponseBody::GetPropertiesFromHandle(PropertiesResponse { properties })
            }),
            any_id().prop_map(|mmio_id| ResponseBody::MapMmio(MmioIdResponse { mmio_id })),
            Just(ResponseBody::UnmapMmio(Empty {})),
            any::<u32>().prop_map(|value| ResponseBody::ReadMmio32(Value32Response { value })),
            Just(ResponseBody::WriteMmio32(Empty {})),
            any::<u64>().prop_map(|value| ResponseBody::ReadMmio64(Value64Response { value })),
            Just(ResponseBody::WriteMmio64(Empty {})),
            Just(ResponseBody::WriteMmio512(Empty {})),
        ]
    }

    fn buffer_and_object_responses() -> impl Strategy<Value = ResponseBody> {
        prop_oneof![
            any_id().prop_map(|buf_id| ResponseBody::PrepareBuffer(BufferIdResponse { buf_id })),
            Just(ResponseBody::ReleaseBuffer(Empty {})),
            any::<u64>().prop_map(|ioaddr| ResponseBody::GetIoAddress(IoAddressResponse { ioaddr })),
            any_id().prop_map(|object_id| ResponseBody::TokenGetObject(ObjectIdResponse { object_id })),
            any_id().prop_map(|object_id| ResponseBody::HandleGetObject(ObjectIdResponse { object_id })),
            any_id().prop_map(|object_id| ResponseBody::ObjectGetObject(ObjectIdResponse { object_id })),
            any_id().prop_map(|object_id| ResponseBody::ObjectGetObjectAt(ObjectIdResponse { object_id })),
            Just(ResponseBody::DestroyObject(Empty {})),
            prop_oneof![Just(SysobjectType::Container), Just(SysobjectType::Attribute)]
                .prop_map(|object_type| ResponseBody::ObjectGetType(ObjectTypeResponse { object_type })),
            any_name().prop_map(|name| ResponseBody::ObjectGetName(NameResponse { name })),
        ]
    }

    fn object_value_responses() -> impl Strategy<Value = ResponseBody> {
        prop_oneof![
            any::<u32>().prop_map(|value| ResponseBody::ObjectGetSize(Value32Response { value })),
            "[ -~]{0,128}".prop_map(|value| ResponseBody::ObjectRead(ObjectReadResponse { value })),
            any::<u64>().prop_map(|value| ResponseBody::ObjectRead64(Value64Response { value })),
            Just(ResponseBody::ObjectWrite64(Empty {})),
        ]
    }

    fn any_response_body() -> impl Strategy<Value = ResponseBody> {
        prop_oneof![
            token_responses(),
            handle_responses(),
            buffer_and_object_responses(),
            object_value_responses(),
        ]
    }

    fn success(request_id: u64, body: ResponseBody) -> Response {
        let header = RequestHeader {
            request_id,
            request_name: op_name(body.tag()),
            serial: 1,
            from: host("client"),
        };
        Response::success(&header, host("agent"), body)
    }

    #[test]
    fn test_response_strategy_covers_every_operation() {
        use proptest::strategy::ValueTree;
        use proptest::test_runner::TestRunner;
        use std::collections::HashSet;

        let strategy = any_response_body();
        let mut runner = TestRunner::deterministic();
        let mut seen = HashSet::new();
        for _ in 0..4000 {
            seen.insert(strategy.new_tree(&mut runner).unwrap().current().tag());
        }
        assert_eq!(seen.len(), OpTag::ALL.len());
    }

    #[test]
    fn test_object_read_at_capacity_round_trips() {
        let body = ResponseBody::ObjectRead(ObjectReadResponse {
            value: "v".repeat(OBJECT_VALUE_MAX),
        });
        let resp = success(3, body);
        let text = encode_response(&resp, WireFormat::Compact).unwrap();
        assert_eq!(decode_response(&text).unwrap(), resp);
    }

    proptest! {
        #[test]
        fn prop_request_round_trip(
            body in any_request_body(),
            request_id in any::<u64>(),
            serial in any::<u64>(),
            from in any_host(),
        ) {
            let req = Request::new(request_id, serial, from, body);
            let text = encode_request(&req, WireFormat::Compact).unwrap();
            prop_assert_eq!(decode_request(&text).unwrap(), req);
        }

        #[test]
        fn prop_failure_response_round_trip(
            op_index in 0..OpTag::ALL.len(),
            request_id in any::<u64>(),
        ) {
            let op = OpTag::ALL[op_index];
            let header = RequestHeader {
                request_id,
                request_name: op_name(op),
                serial: 0,
                from: host("client"),
            };
            let resp = Response::failure(&header, host("agent"), op, ResultCode::Exception);
            let text = encode_response(&resp, WireFormat::Pretty).unwrap();
            prop_assert_eq!(decode_response(&text).unwrap(), resp);
        }

        #[test]
        fn prop_success_response_round_trip(
            body in any_response_body(),
            request_id in any::<u64>(),
            pretty in any::<bool>(),
        ) {
            let resp = success(request_id, body);
            let format = if pretty { WireFormat::Pretty } else { WireFormat::Compact };
            let text = encode_response(&resp, format).unwrap();
            prop_assert_eq!(decode_response(&text).unwrap(), resp);
        }
    }
}
