//! # Remote Client
//!
//! Presents the accelerator API over a `Transport`. Every call resolves its
//! proxy keys to remote identities, performs one round trip and commits the
//! resulting proxy changes. The graph lock is never held across the
//! transport, so calls on different proxies proceed in parallel.
//!
//! ## Failure handling
//!
//! - Stale keys and over-capacity names fail locally, without a round trip.
//! - A timeout leaves the outcome unknown; the target proxy is flagged
//!   indeterminate until the next successful response about it.
//! - Teardown drops the proxy whenever the agent resolved the identity,
//!   which is every answer except `InvalidParam`.
//! - A proxy that cannot be created after a successful response (its owner
//!   was released meanwhile) triggers a compensating release on the agent.
//! - `NoDaemon` means the agent's session is gone; every proxy is dropped.

use crate::config::ClientConfig;
use crate::domain::{
    Buffer, Handle, Mmio, ObjectOwner, ProxyGraph, ProxyRef, Sysobject, Token,
};
use crate::error::RemoteError;
use crate::ports::{Transport, TransportError};
use parking_lot::Mutex;
use ra_01_codec::requests::*;
use ra_01_codec::{
    decode_response, encode_request, CodecError, OpTag, Request, RequestBody, ResponseBody,
};
use shared_types::{ErrorInfo, Properties, RemoteId, ResultCode, SysobjectName, SysobjectType};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Extracts the success body of the expected operation.
macro_rules! reply {
    ($body:expr, $variant:ident) => {
        match $body {
            ResponseBody::$variant(inner) => inner,
            other => {
                return Err(RemoteError::Protocol(CodecError::TagMismatch {
                    header: other.tag().name().to_string(),
                    body: OpTag::$variant.name(),
                }))
            }
        }
    };
}

/// Result of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// One new token proxy per registered match.
    pub tokens: Vec<Token>,
    /// Matches on the agent, including those beyond `max_tokens`.
    pub num_matches: u32,
}

pub struct RemoteClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    graph: Mutex<ProxyGraph>,
    serial: AtomicU64,
}

impl<T: Transport> RemoteClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            graph: Mutex::new(ProxyGraph::new()),
            serial: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of live proxies of every kind.
    pub fn live_proxies(&self) -> usize {
        self.graph.lock().len()
    }

    /// `None` when `target` is stale.
    pub fn is_indeterminate(&self, target: ProxyRef) -> Option<bool> {
        self.graph.lock().is_indeterminate(target)
    }

    /// Remote identity behind a proxy.
    pub fn remote_id(&self, target: ProxyRef) -> Option<RemoteId> {
        let graph = self.graph.lock();
        match target {
            ProxyRef::Token(k) => graph.token(k).map(|p| p.remote_id),
            ProxyRef::Handle(k) => graph.handle(k).map(|p| p.remote_id),
            ProxyRef::Mmio(k) => graph.mmio(k).map(|p| p.remote_id),
            ProxyRef::Buffer(k) => graph.buffer(k).map(|p| p.remote_id),
            ProxyRef::Sysobject(k) => graph.object(k).map(|p| p.remote_id),
        }
    }

    /// Properties snapshot held by the token proxy, without a round trip.
    pub fn cached_properties(&self, token: Token) -> Result<Properties, RemoteError> {
        self.resolve(|g| g.token(token).map(|t| t.properties.clone()))
    }

    /// Token a handle was opened from, while that token proxy is live.
    pub fn token_of(&self, handle: Handle) -> Option<Token> {
        self.graph.lock().token_of(handle)
    }

    /// Mapping proxy for region `mmio_num` of `handle`, if mapped.
    pub fn mapping(&self, handle: Handle, mmio_num: u32) -> Option<Mmio> {
        self.graph.lock().find_mmio(handle, mmio_num)
    }

    /// Drops every proxy without contacting the agent.
    pub fn forget_all(&self) {
        self.graph.lock().clear();
    }

    // =========================================================================
    // ROUND TRIP
    // =========================================================================

    fn call(&self, target: Option<ProxyRef>, body: RequestBody) -> Result<ResponseBody, RemoteError> {
        let op = body.tag();
        let request_id = rand::random::<u64>();
        let serial = self.serial.fetch_add(1, Ordering::Relaxed) + 1;
        let request = Request::new(request_id, serial, self.config.host_name, body);
        let text = encode_request(&request, self.config.format)?;
        debug!(%op, request_id, serial, "sending request");

        let reply = match self.transport.send_and_receive(&text) {
            Ok(reply) => reply,
            Err(TransportError::Timeout) => {
                if let Some(target) = target {
                    self.graph.lock().set_indeterminate(target, true);
                }
                warn!(%op, request_id, "request timed out, outcome unknown");
                return Err(RemoteError::OutcomeUnknown { op });
            }
            Err(err) => return Err(err.into()),
        };

        let response = decode_response(&reply)?;
        if response.header.request_id != request_id || response.op() != op {
            return Err(RemoteError::CorrelationMismatch {
                expected_id: request_id,
                expected_op: op,
                got_id: response.header.request_id,
                got_op: response.op(),
            });
        }

        match response.result {
            ResultCode::Ok => {
                if let Some(target) = target {
                    self.graph.lock().set_indeterminate(target, false);
                }
                Ok(response.body)
            }
            ResultCode::NoDaemon => {
                warn!(%op, request_id, "agent session released, dropping all proxies");
                self.graph.lock().clear();
                Err(RemoteError::Remote(ResultCode::NoDaemon))
            }
            code => {
                debug!(%op, request_id, result = code.as_str(), "remote call failed");
                Err(RemoteError::Remote(code))
            }
        }
    }

    /// Sends a release-type operation and drops the proxy when the agent
    /// resolved the identity.
    fn teardown(
        &self,
        target: ProxyRef,
        body: RequestBody,
        forget: impl FnOnce(&mut ProxyGraph),
    ) -> Result<(), RemoteError> {
        let result = self.call(Some(target), body).map(|_| ());
        let resolved = match &result {
            Ok(()) => true,
            Err(RemoteError::Remote(code)) => *code != ResultCode::InvalidParam,
            Err(_) => false,
        };
        if resolved {
            forget(&mut self.graph.lock());
        }
        result
    }

    /// Releases a remote resource whose proxy could not be created.
    fn compensate(&self, body: RequestBody, remote_id: RemoteId) -> RemoteError {
        let op = body.tag();
        match self.call(None, body) {
            Ok(_) => warn!(%op, %remote_id, "owner released during call, remote resource released"),
            Err(err) => {
                warn!(%op, %remote_id, error = %err, "compensating release failed, remote resource leaked")
            }
        }
        RemoteError::InvalidParam("owner proxy released during call")
    }

    fn resolve<R>(&self, f: impl FnOnce(&ProxyGraph) -> Option<R>) -> Result<R, RemoteError> {
        f(&self.graph.lock()).ok_or(RemoteError::StaleProxy)
    }

    fn token_id(&self, token: Token) -> Result<RemoteId, RemoteError> {
        self.resolve(|g| g.token(token).map(|t| t.remote_id))
    }

    fn handle_id(&self, handle: Handle) -> Result<RemoteId, RemoteError> {
        self.resolve(|g| g.handle(handle).map(|h| h.remote_id))
    }

    fn object_id(&self, object: Sysobject) -> Result<RemoteId, RemoteError> {
        self.resolve(|g| g.object(object).map(|o| o.remote_id))
    }

    /// `(handle_id, buf_id)` of a buffer proxy.
    fn buffer_ids(&self, buffer: Buffer) -> Result<(RemoteId, RemoteId), RemoteError> {
        self.resolve(|g| {
            let b = g.buffer(buffer)?;
            Some((g.handle(b.handle)?.remote_id, b.remote_id))
        })
    }

    // =========================================================================
    // TOKENS
    // =========================================================================

    /// Enumerates accelerators matching any of `filters` (all when empty),
    /// creating at most `max_tokens` token proxies.
    pub fn enumerate(&self, filters: &[Properties], max_tokens: u32) -> Result<Enumeration, RemoteError> {
        let body = RequestBody::Enumerate(EnumerateRequest::new(filters.to_vec(), max_tokens)?);
        let reply = reply!(self.call(None, body)?, Enumerate);
        let mut graph = self.graph.lock();
        let tokens = reply
            .tokens
            .into_iter()
            .map(|header| graph.insert_token(header.token_id, header.properties))
            .collect();
        Ok(Enumeration {
            tokens,
            num_matches: reply.num_matches,
        })
    }

    pub fn destroy_token(&self, token: Token) -> Result<(), RemoteError> {
        let token_id = self.token_id(token)?;
        self.teardown(
            ProxyRef::Token(token),
            RequestBody::DestroyToken(TokenRequest { token_id }),
            |g| {
                g.remove_token(token);
            },
        )
    }

    pub fn clone_token(&self, token: Token) -> Result<Token, RemoteError> {
        let src_token_id = self.token_id(token)?;
        let body = RequestBody::CloneToken(CloneTokenRequest { src_token_id });
        let reply = reply!(self.call(Some(ProxyRef::Token(token)), body)?, CloneToken);
        Ok(self
            .graph
            .lock()
            .insert_token(reply.token.token_id, reply.token.properties))
    }

    /// Fetches the token's properties and refreshes the cached snapshot.
    pub fn get_properties(&self, token: Token) -> Result<Properties, RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::GetProperties(TokenRequest { token_id });
        let reply = reply!(self.call(Some(ProxyRef::Token(token)), body)?, GetProperties);
        self.graph.lock().set_properties(token, reply.properties.clone());
        Ok(reply.properties)
    }

    /// Asks the agent to re-read the device state, then refreshes the
    /// cached snapshot.
    pub fn update_properties(&self, token: Token) -> Result<Properties, RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::UpdateProperties(TokenRequest { token_id });
        let reply = reply!(self.call(Some(ProxyRef::Token(token)), body)?, UpdateProperties);
        self.graph.lock().set_properties(token, reply.properties.clone());
        Ok(reply.properties)
    }

    pub fn open(&self, token: Token, flags: i32) -> Result<Handle, RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::Open(OpenRequest { token_id, flags });
        let reply = reply!(self.call(Some(ProxyRef::Token(token)), body)?, Open);
        let handle_id = reply.handle.handle_id;
        let created = self.graph.lock().insert_handle(token, reply.handle);
        created.ok_or_else(|| {
            self.compensate(RequestBody::Close(HandleRequest { handle_id }), handle_id)
        })
    }

    // =========================================================================
    // HANDLES
    // =========================================================================

    /// Closes the handle. The agent tears down its mappings, buffers and
    /// sysobjects; their proxies are dropped with it.
    pub fn close(&self, handle: Handle) -> Result<(), RemoteError> {
        let handle_id = self.handle_id(handle)?;
        self.teardown(
            ProxyRef::Handle(handle),
            RequestBody::Close(HandleRequest { handle_id }),
            |g| {
                g.remove_handle(handle);
            },
        )
    }

    pub fn reset(&self, handle: Handle) -> Result<(), RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::Reset(HandleRequest { handle_id });
        reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, Reset);
        Ok(())
    }

    pub fn get_properties_from_handle(&self, handle: Handle) -> Result<Properties, RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::GetPropertiesFromHandle(HandleRequest { handle_id });
        let reply = reply!(
            self.call(Some(ProxyRef::Handle(handle)), body)?,
            GetPropertiesFromHandle
        );
        Ok(reply.properties)
    }

    // =========================================================================
    // MMIO
    // =========================================================================

    /// Maps region `mmio_num`. Mapping it again yields the same proxy.
    pub fn map_mmio(&self, handle: Handle, mmio_num: u32) -> Result<Mmio, RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::MapMmio(MapMmioRequest { handle_id, mmio_num });
        let reply = reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, MapMmio);
        let mmio_id = reply.mmio_id;
        let created = self.graph.lock().insert_mmio(handle, mmio_num, mmio_id);
        created.ok_or_else(|| {
            let undo = UnmapMmioRequest {
                handle_id,
                mmio_id,
                mmio_num,
            };
            self.compensate(RequestBody::UnmapMmio(undo), mmio_id)
        })
    }

    pub fn unmap_mmio(&self, handle: Handle, mmio_num: u32) -> Result<(), RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let (mmio, mmio_id) = self
            .resolve(|g| {
                let key = g.find_mmio(handle, mmio_num)?;
                Some((key, g.mmio(key)?.remote_id))
            })
            .map_err(|_| RemoteError::InvalidParam("region not mapped"))?;
        let body = RequestBody::UnmapMmio(UnmapMmioRequest {
            handle_id,
            mmio_id,
            mmio_num,
        });
        self.teardown(ProxyRef::Mmio(mmio), body, |g| {
            g.remove_mmio(mmio);
        })
    }

    pub fn read_mmio32(&self, handle: Handle, mmio_num: u32, offset: u64) -> Result<u32, RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::ReadMmio32(MmioReadRequest {
            handle_id,
            mmio_num,
            offset,
        });
        Ok(reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, ReadMmio32).value)
    }

    pub fn write_mmio32(
        &self,
        handle: Handle,
        mmio_num: u32,
        offset: u64,
        value: u32,
    ) -> Result<(), RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::WriteMmio32(WriteMmio32Request {
            handle_id,
            mmio_num,
            offset,
            value,
        });
        reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, WriteMmio32);
        Ok(())
    }

    pub fn read_mmio64(&self, handle: Handle, mmio_num: u32, offset: u64) -> Result<u64, RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::ReadMmio64(MmioReadRequest {
            handle_id,
            mmio_num,
            offset,
        });
        Ok(reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, ReadMmio64).value)
    }

    pub fn write_mmio64(
        &self,
        handle: Handle,
        mmio_num: u32,
        offset: u64,
        value: u64,
    ) -> Result<(), RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::WriteMmio64(WriteMmio64Request {
            handle_id,
            mmio_num,
            offset,
            value,
        });
        reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, WriteMmio64);
        Ok(())
    }

    pub fn write_mmio512(
        &self,
        handle: Handle,
        mmio_num: u32,
        offset: u64,
        values: &[u64; 8],
    ) -> Result<(), RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::WriteMmio512(WriteMmio512Request {
            handle_id,
            mmio_num,
            offset,
            values: *values,
        });
        reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, WriteMmio512);
        Ok(())
    }

    // =========================================================================
    // BUFFERS
    // =========================================================================

    pub fn prepare_buffer(
        &self,
        handle: Handle,
        len: u64,
        pre_allocated_addr: Option<u64>,
        flags: i32,
    ) -> Result<Buffer, RemoteError> {
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::PrepareBuffer(PrepareBufferRequest {
            handle_id,
            len,
            pre_allocated_addr,
            flags,
        });
        let reply = reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, PrepareBuffer);
        let buf_id = reply.buf_id;
        let created = self
            .graph
            .lock()
            .insert_buffer(handle, buf_id, len, pre_allocated_addr);
        created.ok_or_else(|| {
            let undo = BufferRequest { handle_id, buf_id };
            self.compensate(RequestBody::ReleaseBuffer(undo), buf_id)
        })
    }

    pub fn release_buffer(&self, buffer: Buffer) -> Result<(), RemoteError> {
        let (handle_id, buf_id) = self.buffer_ids(buffer)?;
        self.teardown(
            ProxyRef::Buffer(buffer),
            RequestBody::ReleaseBuffer(BufferRequest { handle_id, buf_id }),
            |g| {
                g.remove_buffer(buffer);
            },
        )
    }

    pub fn get_io_address(&self, buffer: Buffer) -> Result<u64, RemoteError> {
        let (handle_id, buf_id) = self.buffer_ids(buffer)?;
        let body = RequestBody::GetIoAddress(BufferRequest { handle_id, buf_id });
        Ok(reply!(self.call(Some(ProxyRef::Buffer(buffer)), body)?, GetIoAddress).ioaddr)
    }

    // =========================================================================
    // ERROR REGISTERS
    // =========================================================================

    pub fn read_error(&self, token: Token, error_num: u32) -> Result<u64, RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::ReadError(ErrorRequest { token_id, error_num });
        Ok(reply!(self.call(Some(ProxyRef::Token(token)), body)?, ReadError).value)
    }

    pub fn get_error_info(&self, token: Token, error_num: u32) -> Result<ErrorInfo, RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::GetErrorInfo(ErrorRequest { token_id, error_num });
        Ok(reply!(self.call(Some(ProxyRef::Token(token)), body)?, GetErrorInfo).error_info)
    }

    pub fn clear_error(&self, token: Token, error_num: u32) -> Result<(), RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::ClearError(ErrorRequest { token_id, error_num });
        reply!(self.call(Some(ProxyRef::Token(token)), body)?, ClearError);
        Ok(())
    }

    pub fn clear_all_errors(&self, token: Token) -> Result<(), RemoteError> {
        let token_id = self.token_id(token)?;
        let body = RequestBody::ClearAllErrors(TokenRequest { token_id });
        reply!(self.call(Some(ProxyRef::Token(token)), body)?, ClearAllErrors);
        Ok(())
    }

    // =========================================================================
    // SYSOBJECTS
    // =========================================================================

    pub fn token_get_object(&self, token: Token, name: &str, flags: i32) -> Result<Sysobject, RemoteError> {
        let name = object_name(name)?;
        let token_id = self.token_id(token)?;
        let body = RequestBody::TokenGetObject(TokenGetObjectRequest {
            token_id,
            name,
            flags,
        });
        let reply = reply!(self.call(Some(ProxyRef::Token(token)), body)?, TokenGetObject);
        self.adopt_object(ObjectOwner::Token(token), None, reply.object_id)
    }

    pub fn handle_get_object(&self, handle: Handle, name: &str, flags: i32) -> Result<Sysobject, RemoteError> {
        let name = object_name(name)?;
        let handle_id = self.handle_id(handle)?;
        let body = RequestBody::HandleGetObject(HandleGetObjectRequest {
            handle_id,
            name,
            flags,
        });
        let reply = reply!(self.call(Some(ProxyRef::Handle(handle)), body)?, HandleGetObject);
        self.adopt_object(ObjectOwner::Handle(handle), None, reply.object_id)
    }

    /// Child of `parent` by name. The child shares its parent's owner.
    pub fn object_get_object(
        &self,
        parent: Sysobject,
        name: &str,
        flags: i32,
    ) -> Result<Sysobject, RemoteError> {
        let name = object_name(name)?;
        let (object_id, owner) = self.resolve(|g| g.object(parent).map(|o| (o.remote_id, o.owner)))?;
        let body = RequestBody::ObjectGetObject(ObjectGetObjectRequest {
            object_id,
            name,
            flags,
        });
        let reply = reply!(self.call(Some(ProxyRef::Sysobject(parent)), body)?, ObjectGetObject);
        self.adopt_object(owner, Some(parent), reply.object_id)
    }

    /// Child of `parent` by position.
    pub fn object_get_object_at(&self, parent: Sysobject, idx: u64) -> Result<Sysobject, RemoteError> {
        let (object_id, owner) = self.resolve(|g| g.object(parent).map(|o| (o.remote_id, o.owner)))?;
        let body = RequestBody::ObjectGetObjectAt(ObjectGetObjectAtRequest { object_id, idx });
        let reply = reply!(self.call(Some(ProxyRef::Sysobject(parent)), body)?, ObjectGetObjectAt);
        self.adopt_object(owner, Some(parent), reply.object_id)
    }

    fn adopt_object(
        &self,
        owner: ObjectOwner,
        parent: Option<Sysobject>,
        object_id: RemoteId,
    ) -> Result<Sysobject, RemoteError> {
        let created = self.graph.lock().insert_object(owner, parent, object_id);
        created.ok_or_else(|| {
            self.compensate(RequestBody::DestroyObject(ObjectRequest { object_id }), object_id)
        })
    }

    pub fn destroy_object(&self, object: Sysobject) -> Result<(), RemoteError> {
        let object_id = self.object_id(object)?;
        self.teardown(
            ProxyRef::Sysobject(object),
            RequestBody::DestroyObject(ObjectRequest { object_id }),
            |g| {
                g.remove_object(object);
            },
        )
    }

    pub fn object_get_type(&self, object: Sysobject) -> Result<SysobjectType, RemoteError> {
        let object_id = self.object_id(object)?;
        let body = RequestBody::ObjectGetType(ObjectRequest { object_id });
        Ok(reply!(self.call(Some(ProxyRef::Sysobject(object)), body)?, ObjectGetType).object_type)
    }

    pub fn object_get_name(&self, object: Sysobject) -> Result<String, RemoteError> {
        let object_id = self.object_id(object)?;
        let body = RequestBody::ObjectGetName(ObjectRequest { object_id });
        let reply = reply!(self.call(Some(ProxyRef::Sysobject(object)), body)?, ObjectGetName);
        Ok(reply.name.as_str().to_string())
    }

    pub fn object_get_size(&self, object: Sysobject, flags: i32) -> Result<u32, RemoteError> {
        let object_id = self.object_id(object)?;
        let body = RequestBody::ObjectGetSize(ObjectFlagsRequest { object_id, flags });
        Ok(reply!(self.call(Some(ProxyRef::Sysobject(object)), body)?, ObjectGetSize).value)
    }

    pub fn object_read(
        &self,
        object: Sysobject,
        offset: u64,
        len: u64,
        flags: i32,
    ) -> Result<String, RemoteError> {
        let object_id = self.object_id(object)?;
        let body = RequestBody::ObjectRead(ObjectReadRequest {
            object_id,
            offset,
            len,
            flags,
        });
        Ok(reply!(self.call(Some(ProxyRef::Sysobject(object)), body)?, ObjectRead).value)
    }

    pub fn object_read64(&self, object: Sysobject, flags: i32) -> Result<u64, RemoteError> {
        let object_id = self.object_id(object)?;
        let body = RequestBody::ObjectRead64(ObjectFlagsRequest { object_id, flags });
        Ok(reply!(self.call(Some(ProxyRef::Sysobject(object)), body)?, ObjectRead64).value)
    }

    pub fn object_write64(&self, object: Sysobject, value: u64, flags: i32) -> Result<(), RemoteError> {
        let object_id = self.object_id(object)?;
        let body = RequestBody::ObjectWrite64(ObjectWrite64Request {
            object_id,
            value,
            flags,
        });
        reply!(self.call(Some(ProxyRef::Sysobject(object)), body)?, ObjectWrite64);
        Ok(())
    }
}

fn object_name(name: &str) -> Result<SysobjectName, RemoteError> {
    SysobjectName::new(name).map_err(|_| RemoteError::InvalidParam("object name exceeds capacity"))
}
