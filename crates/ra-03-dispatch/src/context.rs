//! # Remote Context
//!
//! One agent-side session: the five registries, the wire format, the serial
//! tracker and a lifecycle gate. Every request runs under a shared hold on
//! the gate; `release` takes it exclusively, so it waits for in-flight
//! requests and everything after it is answered with `NoDaemon`.

use crate::domain::{
    BufferEntry, HandleEntry, HandleSlot, MmioEntry, ObjectEntry, SerialObservation,
    SerialTracker, TokenEntry,
};
use crate::error::DispatchError;
use crate::ports::DeviceDriver;
use parking_lot::{Mutex, RwLock};
use ra_01_codec::{decode_request_envelope, encode_response, OpTag, Request, Response};
use ra_02_registry::{Registry, RegistryError, RegistryKind, RemoteIdGenerator, RemoteRegistry};
use shared_types::{DriverResult, HostName, RemoteId, ResultCode, WireFormat};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Registries of a context driving `D`.
pub type ContextRegistry<D> = RemoteRegistry<
    TokenEntry<<D as DeviceDriver>::Token>,
    HandleEntry<<D as DeviceDriver>::Handle, <D as DeviceDriver>::Mmio, <D as DeviceDriver>::Buffer>,
    MmioEntry,
    BufferEntry,
    ObjectEntry<<D as DeviceDriver>::Object>,
>;

pub(crate) type TokenRef<D> = Arc<TokenEntry<<D as DeviceDriver>::Token>>;
pub(crate) type HandleRef<D> = Arc<
    HandleEntry<<D as DeviceDriver>::Handle, <D as DeviceDriver>::Mmio, <D as DeviceDriver>::Buffer>,
>;
pub(crate) type Slot<D> =
    HandleSlot<<D as DeviceDriver>::Handle, <D as DeviceDriver>::Mmio, <D as DeviceDriver>::Buffer>;
pub(crate) type ObjectRef<D> = Arc<ObjectEntry<<D as DeviceDriver>::Object>>;

/// Result of answering one encoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub op: OpTag,
    pub request_id: u64,
    pub result: ResultCode,
    /// Encoded response.
    pub response: String,
}

/// An agent-side session.
pub struct RemoteContext<D: DeviceDriver> {
    pub(crate) driver: Arc<D>,
    pub(crate) registry: ContextRegistry<D>,
    pub(crate) ids: RemoteIdGenerator,
    format: WireFormat,
    serials: Mutex<SerialTracker>,
    open: RwLock<bool>,
}

impl<D: DeviceDriver> RemoteContext<D> {
    /// Creates a context with empty registries.
    pub fn new(driver: Arc<D>, hostname: HostName, format: WireFormat) -> Self {
        info!(hostname = %hostname, "remote context initialized");
        Self {
            driver,
            registry: RemoteRegistry::new(),
            ids: RemoteIdGenerator::new(hostname),
            format,
            serials: Mutex::new(SerialTracker::new()),
            open: RwLock::new(true),
        }
    }

    pub fn hostname(&self) -> HostName {
        self.ids.hostname()
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// Number of identities currently resolvable.
    pub fn live_identities(&self) -> usize {
        self.registry.live_count()
    }

    /// Returns true if `id` currently resolves in the `kind` map.
    pub fn is_live(&self, kind: RegistryKind, id: &RemoteId) -> bool {
        match kind {
            RegistryKind::Token => self.registry.tokens.contains(id),
            RegistryKind::Handle => self.registry.handles.contains(id),
            RegistryKind::Mmio => self.registry.mmios.contains(id),
            RegistryKind::Buffer => self.registry.buffers.contains(id),
            RegistryKind::Sysobject => self.registry.objects.contains(id),
        }
    }

    // =========================================================================
    // REQUEST ENTRY POINTS
    // =========================================================================

    /// Answers one encoded request.
    ///
    /// A body that fails to decode is answered with `Exception` and never
    /// reaches the driver. Only an unreadable header or unknown operation is
    /// returned as an error.
    pub fn handle_request(&self, text: &str) -> Result<DispatchOutcome, DispatchError> {
        let envelope = decode_request_envelope(text).map_err(DispatchError::Decode)?;
        let header = envelope.header;
        let op = envelope.op;

        let response = match envelope.into_request() {
            Ok(request) => self.dispatch(request),
            Err(err) => {
                warn!(op = %op, request_id = header.request_id, error = %err, "rejected request body");
                Response::failure(&header, self.hostname(), op, err.result_code())
            }
        };

        let encoded = self.encode(&response)?;
        Ok(DispatchOutcome {
            op,
            request_id: header.request_id,
            result: response.result,
            response: encoded,
        })
    }

    /// Executes a decoded request.
    pub fn dispatch(&self, request: Request) -> Response {
        let op = request.op();
        let header = request.header;
        let open = self.open.read();
        if !*open {
            debug!(op = %op, request_id = header.request_id, "context released");
            return Response::failure(&header, self.hostname(), op, ResultCode::NoDaemon);
        }

        let observed = self.serials.lock().observe(header.from, header.serial);
        if observed.is_anomaly() {
            warn!(
                op = %op,
                from = %header.from,
                serial = header.serial,
                observation = ?observed,
                "out-of-order request serial"
            );
        } else if observed == SerialObservation::First {
            debug!(from = %header.from, "first request from originator");
        }

        let response = match self.execute(request.body) {
            Ok(body) => Response::success(&header, self.hostname(), body),
            Err(code) => Response::failure(&header, self.hostname(), op, code),
        };
        debug!(
            op = %op,
            request_id = header.request_id,
            result = response.result.as_str(),
            "dispatched"
        );
        response
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Invalidates every identity and tears down native state, best effort.
    ///
    /// Idempotent. Teardown failures are logged, never surfaced.
    pub fn release(&self) {
        let mut open = self.open.write();
        if !*open {
            return;
        }
        *open = false;

        let objects = self.registry.objects.drain();
        let handles = self.registry.handles.drain();
        let mmios = self.registry.mmios.drain();
        let buffers = self.registry.buffers.drain();
        let tokens = self.registry.tokens.drain();
        info!(
            objects = objects.len(),
            handles = handles.len(),
            mmios = mmios.len(),
            buffers = buffers.len(),
            tokens = tokens.len(),
            "releasing remote context"
        );

        for (id, entry) in objects {
            if let Err(code) = self.destroy_object_entry(&entry) {
                error!(remote_id = %id, result = code.as_str(), "sysobject teardown failed");
            }
        }
        for (id, entry) in handles {
            let mut slot = entry.slot.lock();
            if let Err(code) = self.teardown_handle(id, &mut slot) {
                error!(remote_id = %id, result = code.as_str(), "handle teardown failed");
            }
        }
        for (id, entry) in tokens {
            let native = entry.native.write().take();
            if let Some(native) = native {
                if let Err(code) = self.driver.destroy_token(native) {
                    error!(remote_id = %id, result = code.as_str(), "token teardown failed");
                }
            }
        }
    }

    // =========================================================================
    // RESOLUTION HELPERS
    // =========================================================================

    fn unresolved(&self, err: RegistryError) -> ResultCode {
        warn!(error = %err, "unresolved remote identity");
        err.result_code()
    }

    pub(crate) fn token(&self, id: &RemoteId) -> DriverResult<TokenRef<D>> {
        self.registry.tokens.lookup(id).map_err(|e| self.unresolved(e))
    }

    pub(crate) fn handle(&self, id: &RemoteId) -> DriverResult<HandleRef<D>> {
        self.registry.handles.lookup(id).map_err(|e| self.unresolved(e))
    }

    pub(crate) fn mmio(&self, id: &RemoteId) -> DriverResult<Arc<MmioEntry>> {
        self.registry.mmios.lookup(id).map_err(|e| self.unresolved(e))
    }

    pub(crate) fn buffer(&self, id: &RemoteId) -> DriverResult<Arc<BufferEntry>> {
        self.registry.buffers.lookup(id).map_err(|e| self.unresolved(e))
    }

    pub(crate) fn object(&self, id: &RemoteId) -> DriverResult<ObjectRef<D>> {
        self.registry.objects.lookup(id).map_err(|e| self.unresolved(e))
    }

    /// Mints an identity and registers the state built for it.
    pub(crate) fn register<S>(
        &self,
        registry: &Registry<S>,
        build: impl FnOnce(RemoteId) -> S,
    ) -> DriverResult<RemoteId> {
        let id = self.ids.next_id();
        registry.insert(id, build(id))?;
        Ok(id)
    }

    /// Returns true while the token or handle `owner` resolves.
    pub(crate) fn owner_is_live(&self, owner: &RemoteId) -> bool {
        self.registry.tokens.contains(owner) || self.registry.handles.contains(owner)
    }

    // =========================================================================
    // TEARDOWN HELPERS
    // =========================================================================

    /// Unmaps regions, releases buffers and closes the native handle.
    ///
    /// Child identities are invalidated whatever the driver reports; the
    /// returned code is the native close's.
    pub(crate) fn teardown_handle(&self, handle_id: RemoteId, slot: &mut Slot<D>) -> DriverResult<()> {
        let regions = std::mem::take(&mut slot.regions);
        let buffers = std::mem::take(&mut slot.buffers);

        for (mmio_num, (mmio_id, mmio)) in regions {
            let _ = self.registry.mmios.remove(&mmio_id);
            if let Some(native) = slot.native.as_mut() {
                if let Err(code) = self.driver.unmap_mmio(native, mmio_num, mmio) {
                    warn!(handle = %handle_id, mmio_num, result = code.as_str(), "unmap during close failed");
                }
            }
        }
        for (buf_id, buffer) in buffers {
            let _ = self.registry.buffers.remove(&buf_id);
            if let Some(native) = slot.native.as_mut() {
                if let Err(code) = self.driver.release_buffer(native, buffer) {
                    warn!(handle = %handle_id, buffer = %buf_id, result = code.as_str(), "buffer release during close failed");
                }
            }
        }

        match slot.native.take() {
            Some(native) => self.driver.close(native),
            None => Err(ResultCode::NotFound),
        }
    }

    /// Destroys every sysobject owned by `owner`, best effort.
    pub(crate) fn destroy_owned_objects(&self, owner: &RemoteId) {
        for (id, entry) in self.registry.objects.remove_where(|o| o.owner == *owner) {
            if let Err(code) = self.destroy_object_entry(&entry) {
                warn!(remote_id = %id, owner = %owner, result = code.as_str(), "sysobject teardown failed");
            }
        }
    }

    pub(crate) fn destroy_object_entry(
        &self,
        entry: &ObjectEntry<D::Object>,
    ) -> DriverResult<()> {
        let native = entry.native.lock().take();
        match native {
            Some(native) => self.driver.destroy_object(native),
            None => Err(ResultCode::NotFound),
        }
    }

    /// Encodes a response in this context's format.
    pub fn encode(&self, response: &Response) -> Result<String, DispatchError> {
        encode_response(response, self.format).map_err(DispatchError::Encode)
    }
}

impl<D: DeviceDriver> Drop for RemoteContext<D> {
    fn drop(&mut self) {
        self.release();
    }
}
