//! Shared buffers.

use crate::context::RemoteContext;
use crate::domain::BufferEntry;
use crate::ports::DeviceDriver;
use ra_01_codec::requests::{BufferRequest, PrepareBufferRequest};
use ra_01_codec::responses::{BufferIdResponse, Empty, IoAddressResponse};
use ra_01_codec::ResponseBody;
use shared_types::{DriverResult, ResultCode};
use std::sync::Arc;
use tracing::{debug, warn};

impl<D: DeviceDriver> RemoteContext<D> {
    pub(crate) fn prepare_buffer(&self, req: PrepareBufferRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        let buffer = self
            .driver
            .prepare_buffer(native, req.len, req.pre_allocated_addr, req.flags)?;

        let buf_id = match self.register(&self.registry.buffers, |id| BufferEntry {
            buf_id: id,
            handle_id: req.handle_id,
            len: req.len,
        }) {
            Ok(id) => id,
            Err(code) => {
                if let Some(native) = slot.native.as_mut() {
                    let _ = self.driver.release_buffer(native, buffer);
                }
                return Err(code);
            }
        };
        slot.buffers.insert(buf_id, buffer);
        debug!(handle = %req.handle_id, buffer = %buf_id, len = req.len, "buffer prepared");
        Ok(ResponseBody::PrepareBuffer(BufferIdResponse { buf_id }))
    }

    pub(crate) fn release_buffer(&self, req: BufferRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        self.owned_buffer(&req)?;

        let mut slot = entry.slot.lock();
        let buffer = slot.buffers.remove(&req.buf_id).ok_or(ResultCode::NotFound)?;
        let _ = self.registry.buffers.remove(&req.buf_id);
        let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        self.driver.release_buffer(native, buffer)?;
        Ok(ResponseBody::ReleaseBuffer(Empty {}))
    }

    pub(crate) fn get_io_address(&self, req: BufferRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        self.owned_buffer(&req)?;

        let mut slot = entry.slot.lock();
        let slot = &mut *slot;
        let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        let buffer = slot.buffers.get(&req.buf_id).ok_or(ResultCode::NotFound)?;
        let ioaddr = self.driver.io_address(native, buffer)?;
        Ok(ResponseBody::GetIoAddress(IoAddressResponse { ioaddr }))
    }

    /// Resolves a buffer and checks it belongs to the named handle.
    fn owned_buffer(&self, req: &BufferRequest) -> DriverResult<Arc<BufferEntry>> {
        let buffer = self.buffer(&req.buf_id)?;
        if buffer.handle_id != req.handle_id {
            warn!(handle = %req.handle_id, buffer = %req.buf_id, "buffer does not belong to handle");
            return Err(ResultCode::InvalidParam);
        }
        Ok(buffer)
    }
}
