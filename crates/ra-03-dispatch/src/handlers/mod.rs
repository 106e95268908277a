//! Per-operation handlers.
//!
//! Each handler resolves its identities through the registry, releases the
//! map lock, calls the driver, and commits any identity change afterwards.

mod buffers;
mod error_registers;
mod handles;
mod mmio;
mod sysobjects;
mod tokens;

use crate::context::RemoteContext;
use crate::ports::DeviceDriver;
use ra_01_codec::{RequestBody, ResponseBody};
use shared_types::DriverResult;

impl<D: DeviceDriver> RemoteContext<D> {
    pub(crate) fn execute(&self, body: RequestBody) -> DriverResult<ResponseBody> {
        match body {
            RequestBody::Enumerate(req) => self.enumerate(req),
            RequestBody::DestroyToken(req) => self.destroy_token(req),
            RequestBody::CloneToken(req) => self.clone_token(req),
            RequestBody::GetProperties(req) => self.get_properties(req),
            RequestBody::UpdateProperties(req) => self.update_properties(req),
            RequestBody::Open(req) => self.open(req),
            RequestBody::Close(req) => self.close(req),
            RequestBody::Reset(req) => self.reset(req),
            RequestBody::GetPropertiesFromHandle(req) => self.get_properties_from_handle(req),
            RequestBody::MapMmio(req) => self.map_mmio(req),
            RequestBody::UnmapMmio(req) => self.unmap_mmio(req),
            RequestBody::ReadMmio32(req) => self.read_mmio32(req),
            RequestBody::WriteMmio32(req) => self.write_mmio32(req),
            RequestBody::ReadMmio64(req) => self.read_mmio64(req),
            RequestBody::WriteMmio64(req) => self.write_mmio64(req),
            RequestBody::WriteMmio512(req) => self.write_mmio512(req),
            RequestBody::PrepareBuffer(req) => self.prepare_buffer(req),
            RequestBody::ReleaseBuffer(req) => self.release_buffer(req),
            RequestBody::GetIoAddress(req) => self.get_io_address(req),
            RequestBody::ReadError(req) => self.read_error(req),
            RequestBody::GetErrorInfo(req) => self.get_error_info(req),
            RequestBody::ClearError(req) => self.clear_error(req),
            RequestBody::ClearAllErrors(req) => self.clear_all_errors(req),
            RequestBody::TokenGetObject(req) => self.token_get_object(req),
            RequestBody::DestroyObject(req) => self.destroy_object(req),
            RequestBody::ObjectGetType(req) => self.object_get_type(req),
            RequestBody::ObjectGetName(req) => self.object_get_name(req),
            RequestBody::ObjectGetSize(req) => self.object_get_size(req),
            RequestBody::ObjectRead(req) => self.object_read(req),
            RequestBody::ObjectRead64(req) => self.object_read64(req),
            RequestBody::ObjectWrite64(req) => self.object_write64(req),
            RequestBody::HandleGetObject(req) => self.handle_get_object(req),
            RequestBody::ObjectGetObject(req) => self.object_get_object(req),
            RequestBody::ObjectGetObjectAt(req) => self.object_get_object_at(req),
        }
    }
}
