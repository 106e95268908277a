//! Register region mapping and access.
//!
//! A read or write names its region by index. The region must have been
//! mapped through the same handle; otherwise the request is an
//! `InvalidParam`, not a device failure.

use crate::context::{RemoteContext, Slot};
use crate::domain::MmioEntry;
use crate::ports::DeviceDriver;
use ra_01_codec::requests::{
    MapMmioRequest, MmioReadRequest, UnmapMmioRequest, WriteMmio32Request, WriteMmio512Request,
    WriteMmio64Request,
};
use ra_01_codec::responses::{Empty, MmioIdResponse, Value32Response, Value64Response};
use ra_01_codec::ResponseBody;
use shared_types::{DriverResult, RemoteId, ResultCode};
use tracing::{debug, warn};

/// Splits a locked slot into the native handle and the mapping of `mmio_num`.
fn region<'a, D: DeviceDriver>(
    slot: &'a mut Slot<D>,
    handle_id: &RemoteId,
    mmio_num: u32,
) -> DriverResult<(&'a mut D::Handle, &'a D::Mmio)> {
    let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
    match slot.regions.get(&mmio_num) {
        Some((_, mmio)) => Ok((native, mmio)),
        None => {
            warn!(handle = %handle_id, mmio_num, "access to unmapped region");
            Err(ResultCode::InvalidParam)
        }
    }
}

impl<D: DeviceDriver> RemoteContext<D> {
    /// Maps a region. Mapping an already-mapped region returns its identity.
    pub(crate) fn map_mmio(&self, req: MapMmioRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        if slot.native.is_none() {
            return Err(ResultCode::NotFound);
        }
        if let Some((mmio_id, _)) = slot.regions.get(&req.mmio_num) {
            return Ok(ResponseBody::MapMmio(MmioIdResponse { mmio_id: *mmio_id }));
        }

        let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        let mmio = self.driver.map_mmio(native, req.mmio_num)?;
        let mmio_id = match self.register(&self.registry.mmios, |id| MmioEntry {
            mmio_id: id,
            handle_id: req.handle_id,
            mmio_num: req.mmio_num,
        }) {
            Ok(id) => id,
            Err(code) => {
                if let Some(native) = slot.native.as_mut() {
                    let _ = self.driver.unmap_mmio(native, req.mmio_num, mmio);
                }
                return Err(code);
            }
        };
        slot.regions.insert(req.mmio_num, (mmio_id, mmio));
        debug!(handle = %req.handle_id, mmio = %mmio_id, mmio_num = req.mmio_num, "mapped");
        Ok(ResponseBody::MapMmio(MmioIdResponse { mmio_id }))
    }

    pub(crate) fn unmap_mmio(&self, req: UnmapMmioRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mapping = self.mmio(&req.mmio_id)?;
        if mapping.handle_id != req.handle_id || mapping.mmio_num != req.mmio_num {
            warn!(handle = %req.handle_id, mmio = %req.mmio_id, "mapping does not belong to handle");
            return Err(ResultCode::InvalidParam);
        }

        let mut slot = entry.slot.lock();
        let mmio = match slot.regions.remove(&req.mmio_num) {
            Some((id, mmio)) if id == req.mmio_id => mmio,
            Some(other) => {
                slot.regions.insert(req.mmio_num, other);
                return Err(ResultCode::InvalidParam);
            }
            None => return Err(ResultCode::NotFound),
        };
        let _ = self.registry.mmios.remove(&req.mmio_id);

        let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        self.driver.unmap_mmio(native, req.mmio_num, mmio)?;
        Ok(ResponseBody::UnmapMmio(Empty {}))
    }

    pub(crate) fn read_mmio32(&self, req: MmioReadRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let (native, mmio) = region::<D>(&mut slot, &req.handle_id, req.mmio_num)?;
        let value = self.driver.read_mmio32(native, mmio, req.offset)?;
        Ok(ResponseBody::ReadMmio32(Value32Response { value }))
    }

    pub(crate) fn write_mmio32(&self, req: WriteMmio32Request) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let (native, mmio) = region::<D>(&mut slot, &req.handle_id, req.mmio_num)?;
        self.driver.write_mmio32(native, mmio, req.offset, req.value)?;
        Ok(ResponseBody::WriteMmio32(Empty {}))
    }

    pub(crate) fn read_mmio64(&self, req: MmioReadRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let (native, mmio) = region::<D>(&mut slot, &req.handle_id, req.mmio_num)?;
        let value = self.driver.read_mmio64(native, mmio, req.offset)?;
        Ok(ResponseBody::ReadMmio64(Value64Response { value }))
    }

    pub(crate) fn write_mmio64(&self, req: WriteMmio64Request) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let (native, mmio) = region::<D>(&mut slot, &req.handle_id, req.mmio_num)?;
        self.driver.write_mmio64(native, mmio, req.offset, req.value)?;
        Ok(ResponseBody::WriteMmio64(Empty {}))
    }

    pub(crate) fn write_mmio512(&self, req: WriteMmio512Request) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let (native, mmio) = region::<D>(&mut slot, &req.handle_id, req.mmio_num)?;
        self.driver.write_mmio512(native, mmio, req.offset, &req.values)?;
        Ok(ResponseBody::WriteMmio512(Empty {}))
    }
}
