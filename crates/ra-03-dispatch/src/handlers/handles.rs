//! Handle lifecycle.

use crate::context::RemoteContext;
use crate::ports::DeviceDriver;
use ra_01_codec::requests::HandleRequest;
use ra_01_codec::responses::{Empty, PropertiesResponse};
use ra_01_codec::ResponseBody;
use shared_types::{DriverResult, ResultCode};
use tracing::debug;

impl<D: DeviceDriver> RemoteContext<D> {
    /// Closes a handle, cascading to its regions, buffers and sysobjects.
    pub(crate) fn close(&self, req: HandleRequest) -> DriverResult<ResponseBody> {
        let entry = self.registry.handles.remove(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        self.destroy_owned_objects(&req.handle_id);
        let result = self.teardown_handle(req.handle_id, &mut slot);
        debug!(handle = %req.handle_id, ok = result.is_ok(), "closed");
        result?;
        Ok(ResponseBody::Close(Empty {}))
    }

    pub(crate) fn reset(&self, req: HandleRequest) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let native = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        self.driver.reset(native)?;
        Ok(ResponseBody::Reset(Empty {}))
    }

    pub(crate) fn get_properties_from_handle(
        &self,
        req: HandleRequest,
    ) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let slot = entry.slot.lock();
        let native = slot.native.as_ref().ok_or(ResultCode::NotFound)?;
        let properties = self.driver.handle_properties(native)?;
        Ok(ResponseBody::GetPropertiesFromHandle(PropertiesResponse {
            properties,
        }))
    }
}
