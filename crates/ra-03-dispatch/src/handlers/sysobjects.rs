//! Sysobject lookup, access and destruction.
//!
//! Every node records the token or handle whose teardown destroys it. A
//! child looked up from another node inherits that owner, so tearing down
//! a token or handle removes its whole tree.

use crate::context::RemoteContext;
use crate::domain::ObjectEntry;
use crate::ports::DeviceDriver;
use ra_01_codec::requests::{
    HandleGetObjectRequest, ObjectFlagsRequest, ObjectGetObjectAtRequest, ObjectGetObjectRequest,
    ObjectReadRequest, ObjectRequest, ObjectWrite64Request, TokenGetObjectRequest,
};
use ra_01_codec::responses::{
    Empty, NameResponse, ObjectIdResponse, ObjectReadResponse, ObjectTypeResponse,
    Value32Response, Value64Response, OBJECT_VALUE_MAX,
};
use ra_01_codec::ResponseBody;
use shared_types::{DriverResult, RemoteId, ResultCode, SysobjectName};
use tracing::{debug, warn};

impl<D: DeviceDriver> RemoteContext<D> {
    /// Runs `f` against the native sysobject named by `object_id`.
    fn with_object<R>(
        &self,
        object_id: &RemoteId,
        f: impl FnOnce(&D::Object) -> DriverResult<R>,
    ) -> DriverResult<R> {
        let entry = self.object(object_id)?;
        let guard = entry.native.lock();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;
        f(native)
    }

    fn register_object(
        &self,
        owner: RemoteId,
        parent: Option<RemoteId>,
        native: D::Object,
    ) -> DriverResult<RemoteId> {
        self.register(&self.registry.objects, |id| {
            ObjectEntry::new(id, owner, parent, native)
        })
    }

    pub(crate) fn token_get_object(&self, req: TokenGetObjectRequest) -> DriverResult<ResponseBody> {
        let entry = self.token(&req.token_id)?;
        let guard = entry.native.read();
        let token = guard.as_ref().ok_or(ResultCode::NotFound)?;
        let native = self.driver.token_object(token, req.name.as_str(), req.flags)?;
        let object_id = self.register_object(req.token_id, None, native)?;
        drop(guard);

        debug!(token = %req.token_id, object = %object_id, name = %req.name, "sysobject resolved");
        Ok(ResponseBody::TokenGetObject(ObjectIdResponse { object_id }))
    }

    pub(crate) fn handle_get_object(
        &self,
        req: HandleGetObjectRequest,
    ) -> DriverResult<ResponseBody> {
        let entry = self.handle(&req.handle_id)?;
        let mut slot = entry.slot.lock();
        let handle = slot.native.as_mut().ok_or(ResultCode::NotFound)?;
        let native = self.driver.handle_object(handle, req.name.as_str(), req.flags)?;
        let object_id = self.register_object(req.handle_id, None, native)?;
        drop(slot);

        debug!(handle = %req.handle_id, object = %object_id, name = %req.name, "sysobject resolved");
        Ok(ResponseBody::HandleGetObject(ObjectIdResponse { object_id }))
    }

    pub(crate) fn object_get_object(
        &self,
        req: ObjectGetObjectRequest,
    ) -> DriverResult<ResponseBody> {
        let object_id = self.child_object(&req.object_id, |parent| {
            self.driver.object_child(parent, req.name.as_str(), req.flags)
        })?;
        Ok(ResponseBody::ObjectGetObject(ObjectIdResponse { object_id }))
    }

    pub(crate) fn object_get_object_at(
        &self,
        req: ObjectGetObjectAtRequest,
    ) -> DriverResult<ResponseBody> {
        let object_id = self.child_object(&req.object_id, |parent| {
            self.driver.object_child_at(parent, req.idx)
        })?;
        Ok(ResponseBody::ObjectGetObjectAt(ObjectIdResponse { object_id }))
    }

    /// Looks up a child of `parent_id` and registers it under the parent's
    /// owner.
    fn child_object(
        &self,
        parent_id: &RemoteId,
        lookup: impl FnOnce(&D::Object) -> DriverResult<D::Object>,
    ) -> DriverResult<RemoteId> {
        let parent = self.object(parent_id)?;
        let guard = parent.native.lock();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;
        let child = lookup(native)?;
        let child_id = self.register_object(parent.owner, Some(*parent_id), child)?;
        drop(guard);

        // The owner may have been torn down after the parent resolved; its
        // cascade has then already run and would miss this child.
        if !self.owner_is_live(&parent.owner) {
            warn!(object = %child_id, owner = %parent.owner, "owner released during lookup");
            if let Ok(entry) = self.registry.objects.remove(&child_id) {
                let _ = self.destroy_object_entry(&entry);
            }
            return Err(ResultCode::NotFound);
        }
        Ok(child_id)
    }

    pub(crate) fn destroy_object(&self, req: ObjectRequest) -> DriverResult<ResponseBody> {
        let entry = self.registry.objects.remove(&req.object_id)?;
        self.destroy_object_entry(&entry)?;
        Ok(ResponseBody::DestroyObject(Empty {}))
    }

    pub(crate) fn object_get_type(&self, req: ObjectRequest) -> DriverResult<ResponseBody> {
        let object_type = self.with_object(&req.object_id, |o| self.driver.object_type(o))?;
        Ok(ResponseBody::ObjectGetType(ObjectTypeResponse { object_type }))
    }

    pub(crate) fn object_get_name(&self, req: ObjectRequest) -> DriverResult<ResponseBody> {
        let name = self.with_object(&req.object_id, |o| self.driver.object_name(o))?;
        let name = SysobjectName::new(&name).map_err(|err| {
            warn!(object = %req.object_id, error = %err, "sysobject name does not fit");
            ResultCode::Exception
        })?;
        Ok(ResponseBody::ObjectGetName(NameResponse { name }))
    }

    pub(crate) fn object_get_size(&self, req: ObjectFlagsRequest) -> DriverResult<ResponseBody> {
        let value = self.with_object(&req.object_id, |o| self.driver.object_size(o, req.flags))?;
        Ok(ResponseBody::ObjectGetSize(Value32Response { value }))
    }

    pub(crate) fn object_read(&self, req: ObjectReadRequest) -> DriverResult<ResponseBody> {
        let value = self.with_object(&req.object_id, |o| {
            self.driver.object_read(o, req.offset, req.len, req.flags)
        })?;
        if value.len() > OBJECT_VALUE_MAX {
            warn!(object = %req.object_id, len = value.len(), "sysobject value too large");
            return Err(ResultCode::NoMemory);
        }
        Ok(ResponseBody::ObjectRead(ObjectReadResponse { value }))
    }

    pub(crate) fn object_read64(&self, req: ObjectFlagsRequest) -> DriverResult<ResponseBody> {
        let value = self.with_object(&req.object_id, |o| self.driver.object_read64(o, req.flags))?;
        Ok(ResponseBody::ObjectRead64(Value64Response { value }))
    }

    pub(crate) fn object_write64(&self, req: ObjectWrite64Request) -> DriverResult<ResponseBody> {
        self.with_object(&req.object_id, |o| {
            self.driver.object_write64(o, req.value, req.flags)
        })?;
        Ok(ResponseBody::ObjectWrite64(Empty {}))
    }
}
