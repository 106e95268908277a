//! Token-scoped error registers.

use crate::context::RemoteContext;
use crate::ports::DeviceDriver;
use ra_01_codec::requests::{ErrorRequest, TokenRequest};
use ra_01_codec::responses::{Empty, ErrorInfoResponse, Value64Response};
use ra_01_codec::ResponseBody;
use shared_types::{DriverResult, RemoteId, ResultCode};

impl<D: DeviceDriver> RemoteContext<D> {
    /// Runs `f` against the native token named by `token_id`.
    fn with_token<R>(
        &self,
        token_id: &RemoteId,
        f: impl FnOnce(&D::Token) -> DriverResult<R>,
    ) -> DriverResult<R> {
        let entry = self.token(token_id)?;
        let guard = entry.native.read();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;
        f(native)
    }

    pub(crate) fn read_error(&self, req: ErrorRequest) -> DriverResult<ResponseBody> {
        let value = self.with_token(&req.token_id, |t| self.driver.read_error(t, req.error_num))?;
        Ok(ResponseBody::ReadError(Value64Response { value }))
    }

    pub(crate) fn get_error_info(&self, req: ErrorRequest) -> DriverResult<ResponseBody> {
        let error_info =
            self.with_token(&req.token_id, |t| self.driver.error_info(t, req.error_num))?;
        Ok(ResponseBody::GetErrorInfo(ErrorInfoResponse { error_info }))
    }

    pub(crate) fn clear_error(&self, req: ErrorRequest) -> DriverResult<ResponseBody> {
        self.with_token(&req.token_id, |t| self.driver.clear_error(t, req.error_num))?;
        Ok(ResponseBody::ClearError(Empty {}))
    }

    pub(crate) fn clear_all_errors(&self, req: TokenRequest) -> DriverResult<ResponseBody> {
        self.with_token(&req.token_id, |t| self.driver.clear_all_errors(t))?;
        Ok(ResponseBody::ClearAllErrors(Empty {}))
    }
}
