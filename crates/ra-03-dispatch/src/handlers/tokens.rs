//! Enumeration and token lifecycle.

use crate::context::RemoteContext;
use crate::domain::{HandleEntry, TokenEntry};
use crate::ports::DeviceDriver;
use ra_01_codec::requests::{CloneTokenRequest, EnumerateRequest, OpenRequest, TokenRequest};
use ra_01_codec::responses::{
    Empty, EnumerateResponse, OpenResponse, PropertiesResponse, TokenResponse,
};
use ra_01_codec::ResponseBody;
use shared_types::{DriverResult, HandleHeader, RemoteId, ResultCode, TokenHeader};
use tracing::{debug, warn};

impl<D: DeviceDriver> RemoteContext<D> {
    /// Registers at most `max_tokens` matches; reports the total count.
    pub(crate) fn enumerate(&self, req: EnumerateRequest) -> DriverResult<ResponseBody> {
        let natives = self.driver.enumerate(&req.filters)?;
        let num_matches = u32::try_from(natives.len()).unwrap_or(u32::MAX);
        let mut tokens = Vec::new();

        for (i, native) in natives.into_iter().enumerate() {
            if i >= req.max_tokens as usize {
                if let Err(code) = self.driver.destroy_token(native) {
                    debug!(result = code.as_str(), "surplus token teardown failed");
                }
                continue;
            }

            let properties = self.driver.token_properties(&native).unwrap_or_else(|code| {
                warn!(result = code.as_str(), "token properties unavailable");
                Default::default()
            });
            let token_id = self.register(&self.registry.tokens, |id| TokenEntry::new(id, native))?;
            tokens.push(TokenHeader {
                token_id,
                properties,
            });
        }

        debug!(num_matches, registered = tokens.len(), "enumerated");
        Ok(ResponseBody::Enumerate(EnumerateResponse {
            tokens,
            num_matches,
        }))
    }

    /// Destroys a token and the sysobjects looked up through it. Handles
    /// opened from the token stay valid.
    pub(crate) fn destroy_token(&self, req: TokenRequest) -> DriverResult<ResponseBody> {
        let entry = self.registry.tokens.remove(&req.token_id)?;
        // Sysobject lookups register under the read lock; once the native is
        // taken no new sysobject can name this token as owner.
        let native = entry.native.write().take();
        self.destroy_owned_objects(&req.token_id);

        let native = native.ok_or(ResultCode::NotFound)?;
        self.driver.destroy_token(native)?;
        Ok(ResponseBody::DestroyToken(Empty {}))
    }

    pub(crate) fn clone_token(&self, req: CloneTokenRequest) -> DriverResult<ResponseBody> {
        let entry = self.token(&req.src_token_id)?;
        let guard = entry.native.read();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;

        let cloned = self.driver.clone_token(native)?;
        let properties = self.driver.token_properties(&cloned).unwrap_or_default();
        drop(guard);

        let token_id = self.register(&self.registry.tokens, |id| TokenEntry::new(id, cloned))?;
        Ok(ResponseBody::CloneToken(TokenResponse {
            token: TokenHeader {
                token_id,
                properties,
            },
        }))
    }

    pub(crate) fn get_properties(&self, req: TokenRequest) -> DriverResult<ResponseBody> {
        let entry = self.token(&req.token_id)?;
        let guard = entry.native.read();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;
        let properties = self.driver.token_properties(native)?;
        Ok(ResponseBody::GetProperties(PropertiesResponse { properties }))
    }

    pub(crate) fn update_properties(&self, req: TokenRequest) -> DriverResult<ResponseBody> {
        let entry = self.token(&req.token_id)?;
        let guard = entry.native.read();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;
        let properties = self.driver.update_properties(native)?;
        Ok(ResponseBody::UpdateProperties(PropertiesResponse { properties }))
    }

    pub(crate) fn open(&self, req: OpenRequest) -> DriverResult<ResponseBody> {
        let entry = self.token(&req.token_id)?;
        let guard = entry.native.read();
        let native = guard.as_ref().ok_or(ResultCode::NotFound)?;
        let handle = self.driver.open(native, req.flags)?;
        drop(guard);

        let token_id: RemoteId = entry.token_id;
        let handle_id = self.register(&self.registry.handles, |id| {
            HandleEntry::new(id, token_id, req.flags, handle)
        })?;
        debug!(handle = %handle_id, token = %token_id, "opened");
        Ok(ResponseBody::Open(OpenResponse {
            handle: HandleHeader {
                handle_id,
                token_id,
                flags: req.flags,
            },
        }))
    }
}
