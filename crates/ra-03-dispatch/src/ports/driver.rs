//! Outbound (driven) port to the local device driver.
//!
//! The dispatcher resolves every remote identity before calling here, so
//! each method receives native resource state, never a `RemoteId`. Methods
//! that end a resource's life take it by value; the dispatcher has already
//! invalidated the identity by then, whatever the driver returns.

use shared_types::{DriverResult, ErrorInfo, Properties, SysobjectType};

/// Local accelerator driver.
///
/// Calls on one handle are serialized by the dispatcher; calls on different
/// handles may run in parallel.
pub trait DeviceDriver: Send + Sync + 'static {
    /// An enumerated accelerator.
    type Token: Send + Sync + 'static;
    /// An opened accelerator.
    type Handle: Send + 'static;
    /// A mapped register region.
    type Mmio: Send + 'static;
    /// A shared buffer.
    type Buffer: Send + 'static;
    /// A sysobject node.
    type Object: Send + 'static;

    // -------------------------------------------------------------------------
    // Tokens
    // -------------------------------------------------------------------------

    /// Returns every accelerator matching any filter (all of them if
    /// `filters` is empty).
    fn enumerate(&self, filters: &[Properties]) -> DriverResult<Vec<Self::Token>>;

    fn token_properties(&self, token: &Self::Token) -> DriverResult<Properties>;

    /// Re-reads properties from the device.
    fn update_properties(&self, token: &Self::Token) -> DriverResult<Properties>;

    fn clone_token(&self, token: &Self::Token) -> DriverResult<Self::Token>;

    fn destroy_token(&self, token: Self::Token) -> DriverResult<()>;

    // -------------------------------------------------------------------------
    // Handles
    // -------------------------------------------------------------------------

    fn open(&self, token: &Self::Token, flags: i32) -> DriverResult<Self::Handle>;

    fn close(&self, handle: Self::Handle) -> DriverResult<()>;

    fn reset(&self, handle: &mut Self::Handle) -> DriverResult<()>;

    fn handle_properties(&self, handle: &Self::Handle) -> DriverResult<Properties>;

    // -------------------------------------------------------------------------
    // MMIO
    // -------------------------------------------------------------------------

    fn map_mmio(&self, handle: &mut Self::Handle, mmio_num: u32) -> DriverResult<Self::Mmio>;

    fn unmap_mmio(
        &self,
        handle: &mut Self::Handle,
        mmio_num: u32,
        mmio: Self::Mmio,
    ) -> DriverResult<()>;

    fn read_mmio32(
        &self,
        handle: &mut Self::Handle,
        mmio: &Self::Mmio,
        offset: u64,
    ) -> DriverResult<u32>;

    fn write_mmio32(
        &self,
        handle: &mut Self::Handle,
        mmio: &Self::Mmio,
        offset: u64,
        value: u32,
    ) -> DriverResult<()>;

    fn read_mmio64(
        &self,
        handle: &mut Self::Handle,
        mmio: &Self::Mmio,
        offset: u64,
    ) -> DriverResult<u64>;

    fn write_mmio64(
        &self,
        handle: &mut Self::Handle,
        mmio: &Self::Mmio,
        offset: u64,
        value: u64,
    ) -> DriverResult<()>;

    fn write_mmio512(
        &self,
        handle: &mut Self::Handle,
        mmio: &Self::Mmio,
        offset: u64,
        values: &[u64; 8],
    ) -> DriverResult<()>;

    // -------------------------------------------------------------------------
    // Buffers
    // -------------------------------------------------------------------------

    fn prepare_buffer(
        &self,
        handle: &mut Self::Handle,
        len: u64,
        pre_allocated_addr: Option<u64>,
        flags: i32,
    ) -> DriverResult<Self::Buffer>;

    fn release_buffer(&self, handle: &mut Self::Handle, buffer: Self::Buffer)
        -> DriverResult<()>;

    fn io_address(&self, handle: &mut Self::Handle, buffer: &Self::Buffer) -> DriverResult<u64>;

    // -------------------------------------------------------------------------
    // Error registers
    // -------------------------------------------------------------------------

    fn read_error(&self, token: &Self::Token, error_num: u32) -> DriverResult<u64>;

    fn error_info(&self, token: &Self::Token, error_num: u32) -> DriverResult<ErrorInfo>;

    fn clear_error(&self, token: &Self::Token, error_num: u32) -> DriverResult<()>;

    fn clear_all_errors(&self, token: &Self::Token) -> DriverResult<()>;

    // -------------------------------------------------------------------------
    // Sysobjects
    // -------------------------------------------------------------------------

    fn token_object(&self, token: &Self::Token, name: &str, flags: i32)
        -> DriverResult<Self::Object>;

    fn handle_object(
        &self,
        handle: &mut Self::Handle,
        name: &str,
        flags: i32,
    ) -> DriverResult<Self::Object>;

    fn object_child(&self, parent: &Self::Object, name: &str, flags: i32)
        -> DriverResult<Self::Object>;

    fn object_child_at(&self, parent: &Self::Object, idx: u64) -> DriverResult<Self::Object>;

    fn destroy_object(&self, object: Self::Object) -> DriverResult<()>;

    fn object_type(&self, object: &Self::Object) -> DriverResult<SysobjectType>;

    fn object_name(&self, object: &Self::Object) -> DriverResult<String>;

    fn object_size(&self, object: &Self::Object, flags: i32) -> DriverResult<u32>;

    fn object_read(
        &self,
        object: &Self::Object,
        offset: u64,
        len: u64,
        flags: i32,
    ) -> DriverResult<String>;

    fn object_read64(&self, object: &Self::Object, flags: i32) -> DriverResult<u64>;

    fn object_write64(&self, object: &Self::Object, value: u64, flags: i32) -> DriverResult<()>;
}
