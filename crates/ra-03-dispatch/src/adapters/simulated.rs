//! # Simulated Device Driver
//!
//! An in-memory accelerator farm implementing `DeviceDriver`. Each device
//! has a sparse register file per region, a small bank of error registers
//! and a sysobject tree of named attributes. The driver counts every call
//! and every outstanding native resource, so callers can assert that a
//! request never reached the device or that a teardown left nothing behind.

use crate::ports::DeviceDriver;
use parking_lot::Mutex;
use shared_types::{
    AcceleratorState, DriverResult, ErrorInfo, ErrorName, Guid, ObjectType, Properties,
    ResultCode, SysobjectType,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{trace, warn};

/// Open flag requesting shared access.
pub const OPEN_SHARED: i32 = 0x1;

/// Size of each simulated register region (bytes).
pub const REGION_SIZE: u64 = 0x4_0000;

const PAGE_SIZE: u64 = 4096;
const MAX_BUFFER_LEN: u64 = 1 << 30;
const VENDOR_ID: u16 = 0x8086;
const DEVICE_ID: u16 = 0x0b30;
const NUM_MMIO: u32 = 2;

/// Most accelerators one simulated farm holds; each gets a distinct
/// PCI function number and GUID.
pub const MAX_SIM_DEVICES: usize = 256;

#[derive(Debug)]
pub struct SimToken {
    device: usize,
}

#[derive(Debug)]
pub struct SimHandle {
    device: usize,
    exclusive: bool,
}

#[derive(Debug)]
pub struct SimMmio {
    region: u32,
}

#[derive(Debug)]
pub struct SimBuffer {
    addr: u64,
}

#[derive(Debug)]
pub struct SimObject {
    device: usize,
    path: String,
}

#[derive(Debug, Clone)]
struct ErrorRegister {
    name: &'static str,
    can_clear: bool,
    value: u64,
}

#[derive(Debug, Default)]
struct OpenState {
    count: usize,
    exclusive: bool,
}

#[derive(Debug)]
struct SimulatedDevice {
    properties: Properties,
    registers: Mutex<HashMap<(u32, u64), u64>>,
    errors: Mutex<Vec<ErrorRegister>>,
    attributes: Mutex<BTreeMap<String, String>>,
    opens: Mutex<OpenState>,
}

impl SimulatedDevice {
    fn new(index_byte: u8) -> Self {
        let properties = Properties {
            object_type: Some(ObjectType::Accelerator),
            segment: Some(0),
            bus: Some(0x5e_u8.wrapping_add(index_byte)),
            device: Some(0),
            function: Some(index_byte),
            socket_id: Some(0),
            vendor_id: Some(VENDOR_ID),
            device_id: Some(DEVICE_ID),
            guid: Some(Guid([index_byte; 16])),
            num_errors: Some(4),
            num_slots: Some(1),
            bbs_id: Some(0x0123_4567),
            accelerator_state: Some(AcceleratorState::Unassigned),
            num_mmio: Some(NUM_MMIO),
            num_interrupts: Some(0),
            ..Properties::default()
        };

        let errors = vec![
            ErrorRegister { name: "errors", can_clear: true, value: 0 },
            ErrorRegister { name: "first_error", can_clear: true, value: 0 },
            ErrorRegister { name: "next_error", can_clear: true, value: 0 },
            ErrorRegister { name: "fatal", can_clear: false, value: 0 },
        ];

        let attributes = [
            ("id", format!("0x{DEVICE_ID:x}")),
            ("errors/first_error", "0x0".to_string()),
            ("errors/next_error", "0x0".to_string()),
            ("errors/revision", "1".to_string()),
            ("power_mgmt/consumed", "0x2a".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            properties,
            registers: Mutex::new(HashMap::new()),
            errors: Mutex::new(errors),
            attributes: Mutex::new(attributes),
            opens: Mutex::new(OpenState::default()),
        }
    }

    /// Names of the direct children of `path` ("" is the root).
    fn children(&self, path: &str) -> Vec<String> {
        let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
        let attributes = self.attributes.lock();
        let names: BTreeSet<String> = attributes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        names.into_iter().collect()
    }

    fn exists(&self, path: &str) -> bool {
        let attributes = self.attributes.lock();
        let prefix = format!("{path}/");
        attributes.contains_key(path) || attributes.keys().any(|k| k.starts_with(&prefix))
    }
}

/// Count of native resources handed out and not yet torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outstanding {
    pub tokens: usize,
    pub handles: usize,
    pub mappings: usize,
    pub buffers: usize,
    pub objects: usize,
}

impl Outstanding {
    pub fn total(&self) -> usize {
        self.tokens + self.handles + self.mappings + self.buffers + self.objects
    }
}

#[derive(Debug, Default)]
struct Counters {
    tokens: AtomicUsize,
    handles: AtomicUsize,
    mappings: AtomicUsize,
    buffers: AtomicUsize,
    objects: AtomicUsize,
}

fn up(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn down(counter: &AtomicUsize) {
    counter.fetch_sub(1, Ordering::Relaxed);
}

/// In-memory driver for a fixed set of accelerators.
#[derive(Debug)]
pub struct SimulatedDriver {
    devices: Vec<SimulatedDevice>,
    calls: AtomicUsize,
    next_addr: AtomicU64,
    fail_next: Mutex<Option<ResultCode>>,
    live: Counters,
}

impl SimulatedDriver {
    /// Creates a driver with `num_devices` accelerators, at most
    /// `MAX_SIM_DEVICES`.
    pub fn new(num_devices: usize) -> Self {
        if num_devices > MAX_SIM_DEVICES {
            warn!(num_devices, max = MAX_SIM_DEVICES, "simulated device count capped");
        }
        Self {
            devices: (0..=u8::MAX)
                .take(num_devices)
                .map(SimulatedDevice::new)
                .collect(),
            calls: AtomicUsize::new(0),
            next_addr: AtomicU64::new(0x1_0000_0000),
            fail_next: Mutex::new(None),
            live: Counters::default(),
        }
    }

    /// Number of driver calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn outstanding(&self) -> Outstanding {
        Outstanding {
            tokens: self.live.tokens.load(Ordering::Relaxed),
            handles: self.live.handles.load(Ordering::Relaxed),
            mappings: self.live.mappings.load(Ordering::Relaxed),
            buffers: self.live.buffers.load(Ordering::Relaxed),
            objects: self.live.objects.load(Ordering::Relaxed),
        }
    }

    /// Makes the next driver call fail with `code`.
    pub fn fail_next(&self, code: ResultCode) {
        *self.fail_next.lock() = Some(code);
    }

    /// Sets the value of error register `error_num` on `device`.
    pub fn inject_error(&self, device: usize, error_num: u32, value: u64) -> DriverResult<()> {
        let dev = self.devices.get(device).ok_or(ResultCode::InvalidParam)?;
        let mut errors = dev.errors.lock();
        let reg = errors
            .get_mut(error_num as usize)
            .ok_or(ResultCode::InvalidParam)?;
        reg.value = value;
        Ok(())
    }

    fn enter(&self, op: &'static str) -> DriverResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        trace!(op, "simulated driver call");
        match self.fail_next.lock().take() {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn device(&self, index: usize) -> DriverResult<&SimulatedDevice> {
        self.devices.get(index).ok_or(ResultCode::NotFound)
    }

    fn check_access(offset: u64, width: u64) -> DriverResult<()> {
        if offset % width != 0 || offset.saturating_add(width) > REGION_SIZE {
            return Err(ResultCode::InvalidParam);
        }
        Ok(())
    }

    fn lookup_object(&self, device: usize, path: String) -> DriverResult<SimObject> {
        if !self.device(device)?.exists(&path) {
            return Err(ResultCode::NotFound);
        }
        up(&self.live.objects);
        Ok(SimObject { device, path })
    }

    fn attribute(&self, object: &SimObject) -> DriverResult<String> {
        self.device(object.device)?
            .attributes
            .lock()
            .get(&object.path)
            .cloned()
            .ok_or(ResultCode::InvalidParam)
    }
}

fn parse_u64(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl DeviceDriver for SimulatedDriver {
    type Token = SimToken;
    type Handle = SimHandle;
    type Mmio = SimMmio;
    type Buffer = SimBuffer;
    type Object = SimObject;

    fn enumerate(&self, filters: &[Properties]) -> DriverResult<Vec<SimToken>> {
        self.enter("enumerate")?;
        let tokens: Vec<SimToken> = self
            .devices
            .iter()
            .enumerate()
            .filter(|(_, dev)| filters.is_empty() || filters.iter().any(|f| f.matches(&dev.properties)))
            .map(|(device, _)| SimToken { device })
            .collect();
        for _ in &tokens {
            up(&self.live.tokens);
        }
        Ok(tokens)
    }

    fn token_properties(&self, token: &SimToken) -> DriverResult<Properties> {
        self.enter("token_properties")?;
        Ok(self.device(token.device)?.properties.clone())
    }

    fn update_properties(&self, token: &SimToken) -> DriverResult<Properties> {
        self.enter("update_properties")?;
        let dev = self.device(token.device)?;
        let mut properties = dev.properties.clone();
        if dev.opens.lock().count > 0 {
            properties.accelerator_state = Some(AcceleratorState::Assigned);
        }
        Ok(properties)
    }

    fn clone_token(&self, token: &SimToken) -> DriverResult<SimToken> {
        self.enter("clone_token")?;
        up(&self.live.tokens);
        Ok(SimToken {
            device: token.device,
        })
    }

    fn destroy_token(&self, _token: SimToken) -> DriverResult<()> {
        self.enter("destroy_token")?;
        down(&self.live.tokens);
        Ok(())
    }

    fn open(&self, token: &SimToken, flags: i32) -> DriverResult<SimHandle> {
        self.enter("open")?;
        let dev = self.device(token.device)?;
        let mut opens = dev.opens.lock();
        let exclusive = flags & OPEN_SHARED == 0;
        if opens.exclusive || (exclusive && opens.count > 0) {
            return Err(ResultCode::Busy);
        }
        opens.count += 1;
        opens.exclusive = exclusive;
        up(&self.live.handles);
        Ok(SimHandle {
            device: token.device,
            exclusive,
        })
    }

    fn close(&self, handle: SimHandle) -> DriverResult<()> {
        self.enter("close")?;
        let dev = self.device(handle.device)?;
        let mut opens = dev.opens.lock();
        opens.count = opens.count.saturating_sub(1);
        if handle.exclusive {
            opens.exclusive = false;
        }
        down(&self.live.handles);
        Ok(())
    }

    fn reset(&self, handle: &mut SimHandle) -> DriverResult<()> {
        self.enter("reset")?;
        self.device(handle.device)?.registers.lock().clear();
        Ok(())
    }

    fn handle_properties(&self, handle: &SimHandle) -> DriverResult<Properties> {
        self.enter("handle_properties")?;
        let mut properties = self.device(handle.device)?.properties.clone();
        properties.accelerator_state = Some(AcceleratorState::Assigned);
        Ok(properties)
    }

    fn map_mmio(&self, _handle: &mut SimHandle, mmio_num: u32) -> DriverResult<SimMmio> {
        self.enter("map_mmio")?;
        if mmio_num >= NUM_MMIO {
            return Err(ResultCode::InvalidParam);
        }
        up(&self.live.mappings);
        Ok(SimMmio { region: mmio_num })
    }

    fn unmap_mmio(&self, _handle: &mut SimHandle, _mmio_num: u32, _mmio: SimMmio) -> DriverResult<()> {
        self.enter("unmap_mmio")?;
        down(&self.live.mappings);
        Ok(())
    }

    fn read_mmio32(&self, handle: &mut SimHandle, mmio: &SimMmio, offset: u64) -> DriverResult<u32> {
        self.enter("read_mmio32")?;
        Self::check_access(offset, 4)?;
        let registers = self.device(handle.device)?.registers.lock();
        let word = registers.get(&(mmio.region, offset & !7)).copied().unwrap_or(0);
        let shift = (offset & 4) * 8;
        Ok((word >> shift) as u32)
    }

    fn write_mmio32(
        &self,
        handle: &mut SimHandle,
        mmio: &SimMmio,
        offset: u64,
        value: u32,
    ) -> DriverResult<()> {
        self.enter("write_mmio32")?;
        Self::check_access(offset, 4)?;
        let mut registers = self.device(handle.device)?.registers.lock();
        let word = registers.entry((mmio.region, offset & !7)).or_insert(0);
        let shift = (offset & 4) * 8;
        *word = (*word & !(0xffff_ffff_u64 << shift)) | (u64::from(value) << shift);
        Ok(())
    }

    fn read_mmio64(&self, handle: &mut SimHandle, mmio: &SimMmio, offset: u64) -> DriverResult<u64> {
        self.enter("read_mmio64")?;
        Self::check_access(offset, 8)?;
        let registers = self.device(handle.device)?.registers.lock();
        Ok(registers.get(&(mmio.region, offset)).copied().unwrap_or(0))
    }

    fn write_mmio64(
        &self,
        handle: &mut SimHandle,
        mmio: &SimMmio,
        offset: u64,
        value: u64,
    ) -> DriverResult<()> {
        self.enter("write_mmio64")?;
        Self::check_access(offset, 8)?;
        self.device(handle.device)?
            .registers
            .lock()
            .insert((mmio.region, offset), value);
        Ok(())
    }

    fn write_mmio512(
        &self,
        handle: &mut SimHandle,
        mmio: &SimMmio,
        offset: u64,
        values: &[u64; 8],
    ) -> DriverResult<()> {
        self.enter("write_mmio512")?;
        Self::check_access(offset, 64)?;
        let mut registers = self.device(handle.device)?.registers.lock();
        for (i, value) in values.iter().enumerate() {
            registers.insert((mmio.region, offset + 8 * i as u64), *value);
        }
        Ok(())
    }

    fn prepare_buffer(
        &self,
        _handle: &mut SimHandle,
        len: u64,
        pre_allocated_addr: Option<u64>,
        _flags: i32,
    ) -> DriverResult<SimBuffer> {
        self.enter("prepare_buffer")?;
        if len == 0 {
            return Err(ResultCode::InvalidParam);
        }
        if len > MAX_BUFFER_LEN {
            return Err(ResultCode::NoMemory);
        }
        let addr = match pre_allocated_addr {
            Some(addr) if addr % PAGE_SIZE != 0 => return Err(ResultCode::InvalidParam),
            Some(addr) => addr,
            None => {
                let pages = len.div_ceil(PAGE_SIZE);
                self.next_addr.fetch_add(pages * PAGE_SIZE, Ordering::Relaxed)
            }
        };
        up(&self.live.buffers);
        Ok(SimBuffer { addr })
    }

    fn release_buffer(&self, _handle: &mut SimHandle, _buffer: SimBuffer) -> DriverResult<()> {
        self.enter("release_buffer")?;
        down(&self.live.buffers);
        Ok(())
    }

    fn io_address(&self, _handle: &mut SimHandle, buffer: &SimBuffer) -> DriverResult<u64> {
        self.enter("io_address")?;
        Ok(buffer.addr)
    }

    fn read_error(&self, token: &SimToken, error_num: u32) -> DriverResult<u64> {
        self.enter("read_error")?;
        let errors = self.device(token.device)?.errors.lock();
        errors
            .get(error_num as usize)
            .map(|reg| reg.value)
            .ok_or(ResultCode::InvalidParam)
    }

    fn error_info(&self, token: &SimToken, error_num: u32) -> DriverResult<ErrorInfo> {
        self.enter("error_info")?;
        let errors = self.device(token.device)?.errors.lock();
        let reg = errors.get(error_num as usize).ok_or(ResultCode::InvalidParam)?;
        Ok(ErrorInfo {
            name: ErrorName::new(reg.name).map_err(|_| ResultCode::Exception)?,
            can_clear: reg.can_clear,
        })
    }

    fn clear_error(&self, token: &SimToken, error_num: u32) -> DriverResult<()> {
        self.enter("clear_error")?;
        let mut errors = self.device(token.device)?.errors.lock();
        let reg = errors
            .get_mut(error_num as usize)
            .ok_or(ResultCode::InvalidParam)?;
        if !reg.can_clear {
            return Err(ResultCode::InvalidParam);
        }
        reg.value = 0;
        Ok(())
    }

    fn clear_all_errors(&self, token: &SimToken) -> DriverResult<()> {
        self.enter("clear_all_errors")?;
        let mut errors = self.device(token.device)?.errors.lock();
        for reg in errors.iter_mut().filter(|reg| reg.can_clear) {
            reg.value = 0;
        }
        Ok(())
    }

    fn token_object(&self, token: &SimToken, name: &str, _flags: i32) -> DriverResult<SimObject> {
        self.enter("token_object")?;
        self.lookup_object(token.device, name.trim_matches('/').to_string())
    }

    fn handle_object(
        &self,
        handle: &mut SimHandle,
        name: &str,
        _flags: i32,
    ) -> DriverResult<SimObject> {
        self.enter("handle_object")?;
        self.lookup_object(handle.device, name.trim_matches('/').to_string())
    }

    fn object_child(&self, parent: &SimObject, name: &str, _flags: i32) -> DriverResult<SimObject> {
        self.enter("object_child")?;
        let name = name.trim_matches('/');
        if name.is_empty() {
            return Err(ResultCode::InvalidParam);
        }
        self.lookup_object(parent.device, format!("{}/{name}", parent.path))
    }

    fn object_child_at(&self, parent: &SimObject, idx: u64) -> DriverResult<SimObject> {
        self.enter("object_child_at")?;
        let children = self.device(parent.device)?.children(&parent.path);
        let name = usize::try_from(idx)
            .ok()
            .and_then(|i| children.get(i))
            .ok_or(ResultCode::NotFound)?;
        self.lookup_object(parent.device, format!("{}/{name}", parent.path))
    }

    fn destroy_object(&self, _object: SimObject) -> DriverResult<()> {
        self.enter("destroy_object")?;
        down(&self.live.objects);
        Ok(())
    }

    fn object_type(&self, object: &SimObject) -> DriverResult<SysobjectType> {
        self.enter("object_type")?;
        let dev = self.device(object.device)?;
        if dev.attributes.lock().contains_key(&object.path) {
            Ok(SysobjectType::Attribute)
        } else {
            Ok(SysobjectType::Container)
        }
    }

    fn object_name(&self, object: &SimObject) -> DriverResult<String> {
        self.enter("object_name")?;
        Ok(object
            .path
            .rsplit('/')
            .next()
            .unwrap_or(object.path.as_str())
            .to_string())
    }

    fn object_size(&self, object: &SimObject, _flags: i32) -> DriverResult<u32> {
        self.enter("object_size")?;
        let dev = self.device(object.device)?;
        let value_len = dev.attributes.lock().get(&object.path).map(String::len);
        let size = match value_len {
            Some(len) => len,
            None => dev.children(&object.path).len(),
        };
        u32::try_from(size).map_err(|_| ResultCode::Exception)
    }

    fn object_read(&self, object: &SimObject, offset: u64, len: u64, _flags: i32) -> DriverResult<String> {
        self.enter("object_read")?;
        let value = self.attribute(object)?;
        let start = usize::try_from(offset).map_err(|_| ResultCode::InvalidParam)?;
        if start > value.len() {
            return Err(ResultCode::InvalidParam);
        }
        let end = match usize::try_from(len) {
            Ok(0) => value.len(),
            Ok(len) => start.saturating_add(len).min(value.len()),
            Err(_) => value.len(),
        };
        value
            .get(start..end)
            .map(str::to_string)
            .ok_or(ResultCode::InvalidParam)
    }

    fn object_read64(&self, object: &SimObject, _flags: i32) -> DriverResult<u64> {
        self.enter("object_read64")?;
        let value = self.attribute(object)?;
        parse_u64(&value).ok_or(ResultCode::NotSupported)
    }

    fn object_write64(&self, object: &SimObject, value: u64, _flags: i32) -> DriverResult<()> {
        self.enter("object_write64")?;
        let dev = self.device(object.device)?;
        let mut attributes = dev.attributes.lock();
        let slot = attributes
            .get_mut(&object.path)
            .ok_or(ResultCode::InvalidParam)?;
        *slot = format!("0x{value:x}");
        Ok(())
    }
}
