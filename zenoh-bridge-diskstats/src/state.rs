//! Last observed raw counter values, per device and field.

use std::collections::HashMap;

use crate::engine::DiskField;

/// Per-device, per-field store of the previous raw value.
///
/// Entries are never evicted: a device that disappears from the source keeps
/// its last values for the lifetime of the process.
#[derive(Debug, Default)]
pub struct CounterState {
    devices: HashMap<String, HashMap<DiskField, u64>>,
}

impl CounterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty entry for `device` if it has none.
    pub fn ensure_device(&mut self, device: &str) {
        if !self.devices.contains_key(device) {
            self.devices.insert(device.to_string(), HashMap::new());
        }
    }

    /// Previous raw value, or `None` if the field has not been observed yet.
    pub fn get(&self, device: &str, field: DiskField) -> Option<u64> {
        self.devices.get(device)?.get(&field).copied()
    }

    /// Record the latest raw value, returning the one it replaces.
    pub fn set(&mut self, device: &str, field: DiskField, value: u64) -> Option<u64> {
        match self.devices.get_mut(device) {
            Some(fields) => fields.insert(field, value),
            None => {
                self.devices
                    .insert(device.to_string(), HashMap::from([(field, value)]));
                None
            }
        }
    }

    pub fn contains_device(&self, device: &str) -> bool {
        self.devices.contains_key(device)
    }

    /// Number of fields primed for `device`.
    pub fn primed_fields(&self, device: &str) -> usize {
        self.devices.get(device).map_or(0, HashMap::len)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
