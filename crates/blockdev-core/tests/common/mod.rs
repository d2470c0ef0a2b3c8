//! Fake plugins and loaders shared by the integration tests.

#![allow(dead_code)]

use blockdev_core::prelude::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

pub struct FakeLvm;

impl LvmOps for FakeLvm {
    fn is_supported_pe_size(&self, size: u64) -> bool {
        size.is_power_of_two() && size >= 1024
    }
    fn max_lv_size(&self) -> u64 {
        8 << 50
    }
    fn round_size_to_pe(&self, size: u64, pe_size: u64, roundup: bool) -> u64 {
        let down = size - size % pe_size;
        if roundup && down != size {
            down + pe_size
        } else {
            down
        }
    }
    fn pvcreate(&self, _device: &str) -> Result<()> {
        Ok(())
    }
    fn pvremove(&self, _device: &str) -> Result<()> {
        Ok(())
    }
    fn vgcreate(&self, _name: &str, _pv_list: &[&str], _pe_size: u64) -> Result<()> {
        Ok(())
    }
    fn vgremove(&self, _name: &str) -> Result<()> {
        Ok(())
    }
    fn lvcreate(&self, _vg: &str, _lv: &str, _size: u64, _pvs: Option<&[&str]>) -> Result<()> {
        Ok(())
    }
    fn lvremove(&self, _vg: &str, _lv: &str, _force: bool) -> Result<()> {
        Ok(())
    }
    fn lvactivate(&self, _vg: &str, _lv: &str, _ignore_skip: bool) -> Result<()> {
        Ok(())
    }
    fn lvdeactivate(&self, _vg: &str, _lv: &str) -> Result<()> {
        Ok(())
    }
}

pub struct FakeSwap;

impl SwapOps for FakeSwap {
    fn mkswap(&self, _device: &str, _label: Option<&str>) -> Result<()> {
        Ok(())
    }
    fn swapon(&self, device: &str, _priority: i32) -> Result<()> {
        if device.is_empty() {
            return Err(Error::OperationFailed {
                plugin: Plugin::Swap,
                operation: "swapon",
                message: "no device".to_string(),
            });
        }
        Ok(())
    }
    fn swapoff(&self, _device: &str) -> Result<()> {
        Ok(())
    }
    fn swapstatus(&self, device: &str) -> Result<bool> {
        Ok(device == "/dev/active")
    }
}

/// Records every load request and fails the plugins it was told to fail.
#[derive(Default)]
pub struct RecordingLoader {
    failing: HashSet<Plugin>,
    calls: Mutex<Vec<(Plugin, String)>>,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(plugins: &[Plugin]) -> Self {
        Self {
            failing: plugins.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Plugin, String)> {
        self.calls.lock().clone()
    }
}

impl PluginLoader for RecordingLoader {
    fn load(&self, plugin: Plugin, so_name: &str) -> Result<BoundPlugin> {
        self.calls.lock().push((plugin, so_name.to_string()));

        if self.failing.contains(&plugin) {
            return Err(Error::LoadFailed {
                so_name: so_name.to_string(),
                reason: "cannot open shared object file".to_string(),
            });
        }

        Ok(match plugin {
            Plugin::Lvm => BoundPlugin::Lvm(Arc::new(FakeLvm)),
            Plugin::Swap => BoundPlugin::Swap(Arc::new(FakeSwap)),
        })
    }
}
