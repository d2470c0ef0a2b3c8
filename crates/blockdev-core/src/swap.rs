//! Swap plugin interface.

use libloading::Library;
use std::ffi::{c_char, c_int};
use std::fmt;
use std::ptr;

use crate::error::Result;
use crate::native::{c_string, call_reporting, resolve};
use crate::plugin::Plugin;

/// Symbols every swap plugin must export.
pub mod symbols {
    pub const MKSWAP: &str = "bd_swap_mkswap";
    pub const SWAPON: &str = "bd_swap_swapon";
    pub const SWAPOFF: &str = "bd_swap_swapoff";
    pub const SWAPSTATUS: &str = "bd_swap_swapstatus";
}

/// Operations provided by a loaded swap plugin.
pub trait SwapOps: Send + Sync {
    /// Format `device` as swap space, with an optional label.
    fn mkswap(&self, device: &str, label: Option<&str>) -> Result<()>;

    /// Activate swap on `device`. A negative priority lets the kernel choose.
    fn swapon(&self, device: &str, priority: i32) -> Result<()>;

    fn swapoff(&self, device: &str) -> Result<()>;

    /// Whether swap is active on `device`.
    fn swapstatus(&self, device: &str) -> Result<bool>;
}

type MkswapFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut *mut c_char) -> c_int;
type SwaponFn = unsafe extern "C" fn(*const c_char, c_int, *mut *mut c_char) -> c_int;
type DeviceFn = unsafe extern "C" fn(*const c_char, *mut *mut c_char) -> c_int;

/// Swap plugin bound from a shared object.
pub struct NativeSwap {
    so_name: String,
    mkswap: MkswapFn,
    swapon: SwaponFn,
    swapoff: DeviceFn,
    swapstatus: DeviceFn,
    _library: Library,
}

impl NativeSwap {
    pub(crate) fn bind(library: Library, so_name: &str) -> Result<Self> {
        // SAFETY: Each type alias matches the declared plugin ABI, and the
        // pointers are stored next to the library that owns them.
        unsafe {
            Ok(Self {
                so_name: so_name.to_string(),
                mkswap: resolve(&library, so_name, symbols::MKSWAP)?,
                swapon: resolve(&library, so_name, symbols::SWAPON)?,
                swapoff: resolve(&library, so_name, symbols::SWAPOFF)?,
                swapstatus: resolve(&library, so_name, symbols::SWAPSTATUS)?,
                _library: library,
            })
        }
    }

    /// Shared object this plugin was loaded from.
    pub fn so_name(&self) -> &str {
        &self.so_name
    }
}

impl SwapOps for NativeSwap {
    fn mkswap(&self, device: &str, label: Option<&str>) -> Result<()> {
        let device = c_string("mkswap", device)?;
        let label = label.map(|l| c_string("mkswap", l)).transpose()?;
        let label_ptr = label.as_ref().map_or(ptr::null(), |l| l.as_ptr());
        let f = self.mkswap;
        // SAFETY: `f` was resolved with this signature; the label may be null.
        call_reporting(Plugin::Swap, "mkswap", true, |err| unsafe {
            f(device.as_ptr(), label_ptr, err)
        })
        .map(|_| ())
    }

    fn swapon(&self, device: &str, priority: i32) -> Result<()> {
        let device = c_string("swapon", device)?;
        let f = self.swapon;
        // SAFETY: `f` was resolved from the live library with this signature.
        call_reporting(Plugin::Swap, "swapon", true, |err| unsafe {
            f(device.as_ptr(), priority, err)
        })
        .map(|_| ())
    }

    fn swapoff(&self, device: &str) -> Result<()> {
        let device = c_string("swapoff", device)?;
        let f = self.swapoff;
        // SAFETY: `f` was resolved from the live library with this signature.
        call_reporting(Plugin::Swap, "swapoff", true, |err| unsafe {
            f(device.as_ptr(), err)
        })
        .map(|_| ())
    }

    fn swapstatus(&self, device: &str) -> Result<bool> {
        let device = c_string("swapstatus", device)?;
        let f = self.swapstatus;
        // FALSE means "inactive" here; only a message signals failure.
        // SAFETY: `f` was resolved from the live library with this signature.
        call_reporting(Plugin::Swap, "swapstatus", false, |err| unsafe {
            f(device.as_ptr(), err)
        })
    }
}

impl fmt::Debug for NativeSwap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSwap")
            .field("so_name", &self.so_name)
            .finish()
    }
}
