//! LVM plugin interface.
//!
//! [`LvmOps`] is the capability surface the rest of the library sees;
//! [`NativeLvm`] binds it to the `bd_lvm_*` symbols of a loaded plugin.

use libloading::Library;
use std::ffi::{c_char, c_int};
use std::fmt;
use std::ptr;

use crate::error::Result;
use crate::native::{c_string, call_reporting, resolve, CStringList};
use crate::plugin::Plugin;

/// Symbols every LVM plugin must export.
pub mod symbols {
    pub const IS_SUPPORTED_PE_SIZE: &str = "bd_lvm_is_supported_pe_size";
    pub const GET_MAX_LV_SIZE: &str = "bd_lvm_get_max_lv_size";
    pub const ROUND_SIZE_TO_PE: &str = "bd_lvm_round_size_to_pe";
    pub const PVCREATE: &str = "bd_lvm_pvcreate";
    pub const PVREMOVE: &str = "bd_lvm_pvremove";
    pub const VGCREATE: &str = "bd_lvm_vgcreate";
    pub const VGREMOVE: &str = "bd_lvm_vgremove";
    pub const LVCREATE: &str = "bd_lvm_lvcreate";
    pub const LVREMOVE: &str = "bd_lvm_lvremove";
    pub const LVACTIVATE: &str = "bd_lvm_lvactivate";
    pub const LVDEACTIVATE: &str = "bd_lvm_lvdeactivate";
}

/// Operations provided by a loaded LVM plugin.
pub trait LvmOps: Send + Sync {
    /// Whether `size` (bytes) is a valid physical extent size.
    fn is_supported_pe_size(&self, size: u64) -> bool;

    /// Largest logical volume size the plugin supports, in bytes.
    fn max_lv_size(&self) -> u64;

    /// Round `size` to a multiple of `pe_size`, up or down.
    fn round_size_to_pe(&self, size: u64, pe_size: u64, roundup: bool) -> u64;

    fn pvcreate(&self, device: &str) -> Result<()>;

    fn pvremove(&self, device: &str) -> Result<()>;

    /// Create volume group `name` over `pv_list`. A `pe_size` of 0 selects
    /// the plugin default.
    fn vgcreate(&self, name: &str, pv_list: &[&str], pe_size: u64) -> Result<()>;

    fn vgremove(&self, name: &str) -> Result<()>;

    /// Create a logical volume, optionally restricted to `pv_list`.
    fn lvcreate(&self, vg_name: &str, lv_name: &str, size: u64, pv_list: Option<&[&str]>)
        -> Result<()>;

    fn lvremove(&self, vg_name: &str, lv_name: &str, force: bool) -> Result<()>;

    fn lvactivate(&self, vg_name: &str, lv_name: &str, ignore_skip: bool) -> Result<()>;

    fn lvdeactivate(&self, vg_name: &str, lv_name: &str) -> Result<()>;
}

type IsSupportedPeSizeFn = unsafe extern "C" fn(u64) -> c_int;
type GetMaxLvSizeFn = unsafe extern "C" fn() -> u64;
type RoundSizeToPeFn = unsafe extern "C" fn(u64, u64, c_int) -> u64;
type DeviceFn = unsafe extern "C" fn(*const c_char, *mut *mut c_char) -> c_int;
type VgCreateFn =
    unsafe extern "C" fn(*const c_char, *const *const c_char, u64, *mut *mut c_char) -> c_int;
type LvCreateFn = unsafe extern "C" fn(
    *const c_char,
    *const c_char,
    u64,
    *const *const c_char,
    *mut *mut c_char,
) -> c_int;
type LvFlagFn =
    unsafe extern "C" fn(*const c_char, *const c_char, c_int, *mut *mut c_char) -> c_int;
type LvFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut *mut c_char) -> c_int;

/// LVM plugin bound from a shared object.
pub struct NativeLvm {
    so_name: String,
    is_supported_pe_size: IsSupportedPeSizeFn,
    get_max_lv_size: GetMaxLvSizeFn,
    round_size_to_pe: RoundSizeToPeFn,
    pvcreate: DeviceFn,
    pvremove: DeviceFn,
    vgcreate: VgCreateFn,
    vgremove: DeviceFn,
    lvcreate: LvCreateFn,
    lvremove: LvFlagFn,
    lvactivate: LvFlagFn,
    lvdeactivate: LvFn,
    // Keeps the resolved function pointers valid.
    _library: Library,
}

impl NativeLvm {
    /// Resolve every required symbol, failing on the first missing one.
    pub(crate) fn bind(library: Library, so_name: &str) -> Result<Self> {
        // SAFETY: Each type alias matches the declared plugin ABI, and the
        // pointers are stored next to the library that owns them.
        unsafe {
            Ok(Self {
                so_name: so_name.to_string(),
                is_supported_pe_size: resolve(&library, so_name, symbols::IS_SUPPORTED_PE_SIZE)?,
                get_max_lv_size: resolve(&library, so_name, symbols::GET_MAX_LV_SIZE)?,
                round_size_to_pe: resolve(&library, so_name, symbols::ROUND_SIZE_TO_PE)?,
                pvcreate: resolve(&library, so_name, symbols::PVCREATE)?,
                pvremove: resolve(&library, so_name, symbols::PVREMOVE)?,
                vgcreate: resolve(&library, so_name, symbols::VGCREATE)?,
                vgremove: resolve(&library, so_name, symbols::VGREMOVE)?,
                lvcreate: resolve(&library, so_name, symbols::LVCREATE)?,
                lvremove: resolve(&library, so_name, symbols::LVREMOVE)?,
                lvactivate: resolve(&library, so_name, symbols::LVACTIVATE)?,
                lvdeactivate: resolve(&library, so_name, symbols::LVDEACTIVATE)?,
                _library: library,
            })
        }
    }

    /// Shared object this plugin was loaded from.
    pub fn so_name(&self) -> &str {
        &self.so_name
    }

    fn device_call(&self, f: DeviceFn, operation: &'static str, device: &str) -> Result<()> {
        let device = c_string(operation, device)?;
        // SAFETY: `f` was resolved from the live library with this signature.
        call_reporting(Plugin::Lvm, operation, true, |err| unsafe {
            f(device.as_ptr(), err)
        })
        .map(|_| ())
    }

    fn lv_flag_call(
        &self,
        f: LvFlagFn,
        operation: &'static str,
        vg_name: &str,
        lv_name: &str,
        flag: bool,
    ) -> Result<()> {
        let vg_name = c_string(operation, vg_name)?;
        let lv_name = c_string(operation, lv_name)?;
        // SAFETY: `f` was resolved from the live library with this signature.
        call_reporting(Plugin::Lvm, operation, true, |err| unsafe {
            f(vg_name.as_ptr(), lv_name.as_ptr(), c_int::from(flag), err)
        })
        .map(|_| ())
    }
}

impl LvmOps for NativeLvm {
    fn is_supported_pe_size(&self, size: u64) -> bool {
        // SAFETY: resolved with this signature; takes no pointers.
        unsafe { (self.is_supported_pe_size)(size) != 0 }
    }

    fn max_lv_size(&self) -> u64 {
        // SAFETY: resolved with this signature; takes no pointers.
        unsafe { (self.get_max_lv_size)() }
    }

    fn round_size_to_pe(&self, size: u64, pe_size: u64, roundup: bool) -> u64 {
        // SAFETY: resolved with this signature; takes no pointers.
        unsafe { (self.round_size_to_pe)(size, pe_size, c_int::from(roundup)) }
    }

    fn pvcreate(&self, device: &str) -> Result<()> {
        self.device_call(self.pvcreate, "pvcreate", device)
    }

    fn pvremove(&self, device: &str) -> Result<()> {
        self.device_call(self.pvremove, "pvremove", device)
    }

    fn vgcreate(&self, name: &str, pv_list: &[&str], pe_size: u64) -> Result<()> {
        let name = c_string("vgcreate", name)?;
        let pv_list = CStringList::new("vgcreate", pv_list)?;
        let f = self.vgcreate;
        // SAFETY: `f` was resolved with this signature; `pv_list` is NULL-terminated.
        call_reporting(Plugin::Lvm, "vgcreate", true, |err| unsafe {
            f(name.as_ptr(), pv_list.as_ptr(), pe_size, err)
        })
        .map(|_| ())
    }

    fn vgremove(&self, name: &str) -> Result<()> {
        self.device_call(self.vgremove, "vgremove", name)
    }

    fn lvcreate(
        &self,
        vg_name: &str,
        lv_name: &str,
        size: u64,
        pv_list: Option<&[&str]>,
    ) -> Result<()> {
        let vg = c_string("lvcreate", vg_name)?;
        let lv = c_string("lvcreate", lv_name)?;
        let pv_list = pv_list
            .map(|pvs| CStringList::new("lvcreate", pvs))
            .transpose()?;
        let pv_ptr = pv_list.as_ref().map_or(ptr::null(), |l| l.as_ptr());
        let f = self.lvcreate;
        // SAFETY: `f` was resolved with this signature; `pv_ptr` is null or NULL-terminated.
        call_reporting(Plugin::Lvm, "lvcreate", true, |err| unsafe {
            f(vg.as_ptr(), lv.as_ptr(), size, pv_ptr, err)
        })
        .map(|_| ())
    }

    fn lvremove(&self, vg_name: &str, lv_name: &str, force: bool) -> Result<()> {
        self.lv_flag_call(self.lvremove, "lvremove", vg_name, lv_name, force)
    }

    fn lvactivate(&self, vg_name: &str, lv_name: &str, ignore_skip: bool) -> Result<()> {
        self.lv_flag_call(self.lvactivate, "lvactivate", vg_name, lv_name, ignore_skip)
    }

    fn lvdeactivate(&self, vg_name: &str, lv_name: &str) -> Result<()> {
        let vg = c_string("lvdeactivate", vg_name)?;
        let lv = c_string("lvdeactivate", lv_name)?;
        let f = self.lvdeactivate;
        // SAFETY: `f` was resolved from the live library with this signature.
        call_reporting(Plugin::Lvm, "lvdeactivate", true, |err| unsafe {
            f(vg.as_ptr(), lv.as_ptr(), err)
        })
        .map(|_| ())
    }
}

impl fmt::Debug for NativeLvm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLvm")
            .field("so_name", &self.so_name)
            .finish()
    }
}

