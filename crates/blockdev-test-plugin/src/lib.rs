//! Fixture plugin for the blockdev tests.
//!
//! Built as a `cdylib`, it exports the complete `bd_lvm_*` and `bd_swap_*`
//! ABI with scripted results keyed on the arguments:
//! - [`BUSY`] fails with a malloc'd message
//! - [`SILENT`] fails without a message
//! - [`ACTIVE`] is the only device with swap enabled
//!
//! The rlib side exposes [`library_path`] so tests can open the built object.

#![allow(clippy::missing_safety_doc)]

use once_cell::sync::Lazy;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::{c_char, c_int, CStr, CString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const BUSY: &str = "/dev/busy";
pub const SILENT: &str = "/dev/silent";
pub const ACTIVE: &str = "/dev/active";
/// `mkswap` on this device fails unless a label is given.
pub const NEEDS_LABEL: &str = "/dev/needs-label";
/// Logical volume that refuses removal without `force`.
pub const OPEN_LV: &str = "open";
/// Logical volume that stays inactive unless skip flags are ignored.
pub const SKIPPED_LV: &str = "skipped";

pub const MAX_LV_SIZE: u64 = 8 << 50;
pub const MAX_LABEL_LEN: usize = 16;

const TRUE: c_int = 1;
const FALSE: c_int = 0;

static LIBRARY: Lazy<Option<PathBuf>> = Lazy::new(|| find_built().or_else(build));

/// Path of the built fixture shared object.
///
/// Looks next to the running test binary first, then builds the fixture
/// into its own target directory.
pub fn library_path() -> Option<&'static Path> {
    LIBRARY.as_deref()
}

fn is_fixture(path: &Path) -> bool {
    let stem = format!("{}blockdev_test_plugin", DLL_PREFIX);
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(DLL_SUFFIX))
        .is_some_and(|name| name == stem || name.starts_with(&format!("{}-", stem)))
}

fn newest_in(dir: &Path) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_fixture(path))
        .max_by_key(|path| fs::metadata(path).and_then(|m| m.modified()).ok())
}

fn find_built() -> Option<PathBuf> {
    // target/<profile>/deps/<test binary>
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    newest_in(deps).or_else(|| newest_in(deps.parent()?))
}

fn build() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let target_dir = exe.parent()?.parent()?.parent()?.join("blockdev-test-plugin");

    // A separate target directory avoids waiting on the lock held by the
    // outer cargo invocation.
    let status = Command::new(option_env!("CARGO").unwrap_or("cargo"))
        .args(["build", "--quiet", "--lib", "--manifest-path"])
        .arg(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"))
        .arg("--target-dir")
        .arg(&target_dir)
        .status()
        .ok()?;
    if !status.success() {
        return None;
    }
    newest_in(&target_dir.join("debug"))
}

unsafe fn arg<'a>(ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("")
}

unsafe fn list<'a>(ptr: *const *const c_char) -> Option<Vec<&'a str>> {
    if ptr.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        let item = unsafe { *ptr.add(i) };
        if item.is_null() {
            return Some(out);
        }
        out.push(unsafe { arg(item) });
        i += 1;
    }
}

unsafe fn fail(error_message: *mut *mut c_char, text: &str) -> c_int {
    if !error_message.is_null() {
        if let Ok(text) = CString::new(text) {
            unsafe { *error_message = libc::strdup(text.as_ptr()) };
        }
    }
    FALSE
}

unsafe fn device_result(device: &str, error_message: *mut *mut c_char) -> c_int {
    match device {
        BUSY => unsafe { fail(error_message, &format!("{} is busy", device)) },
        SILENT => FALSE,
        _ => TRUE,
    }
}

unsafe fn pvs_result(pvs: &[&str], error_message: *mut *mut c_char) -> c_int {
    for pv in pvs {
        if unsafe { device_result(pv, error_message) } == FALSE {
            return FALSE;
        }
    }
    TRUE
}

fn supported_pe_size(size: u64) -> bool {
    size.is_power_of_two() && (1 << 10..=16 << 30).contains(&size)
}

#[no_mangle]
pub extern "C" fn bd_lvm_is_supported_pe_size(size: u64) -> c_int {
    c_int::from(supported_pe_size(size))
}

#[no_mangle]
pub extern "C" fn bd_lvm_get_max_lv_size() -> u64 {
    MAX_LV_SIZE
}

#[no_mangle]
pub extern "C" fn bd_lvm_round_size_to_pe(size: u64, pe_size: u64, roundup: c_int) -> u64 {
    if pe_size == 0 {
        return size;
    }
    let down = size - size % pe_size;
    if roundup != 0 && down != size {
        down + pe_size
    } else {
        down
    }
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_pvcreate(
    device: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    unsafe { device_result(arg(device), error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_pvremove(
    device: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    unsafe { device_result(arg(device), error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_vgcreate(
    name: *const c_char,
    pv_list: *const *const c_char,
    pe_size: u64,
    error_message: *mut *mut c_char,
) -> c_int {
    let name = unsafe { arg(name) };
    let pvs = unsafe { list(pv_list) }.unwrap_or_default();

    if name.is_empty() {
        return unsafe { fail(error_message, "volume group name required") };
    }
    if pvs.is_empty() {
        return unsafe { fail(error_message, "no physical volumes given") };
    }
    if pe_size != 0 && !supported_pe_size(pe_size) {
        return unsafe { fail(error_message, &format!("unsupported extent size {}", pe_size)) };
    }
    unsafe { pvs_result(&pvs, error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_vgremove(
    name: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    unsafe { device_result(arg(name), error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_lvcreate(
    vg_name: *const c_char,
    lv_name: *const c_char,
    size: u64,
    pv_list: *const *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    let (vg, lv) = unsafe { (arg(vg_name), arg(lv_name)) };
    if size == 0 {
        return unsafe { fail(error_message, &format!("{}/{}: size must be positive", vg, lv)) };
    }
    match unsafe { list(pv_list) } {
        None => TRUE,
        Some(pvs) if pvs.is_empty() => unsafe { fail(error_message, "empty physical volume list") },
        Some(pvs) => unsafe { pvs_result(&pvs, error_message) },
    }
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_lvremove(
    vg_name: *const c_char,
    lv_name: *const c_char,
    force: c_int,
    error_message: *mut *mut c_char,
) -> c_int {
    let (vg, lv) = unsafe { (arg(vg_name), arg(lv_name)) };
    if lv == OPEN_LV && force == 0 {
        return unsafe { fail(error_message, &format!("{}/{} is open", vg, lv)) };
    }
    TRUE
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_lvactivate(
    _vg_name: *const c_char,
    lv_name: *const c_char,
    ignore_skip: c_int,
    _error_message: *mut *mut c_char,
) -> c_int {
    if unsafe { arg(lv_name) } == SKIPPED_LV && ignore_skip == 0 {
        return FALSE;
    }
    TRUE
}

#[no_mangle]
pub unsafe extern "C" fn bd_lvm_lvdeactivate(
    vg_name: *const c_char,
    lv_name: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    let (vg, lv) = unsafe { (arg(vg_name), arg(lv_name)) };
    if lv == OPEN_LV {
        return unsafe { fail(error_message, &format!("{}/{} is open", vg, lv)) };
    }
    TRUE
}

#[no_mangle]
pub unsafe extern "C" fn bd_swap_mkswap(
    device: *const c_char,
    label: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    let device = unsafe { arg(device) };
    if label.is_null() {
        if device == NEEDS_LABEL {
            return unsafe { fail(error_message, &format!("{} needs a label", device)) };
        }
    } else if unsafe { arg(label) }.len() > MAX_LABEL_LEN {
        return unsafe { fail(error_message, "label too long") };
    }
    unsafe { device_result(device, error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_swap_swapon(
    device: *const c_char,
    priority: c_int,
    error_message: *mut *mut c_char,
) -> c_int {
    if priority < -1 {
        return unsafe { fail(error_message, &format!("invalid priority {}", priority)) };
    }
    unsafe { device_result(arg(device), error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_swap_swapoff(
    device: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    unsafe { device_result(arg(device), error_message) }
}

#[no_mangle]
pub unsafe extern "C" fn bd_swap_swapstatus(
    device: *const c_char,
    error_message: *mut *mut c_char,
) -> c_int {
    match unsafe { arg(device) } {
        ACTIVE => TRUE,
        BUSY => unsafe { fail(error_message, "cannot read swap status") },
        _ => FALSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_file_names() {
        let name = |n: &str| PathBuf::from(format!("/t/{}{}{}", DLL_PREFIX, n, DLL_SUFFIX));
        assert!(is_fixture(&name("blockdev_test_plugin")));
        assert!(is_fixture(&name("blockdev_test_plugin-0a1b2c")));
        assert!(!is_fixture(&name("blockdev_test_plugin_other")));
        assert!(!is_fixture(Path::new("/t/libblockdev_test_plugin.rlib")));
    }

    #[test]
    fn test_round_size_to_pe() {
        assert_eq!(bd_lvm_round_size_to_pe(5000, 4096, 0), 4096);
        assert_eq!(bd_lvm_round_size_to_pe(5000, 4096, 1), 8192);
        assert_eq!(bd_lvm_round_size_to_pe(8192, 4096, 1), 8192);
        assert_eq!(bd_lvm_round_size_to_pe(5000, 0, 1), 5000);
    }
}
