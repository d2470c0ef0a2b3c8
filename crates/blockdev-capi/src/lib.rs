//! C interface to the blockdev plugin registry.
//!
//! ```c
//! BDPluginSpec force[] = {
//!     { BD_PLUGIN_SWAP, "/opt/bd/libbd_swap.so" },
//!     { BD_PLUGIN_UNDEF, NULL },
//! };
//! int all = bd_init (force);
//!
//! char **names = bd_get_available_plugin_names ();
//! for (char **n = names; *n; n++)
//!     puts (*n);
//! bd_plugin_names_free (names);
//! ```
//!
//! Override lists end at the first element whose `name` is
//! `BD_PLUGIN_UNDEF`. A null list means no overrides.

use std::ffi::{c_char, c_int, c_uint, CStr};
use std::ptr;

use blockdev_core::{Error, Plugin, PluginSpec, Result};

/// Plugin identifier as seen from C.
pub type BDPlugin = c_uint;

pub const BD_PLUGIN_LVM: BDPlugin = Plugin::Lvm as BDPlugin;
pub const BD_PLUGIN_SWAP: BDPlugin = Plugin::Swap as BDPlugin;
/// Sentinel: terminates override lists, never a valid plugin.
pub const BD_PLUGIN_UNDEF: BDPlugin = Plugin::COUNT as BDPlugin;

pub const TRUE: c_int = 1;
pub const FALSE: c_int = 0;

/// Shared-object override for one plugin.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BDPluginSpec {
    pub name: BDPlugin,
    /// Shared object to load; null selects the default.
    pub so_name: *const c_char,
}

/// Read a sentinel-terminated override list.
///
/// # Safety
///
/// `specs` must be null or point to an array terminated by an element whose
/// `name` is `BD_PLUGIN_UNDEF`, with every `so_name` null or NUL-terminated.
unsafe fn read_specs(specs: *const BDPluginSpec) -> Result<Vec<PluginSpec>> {
    let mut out = Vec::new();
    if specs.is_null() {
        return Ok(out);
    }

    let mut i = 0;
    loop {
        // SAFETY: the caller guarantees the array is terminated.
        let spec = unsafe { *specs.add(i) };
        if spec.name == BD_PLUGIN_UNDEF {
            break;
        }

        let plugin = Plugin::try_from(spec.name)?;
        let so_name = if spec.so_name.is_null() {
            plugin.default_so_name().to_string()
        } else {
            // SAFETY: the caller guarantees `so_name` is NUL-terminated.
            unsafe { CStr::from_ptr(spec.so_name) }
                .to_str()
                .map_err(|_| Error::InvalidArgument {
                    operation: "bd_init",
                    message: format!("shared-object name for {} is not UTF-8", plugin),
                })?
                .to_string()
        };
        out.push(PluginSpec::new(plugin, so_name));
        i += 1;
    }

    Ok(out)
}

/// Build a NULL-terminated array of plugin names owned by the caller.
fn names_array(plugins: impl Iterator<Item = Plugin>) -> *mut *const c_char {
    let names: Vec<*const c_char> = plugins
        .map(|plugin| plugin.c_name().as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect();
    Box::into_raw(names.into_boxed_slice()).cast()
}

/// Initialize the library, loading every plugin.
///
/// Returns TRUE only if every plugin loaded. An invalid override list
/// loads nothing and returns FALSE. Once initialized, further calls ignore
/// `force_plugins` and return the result of the first call.
///
/// # Safety
///
/// `force_plugins` must be null or a `BD_PLUGIN_UNDEF`-terminated array of
/// valid specs.
#[no_mangle]
pub unsafe extern "C" fn bd_init(force_plugins: *const BDPluginSpec) -> c_int {
    if blockdev_core::is_initialized() {
        tracing::warn!("bd_init called more than once, overrides ignored");
        return first_result();
    }

    // SAFETY: forwarded from the caller.
    let specs = match unsafe { read_specs(force_plugins) } {
        Ok(specs) => specs,
        Err(e) => {
            tracing::error!("Rejected plugin overrides: {}", e);
            return FALSE;
        }
    };

    match blockdev_core::init(&specs) {
        Ok(true) => TRUE,
        Ok(false) => FALSE,
        // Lost a race with a concurrent first call.
        Err(Error::AlreadyInitialized) => first_result(),
        Err(e) => {
            tracing::error!("Initialization failed: {}", e);
            FALSE
        }
    }
}

fn first_result() -> c_int {
    match blockdev_core::registry() {
        Some(table) if table.all_loaded() => TRUE,
        _ => FALSE,
    }
}

/// Names of the available plugins as a NULL-terminated array.
///
/// The strings are static; release the array with [`bd_plugin_names_free`].
#[no_mangle]
pub extern "C" fn bd_get_available_plugin_names() -> *mut *const c_char {
    names_array(
        Plugin::ALL
            .into_iter()
            .filter(|&plugin| blockdev_core::is_plugin_available(plugin)),
    )
}

/// Release an array returned by [`bd_get_available_plugin_names`].
///
/// # Safety
///
/// `names` must be null or come from [`bd_get_available_plugin_names`] and
/// must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn bd_plugin_names_free(names: *mut *const c_char) {
    if names.is_null() {
        return;
    }

    let mut len = 0;
    // SAFETY: the array is NULL-terminated.
    while !unsafe { *names.add(len) }.is_null() {
        len += 1;
    }
    // SAFETY: allocated by `names_array` as a boxed slice of `len + 1` pointers.
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(names, len + 1)) });
}

/// Whether `plugin` loaded. Out-of-range identifiers yield FALSE.
#[no_mangle]
pub extern "C" fn bd_is_plugin_available(plugin: BDPlugin) -> c_int {
    c_int::from(blockdev_core::is_plugin_available_raw(plugin))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(names: *mut *const c_char) -> Vec<String> {
        let mut out = Vec::new();
        let mut i = 0;
        loop {
            let name = unsafe { *names.add(i) };
            if name.is_null() {
                break;
            }
            out.push(unsafe { CStr::from_ptr(name) }.to_str().unwrap().to_string());
            i += 1;
        }
        out
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(BD_PLUGIN_LVM, 0);
        assert_eq!(BD_PLUGIN_SWAP, 1);
        assert_eq!(BD_PLUGIN_UNDEF, 2);
    }

    #[test]
    fn test_read_null_list() {
        assert!(unsafe { read_specs(ptr::null()) }.unwrap().is_empty());
    }

    #[test]
    fn test_read_terminated_list() {
        let specs = [
            BDPluginSpec {
                name: BD_PLUGIN_SWAP,
                so_name: c"/opt/libbd_swap.so".as_ptr(),
            },
            BDPluginSpec {
                name: BD_PLUGIN_LVM,
                so_name: ptr::null(),
            },
            BDPluginSpec {
                name: BD_PLUGIN_UNDEF,
                so_name: ptr::null(),
            },
            // Past the terminator, must never be read.
            BDPluginSpec {
                name: 99,
                so_name: ptr::null(),
            },
        ];

        let read = unsafe { read_specs(specs.as_ptr()) }.unwrap();
        assert_eq!(
            read,
            vec![
                PluginSpec::new(Plugin::Swap, "/opt/libbd_swap.so"),
                PluginSpec::new(Plugin::Lvm, "libbd_lvm.so"),
            ]
        );
    }

    #[test]
    fn test_read_rejects_out_of_range() {
        let specs = [
            BDPluginSpec {
                name: 7,
                so_name: c"libbd_bogus.so".as_ptr(),
            },
            BDPluginSpec {
                name: BD_PLUGIN_UNDEF,
                so_name: ptr::null(),
            },
        ];

        assert_eq!(
            unsafe { read_specs(specs.as_ptr()) },
            Err(Error::InvalidPlugin(7))
        );
    }

    #[test]
    fn test_names_array_round_trip() {
        let names = names_array(Plugin::ALL.into_iter());
        assert_eq!(collect(names), vec!["lvm", "swap"]);
        unsafe { bd_plugin_names_free(names) };

        let empty = names_array(std::iter::empty());
        assert!(collect(empty).is_empty());
        unsafe { bd_plugin_names_free(empty) };

        unsafe { bd_plugin_names_free(ptr::null_mut()) };
    }
}
