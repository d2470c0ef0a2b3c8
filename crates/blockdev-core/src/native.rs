//! Native plugin loading using libloading.
//!
//! This is the only module that opens shared objects or resolves raw
//! symbols. Technology modules describe the symbols they need and receive
//! plain function pointers back, together with the [`Library`] that keeps
//! them valid.
//!
//! # Plugin ABI
//!
//! Plugins export C functions. Booleans are `int` (0 is FALSE). Fallible
//! calls take a trailing `char **error_message` which the plugin may set to a
//! `malloc`-allocated message; the caller releases it with `free`.

use libloading::Library;
use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::loader::{BoundPlugin, PluginLoader};
use crate::lvm::NativeLvm;
use crate::plugin::Plugin;
use crate::swap::NativeSwap;

/// Loads plugins from shared objects on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    /// Create a new native loader.
    pub fn new() -> Self {
        Self
    }
}

impl PluginLoader for NativeLoader {
    fn load(&self, plugin: Plugin, so_name: &str) -> Result<BoundPlugin> {
        let so_name = if so_name.trim().is_empty() {
            plugin.default_so_name()
        } else {
            so_name
        };

        let library = open(so_name)?;
        let bound = match plugin {
            Plugin::Lvm => BoundPlugin::Lvm(Arc::new(NativeLvm::bind(library, so_name)?)),
            Plugin::Swap => BoundPlugin::Swap(Arc::new(NativeSwap::bind(library, so_name)?)),
        };
        Ok(bound)
    }
}

/// Open a shared object by name or path.
pub(crate) fn open(so_name: &str) -> Result<Library> {
    // SAFETY: Loading runs the library's initializers. Plugins are trusted
    // code selected by the caller or the compiled-in defaults.
    unsafe { Library::new(so_name) }.map_err(|e| Error::LoadFailed {
        so_name: so_name.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `symbol` and copy the function pointer out of the library.
///
/// # Safety
///
/// `T` must be the exact function pointer type the plugin ABI declares for
/// `symbol`, and the returned pointer must not outlive `library`.
pub(crate) unsafe fn resolve<T: Copy>(
    library: &Library,
    so_name: &str,
    symbol: &'static str,
) -> Result<T> {
    let sym = unsafe { library.get::<T>(symbol.as_bytes()) }.map_err(|_| Error::MissingSymbol {
        so_name: so_name.to_string(),
        symbol,
    })?;
    Ok(*sym)
}

/// Convert an argument into a C string.
pub(crate) fn c_string(operation: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InvalidArgument {
        operation,
        message: format!("{:?} contains a NUL byte", value),
    })
}

/// Owned NULL-terminated array of C strings.
pub(crate) struct CStringList {
    _strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl CStringList {
    pub(crate) fn new(operation: &'static str, values: &[&str]) -> Result<Self> {
        let strings = values
            .iter()
            .map(|v| c_string(operation, v))
            .collect::<Result<Vec<_>>>()?;
        let mut pointers: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        pointers.push(ptr::null());
        Ok(Self {
            _strings: strings,
            pointers,
        })
    }

    pub(crate) fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }
}

/// Take ownership of a plugin-allocated error message.
///
/// # Safety
///
/// `message` must be null or a NUL-terminated string allocated with `malloc`.
unsafe fn take_message(message: *mut c_char) -> Option<String> {
    if message.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned();
    unsafe { libc::free(message.cast()) };
    Some(text)
}

/// Call a fallible plugin function and return its boolean result.
///
/// A FALSE result or a set error message is turned into
/// [`Error::OperationFailed`] when `false_is_error` is set; otherwise only
/// the message counts as failure.
pub(crate) fn call_reporting(
    plugin: Plugin,
    operation: &'static str,
    false_is_error: bool,
    call: impl FnOnce(*mut *mut c_char) -> c_int,
) -> Result<bool> {
    let mut message: *mut c_char = ptr::null_mut();
    let ret = call(ptr::addr_of_mut!(message));
    // SAFETY: The plugin ABI requires messages to be malloc-allocated.
    let message = unsafe { take_message(message) };

    match message {
        Some(message) => Err(Error::OperationFailed {
            plugin,
            operation,
            message,
        }),
        None if ret == 0 && false_is_error => Err(Error::OperationFailed {
            plugin,
            operation,
            message: "unknown error".to_string(),
        }),
        None => Ok(ret != 0),
    }
}
