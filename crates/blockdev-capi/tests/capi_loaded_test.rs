//! C Interface Tests With Loaded Plugins
//!
//! Initializes once against the fixture plugin so every plugin loads, then
//! checks that later `bd_init` calls report that first result whatever
//! override list they pass.

use blockdev::{
    bd_get_available_plugin_names, bd_init, bd_is_plugin_available, bd_plugin_names_free,
    BDPluginSpec, BD_PLUGIN_LVM, BD_PLUGIN_SWAP, BD_PLUGIN_UNDEF, TRUE,
};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

fn collect(names: *mut *const c_char) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        let name = unsafe { *names.add(i) };
        if name.is_null() {
            return out;
        }
        out.push(unsafe { CStr::from_ptr(name) }.to_str().unwrap().to_string());
        i += 1;
    }
}

#[test]
fn test_init_with_fixture_plugins() {
    let so_name = blockdev_test_plugin::library_path()
        .and_then(|path| path.to_str())
        .map(|path| CString::new(path).unwrap())
        .expect("fixture plugin shared object not found");

    let force = [
        BDPluginSpec {
            name: BD_PLUGIN_LVM,
            so_name: so_name.as_ptr(),
        },
        BDPluginSpec {
            name: BD_PLUGIN_SWAP,
            so_name: so_name.as_ptr(),
        },
        BDPluginSpec {
            name: BD_PLUGIN_UNDEF,
            so_name: ptr::null(),
        },
    ];
    assert_eq!(unsafe { bd_init(force.as_ptr()) }, TRUE);

    let names = bd_get_available_plugin_names();
    assert_eq!(collect(names), vec!["lvm", "swap"]);
    unsafe { bd_plugin_names_free(names) };
    assert_eq!(bd_is_plugin_available(BD_PLUGIN_LVM), TRUE);
    assert_eq!(bd_is_plugin_available(BD_PLUGIN_SWAP), TRUE);

    // An override list that would be rejected before initialization is
    // ignored afterwards.
    let invalid = [
        BDPluginSpec {
            name: BD_PLUGIN_UNDEF + 1,
            so_name: c"libbd_bogus.so".as_ptr(),
        },
        BDPluginSpec {
            name: BD_PLUGIN_UNDEF,
            so_name: ptr::null(),
        },
    ];
    assert_eq!(unsafe { bd_init(invalid.as_ptr()) }, TRUE);
    assert_eq!(unsafe { bd_init(ptr::null()) }, TRUE);

    let swap = blockdev_core::swap().unwrap();
    assert_eq!(swap.swapstatus(blockdev_test_plugin::ACTIVE), Ok(true));
}
