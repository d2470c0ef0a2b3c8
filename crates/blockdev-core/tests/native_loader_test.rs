//! Native Loader Tests
//!
//! Exercises the libloading-backed loader on its error paths:
//! - Missing shared objects
//! - Files that are not shared objects
//! - Shared objects without the required symbols

use blockdev_core::{
    load_plugins, Error, NativeLoader, Plugin, PluginLoader, PluginSpec, PluginTable,
};
use std::io::Write;

#[test]
fn test_load_nonexistent_library() {
    let loader = NativeLoader::new();
    let result = loader.load(Plugin::Lvm, "/nonexistent/path/libbd_lvm.so");

    match result {
        Err(Error::LoadFailed { so_name, reason }) => {
            assert_eq!(so_name, "/nonexistent/path/libbd_lvm.so");
            assert!(!reason.is_empty());
        }
        other => panic!("Expected LoadFailed, got {:?}", other),
    }
}

#[test]
fn test_empty_name_uses_default() {
    let loader = NativeLoader::new();

    // The default plugins are not installed in the test environment.
    match loader.load(Plugin::Swap, "") {
        Err(Error::LoadFailed { so_name, .. }) => assert_eq!(so_name, "libbd_swap.so"),
        Err(Error::MissingSymbol { so_name, .. }) => assert_eq!(so_name, "libbd_swap.so"),
        Ok(_) => {}
        Err(e) => panic!("Unexpected error: {}", e),
    }
}

#[test]
fn test_load_invalid_library_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("libbd_garbage.so");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"this is not an ELF object").unwrap();
    drop(file);

    let loader = NativeLoader::new();
    let result = loader.load(Plugin::Swap, path.to_str().unwrap());
    assert!(matches!(result, Err(Error::LoadFailed { .. })));
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_library_without_plugin_symbols() {
    let loader = NativeLoader::new();

    let err = loader.load(Plugin::Lvm, "libc.so.6").unwrap_err();
    assert_eq!(
        err,
        Error::MissingSymbol {
            so_name: "libc.so.6".to_string(),
            symbol: "bd_lvm_is_supported_pe_size",
        }
    );

    let err = loader.load(Plugin::Swap, "libc.so.6").unwrap_err();
    assert_eq!(
        err,
        Error::MissingSymbol {
            so_name: "libc.so.6".to_string(),
            symbol: "bd_swap_mkswap",
        }
    );
}

#[test]
fn test_native_pass_records_every_failure() {
    let mut table = PluginTable::new();
    let overrides = [
        PluginSpec::new(Plugin::Lvm, "/nonexistent/libbd_lvm.so"),
        PluginSpec::new(Plugin::Swap, "/nonexistent/libbd_swap.so"),
    ];

    assert!(!load_plugins(&mut table, &overrides, &NativeLoader::new()));
    for plugin in Plugin::ALL {
        assert!(!table.is_loaded(plugin));
        assert!(table.slot(plugin).error().unwrap().is_load_error());
    }
    assert!(table.available_names().is_empty());
}
