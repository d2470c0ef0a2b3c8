//! Process-wide plugin registry.
//!
//! The registry is built and loaded exactly once by [`init`]. Until then every
//! query reports nothing available; afterwards the table is read-only.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config;
use crate::error::{Error, Result};
use crate::loader::{load_plugins, PluginLoader};
use crate::lvm::LvmOps;
use crate::native::NativeLoader;
use crate::plugin::{Plugin, PluginSpec};
use crate::registry::{PluginSnapshot, PluginTable};
use crate::swap::SwapOps;

static REGISTRY: OnceCell<PluginTable> = OnceCell::new();

/// Load every plugin from shared objects on disk.
///
/// `force_plugins` override the shared object used for the plugins they
/// name, taking precedence over the environment (see [`config`]). Returns
/// whether every plugin loaded; use the query functions for details.
pub fn init(force_plugins: &[PluginSpec]) -> Result<bool> {
    init_with(force_plugins, &NativeLoader)
}

/// Like [`init`] with a custom loader.
///
/// Concurrent callers block until the first one finishes; every call after
/// the first returns [`Error::AlreadyInitialized`].
pub fn init_with(force_plugins: &[PluginSpec], loader: &dyn PluginLoader) -> Result<bool> {
    let mut initialized_here = false;
    let table = REGISTRY.get_or_init(|| {
        initialized_here = true;

        let mut overrides = config::overrides_from_env();
        overrides.extend_from_slice(force_plugins);

        let mut table = PluginTable::new();
        load_plugins(&mut table, &overrides, loader);
        table
    });

    if !initialized_here {
        return Err(Error::AlreadyInitialized);
    }

    let all_loaded = table.all_loaded();
    if all_loaded {
        tracing::info!("All {} plugins loaded", Plugin::COUNT);
    } else {
        tracing::warn!(
            "Only {} of {} plugins loaded",
            table.loaded_count(),
            Plugin::COUNT
        );
    }
    Ok(all_loaded)
}

pub fn is_initialized() -> bool {
    REGISTRY.get().is_some()
}

/// The finalized registry, once [`init`] has run.
pub fn registry() -> Option<&'static PluginTable> {
    REGISTRY.get()
}

/// Display names of loaded plugins, in enumeration order.
pub fn available_plugin_names() -> Vec<&'static str> {
    REGISTRY
        .get()
        .map(PluginTable::available_names)
        .unwrap_or_default()
}

pub fn is_plugin_available(plugin: Plugin) -> bool {
    REGISTRY.get().is_some_and(|table| table.is_loaded(plugin))
}

/// Availability of a raw identifier; out-of-range values are never available.
pub fn is_plugin_available_raw(raw: u32) -> bool {
    REGISTRY.get().is_some_and(|table| table.is_loaded_raw(raw))
}

/// Per-plugin status of the registry; empty before [`init`].
pub fn plugin_status() -> Vec<PluginSnapshot> {
    REGISTRY
        .get()
        .map(PluginTable::snapshot)
        .unwrap_or_default()
}

/// Operations of the loaded LVM plugin.
pub fn lvm() -> Result<Arc<dyn LvmOps>> {
    REGISTRY
        .get()
        .and_then(|table| table.handle(Plugin::Lvm))
        .and_then(|bound| bound.as_lvm().cloned())
        .ok_or(Error::PluginUnavailable(Plugin::Lvm))
}

/// Operations of the loaded swap plugin.
pub fn swap() -> Result<Arc<dyn SwapOps>> {
    REGISTRY
        .get()
        .and_then(|table| table.handle(Plugin::Swap))
        .and_then(|bound| bound.as_swap().cloned())
        .ok_or(Error::PluginUnavailable(Plugin::Swap))
}
