//! Plugin loading pass.
//!
//! A [`PluginLoader`] turns a plugin and a shared-object name into a
//! [`BoundPlugin`]. [`load_plugins`] applies overrides and runs the loader for
//! every slot, best-effort: one failure never stops the others.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::lvm::LvmOps;
use crate::plugin::{Plugin, PluginSpec};
use crate::registry::PluginTable;
use crate::swap::SwapOps;

/// A loaded plugin, exposing its technology's operations.
#[derive(Clone)]
pub enum BoundPlugin {
    Lvm(Arc<dyn LvmOps>),
    Swap(Arc<dyn SwapOps>),
}

impl BoundPlugin {
    /// Technology this handle implements.
    pub fn plugin(&self) -> Plugin {
        match self {
            BoundPlugin::Lvm(_) => Plugin::Lvm,
            BoundPlugin::Swap(_) => Plugin::Swap,
        }
    }

    pub fn as_lvm(&self) -> Option<&Arc<dyn LvmOps>> {
        match self {
            BoundPlugin::Lvm(lvm) => Some(lvm),
            _ => None,
        }
    }

    pub fn as_swap(&self) -> Option<&Arc<dyn SwapOps>> {
        match self {
            BoundPlugin::Swap(swap) => Some(swap),
            _ => None,
        }
    }
}

impl fmt::Debug for BoundPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundPlugin").field(&self.plugin()).finish()
    }
}

/// Loads the shared object for one technology and binds its operations.
pub trait PluginLoader: Send + Sync {
    /// Load `plugin` from `so_name`. An empty name selects the default.
    fn load(&self, plugin: Plugin, so_name: &str) -> Result<BoundPlugin>;
}

/// Apply `overrides` to `table`, then attempt to load every plugin.
///
/// Returns whether every slot ended up loaded. Per-plugin outcomes are
/// recorded in the table.
pub fn load_plugins(
    table: &mut PluginTable,
    overrides: &[PluginSpec],
    loader: &dyn PluginLoader,
) -> bool {
    table.apply_overrides(overrides);

    for plugin in Plugin::ALL {
        let slot = table.slot_mut(plugin);
        let outcome = loader.load(plugin, slot.so_name()).and_then(|bound| {
            if bound.plugin() == plugin {
                Ok(bound)
            } else {
                Err(Error::PluginMismatch {
                    expected: plugin,
                    found: bound.plugin(),
                })
            }
        });

        match &outcome {
            Ok(_) => tracing::info!("Loaded {} plugin from {}", plugin, slot.so_name()),
            Err(e) => tracing::warn!("Failed to load {} plugin: {}", plugin, e),
        }
        slot.record(outcome);
    }

    table.all_loaded()
}
