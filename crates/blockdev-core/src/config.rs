//! Default plugin locations and environment overrides.
//!
//! Overrides are resolved in increasing precedence: compiled-in defaults,
//! then the environment, then the specs passed to [`crate::init`].

use crate::plugin::{Plugin, PluginSpec};

/// Compiled-in shared-object names.
pub mod defaults {
    pub const LVM_SO_NAME: &str = "libbd_lvm.so";
    pub const SWAP_SO_NAME: &str = "libbd_swap.so";
}

/// Environment variable names.
pub mod env_vars {
    use crate::plugin::Plugin;

    pub const LVM_PLUGIN: &str = "BLOCKDEV_LVM_PLUGIN";
    pub const SWAP_PLUGIN: &str = "BLOCKDEV_SWAP_PLUGIN";

    /// Variable holding the shared-object override for `plugin`.
    pub fn for_plugin(plugin: Plugin) -> &'static str {
        match plugin {
            Plugin::Lvm => LVM_PLUGIN,
            Plugin::Swap => SWAP_PLUGIN,
        }
    }
}

/// Collect overrides from the environment, in enumeration order.
///
/// Unset or blank variables are skipped.
pub fn overrides_from_env() -> Vec<PluginSpec> {
    overrides_from(|var| std::env::var(var).ok())
}

fn overrides_from(lookup: impl Fn(&str) -> Option<String>) -> Vec<PluginSpec> {
    Plugin::ALL
        .iter()
        .filter_map(|&plugin| {
            let value = lookup(env_vars::for_plugin(plugin))?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            tracing::debug!("{} plugin overridden from environment: {}", plugin, value);
            Some(PluginSpec::new(plugin, value))
        })
        .collect()
}
