//! Plugin identities and override specs.
//!
//! The set of plugins is closed: every identifier has exactly one registry
//! slot, a default shared-object name and a short display name.

use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::fmt;

use crate::config::defaults;
use crate::error::{Error, Result};

/// Known plugin technologies, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Plugin {
    /// LVM management.
    Lvm = 0,
    /// Swap space management.
    Swap = 1,
}

// Registry slot `i` is built from `Plugin::ALL[i]` and looked up through the
// discriminant, so the two orders must agree.
const _: () = {
    let mut i = 0;
    while i < Plugin::COUNT {
        assert!(Plugin::ALL[i] as usize == i);
        i += 1;
    }
};

impl Plugin {
    /// Every plugin in enumeration order.
    pub const ALL: [Plugin; 2] = [Plugin::Lvm, Plugin::Swap];

    /// Number of plugins. Also the first invalid raw identifier.
    pub const COUNT: usize = Self::ALL.len();

    /// Registry slot index of this plugin.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Convert a raw identifier, `None` for the sentinel and anything past it.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Plugin::Lvm),
            1 => Some(Plugin::Swap),
            _ => None,
        }
    }

    /// Short display name.
    pub const fn name(self) -> &'static str {
        match self {
            Plugin::Lvm => "lvm",
            Plugin::Swap => "swap",
        }
    }

    /// [`name`](Self::name) as a NUL-terminated string for C callers.
    pub const fn c_name(self) -> &'static CStr {
        match self {
            Plugin::Lvm => c"lvm",
            Plugin::Swap => c"swap",
        }
    }

    /// Shared object loaded when no override is configured.
    pub const fn default_so_name(self) -> &'static str {
        match self {
            Plugin::Lvm => defaults::LVM_SO_NAME,
            Plugin::Swap => defaults::SWAP_SO_NAME,
        }
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for Plugin {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        Plugin::from_raw(raw).ok_or(Error::InvalidPlugin(raw))
    }
}

/// Override of the shared object used for one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Plugin the override applies to.
    pub plugin: Plugin,
    /// Shared-object name or path to load instead of the default.
    pub so_name: String,
}

impl PluginSpec {
    /// Create a new override spec.
    pub fn new(plugin: Plugin, so_name: impl Into<String>) -> Self {
        Self {
            plugin,
            so_name: so_name.into(),
        }
    }

    /// Create a spec from a raw identifier, rejecting anything out of range.
    pub fn from_raw(raw: u32, so_name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(Plugin::try_from(raw)?, so_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_enumeration_order() {
        for (i, plugin) in Plugin::ALL.iter().enumerate() {
            assert_eq!(plugin.index(), i);
            assert_eq!(Plugin::from_raw(i as u32), Some(*plugin));
        }
    }

    #[test]
    fn test_sentinel_is_invalid() {
        assert_eq!(Plugin::from_raw(Plugin::COUNT as u32), None);
        assert_eq!(Plugin::from_raw(u32::MAX), None);
        assert_eq!(Plugin::try_from(2), Err(Error::InvalidPlugin(2)));
    }

    #[test]
    fn test_names() {
        assert_eq!(Plugin::Lvm.name(), "lvm");
        assert_eq!(Plugin::Swap.to_string(), "swap");
        assert_eq!(Plugin::Lvm.default_so_name(), "libbd_lvm.so");
        assert_eq!(Plugin::Swap.default_so_name(), "libbd_swap.so");
    }

    #[test]
    fn test_c_name_matches_name() {
        for plugin in Plugin::ALL {
            assert_eq!(plugin.c_name().to_str().unwrap(), plugin.name());
        }
    }

    #[test]
    fn test_spec_from_raw() {
        let spec = PluginSpec::from_raw(1, "/opt/libbd_swap.so").unwrap();
        assert_eq!(spec, PluginSpec::new(Plugin::Swap, "/opt/libbd_swap.so"));

        assert!(matches!(
            PluginSpec::from_raw(5, "x.so"),
            Err(Error::InvalidPlugin(5))
        ));
    }
}
