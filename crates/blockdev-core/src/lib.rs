//! Plugin registry for the blockdev library.
//!
//! blockdev delegates every technology (LVM, swap, ...) to a plugin shared
//! object loaded at runtime. This crate keeps the fixed table of known
//! plugins, loads them once at initialization and answers which ones are
//! available.
//!
//! # Usage
//!
//! ```rust,ignore
//! use blockdev_core::{Plugin, PluginSpec};
//!
//! let all = blockdev_core::init(&[PluginSpec::new(Plugin::Swap, "/opt/bd/libbd_swap.so")])?;
//! if !all {
//!     println!("available: {:?}", blockdev_core::available_plugin_names());
//! }
//!
//! if blockdev_core::is_plugin_available(Plugin::Swap) {
//!     blockdev_core::swap()?.swapon("/dev/vdb1", -1)?;
//! }
//! ```

pub mod config;
pub mod error;
pub mod init;
pub mod loader;
pub mod lvm;
pub mod native;
pub mod plugin;
pub mod registry;
pub mod swap;

pub use error::{Error, Result};
pub use init::{
    available_plugin_names, init, init_with, is_initialized, is_plugin_available,
    is_plugin_available_raw, lvm, plugin_status, registry, swap,
};
pub use loader::{load_plugins, BoundPlugin, PluginLoader};
pub use lvm::{LvmOps, NativeLvm};
pub use native::NativeLoader;
pub use plugin::{Plugin, PluginSpec};
pub use registry::{PluginSnapshot, PluginStatus, PluginTable, SlotState};
pub use swap::{NativeSwap, SwapOps};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::loader::{BoundPlugin, PluginLoader};
    pub use crate::lvm::LvmOps;
    pub use crate::plugin::{Plugin, PluginSpec};
    pub use crate::registry::PluginTable;
    pub use crate::swap::SwapOps;
}
