//! Fixed plugin table.
//!
//! The table holds exactly one slot per [`Plugin`], built in enumeration
//! order and addressed only through [`Plugin::index`]. A slot counts as
//! loaded exactly when it holds a bound handle.

use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::loader::BoundPlugin;
use crate::plugin::{Plugin, PluginSpec};

/// Load state of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// No load attempt yet.
    Unloaded,
    /// Loaded and bound.
    Loaded,
    /// The load attempt failed.
    Failed,
}

/// Live state of one registry slot.
pub struct PluginStatus {
    plugin: Plugin,
    so_name: String,
    handle: Option<BoundPlugin>,
    error: Option<Error>,
}

impl PluginStatus {
    fn new(plugin: Plugin) -> Self {
        Self {
            plugin,
            so_name: plugin.default_so_name().to_string(),
            handle: None,
            error: None,
        }
    }

    /// Plugin this slot belongs to.
    pub fn plugin(&self) -> Plugin {
        self.plugin
    }

    /// Display name of the plugin.
    pub fn name(&self) -> &'static str {
        self.plugin.name()
    }

    /// Default shared-object name.
    pub fn default_so_name(&self) -> &'static str {
        self.plugin.default_so_name()
    }

    /// Currently configured shared-object name.
    pub fn so_name(&self) -> &str {
        &self.so_name
    }

    /// Whether the most recent load attempt succeeded.
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn state(&self) -> SlotState {
        match (&self.handle, &self.error) {
            (Some(_), _) => SlotState::Loaded,
            (None, Some(_)) => SlotState::Failed,
            (None, None) => SlotState::Unloaded,
        }
    }

    /// Why the load attempt failed, if it did.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Bound plugin handle, present once loaded.
    pub fn handle(&self) -> Option<&BoundPlugin> {
        self.handle.as_ref()
    }

    pub(crate) fn record(&mut self, outcome: Result<BoundPlugin>) {
        match outcome {
            Ok(handle) => {
                self.handle = Some(handle);
                self.error = None;
            }
            Err(e) => {
                self.handle = None;
                self.error = Some(e);
            }
        }
    }
}

impl fmt::Debug for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginStatus")
            .field("plugin", &self.plugin)
            .field("so_name", &self.so_name)
            .field("state", &self.state())
            .field("error", &self.error)
            .finish()
    }
}

/// Serializable view of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSnapshot {
    pub plugin: Plugin,
    pub name: &'static str,
    pub so_name: String,
    pub state: SlotState,
    pub loaded: bool,
    pub error: Option<String>,
}

/// Registry of every known plugin.
#[derive(Debug)]
pub struct PluginTable {
    slots: [PluginStatus; Plugin::COUNT],
}

impl PluginTable {
    /// Create a table with default shared-object names and nothing loaded.
    pub fn new() -> Self {
        Self {
            slots: Plugin::ALL.map(PluginStatus::new),
        }
    }

    /// Slot for `plugin`.
    pub fn slot(&self, plugin: Plugin) -> &PluginStatus {
        &self.slots[plugin.index()]
    }

    pub(crate) fn slot_mut(&mut self, plugin: Plugin) -> &mut PluginStatus {
        &mut self.slots[plugin.index()]
    }

    /// All slots in enumeration order.
    pub fn slots(&self) -> impl Iterator<Item = &PluginStatus> {
        self.slots.iter()
    }

    /// Replace the configured shared-object name for `plugin`.
    ///
    /// Has no effect on a slot that is already loaded other than changing
    /// the name used by a later load attempt.
    pub fn set_override(&mut self, plugin: Plugin, so_name: impl Into<String>) {
        let slot = self.slot_mut(plugin);
        slot.so_name = so_name.into();
        tracing::debug!("{} plugin will be loaded from {}", plugin, slot.so_name);
    }

    /// Like [`set_override`](Self::set_override) for a raw identifier.
    pub fn set_override_raw(&mut self, raw: u32, so_name: impl Into<String>) -> Result<()> {
        let plugin = Plugin::try_from(raw)?;
        self.set_override(plugin, so_name);
        Ok(())
    }

    /// Apply overrides in order; later specs for the same plugin win.
    pub fn apply_overrides(&mut self, specs: &[PluginSpec]) {
        for spec in specs {
            self.set_override(spec.plugin, spec.so_name.clone());
        }
    }

    pub fn is_loaded(&self, plugin: Plugin) -> bool {
        self.slot(plugin).is_loaded()
    }

    /// Loaded flag for a raw identifier. Out-of-range identifiers are never loaded.
    pub fn is_loaded_raw(&self, raw: u32) -> bool {
        Plugin::from_raw(raw).is_some_and(|plugin| self.is_loaded(plugin))
    }

    /// Display names of loaded plugins, in enumeration order.
    pub fn available_names(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|slot| slot.is_loaded())
            .map(PluginStatus::name)
            .collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_loaded()).count()
    }

    /// Whether every slot is loaded.
    pub fn all_loaded(&self) -> bool {
        self.slots.iter().all(PluginStatus::is_loaded)
    }

    /// Bound handle for `plugin`, if loaded.
    pub fn handle(&self, plugin: Plugin) -> Option<&BoundPlugin> {
        self.slot(plugin).handle()
    }

    pub fn snapshot(&self) -> Vec<PluginSnapshot> {
        self.slots
            .iter()
            .map(|slot| PluginSnapshot {
                plugin: slot.plugin,
                name: slot.name(),
                so_name: slot.so_name.clone(),
                state: slot.state(),
                loaded: slot.is_loaded(),
                error: slot.error.as_ref().map(ToString::to_string),
            })
            .collect()
    }
}

impl Default for PluginTable {
    fn default() -> Self {
        Self::new()
    }
}
