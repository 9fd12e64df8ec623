//! Bundles of plugins added in one call.

use super::{Plugin, PluginId};

/// A named collection of plugins.
///
/// ```ignore
/// Server::new()
///     .add_plugins(DefaultPlugins.build().disable::<TracingPlugin>())
///     .finish();
/// ```
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

/// Ordered, editable list of plugins produced by a [`PluginGroup`].
#[derive(Default)]
pub struct PluginGroupBuilder {
    plugins: Vec<(PluginId, Box<dyn Plugin>)>,
}

impl PluginGroupBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Appends a plugin.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push((PluginId::of::<P>(), Box::new(plugin)));
        self
    }

    /// Removes every plugin of type `P`. No-op if absent.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let target = PluginId::of::<P>();
        self.plugins.retain(|(id, _)| *id != target);
        self
    }

    /// Returns `true` if a plugin of type `P` is in the group.
    #[must_use]
    pub fn contains<P: Plugin>(&self) -> bool {
        let target = PluginId::of::<P>();
        self.plugins.iter().any(|(id, _)| *id == target)
    }

    /// Returns the number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(PluginId, Box<dyn Plugin>)> {
        self.plugins
    }
}
