//! Server runtime for plugin orchestration.
//!
//! The [`Server`] owns the service registry and the build-time APIs, and
//! drives plugins through their lifecycle. It has no behavior of its own:
//! the hook engine, logging and time all arrive as plugins.
//!
//! ```ignore
//! let mut server = Server::new();
//! server
//!     .add_plugins(DefaultPlugins.build())
//!     .add_plugins(HooksPlugin::default())
//!     .add_plugins(CalculatorHooks);
//! server.finish();
//!
//! let interceptor = Interceptor::new(&server);
//! ```
//!
//! # Lifecycle
//!
//! 1. **Dependency Resolution** - Validate and topologically sort plugins
//! 2. **Build Phase** - Call `plugin.build()` in dependency order
//! 3. **Ready Phase** - Call `plugin.ready()` in dependency order
//! 4. **Cleanup Phase** - Call `plugin.cleanup()` in reverse order

use core::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::api::API;
use crate::plugin::{Plugin, PluginId, Plugins};
use crate::service::{Service, Services};

type BoxedAPI = Box<dyn Any + Send + Sync>;

/// Build progress of a server: `NotStarted` → `Building` → `Built`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    NotStarted,
    Building,
    Built,
}

struct PluginEntry {
    id: PluginId,
    plugin: Box<dyn Plugin>,
    name: String,
}

/// The runtime that orchestrates plugins and owns shared services.
pub struct Server {
    /// Shared collaborators: handler instances, sinks, settings.
    services: Services,
    /// Build-time capability registries, keyed by type.
    apis: HashMap<TypeId, BoxedAPI>,
    /// Plugins added before `finish()`, not yet sorted.
    pending_plugins: Vec<PluginEntry>,
    /// Plugins that have been built, in dependency order.
    built_plugins: Vec<PluginEntry>,
    /// Ids of every plugin added so far, for duplicate detection.
    plugin_ids: HashSet<PluginId>,
    build_state: BuildState,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Creates a server with no plugins, services or APIs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Services::new(),
            apis: HashMap::new(),
            pending_plugins: Vec::new(),
            built_plugins: Vec::new(),
            plugin_ids: HashSet::new(),
            build_state: BuildState::NotStarted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a plugin or a plugin group.
    ///
    /// # Panics
    ///
    /// Panics if a unique plugin is added twice.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> &mut Self {
        plugins.add_to_server(self);
        self
    }

    pub(crate) fn add_plugin_boxed(&mut self, id: PluginId, plugin: Box<dyn Plugin>) {
        let name = plugin.name().to_string();
        let first_of_kind = self.plugin_ids.insert(id);
        assert!(
            first_of_kind || !plugin.is_unique(),
            "plugin `{name}` is unique and cannot be added twice"
        );

        let entry = PluginEntry { id, plugin, name };
        match self.build_state {
            // Added from inside another plugin's build(): no later sort will see it
            BuildState::Building => {
                entry.plugin.build(self);
                self.built_plugins.push(entry);
            }
            BuildState::NotStarted | BuildState::Built => self.pending_plugins.push(entry),
        }
    }

    /// Returns true if a plugin of type `P` has been added.
    #[must_use]
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugin_ids.contains(&PluginId::of::<P>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a service, returning the handle it replaced.
    pub fn insert_service<S: Service>(&mut self, service: S) -> Option<Arc<S>> {
        self.services.insert(service)
    }

    /// Inserts an already shared service, returning the handle it replaced.
    pub fn insert_service_arc<S: Service>(&mut self, service: Arc<S>) -> Option<Arc<S>> {
        self.services.insert_arc(service)
    }

    /// Returns true if a service of type `S` exists.
    #[must_use]
    pub fn contains_service<S: Service>(&self) -> bool {
        self.services.contains::<S>()
    }

    /// Returns a shared handle to a service, or `None` if absent.
    #[must_use]
    pub fn get_service<S: Service>(&self) -> Option<Arc<S>> {
        self.services.get::<S>().ok()
    }

    /// Removes a service and returns its handle.
    pub fn remove_service<S: Service>(&mut self) -> Option<Arc<S>> {
        self.services.remove::<S>()
    }

    /// Returns the service registry.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts an API, returning the one it replaced.
    pub fn insert_api<A: API>(&mut self, api: A) -> Option<A> {
        let boxed: BoxedAPI = Box::new(api);
        self.apis
            .insert(TypeId::of::<A>(), boxed)
            .and_then(|old| old.downcast::<A>().ok())
            .map(|b| *b)
    }

    /// Gets a reference to an API, or `None` if it was never inserted.
    #[must_use]
    pub fn api<A: API>(&self) -> Option<&A> {
        self.apis
            .get(&TypeId::of::<A>())
            .and_then(|boxed| boxed.downcast_ref::<A>())
    }

    /// Returns true if an API of type `A` exists.
    #[must_use]
    pub fn contains_api<A: API>(&self) -> bool {
        self.apis.contains_key(&TypeId::of::<A>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns whether `finish()` has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.build_state == BuildState::Built
    }

    /// Builds and readies all plugins in dependency order.
    ///
    /// # Panics
    ///
    /// - If a plugin's dependency was not added
    /// - If plugins depend on each other circularly
    /// - If called more than once
    pub fn finish(&mut self) {
        assert_eq!(
            self.build_state,
            BuildState::NotStarted,
            "a server can only be finished once"
        );

        let sorted_plugins = self.sort_plugins_by_dependencies();

        self.build_state = BuildState::Building;
        for entry in sorted_plugins {
            entry.plugin.build(self);
            self.built_plugins.push(entry);
        }

        // ready() takes &mut Server, so the list is detached while it runs.
        // Plugins added during ready() are built immediately and appended.
        let built = core::mem::take(&mut self.built_plugins);
        for entry in &built {
            entry.plugin.ready(self);
        }
        let added_during_ready = core::mem::replace(&mut self.built_plugins, built);
        self.built_plugins.extend(added_during_ready);

        self.build_state = BuildState::Built;
    }

    /// Cleans up all plugins in reverse dependency order.
    pub fn cleanup(&mut self) {
        let built = core::mem::take(&mut self.built_plugins);
        for entry in built.iter().rev() {
            entry.plugin.cleanup(self);
        }
        self.built_plugins = built;
    }

    /// Orders pending plugins so every plugin follows its dependencies.
    ///
    /// Roots keep their insertion order. A dependency that was already built
    /// (added during an earlier build) counts as satisfied.
    ///
    /// # Panics
    ///
    /// - If a dependency was never added
    /// - If the dependencies form a cycle
    fn sort_plugins_by_dependencies(&mut self) -> Vec<PluginEntry> {
        let pending = core::mem::take(&mut self.pending_plugins);

        let position: HashMap<PluginId, usize> = pending
            .iter()
            .enumerate()
            .rev()
            .map(|(index, entry)| (entry.id, index))
            .collect();

        let mut waiting_on = vec![0_usize; pending.len()];
        let mut unlocks: Vec<Vec<usize>> = vec![Vec::new(); pending.len()];
        for (index, entry) in pending.iter().enumerate() {
            for dependency in entry.plugin.dependencies() {
                match position.get(&dependency) {
                    Some(&provider) => {
                        unlocks[provider].push(index);
                        waiting_on[index] += 1;
                    }
                    None => assert!(
                        self.built_plugins.iter().any(|built| built.id == dependency),
                        "plugin `{}` depends on `{}`, which was never added",
                        entry.name,
                        dependency.type_name(),
                    ),
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..pending.len())
            .filter(|&index| waiting_on[index] == 0)
            .collect();
        let mut order = Vec::with_capacity(pending.len());
        while let Some(index) = ready.pop_front() {
            order.push(index);
            for &next in &unlocks[index] {
                waiting_on[next] -= 1;
                if waiting_on[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() < pending.len() {
            let stuck: Vec<&str> = pending
                .iter()
                .zip(&waiting_on)
                .filter(|(_, count)| **count > 0)
                .map(|(entry, _)| entry.name.as_str())
                .collect();
            panic!("plugins depend on each other in a cycle: {stuck:?}");
        }

        let mut slots: Vec<Option<PluginEntry>> = pending.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}
