use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde_json::Value;
use tracing::info;

use crate::capability::{self, CapabilityKeeper, Implementation};
use crate::config::EngineConfig;
use crate::construct::{Class, ClassId, ClassKeeper, Instance, ThingGenerator};
use crate::dispatch::{Call, Kwargs};
use crate::error::Result;
use crate::linearize::Linearizer;

// ------------- Engine -------------
// This sets up the engine with the necessary structures. Setup (declare and
// register) takes write locks; linearization and dispatch only ever read,
// and no lock is held while an implementation runs, so implementations are
// free to call back into the engine.
pub struct Engine<A = Kwargs, R = Value> {
    config: EngineConfig,
    root: ClassId,
    // owns a thing generator for instances
    thing_generator: ThingGenerator,
    // owns keepers for classes and capabilities
    class_keeper: RwLock<ClassKeeper>,
    capability_keeper: RwLock<CapabilityKeeper<A, R>>,
    // memoized precedence sequences
    linearizer: Linearizer,
}

impl<A, R> Engine<A, R> {
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let class_keeper = ClassKeeper::new(&config.root_name)?;
        let root = class_keeper.root();
        info!(root = %config.root_name, validate_on_declare = config.validate_on_declare, "engine created");
        Ok(Self {
            config,
            root,
            thing_generator: ThingGenerator::new(),
            class_keeper: RwLock::new(class_keeper),
            capability_keeper: RwLock::new(CapabilityKeeper::new()),
            linearizer: Linearizer::new(),
        })
    }
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
    /// The common ancestor of every class.
    pub fn root(&self) -> ClassId {
        self.root
    }
    pub(crate) fn capability_keeper(&self) -> Result<RwLockReadGuard<'_, CapabilityKeeper<A, R>>> {
        Ok(self.capability_keeper.read()?)
    }

    // ---- hierarchy ----

    /// Declares a class with the given parents, in precedence order. A class
    /// without parents becomes a direct child of the root. A failed
    /// declaration leaves the hierarchy unchanged.
    pub fn declare(&self, name: &str, parents: &[&str]) -> Result<ClassId> {
        let mut keeper = self.class_keeper.write()?;
        let class = keeper.prepare(name, parents)?;
        if self.config.validate_on_declare {
            self.linearizer.linearize(&keeper, &class)?;
        }
        Ok(keeper.keep(class)?.id())
    }
    pub fn class(&self, id: ClassId) -> Result<Arc<Class>> {
        self.class_keeper.read()?.get(id)
    }
    /// Direct parents of `id` in declaration order; empty only for the root.
    pub fn parents(&self, id: ClassId) -> Result<Vec<ClassId>> {
        Ok(self.class_keeper.read()?.get(id)?.parents().to_vec())
    }
    pub fn find(&self, name: &str) -> Result<ClassId> {
        self.class_keeper.read()?.find(name)
    }
    pub fn is_subclass(&self, class: ClassId, ancestor: ClassId) -> Result<bool> {
        self.class_keeper.read()?.is_subclass(class, ancestor)
    }
    /// Number of declared classes, the root included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.class_keeper.read()?.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.class_keeper.read()?.is_empty())
    }

    // ---- linearization ----

    /// The precedence sequence of `class`: the class itself first, every
    /// ancestor exactly once, and the root last.
    pub fn precedence_of(&self, class: ClassId) -> Result<Arc<[ClassId]>> {
        let keeper = self.class_keeper.read()?;
        self.linearizer.precedence_of(&keeper, class)
    }
    pub fn precedence_names(&self, class: ClassId) -> Result<Vec<String>> {
        let sequence = self.precedence_of(class)?;
        let keeper = self.class_keeper.read()?;
        sequence
            .iter()
            .map(|&id| keeper.name(id).map(str::to_owned))
            .collect()
    }

    // ---- capabilities ----

    pub fn register<F>(&self, class: ClassId, capability: &str, f: F) -> Result<()>
    where
        F: Fn(&Call<'_, A, R>, A) -> Result<R> + Send + Sync + 'static,
    {
        self.register_implementation(class, capability, capability::implementation(f))
    }
    pub fn register_implementation(
        &self,
        class: ClassId,
        capability: &str,
        implementation: Implementation<A, R>,
    ) -> Result<()> {
        let class = self.class(class)?;
        self.capability_keeper
            .write()?
            .register(&class, capability, implementation)
    }
    /// Registers an implementation that absorbs the call instead of
    /// forwarding it, ending every chain that reaches `class`.
    pub fn register_terminal<F>(&self, class: ClassId, capability: &str, f: F) -> Result<()>
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.register_implementation(class, capability, capability::terminal(f))
    }
    /// Explicitly replaces (or adds) an implementation. Returns true if one
    /// was replaced.
    pub fn replace<F>(&self, class: ClassId, capability: &str, f: F) -> Result<bool>
    where
        F: Fn(&Call<'_, A, R>, A) -> Result<R> + Send + Sync + 'static,
    {
        let class = self.class(class)?;
        self.capability_keeper
            .write()?
            .replace(&class, capability, capability::implementation(f))
    }
    pub fn lookup(&self, class: ClassId, capability: &str) -> Result<Option<Implementation<A, R>>> {
        Ok(self.capability_keeper.read()?.lookup(class, capability))
    }
    pub fn capabilities(&self, class: ClassId) -> Result<Vec<String>> {
        Ok(self.capability_keeper.read()?.capabilities(class))
    }

    // ---- instances ----

    pub fn instantiate(&self, class: ClassId) -> Result<Instance> {
        self.class(class)?;
        Ok(Instance::new(self.thing_generator.generate(), class))
    }
    pub fn instantiate_named(&self, name: &str) -> Result<Instance> {
        let class = self.find(name)?;
        self.instantiate(class)
    }
}

impl<A, R> std::fmt::Debug for Engine<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("instances", &self.thing_generator.current())
            .finish_non_exhaustive()
    }
}

