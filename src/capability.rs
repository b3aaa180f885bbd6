//! Per-class registry of capability implementations.
//!
//! An implementation is bound to the class it was registered on, never to the
//! dynamic class of the instance it ends up serving. Capability names are
//! arbitrary strings, matched exactly. Registration happens during setup;
//! lookups are plain map accesses without any traversal.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::construct::{Class, ClassId, OtherHasher, ThingHasher};
use crate::dispatch::Call;
use crate::error::{Result, SuccessionError};

/// A capability implementation. It receives the [`Call`] it is servicing,
/// through which it may continue the chain, and the forwarded arguments.
pub type Implementation<A, R> = Arc<dyn Fn(&Call<'_, A, R>, A) -> Result<R> + Send + Sync>;

/// Wraps a closure as an [`Implementation`].
pub fn implementation<A, R, F>(f: F) -> Implementation<A, R>
where
    F: Fn(&Call<'_, A, R>, A) -> Result<R> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a chain-terminating [`Implementation`], one that
/// absorbs the call and never forwards it.
pub fn terminal<A: 'static, R: 'static, F>(f: F) -> Implementation<A, R>
where
    F: Fn(A) -> R + Send + Sync + 'static,
{
    implementation(move |_call: &Call<'_, A, R>, args: A| Ok(f(args)))
}

pub struct CapabilityKeeper<A, R> {
    kept: HashMap<ClassId, HashMap<String, Implementation<A, R>, OtherHasher>, ThingHasher>,
}

impl<A, R> CapabilityKeeper<A, R> {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
        }
    }
    /// Registers `capability` on `class`. A second registration of the same
    /// name on the same class is refused; use [`CapabilityKeeper::replace`].
    pub fn register(
        &mut self,
        class: &Class,
        capability: &str,
        implementation: Implementation<A, R>,
    ) -> Result<()> {
        let table = self.kept.entry(class.id()).or_default();
        if table.contains_key(capability) {
            return Err(SuccessionError::DuplicateCapability {
                class: class.name().to_owned(),
                capability: capability.to_owned(),
            });
        }
        debug!(class = %class.name(), capability, "capability registered");
        table.insert(capability.to_owned(), implementation);
        Ok(())
    }
    /// Registers `capability` on `class`, returning true if it replaced an
    /// earlier implementation.
    pub fn replace(
        &mut self,
        class: &Class,
        capability: &str,
        implementation: Implementation<A, R>,
    ) -> Result<bool> {
        let replaced = self
            .kept
            .entry(class.id())
            .or_default()
            .insert(capability.to_owned(), implementation)
            .is_some();
        debug!(class = %class.name(), capability, replaced, "capability replaced");
        Ok(replaced)
    }
    pub fn lookup(&self, class: ClassId, capability: &str) -> Option<Implementation<A, R>> {
        self.kept
            .get(&class)
            .and_then(|table| table.get(capability))
            .map(Arc::clone)
    }
    pub fn provides(&self, class: ClassId, capability: &str) -> bool {
        self.kept
            .get(&class)
            .is_some_and(|table| table.contains_key(capability))
    }
    /// Names of the capabilities registered directly on `class`, sorted.
    pub fn capabilities(&self, class: ClassId) -> Vec<String> {
        let mut names: Vec<String> = self
            .kept
            .get(&class)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
    pub fn len(&self) -> usize {
        self.kept.values().map(HashMap::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A, R> Default for CapabilityKeeper<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::ClassKeeper;
    use serde_json::{Value, json};

    #[test]
    fn keeper_counts_registrations_across_classes() {
        let mut classes = ClassKeeper::new("object").unwrap();
        let a = classes.declare("A", &[]).unwrap();
        let root = classes.get(classes.root()).unwrap();
        let mut keeper = CapabilityKeeper::<Value, Value>::new();
        assert!(keeper.is_empty());
        keeper.register(&a, "f", terminal(|_: Value| json!(1))).unwrap();
        keeper.register(&root, "f", terminal(|_: Value| json!(0))).unwrap();
        keeper.register(&a, "g", terminal(|_: Value| json!(2))).unwrap();
        assert_eq!(keeper.len(), 3);
        // replacing keeps the count, a fresh name adds to it
        assert!(keeper.replace(&a, "f", terminal(|_: Value| json!(3))).unwrap());
        assert!(!keeper.replace(&root, "h", terminal(|_: Value| json!(4))).unwrap());
        assert_eq!(keeper.len(), 4);
        assert!(!keeper.is_empty());
        assert!(keeper.provides(a.id(), "g"));
        assert!(!keeper.provides(root.id(), "g"));
        assert_eq!(keeper.capabilities(a.id()), ["f", "g"]);
    }
}
