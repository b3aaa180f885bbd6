//! Cooperative dispatch along a precedence sequence.
//!
//! A chain starts with [`Engine::invoke`], which runs the first implementation
//! found in the precedence sequence of the instance's *dynamic* class. Each
//! implementation may hand the call on with [`Call::next`], which resumes the
//! scan strictly after the class currently executing. Because the scan always
//! runs over the dynamic class's sequence, the implementation that services a
//! delegated call depends on how the subclass was composed, not on the
//! declaring class's own parents.
//!
//! Usage contract: capability names match exactly and the engine never looks
//! inside the forwarded arguments. Cooperating implementations agree on a
//! forwarding convention; with the default [`Kwargs`] payload each class takes
//! the keys it understands and forwards the rest. A class that never calls
//! `next` silently ends the chain at that point.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::capability::{CapabilityKeeper, Implementation};
use crate::construct::{ClassId, Instance};
use crate::engine::Engine;
use crate::error::{Result, SuccessionError};

/// Keyword arguments, progressively consumed as they travel down a chain.
pub type Kwargs = serde_json::Map<String, serde_json::Value>;

// ------------- DispatchCursor -------------
/// The class currently executing, as a position within the precedence
/// sequence of a dynamic class. Cursors are never mutated; advancing one
/// produces a new cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchCursor {
    sequence: Arc<[ClassId]>,
    index: usize,
}

impl DispatchCursor {
    pub(crate) fn new(sequence: Arc<[ClassId]>, index: usize) -> Self {
        Self { sequence, index }
    }
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn sequence(&self) -> &[ClassId] {
        &self.sequence
    }
    /// The class whose implementation is executing.
    pub fn class(&self) -> ClassId {
        self.sequence[self.index]
    }
    /// The class the chain was started for.
    pub fn dynamic_class(&self) -> ClassId {
        self.sequence[0]
    }
    fn advance_to(&self, index: usize) -> Self {
        Self {
            sequence: Arc::clone(&self.sequence),
            index,
        }
    }
}

/// Finds the first class at or after `from` in `sequence` that provides
/// `capability`, with its position and implementation.
pub(crate) fn resolve<A, R>(
    keeper: &CapabilityKeeper<A, R>,
    sequence: &[ClassId],
    from: usize,
    capability: &str,
) -> Option<(usize, Implementation<A, R>)> {
    sequence
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(index, &class)| keeper.lookup(class, capability).map(|found| (index, found)))
}

// ------------- Call -------------
/// The context an implementation runs in: which instance it serves, where in
/// the chain it sits, and which capability is being dispatched.
pub struct Call<'a, A, R> {
    engine: &'a Engine<A, R>,
    instance: Instance,
    cursor: DispatchCursor,
    capability: &'a str,
}

impl<'a, A, R> Call<'a, A, R> {
    pub(crate) fn new(
        engine: &'a Engine<A, R>,
        instance: Instance,
        cursor: DispatchCursor,
        capability: &'a str,
    ) -> Self {
        Self {
            engine,
            instance,
            cursor,
            capability,
        }
    }
    pub fn engine(&self) -> &'a Engine<A, R> {
        self.engine
    }
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
    pub fn cursor(&self) -> &DispatchCursor {
        &self.cursor
    }
    pub fn class(&self) -> ClassId {
        self.cursor.class()
    }
    pub fn capability(&self) -> &str {
        self.capability
    }
    /// True when some class further along the sequence provides this capability.
    pub fn has_next(&self) -> Result<bool> {
        self.engine.has_next(&self.cursor, self.capability)
    }
    /// Hands the call on to the next implementation in the sequence.
    /// Running past the end fails with [`SuccessionError::UnterminatedChain`].
    pub fn next(&self, args: A) -> Result<R> {
        self.engine
            .next(&self.instance, &self.cursor, self.capability, args)
    }
    /// Like [`Call::next`], but continues the chain under another capability name.
    pub fn next_as(&self, capability: &str, args: A) -> Result<R> {
        self.engine.next(&self.instance, &self.cursor, capability, args)
    }
    /// Like [`Call::next`], but an exhausted chain yields `Ok(None)`.
    pub fn try_next(&self, args: A) -> Result<Option<R>> {
        self.engine
            .try_next(&self.instance, &self.cursor, self.capability, args)
    }
}

impl<A, R> Engine<A, R> {
    /// Starts a chain for `capability` on `instance`.
    pub fn invoke(&self, instance: &Instance, capability: &str, args: A) -> Result<R> {
        let sequence = self.precedence_of(instance.class())?;
        let found = resolve(&*self.capability_keeper()?, &sequence, 0, capability);
        let Some((index, implementation)) = found else {
            warn!(instance = %instance, capability, "no implementation");
            return Err(SuccessionError::NoImplementation(capability.to_owned()));
        };
        let cursor = DispatchCursor::new(sequence, index);
        trace!(instance = %instance, capability, class = %cursor.class(), index, "invoke");
        implementation(&Call::new(self, *instance, cursor, capability), args)
    }
    /// Continues a chain past `cursor`, reporting an unabsorbed chain as an error.
    pub fn next(
        &self,
        instance: &Instance,
        cursor: &DispatchCursor,
        capability: &str,
        args: A,
    ) -> Result<R> {
        match self.try_next(instance, cursor, capability, args)? {
            Some(result) => Ok(result),
            None => {
                let from = self.class(cursor.class())?.name().to_owned();
                warn!(instance = %instance, capability, from = %from, "unterminated chain");
                Err(SuccessionError::UnterminatedChain {
                    capability: capability.to_owned(),
                    from,
                })
            }
        }
    }
    /// Continues a chain past `cursor`. `Ok(None)` means the chain is exhausted.
    pub fn try_next(
        &self,
        instance: &Instance,
        cursor: &DispatchCursor,
        capability: &str,
        args: A,
    ) -> Result<Option<R>> {
        let found = resolve(
            &*self.capability_keeper()?,
            cursor.sequence(),
            cursor.index() + 1,
            capability,
        );
        let Some((index, implementation)) = found else {
            trace!(instance = %instance, capability, from = %cursor.class(), "chain exhausted");
            return Ok(None);
        };
        let cursor = cursor.advance_to(index);
        trace!(instance = %instance, capability, class = %cursor.class(), index, "next");
        implementation(&Call::new(self, *instance, cursor, capability), args).map(Some)
    }
    pub fn has_next(&self, cursor: &DispatchCursor, capability: &str) -> Result<bool> {
        let keeper = self.capability_keeper()?;
        Ok(cursor.sequence()[cursor.index() + 1..]
            .iter()
            .any(|&class| keeper.provides(class, capability)))
    }
    /// The classes that would service a chain for `capability` started on an
    /// instance of `class`, in the order they would run.
    pub fn chain(&self, class: ClassId, capability: &str) -> Result<Vec<ClassId>> {
        let sequence = self.precedence_of(class)?;
        let keeper = self.capability_keeper()?;
        Ok(sequence
            .iter()
            .copied()
            .filter(|&candidate| keeper.provides(candidate, capability))
            .collect())
    }
}
