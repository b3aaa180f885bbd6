//! C3 linearization of the class graph.
//!
//! The precedence sequence of a class `C` with parents `P1..Pn` is
//! `[C] ++ merge(seq(P1), .., seq(Pn), [P1, .., Pn])`. Sequences are a pure
//! function of the (immutable) graph below a class, so they are memoized per
//! class id for the lifetime of the [`Linearizer`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::construct::{Class, ClassId, ClassKeeper, ThingHasher};
use crate::error::{Result, SuccessionError};

/// Merges the input sequences into one order.
///
/// Each round takes the first head, scanning inputs left to right, that does
/// not occur in the tail of any input. When every remaining head is blocked
/// the distinct blocked heads are returned as the error.
pub fn merge(sequences: &[&[ClassId]]) -> std::result::Result<Vec<ClassId>, Vec<ClassId>> {
    let mut starts = vec![0usize; sequences.len()];
    // how often each class occurs behind the current head of some input
    let mut in_tails = HashMap::<ClassId, usize, ThingHasher>::default();
    for sequence in sequences {
        for &class in sequence.iter().skip(1) {
            *in_tails.entry(class).or_default() += 1;
        }
    }
    let mut merged = Vec::new();
    loop {
        let live: Vec<usize> = (0..sequences.len())
            .filter(|&i| starts[i] < sequences[i].len())
            .collect();
        if live.is_empty() {
            return Ok(merged);
        }
        let selected = live
            .iter()
            .map(|&i| sequences[i][starts[i]])
            .find(|head| in_tails.get(head).is_none_or(|&count| count == 0));
        match selected {
            Some(head) => {
                merged.push(head);
                for &i in &live {
                    if sequences[i][starts[i]] == head {
                        starts[i] += 1;
                        // the next element leaves the tail and becomes the head
                        if let Some(count) =
                            sequences[i].get(starts[i]).and_then(|next| in_tails.get_mut(next))
                        {
                            *count -= 1;
                        }
                    }
                }
            }
            None => {
                let mut blocked = Vec::new();
                for &i in &live {
                    let head = sequences[i][starts[i]];
                    if !blocked.contains(&head) {
                        blocked.push(head);
                    }
                }
                return Err(blocked);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Linearizer {
    cache: RwLock<HashMap<ClassId, Arc<[ClassId]>, ThingHasher>>,
}

impl Linearizer {
    pub fn new() -> Self {
        Self::default()
    }
    /// Returns the cached precedence sequence of `id`, computing it first if needed.
    ///
    /// Concurrent first-time callers may compute the same sequence more than
    /// once; the results are identical and only the first one is kept.
    pub fn precedence_of(&self, keeper: &ClassKeeper, id: ClassId) -> Result<Arc<[ClassId]>> {
        if let Some(sequence) = self.cache.read()?.get(&id) {
            return Ok(Arc::clone(sequence));
        }
        let class = keeper.get(id)?;
        // A parent is always kept before its children and so has a smaller
        // id. Filling the cache in ascending id order means every parent
        // sequence is already cached when a class is linearized, which keeps
        // the depth of the hierarchy off the call stack.
        let mut ancestors = self.uncached_ancestors(keeper, &class)?;
        ancestors.sort_unstable();
        for ancestor in ancestors {
            let ancestor: Arc<Class> = keeper.get(ancestor)?;
            self.compute(keeper, &ancestor)?;
        }
        self.compute(keeper, &class)
    }
    fn uncached_ancestors(&self, keeper: &ClassKeeper, class: &Class) -> Result<Vec<ClassId>> {
        let cache = self.cache.read()?;
        let mut pending = class.parents().to_vec();
        let mut visited = HashSet::<ClassId, ThingHasher>::default();
        let mut uncached = Vec::new();
        while let Some(current) = pending.pop() {
            // the ancestors of a cached class are cached as well
            if !visited.insert(current) || cache.contains_key(&current) {
                continue;
            }
            uncached.push(current);
            pending.extend_from_slice(keeper.get(current)?.parents());
        }
        Ok(uncached)
    }
    fn compute(&self, keeper: &ClassKeeper, class: &Class) -> Result<Arc<[ClassId]>> {
        let computed = self.linearize(keeper, class)?;
        let mut cache = self.cache.write()?;
        let kept = cache.entry(class.id()).or_insert_with(|| {
            debug!(class = %class.name(), length = computed.len(), "precedence sequence cached");
            computed
        });
        Ok(Arc::clone(kept))
    }
    /// Computes the sequence of a class without caching the class itself.
    /// The class does not have to be kept yet, which lets a declaration be
    /// validated before it touches the graph. Its parents are cached as usual.
    pub fn linearize(&self, keeper: &ClassKeeper, class: &Class) -> Result<Arc<[ClassId]>> {
        let parent_sequences = class
            .parents()
            .iter()
            .map(|&parent| self.precedence_of(keeper, parent))
            .collect::<Result<Vec<_>>>()?;
        let mut inputs: Vec<&[ClassId]> = parent_sequences.iter().map(|s| &s[..]).collect();
        inputs.push(class.parents());
        match merge(&inputs) {
            Ok(tail) => {
                let mut sequence = Vec::with_capacity(tail.len() + 1);
                sequence.push(class.id());
                sequence.extend(tail);
                Ok(sequence.into())
            }
            Err(blocked) => {
                let blocked = blocked
                    .into_iter()
                    .map(|id| keeper.name(id).map(str::to_owned))
                    .collect::<Result<Vec<_>>>()?;
                warn!(class = %class.name(), blocked = ?blocked, "inconsistent hierarchy");
                Err(SuccessionError::InconsistentHierarchy {
                    class: class.name().to_owned(),
                    blocked,
                })
            }
        }
    }
    pub fn is_cached(&self, id: ClassId) -> Result<bool> {
        Ok(self.cache.read()?.contains_key(&id))
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.cache.read()?.len())
    }
}
