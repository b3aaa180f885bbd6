use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// used to keep the one-to-one mapping between class names and their assigned ids
use bimap::BiMap;

// maps keyed by class ids or names use a fast non-cryptographic hasher
use core::hash::BuildHasherDefault;
use std::collections::HashSet;
use seahash::SeaHasher;

// names are validated once, the pattern is compiled once
use lazy_static::lazy_static;
use regex::Regex;

// used to print out readable forms of a construct
use std::fmt;

use tracing::debug;

use crate::error::{Result, SuccessionError};

// ------------- Thing -------------
pub type Thing = u64;

pub type ThingHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: Thing = 0;

lazy_static! {
    static ref NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

/// Checks that a class name is an identifier, optionally a `::` path.
pub fn valid_name(name: &str) -> Result<()> {
    if NAME.is_match(name) {
        Ok(())
    } else {
        Err(SuccessionError::InvalidName(name.to_owned()))
    }
}

// Instances are only ever implicitly created, so a monotonic counter suffices.
#[derive(Debug)]
pub struct ThingGenerator {
    lower_bound: AtomicU64,
}

impl ThingGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: AtomicU64::new(GENESIS),
        }
    }
    pub fn generate(&self) -> Thing {
        self.lower_bound.fetch_add(1, Ordering::Relaxed) + 1
    }
    pub fn current(&self) -> Thing {
        self.lower_bound.load(Ordering::Relaxed)
    }
}

impl Default for ThingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- ClassId -------------
/// Handle of a declared class, an index into the [`ClassKeeper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ------------- Class -------------
#[derive(Debug, PartialEq, Eq)]
pub struct Class {
    id: ClassId,
    name: String,
    parents: Vec<ClassId>, // declaration order is significant
}

impl Class {
    // Fields are only exposed through getters, which keeps a class
    // immutable once it has been declared.
    pub fn id(&self) -> ClassId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn parents(&self) -> &[ClassId] {
        &self.parents
    }
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ------------- Instance -------------
/// A stateless object: an identity together with its dynamic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instance {
    thing: Thing,
    class: ClassId,
}

impl Instance {
    pub fn new(thing: Thing, class: ClassId) -> Self {
        Self { thing, class }
    }
    pub fn thing(&self) -> Thing {
        self.thing
    }
    pub fn class(&self) -> ClassId {
        self.class
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.thing, self.class)
    }
}

// ------------- ClassKeeper -------------
/// Owns every declared class. Classes are never removed or modified, so an
/// id handed out once stays valid for the keeper's lifetime.
#[derive(Debug)]
pub struct ClassKeeper {
    kept: Vec<Arc<Class>>,
    names: BiMap<String, ClassId>,
    root: ClassId,
}

impl ClassKeeper {
    pub fn new(root_name: &str) -> Result<Self> {
        valid_name(root_name)?;
        let root = ClassId(0);
        let mut names = BiMap::new();
        names.insert(root_name.to_owned(), root);
        Ok(Self {
            kept: vec![Arc::new(Class {
                id: root,
                name: root_name.to_owned(),
                parents: Vec::new(),
            })],
            names,
            root,
        })
    }
    pub fn root(&self) -> ClassId {
        self.root
    }
    /// Validates a declaration and builds the class it would create, without
    /// keeping it. The returned class carries the id it will be kept under.
    pub fn prepare(&self, name: &str, parents: &[&str]) -> Result<Class> {
        valid_name(name)?;
        if let Some(own) = parents.iter().find(|p| **p == name) {
            return Err(SuccessionError::Cycle {
                class: name.to_owned(),
                via: (*own).to_owned(),
            });
        }
        if self.names.contains_left(name) {
            return Err(SuccessionError::DuplicateClass(name.to_owned()));
        }
        let mut resolved = Vec::with_capacity(parents.len());
        let mut seen = HashSet::<ClassId, ThingHasher>::default();
        for parent in parents {
            let id = self.find(parent)?;
            if !seen.insert(id) {
                return Err(SuccessionError::DuplicateParent {
                    class: name.to_owned(),
                    parent: (*parent).to_owned(),
                });
            }
            resolved.push(id);
        }
        // anything declared without parents hangs directly below the root
        if resolved.is_empty() {
            resolved.push(self.root);
        }
        Ok(Class {
            id: ClassId(self.kept.len() as u32),
            name: name.to_owned(),
            parents: resolved,
        })
    }
    /// Keeps a class produced by [`ClassKeeper::prepare`] on this keeper.
    pub fn keep(&mut self, class: Class) -> Result<Arc<Class>> {
        if class.id.index() != self.kept.len() {
            return Err(SuccessionError::StaleDeclaration(class.name));
        }
        debug!(class = %class.name, id = %class.id, parents = class.parents.len(), "class declared");
        self.names.insert(class.name.clone(), class.id);
        let kept = Arc::new(class);
        self.kept.push(Arc::clone(&kept));
        Ok(kept)
    }
    pub fn declare(&mut self, name: &str, parents: &[&str]) -> Result<Arc<Class>> {
        let class = self.prepare(name, parents)?;
        self.keep(class)
    }
    pub fn get(&self, id: ClassId) -> Result<Arc<Class>> {
        self.kept
            .get(id.index())
            .map(Arc::clone)
            .ok_or_else(|| SuccessionError::UnknownClass(id.to_string()))
    }
    pub fn find(&self, name: &str) -> Result<ClassId> {
        self.names
            .get_by_left(name)
            .copied()
            .ok_or_else(|| SuccessionError::UnknownClass(name.to_owned()))
    }
    pub fn name(&self, id: ClassId) -> Result<&str> {
        self.names
            .get_by_right(&id)
            .map(String::as_str)
            .ok_or_else(|| SuccessionError::UnknownClass(id.to_string()))
    }
    /// True when `ancestor` is `class` itself or reachable through its parents.
    pub fn is_subclass(&self, class: ClassId, ancestor: ClassId) -> Result<bool> {
        let mut pending = vec![class];
        let mut visited = HashSet::<ClassId, ThingHasher>::default();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return Ok(true);
            }
            if visited.insert(current) {
                pending.extend_from_slice(self.get(current)?.parents());
            }
        }
        Ok(false)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parentless_classes_hang_below_the_root() {
        let mut keeper = ClassKeeper::new("object").unwrap();
        let a = keeper.declare("A", &[]).unwrap();
        assert_eq!(a.parents(), &[keeper.root()]);
        assert!(keeper.get(keeper.root()).unwrap().is_root());
    }

    #[test]
    fn rejected_declarations_leave_the_keeper_unchanged() {
        let mut keeper = ClassKeeper::new("object").unwrap();
        keeper.declare("A", &[]).unwrap();
        let before = keeper.len();
        assert!(matches!(
            keeper.declare("B", &["A", "A"]),
            Err(SuccessionError::DuplicateParent { .. })
        ));
        assert!(matches!(
            keeper.declare("B", &["B"]),
            Err(SuccessionError::Cycle { .. })
        ));
        assert!(matches!(
            keeper.declare("B", &["Missing"]),
            Err(SuccessionError::UnknownClass(_))
        ));
        assert!(matches!(
            keeper.declare("A", &[]),
            Err(SuccessionError::DuplicateClass(_))
        ));
        assert!(matches!(
            keeper.declare("not a name", &[]),
            Err(SuccessionError::InvalidName(_))
        ));
        assert_eq!(keeper.len(), before);
    }

    #[test]
    fn stale_declaration_is_not_kept() {
        let mut keeper = ClassKeeper::new("object").unwrap();
        let a = keeper.prepare("A", &[]).unwrap();
        let b = keeper.prepare("B", &[]).unwrap();
        assert_eq!(a.id(), b.id());
        keeper.keep(a).unwrap();
        let err = keeper.keep(b).unwrap_err();
        assert!(matches!(err, SuccessionError::StaleDeclaration(ref name) if name == "B"));
        assert!(err.to_string().contains("older state"));
        assert_eq!(keeper.len(), 2);
        assert!(!keeper.is_empty());
        assert!(keeper.find("B").is_err());
    }

    #[test]
    fn names_accept_paths() {
        assert!(valid_name("shapes::Circle").is_ok());
        assert!(valid_name("_private").is_ok());
        assert!(valid_name("9lives").is_err());
        assert!(valid_name("a::").is_err());
    }
}
