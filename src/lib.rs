//! Succession – multiple-inheritance linearization and cooperative dispatch.
//!
//! Succession centers on the *precedence sequence*: given classes declared
//! with ordered lists of direct parents, every class gets a single
//! deterministic order over itself and its ancestors, computed with the C3
//! merge. Calls are then dispatched along that order:
//! * A [`construct::Class`] is an immutable declaration, identified by a [`construct::ClassId`].
//! * A capability is a named operation a class may implement.
//! * An [`construct::Instance`] is an opaque identity together with its dynamic class.
//! * A [`dispatch::DispatchCursor`] marks the class currently executing within
//!   the precedence sequence of an instance's dynamic class.
//!
//! ## Modules
//! * [`construct`] – Classes, instances and the keeper that owns the hierarchy.
//! * [`linearize`] – The C3 merge and the memoizing [`linearize::Linearizer`].
//! * [`capability`] – The per-class registry of capability implementations.
//! * [`dispatch`] – Cursors, the [`dispatch::Call`] context and the chain walk.
//! * [`engine`] – The [`engine::Engine`] tying the pieces together.
//! * [`config`] – [`config::EngineConfig`], read from defaults, a file and the environment.
//!
//! ## Cooperative chains
//! [`engine::Engine::invoke`] runs the first implementation found in the
//! precedence sequence of the instance's class. An implementation continues
//! the chain with [`dispatch::Call::next`], which resolves against the
//! *dynamic* class's sequence, so which implementation runs next depends on
//! how the subclass was composed. A chain that runs past the last
//! implementation without being absorbed by a terminal class is reported as
//! [`SuccessionError::UnterminatedChain`]. A class that never calls `next`
//! ends the chain silently; this is not detected.
//!
//! ## Quick Start
//! ```
//! use serde_json::{json, Value};
//! use succession::dispatch::Kwargs;
//! use succession::engine::Engine;
//!
//! let engine: Engine = Engine::new().unwrap();
//! engine.declare("A", &[]).unwrap();
//! engine.declare("B", &["A"]).unwrap();
//! engine.declare("C", &["A"]).unwrap();
//! let d = engine.declare("D", &["B", "C"]).unwrap();
//! assert_eq!(engine.precedence_names(d).unwrap(), ["D", "B", "C", "A", "object"]);
//!
//! for name in ["D", "B", "C"] {
//!     let class = engine.find(name).unwrap();
//!     engine
//!         .register(class, "describe", move |call, args: Kwargs| {
//!             let rest = call.next(args)?;
//!             Ok(json!(format!("{name}>{}", rest.as_str().unwrap_or_default())))
//!         })
//!         .unwrap();
//! }
//! engine
//!     .register_terminal(engine.root(), "describe", |_args: Kwargs| Value::from("root"))
//!     .unwrap();
//!
//! let instance = engine.instantiate(d).unwrap();
//! let described = engine.invoke(&instance, "describe", Kwargs::new()).unwrap();
//! assert_eq!(described, json!("D>B>C>root"));
//! ```
//!
//! ## Status
//! Classes are immutable once declared and cannot be removed. Argument
//! shapes are a contract between cooperating implementations; the engine
//! never inspects the forwarded payload.

pub mod capability;
pub mod config;
pub mod construct;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod linearize;

pub use error::{Result, SuccessionError};
