//! Thread-safe registries of unique, multi-key items.
//!
//! A registry holds items (values or trait objects) that are each identified by one or more
//! lookup attributes, and decouples the code providing implementations from the code looking
//! them up by stable identifiers.
//!
//! # Modules
//!
//! - [`registry`] - [`Registry`], [`OrderedRegistry`] and their builder
//! - [`hooks`] - Lifecycle callbacks around register, unregister, populate and reset
//! - [`source`] - Default items: static lists and discovered entry points
//! - [`error`] - Error kinds and per-registry error bindings
//! - [`value`] - The [`Item`] accessor contract, attribute values and item identity
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use registries::{AttrValue, Item, Query, Registry, RegistryError};
//!
//! #[derive(Debug)]
//! struct Backend {
//! 	id: &'static str,
//! }
//!
//! impl Item for Backend {
//! 	fn attr(&self, name: &str) -> Option<AttrValue> {
//! 		(name == "id").then(|| self.id.into())
//! 	}
//! }
//!
//! let backends = Registry::<Backend>::builder("backends")
//! 	.lookup_attr("id")
//! 	.defaults(|| vec![Arc::new(Backend { id: "memory" })])
//! 	.build()
//! 	.unwrap();
//!
//! backends.register(&Arc::new(Backend { id: "disk" })).unwrap();
//! assert_eq!(backends.len().unwrap(), 2);
//!
//! let err = backends.register(&Arc::new(Backend { id: "disk" })).unwrap_err();
//! assert!(matches!(err, RegistryError::RegistrationConflict { .. }));
//! assert!(backends.get_or_none(Query::value("tape")).unwrap().is_none());
//! ```

pub mod error;
pub mod hooks;
mod index;
pub mod registry;
pub mod source;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use error::{BoxError, BuildError, DefaultErrors, ErrorBindings, ErrorKind, RegistryError};
pub use hooks::{HookDispatcher, ItemStage, LifecycleStage};
pub use registry::{Iter, OrderedRegistry, Query, Registry, RegistryBuilder, RegistryState};
#[cfg(feature = "entry-points")]
pub use source::InventoryDiscovery;
pub use source::{Discover, EntryPoint, EntryPointSource, LoadErrorPolicy, PopulationSource};
pub use value::{AttrValue, Item, ItemId};

#[doc(hidden)]
pub mod __private {
	#[cfg(feature = "entry-points")]
	pub use inventory;
}
