//! Lifecycle hooks.
//!
//! # Role
//!
//! Ordered callback lists around the four registry boundaries (register, unregister, populate,
//! reset). Hooks are fixed when the registry is built.
//!
//! # Semantics
//!
//! - Hooks of one stage run in the order they were added.
//! - The first failing hook stops the stage and its error becomes the operation's error.
//! - Pre-stage failures abort the operation before anything is mutated.
//! - Post-stage hooks observe committed state; their failures propagate but nothing is rolled
//!   back.
//! - Hooks run while the registry's write gate is held by the calling thread and may re-enter
//!   the registry from that thread.

use std::fmt;
use std::sync::Arc;

/// Callback for an item boundary, receiving the owning registry and the item.
pub type ItemHook<R, T, E> = Box<dyn Fn(&R, &Arc<T>) -> Result<(), E> + Send + Sync>;

/// Callback for a populate or reset boundary, receiving the owning registry.
pub type LifecycleHook<R, E> = Box<dyn Fn(&R) -> Result<(), E> + Send + Sync>;

/// Item boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemStage {
	/// Before an item is validated and indexed. May abort.
	Registering,
	/// After an item is indexed.
	Registered,
	/// Before an item is removed. May abort.
	Unregistering,
	/// After an item is removed.
	Unregistered,
}

/// Registry-wide boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleStage {
	/// Before default items are loaded. May abort population.
	Populating,
	/// After all default items are registered.
	Populated,
	/// Before a ready registry is cleared. May abort the reset.
	Resetting,
	/// After the registry is cleared.
	Reset,
}

impl fmt::Display for ItemStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Registering => write!(f, "registering"),
			Self::Registered => write!(f, "registered"),
			Self::Unregistering => write!(f, "unregistering"),
			Self::Unregistered => write!(f, "unregistered"),
		}
	}
}

impl fmt::Display for LifecycleStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Populating => write!(f, "populating"),
			Self::Populated => write!(f, "populated"),
			Self::Resetting => write!(f, "resetting"),
			Self::Reset => write!(f, "reset"),
		}
	}
}

/// Per-stage hook lists for an owner of type `R`.
pub struct HookDispatcher<R, T: ?Sized, E> {
	item: [Vec<ItemHook<R, T, E>>; 4],
	lifecycle: [Vec<LifecycleHook<R, E>>; 4],
}

impl<R, T: ?Sized, E> Default for HookDispatcher<R, T, E> {
	fn default() -> Self {
		Self {
			item: std::array::from_fn(|_| Vec::new()),
			lifecycle: std::array::from_fn(|_| Vec::new()),
		}
	}
}

impl<R, T: ?Sized, E> fmt::Debug for HookDispatcher<R, T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookDispatcher")
			.field("item", &self.item.each_ref().map(Vec::len))
			.field("lifecycle", &self.lifecycle.each_ref().map(Vec::len))
			.finish()
	}
}

impl<R, T: ?Sized, E: fmt::Display> HookDispatcher<R, T, E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a hook to an item stage.
	pub fn push_item(&mut self, stage: ItemStage, hook: ItemHook<R, T, E>) {
		self.item[stage as usize].push(hook);
	}

	/// Appends a hook to a lifecycle stage.
	pub fn push_lifecycle(&mut self, stage: LifecycleStage, hook: LifecycleHook<R, E>) {
		self.lifecycle[stage as usize].push(hook);
	}

	/// Number of hooks attached to an item stage.
	pub fn item_hooks(&self, stage: ItemStage) -> usize {
		self.item[stage as usize].len()
	}

	/// Number of hooks attached to a lifecycle stage.
	pub fn lifecycle_hooks(&self, stage: LifecycleStage) -> usize {
		self.lifecycle[stage as usize].len()
	}

	/// Runs every hook of an item stage, stopping at the first failure.
	pub fn fire_item(&self, stage: ItemStage, owner: &R, item: &Arc<T>) -> Result<(), E> {
		for hook in &self.item[stage as usize] {
			if let Err(err) = hook(owner, item) {
				tracing::debug!(%stage, error = %err, "item hook failed");
				return Err(err);
			}
		}
		Ok(())
	}

	/// Runs every hook of a lifecycle stage, stopping at the first failure.
	pub fn fire(&self, stage: LifecycleStage, owner: &R) -> Result<(), E> {
		for hook in &self.lifecycle[stage as usize] {
			if let Err(err) = hook(owner) {
				tracing::debug!(%stage, error = %err, "lifecycle hook failed");
				return Err(err);
			}
		}
		Ok(())
	}
}
