#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Thread-safe item registry.
//!
//! # Purpose
//!
//! [`Registry`] keeps a set of unique items that can be looked up by any of a fixed list of
//! lookup attributes. Default items are loaded lazily, exactly once per population cycle, and
//! lifecycle hooks can observe or veto changes.
//!
//! # Mental Model
//!
//! 1. **Definition:** [`RegistryBuilder`] fixes the lookup attributes, error bindings, default
//!    item source and hooks. Nothing about a definition changes after `build`.
//! 2. **Population:** The first operation on a [`RegistryState::Pending`] registry loads the
//!    default items. With item hooks installed each default goes through
//!    [`Registry::register`]; otherwise they are indexed in one batch and published once.
//! 3. **Use:** Reads load the current [`AttributeIndex`] snapshot; writes publish a new one.
//! 4. **Reset:** [`Registry::reset`] unregisters everything and returns to `Pending`, so the next
//!    operation populates again.
//!
//! # Concurrency
//!
//! - **Snapshots:** the population state and the index are published together as one
//!   [`Snapshot`]. A snapshot is `Ready` only when its index is complete.
//! - **Reads** (`get`, `get_or_none`, `contains`, `len`, `iter`): wait-free loads of a `Ready`
//!   snapshot. Any other state sends the reader to the gate, where it waits for the running
//!   population or reset to finish.
//! - **Writes** (`register`, `unregister`, `unregister_by_attr`, `reset`, population): serialized
//!   on a reentrant gate. Each write validates against the current snapshot, then publishes the
//!   successor atomically, so no reader observes a partial update.
//! - **Reset:** publishes a non-ready snapshot before removing anything, so concurrent readers
//!   see either the full pre-reset contents or the repopulated registry.
//! - **Re-entrancy:** hooks run while the gate is held and may call back into the registry from
//!   the same thread. Other threads block on the gate as usual.
//!
//! # Invariants
//!
//! - Must populate at most once per cycle, even under concurrent first access.
//!   - Enforced in: [`Registry::populate`].
//!   - Tested by: `crate::registry::invariants::test_exactly_once_population`
//!   - Failure symptom: Default source invoked twice, duplicate-default conflicts.
//!
//! - Must not stay `Populating` after a failed or panicking population.
//!   - Enforced in: [`Rollback`].
//!   - Tested by: `crate::registry::invariants::test_failed_population_recovers`
//!   - Failure symptom: Registry permanently empty, or threads observing a half-populated index.
//!
//! - Must never expose a `Ready` snapshot that is mid-population or mid-reset.
//!   - Enforced in: [`Registry::reset`], [`Registry::populate`] (state and index swapped as one).
//!   - Tested by: `crate::registry::invariants::test_linearizable_reads`
//!   - Failure symptom: Lookups of default items miss while another thread resets.
//!
//! - Must leave the index unchanged when a write is rejected.
//!   - Enforced in: [`Registry::register`], [`Registry::unregister`] (check before publish).
//!   - Tested by: `crate::registry::invariants::test_atomic_conflict`
//!   - Failure symptom: Items reachable by some attributes but not others.


mod builder;
mod ordered;

#[cfg(test)]
pub(crate) mod invariants;


use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;

pub use builder::RegistryBuilder;
pub use ordered::OrderedRegistry;

use crate::error::{DefaultErrors, ErrorBindings};
use crate::hooks::{HookDispatcher, ItemStage, LifecycleStage};
use crate::index::{AttributeIndex, Rejection};
use crate::source::PopulationSource;
use crate::value::{AttrValue, Item};

/// Population state of a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryState {
	/// Default items have not been loaded yet.
	Pending,
	/// Default items are being loaded, or a reset is clearing the registry.
	Populating,
	/// The registry is populated and ready for use.
	Ready,
}

/// An attribute/value lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query<'a> {
	attr: Option<&'a str>,
	value: AttrValue,
}

impl<'a> Query<'a> {
	/// Looks up by the registry's only lookup attribute.
	///
	/// Rejected with an unsupported-attribute error on registries with several lookup
	/// attributes.
	pub fn value(value: impl Into<AttrValue>) -> Self {
		Self {
			attr: None,
			value: value.into(),
		}
	}

	/// Looks up by a named lookup attribute.
	pub fn attr(attr: &'a str, value: impl Into<AttrValue>) -> Self {
		Self {
			attr: Some(attr),
			value: value.into(),
		}
	}

	pub fn attr_name(&self) -> Option<&'a str> {
		self.attr
	}

	pub fn attr_value(&self) -> &AttrValue {
		&self.value
	}
}

/// An index together with the population state it was published under.
struct Snapshot<T: ?Sized> {
	state: RegistryState,
	index: Arc<AttributeIndex<T>>,
}

impl<T: ?Sized> Snapshot<T> {
	fn new(state: RegistryState, index: Arc<AttributeIndex<T>>) -> Arc<Self> {
		Arc::new(Self { state, index })
	}
}

/// A registry of unique items indexed by lookup attributes.
pub struct Registry<T, B = DefaultErrors>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	label: &'static str,
	lookup_attrs: Box<[&'static str]>,
	ordered: bool,
	errors: B,
	source: PopulationSource<T>,
	hooks: HookDispatcher<Registry<T, B>, T, B::Error>,
	gate: ReentrantMutex<()>,
	snap: ArcSwap<Snapshot<T>>,
}

impl<T: ?Sized + Item> Registry<T, DefaultErrors> {
	/// Starts a registry definition using the built-in error types.
	pub fn builder(label: &'static str) -> RegistryBuilder<T> {
		RegistryBuilder::new(label)
	}
}

impl<T, B> Registry<T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	pub(crate) fn from_parts(
		label: &'static str,
		lookup_attrs: Box<[&'static str]>,
		ordered: bool,
		errors: B,
		source: PopulationSource<T>,
		hooks: HookDispatcher<Registry<T, B>, T, B::Error>,
	) -> Self {
		let empty = Arc::new(AttributeIndex::new(lookup_attrs.len(), ordered));
		Self {
			label,
			lookup_attrs,
			ordered,
			errors,
			source,
			hooks,
			gate: ReentrantMutex::new(()),
			snap: ArcSwap::new(Snapshot::new(RegistryState::Pending, empty)),
		}
	}

	#[inline]
	pub fn label(&self) -> &'static str {
		self.label
	}

	#[inline]
	pub fn lookup_attrs(&self) -> &[&'static str] {
		&self.lookup_attrs
	}

	/// Returns whether iteration follows registration order.
	#[inline]
	pub fn is_ordered(&self) -> bool {
		self.ordered
	}

	/// Returns the error bindings of this registry.
	#[inline]
	pub fn errors(&self) -> &B {
		&self.errors
	}

	#[inline]
	pub fn state(&self) -> RegistryState {
		self.snap.load().state
	}

	/// Republishes the current index under `state`. Gate must be held.
	fn set_state(&self, state: RegistryState) {
		let index = Arc::clone(&self.snap.load().index);
		self.snap.store(Snapshot::new(state, index));
	}

	/// Publishes `index` under the current state. Gate must be held.
	fn publish(&self, index: AttributeIndex<T>) {
		let state = self.snap.load().state;
		self.snap.store(Snapshot::new(state, Arc::new(index)));
	}

	/// Ensures the default items are loaded.
	///
	/// Has no effect on a ready registry. Concurrent callers block until the populating thread
	/// finishes; the populating thread itself may re-enter freely. On failure every item
	/// registered during the attempt is dropped, the registry returns to
	/// [`RegistryState::Pending`], and the next operation retries.
	pub fn populate(&self) -> Result<(), B::Error> {
		if self.state() == RegistryState::Ready {
			return Ok(());
		}

		let _gate = self.gate.lock();
		if self.state() != RegistryState::Pending {
			// Populated while we waited, or re-entered by the populating or resetting thread.
			return Ok(());
		}

		let rollback = Rollback::new(
			self,
			Snapshot::new(RegistryState::Pending, Arc::new(self.empty_index())),
		);
		self.set_state(RegistryState::Populating);
		tracing::debug!(registry = self.label, "populating registry");

		match self.load_defaults() {
			Ok(count) => {
				rollback.disarm();
				self.set_state(RegistryState::Ready);
				tracing::debug!(registry = self.label, count, "registry populated");
				self.hooks.fire(LifecycleStage::Populated, self)
			}
			Err(err) => {
				drop(rollback);
				tracing::warn!(
					registry = self.label,
					error = %err,
					"population failed; registry rolled back"
				);
				Err(err)
			}
		}
	}

	fn load_defaults(&self) -> Result<usize, B::Error> {
		self.hooks.fire(LifecycleStage::Populating, self)?;
		let defaults = self.source.collect(self.label, &self.errors)?;

		let observed = self.hooks.item_hooks(ItemStage::Registering) > 0
			|| self.hooks.item_hooks(ItemStage::Registered) > 0;
		if observed {
			// Item hooks must see each default land before the next one.
			for item in &defaults {
				self.register(item)?;
			}
		} else {
			let mut next = AttributeIndex::clone(&*self.index());
			for item in &defaults {
				let prepared = next
					.check_insert(item, &self.lookup_attrs)
					.map_err(|rejection| self.reject(item, rejection))?;
				next.apply_insert(prepared);
			}
			self.publish(next);
		}
		Ok(defaults.len())
	}

	/// Registers an item.
	///
	/// Fails if the item lacks a lookup attribute, is already registered, or shares a lookup
	/// value with another item. A failed registration leaves the registry unchanged.
	pub fn register(&self, item: &Arc<T>) -> Result<(), B::Error> {
		let _gate = self.gate.lock();
		self.populate()?;

		if self.snap.load().index.contains(item) {
			return Err(self.errors.already_registered(item));
		}
		self.hooks.fire_item(ItemStage::Registering, self, item)?;

		let current = Arc::clone(&self.snap.load().index);
		let prepared = current
			.check_insert(item, &self.lookup_attrs)
			.map_err(|rejection| self.reject(item, rejection))?;
		let mut next = AttributeIndex::clone(&*current);
		next.apply_insert(prepared);
		self.publish(next);

		tracing::debug!(registry = self.label, ?item, "item registered");
		self.hooks.fire_item(ItemStage::Registered, self, item)
	}

	/// Unregisters an item.
	pub fn unregister(&self, item: &Arc<T>) -> Result<(), B::Error> {
		let _gate = self.gate.lock();
		self.populate()?;
		self.unregister_locked(item)
	}

	/// Unregisters the item matching `query`.
	pub fn unregister_by_attr(&self, query: Query<'_>) -> Result<(), B::Error> {
		let attr = self.resolve(&query)?;
		let _gate = self.gate.lock();
		self.populate()?;

		let item = self
			.snap
			.load()
			.index
			.lookup(attr, &query.value)
			.cloned()
			.ok_or_else(|| {
				self.errors
					.attr_not_found_unregistration(self.lookup_attrs[attr], &query.value)
			})?;
		self.unregister_locked(&item)
	}

	fn unregister_locked(&self, item: &Arc<T>) -> Result<(), B::Error> {
		self.hooks.fire_item(ItemStage::Unregistering, self, item)?;

		let current = Arc::clone(&self.snap.load().index);
		if !current.contains(item) {
			return Err(self.errors.item_not_found_unregistration(item));
		}
		let mut next = AttributeIndex::clone(&*current);
		next.remove(item)
			.map_err(|rejection| self.reject(item, rejection))?;
		self.publish(next);

		tracing::debug!(registry = self.label, ?item, "item unregistered");
		self.hooks.fire_item(ItemStage::Unregistered, self, item)
	}

	/// Returns the item matching `query`.
	pub fn get(&self, query: Query<'_>) -> Result<Arc<T>, B::Error> {
		let attr = self.resolve(&query)?;
		self.read()?
			.lookup(attr, &query.value)
			.cloned()
			.ok_or_else(|| {
				self.errors
					.item_not_found_lookup(self.lookup_attrs[attr], &query.value)
			})
	}

	/// Returns the item matching `query`, or `None` when nothing matches.
	///
	/// Only a miss is turned into `None`; unsupported attributes and population failures are
	/// still errors.
	pub fn get_or_none(&self, query: Query<'_>) -> Result<Option<Arc<T>>, B::Error> {
		let attr = self.resolve(&query)?;
		Ok(self.read()?.lookup(attr, &query.value).cloned())
	}

	/// Returns whether this exact item is registered.
	pub fn contains(&self, item: &Arc<T>) -> Result<bool, B::Error> {
		Ok(self.read()?.contains(item))
	}

	pub fn len(&self) -> Result<usize, B::Error> {
		Ok(self.read()?.len())
	}

	pub fn is_empty(&self) -> Result<bool, B::Error> {
		Ok(self.read()?.is_empty())
	}

	/// Iterates the items registered when this call is made.
	///
	/// Later changes to the registry are not reflected; call `iter` again to restart against the
	/// current state. Ordered registries yield registration order, others an unspecified order.
	pub fn iter(&self) -> Result<Iter<T>, B::Error> {
		Ok(Iter::new(self.read()?))
	}

	/// Unregisters every item and marks the registry unpopulated.
	///
	/// Does nothing unless the registry is ready. Items are removed through the ordinary
	/// unregister path, so unregister hooks fire for each of them. Other threads wait until the
	/// reset is complete and then see a repopulated registry.
	///
	/// If an unregister hook fails or panics, the pre-reset contents are restored and the
	/// registry stays ready; hooks that already ran are not undone. Items registered by hooks
	/// during the reset are discarded with everything else.
	pub fn reset(&self) -> Result<(), B::Error> {
		let _gate = self.gate.lock();
		if self.state() != RegistryState::Ready {
			return Ok(());
		}

		self.hooks.fire(LifecycleStage::Resetting, self)?;
		let before = self.snap.load_full();
		let rollback = Rollback::new(self, Arc::clone(&before));
		self.set_state(RegistryState::Populating);

		let items: Vec<_> = Iter::new(Arc::clone(&before.index)).collect();
		for item in &items {
			if let Err(err) = self.unregister_locked(item) {
				drop(rollback);
				tracing::warn!(
					registry = self.label,
					error = %err,
					"reset failed; registry restored"
				);
				return Err(err);
			}
		}
		rollback.disarm();
		self.snap.store(Snapshot::new(
			RegistryState::Populating,
			Arc::new(self.empty_index()),
		));
		tracing::debug!(registry = self.label, count = items.len(), "registry reset");

		// Pending even when the post-reset hook fails or panics.
		let _pending = Rollback::new(
			self,
			Snapshot::new(RegistryState::Pending, Arc::new(self.empty_index())),
		);
		self.hooks.fire(LifecycleStage::Reset, self)
	}

	/// Current index, without populating.
	pub(crate) fn index(&self) -> Arc<AttributeIndex<T>> {
		Arc::clone(&self.snap.load().index)
	}

	/// Index of a ready registry, populating first if needed.
	///
	/// Only a `Ready` snapshot is read without the gate. Anything else waits for the gate, so a
	/// concurrent population or reset is observed only once it has finished.
	fn read(&self) -> Result<Arc<AttributeIndex<T>>, B::Error> {
		let snap = self.snap.load_full();
		if snap.state == RegistryState::Ready {
			return Ok(Arc::clone(&snap.index));
		}

		let _gate = self.gate.lock();
		self.populate()?;
		Ok(self.index())
	}

	fn empty_index(&self) -> AttributeIndex<T> {
		AttributeIndex::new(self.lookup_attrs.len(), self.ordered)
	}

	fn resolve(&self, query: &Query<'_>) -> Result<usize, B::Error> {
		match query.attr {
			Some(name) => self
				.lookup_attrs
				.iter()
				.position(|attr| *attr == name)
				.ok_or_else(|| self.errors.unsupported_attribute(Some(name), &self.lookup_attrs)),
			None if self.lookup_attrs.len() == 1 => Ok(0),
			None => Err(self.errors.unsupported_attribute(None, &self.lookup_attrs)),
		}
	}

	fn reject(&self, item: &Arc<T>, rejection: Rejection<T>) -> B::Error {
		match rejection {
			Rejection::MissingAttr { attr } => {
				self.errors
					.invalid_item_registration(item, self.lookup_attrs[attr])
			}
			Rejection::AlreadyRegistered => self.errors.already_registered(item),
			Rejection::Conflict {
				attr,
				value,
				existing,
			} => self.errors.registration_conflict(
				item,
				&existing,
				self.lookup_attrs[attr],
				&value,
			),
			Rejection::NotFound => self.errors.item_not_found_unregistration(item),
		}
	}
}

impl<T, B> fmt::Debug for Registry<T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let snap = self.snap.load();
		f.debug_struct("Registry")
			.field("label", &self.label)
			.field("lookup_attrs", &self.lookup_attrs)
			.field("ordered", &self.ordered)
			.field("state", &snap.state)
			.field("len", &snap.index.len())
			.field("source", &self.source)
			.field("hooks", &self.hooks)
			.finish()
	}
}

/// Publishes a saved snapshot when dropped armed.
///
/// Population and reset arm one before they start mutating, so an error or an unwind out of a
/// hook or default source never leaves the registry stuck in `Populating`.
struct Rollback<'a, T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	registry: &'a Registry<T, B>,
	restore: Option<Arc<Snapshot<T>>>,
}

impl<'a, T, B> Rollback<'a, T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	fn new(registry: &'a Registry<T, B>, restore: Arc<Snapshot<T>>) -> Self {
		Self {
			registry,
			restore: Some(restore),
		}
	}

	fn disarm(mut self) {
		self.restore = None;
	}
}

impl<T, B> Drop for Rollback<'_, T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	fn drop(&mut self) {
		if let Some(restore) = self.restore.take() {
			self.registry.snap.store(restore);
		}
	}
}

/// Iterator over a registry snapshot.
pub struct Iter<T: ?Sized> {
	index: Arc<AttributeIndex<T>>,
	pos: usize,
}

impl<T: ?Sized + Item> Iter<T> {
	fn new(index: Arc<AttributeIndex<T>>) -> Self {
		Self { index, pos: 0 }
	}
}

impl<T: ?Sized + Item> Iterator for Iter<T> {
	type Item = Arc<T>;

	fn next(&mut self) -> Option<Arc<T>> {
		let item = self.index.get_index(self.pos)?.clone();
		self.pos += 1;
		Some(item)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining = self.index.len().saturating_sub(self.pos);
		(remaining, Some(remaining))
	}
}

impl<T: ?Sized + Item> ExactSizeIterator for Iter<T> {}

impl<T: ?Sized + Item> FusedIterator for Iter<T> {}

impl<T: ?Sized> fmt::Debug for Iter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Iter").field("pos", &self.pos).finish_non_exhaustive()
	}
}
