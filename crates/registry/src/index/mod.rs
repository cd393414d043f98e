#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Multi-attribute item index.
//!
//! # Purpose
//!
//! [`AttributeIndex`] maps `(lookup attribute, value)` pairs to items and owns the set of
//! registered items. It is a plain value: the registry publishes immutable indexes through an
//! atomic pointer and builds successors for every mutation.
//!
//! # Mental Model
//!
//! 1. **Check:** [`AttributeIndex::check_insert`] reads every lookup attribute off the candidate
//!    and validates all of them against the current bindings without mutating anything.
//! 2. **Apply:** [`AttributeIndex::apply_insert`] commits the captured values in one step.
//! 3. **Remove:** [`AttributeIndex::remove`] drops the bindings captured at insertion; the item
//!    is never re-read.
//!
//! # Invariants
//!
//! - Every registered item is reachable under each lookup attribute by the value captured at
//!   registration.
//!   - Enforced in: [`AttributeIndex::apply_insert`].
//!   - Tested by: `crate::registry::invariants::test_round_trip`
//! - No two items share a value for any single lookup attribute.
//!   - Enforced in: [`AttributeIndex::check_insert`].
//!   - Tested by: `crate::registry::invariants::test_uniqueness`
//! - A rejected insertion leaves the index untouched.
//!   - Enforced in: [`AttributeIndex::check_insert`] (no `&mut self`).
//!   - Tested by: `crate::registry::invariants::test_atomic_conflict`
//! - Ordered indexes keep first-registration order across removals.
//!   - Enforced in: [`AttributeIndex::remove`] (`shift_remove`).
//!   - Tested by: `crate::registry::invariants::test_order_preservation`

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHasher};

use crate::value::{AttrValue, Item, ItemId};


type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// A registered item with the attribute values captured when it was inserted.
pub(crate) struct Entry<T: ?Sized> {
	pub(crate) item: Arc<T>,
	pub(crate) values: Box<[AttrValue]>,
}

impl<T: ?Sized> Clone for Entry<T> {
	fn clone(&self) -> Self {
		Self {
			item: self.item.clone(),
			values: self.values.clone(),
		}
	}
}

/// Why an index operation was rejected.
///
/// Attribute positions refer to the registry's lookup attribute list.
pub(crate) enum Rejection<T: ?Sized> {
	/// The item does not define the lookup attribute at `attr`.
	MissingAttr { attr: usize },
	/// The very same item is already registered.
	AlreadyRegistered,
	/// A different item already holds `value` for the lookup attribute at `attr`.
	Conflict {
		attr: usize,
		value: AttrValue,
		existing: Arc<T>,
	},
	/// The item is not registered.
	NotFound,
}

/// Validated insertion, ready to be applied.
pub(crate) struct Prepared<T: ?Sized> {
	id: ItemId,
	entry: Entry<T>,
}

/// Multi-key index from `(attribute, value)` to item.
pub(crate) struct AttributeIndex<T: ?Sized> {
	/// One map per lookup attribute, in declaration order.
	by_attr: Box<[FxHashMap<AttrValue, ItemId>]>,
	items: FxIndexMap<ItemId, Entry<T>>,
	ordered: bool,
}

impl<T: ?Sized> Clone for AttributeIndex<T> {
	fn clone(&self) -> Self {
		Self {
			by_attr: self.by_attr.clone(),
			items: self.items.clone(),
			ordered: self.ordered,
		}
	}
}

impl<T: ?Sized + Item> AttributeIndex<T> {
	/// Creates an empty index over `attr_count` lookup attributes.
	pub(crate) fn new(attr_count: usize, ordered: bool) -> Self {
		Self {
			by_attr: (0..attr_count).map(|_| FxHashMap::default()).collect(),
			items: FxIndexMap::default(),
			ordered,
		}
	}

	/// Validates `item` for insertion against every lookup attribute.
	///
	/// Reads each attribute exactly once. Nothing is mutated; a rejection on any attribute
	/// rejects the whole insertion.
	pub(crate) fn check_insert(
		&self,
		item: &Arc<T>,
		lookup_attrs: &[&'static str],
	) -> Result<Prepared<T>, Rejection<T>> {
		let id = ItemId::of(item);
		if self.items.contains_key(&id) {
			return Err(Rejection::AlreadyRegistered);
		}

		let mut values = Vec::with_capacity(lookup_attrs.len());
		for (attr, name) in lookup_attrs.iter().enumerate() {
			let value = item.attr(name).ok_or(Rejection::MissingAttr { attr })?;
			values.push(value);
		}

		for (attr, value) in values.iter().enumerate() {
			if let Some(existing) = self.by_attr[attr].get(value) {
				if *existing == id {
					return Err(Rejection::AlreadyRegistered);
				}
				return Err(Rejection::Conflict {
					attr,
					value: value.clone(),
					existing: self.items[existing].item.clone(),
				});
			}
		}

		Ok(Prepared {
			id,
			entry: Entry {
				item: item.clone(),
				values: values.into_boxed_slice(),
			},
		})
	}

	/// Commits a validated insertion.
	///
	/// `prepared` must come from [`Self::check_insert`] on this same index value.
	pub(crate) fn apply_insert(&mut self, prepared: Prepared<T>) {
		let Prepared { id, entry } = prepared;
		for (map, value) in self.by_attr.iter_mut().zip(entry.values.iter()) {
			map.insert(value.clone(), id);
		}
		self.items.insert(id, entry);
	}

	/// Removes `item` and every binding captured for it.
	pub(crate) fn remove(&mut self, item: &Arc<T>) -> Result<Arc<T>, Rejection<T>> {
		let id = ItemId::of(item);
		let entry = if self.ordered {
			self.items.shift_remove(&id)
		} else {
			self.items.swap_remove(&id)
		}
		.ok_or(Rejection::NotFound)?;

		for (map, value) in self.by_attr.iter_mut().zip(entry.values.iter()) {
			map.remove(value);
		}
		Ok(entry.item)
	}

	/// Returns the item bound to `value` under the lookup attribute at `attr`.
	pub(crate) fn lookup(&self, attr: usize, value: &AttrValue) -> Option<&Arc<T>> {
		let id = self.by_attr.get(attr)?.get(value)?;
		self.items.get(id).map(|entry| &entry.item)
	}

	/// Returns whether `item` itself is registered.
	#[inline]
	pub(crate) fn contains(&self, item: &Arc<T>) -> bool {
		self.items.contains_key(&ItemId::of(item))
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.items.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Returns the item at storage position `pos`.
	///
	/// For ordered indexes this is registration order.
	#[inline]
	pub(crate) fn get_index(&self, pos: usize) -> Option<&Arc<T>> {
		self.items.get_index(pos).map(|(_, entry)| &entry.item)
	}

	/// Returns the flattened `(attribute position, value, item)` bindings, sorted.
	#[cfg(test)]
	pub(crate) fn bindings(&self) -> Vec<(usize, AttrValue, ItemId)> {
		let mut out: Vec<_> = self
			.by_attr
			.iter()
			.enumerate()
			.flat_map(|(attr, map)| map.iter().map(move |(v, id)| (attr, v.clone(), *id)))
			.collect();
		out.sort();
		out
	}

	/// Returns registered identities in storage order.
	#[cfg(test)]
	pub(crate) fn ids(&self) -> Vec<ItemId> {
		self.items.keys().copied().collect()
	}
}
