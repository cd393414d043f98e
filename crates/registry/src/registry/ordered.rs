//! Registration-ordered registries.

use std::ops::Deref;
use std::sync::Arc;

use super::Registry;
use crate::error::{DefaultErrors, ErrorBindings};
use crate::value::Item;

/// A [`Registry`] that remembers registration order.
///
/// Iteration yields items in the order they were first registered; unregistering an item keeps
/// the relative order of the rest. Items can also be addressed by position.
pub struct OrderedRegistry<T, B = DefaultErrors>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	inner: Registry<T, B>,
}

impl<T, B> OrderedRegistry<T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	pub(super) fn new(inner: Registry<T, B>) -> Self {
		debug_assert!(inner.is_ordered());
		Self { inner }
	}

	/// Returns the item registered at position `index`.
	///
	/// Negative indices count from the end (`-1` is the most recent registration). Returns
	/// `None` when the position is out of range.
	pub fn get_index(&self, index: isize) -> Result<Option<Arc<T>>, B::Error> {
		let snap = self.inner.read()?;
		let pos = if index >= 0 {
			index.unsigned_abs()
		} else {
			match snap.len().checked_sub(index.unsigned_abs()) {
				Some(pos) => pos,
				None => return Ok(None),
			}
		};
		Ok(snap.get_index(pos).cloned())
	}

	/// Returns the earliest registered item.
	pub fn first(&self) -> Result<Option<Arc<T>>, B::Error> {
		self.get_index(0)
	}

	/// Returns the most recently registered item.
	pub fn last(&self) -> Result<Option<Arc<T>>, B::Error> {
		self.get_index(-1)
	}

	pub fn into_inner(self) -> Registry<T, B> {
		self.inner
	}
}

impl<T, B> Deref for OrderedRegistry<T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	type Target = Registry<T, B>;

	fn deref(&self) -> &Registry<T, B> {
		&self.inner
	}
}

impl<T, B> std::fmt::Debug for OrderedRegistry<T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("OrderedRegistry").field(&self.inner).finish()
	}
}
