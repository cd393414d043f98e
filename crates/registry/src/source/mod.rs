//! Default item providers.
//!
//! # Role
//!
//! A [`PopulationSource`] is consulted once per population cycle, the first time a registry is
//! used after construction or [`crate::Registry::reset`]. Items it yields go through the ordinary
//! register path, so a duplicate default fails population like any other conflict.

mod entry_points;


use std::sync::Arc;

#[cfg(feature = "entry-points")]
pub use entry_points::InventoryDiscovery;
pub use entry_points::{
	Discover, EntryPoint, EntryPointSource, LoadErrorPolicy, LoadFn, Loaded, ShapeFn,
	UnexpectedValue,
};

use crate::error::ErrorBindings;
use crate::value::Item;

/// Produces the default items of a registry.
pub enum PopulationSource<T: ?Sized> {
	/// No default items.
	Empty,
	/// A fixed list, evaluated once per population.
	Defaults(Box<dyn Fn() -> Vec<Arc<T>> + Send + Sync>),
	/// Items resolved from discovered entry points.
	EntryPoints(EntryPointSource<T>),
}

impl<T: ?Sized> Default for PopulationSource<T> {
	fn default() -> Self {
		Self::Empty
	}
}

impl<T: ?Sized> std::fmt::Debug for PopulationSource<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Empty => f.write_str("Empty"),
			Self::Defaults(_) => f.write_str("Defaults(..)"),
			Self::EntryPoints(source) => f.debug_tuple("EntryPoints").field(source).finish(),
		}
	}
}

impl<T: ?Sized + Item> PopulationSource<T> {
	/// Collects the default items in registration order.
	pub(crate) fn collect<B>(
		&self,
		registry: &'static str,
		errors: &B,
	) -> Result<Vec<Arc<T>>, B::Error>
	where
		B: ErrorBindings<T>,
	{
		match self {
			Self::Empty => Ok(Vec::new()),
			Self::Defaults(defaults) => Ok(defaults()),
			Self::EntryPoints(source) => source.collect(registry, errors),
		}
	}
}
