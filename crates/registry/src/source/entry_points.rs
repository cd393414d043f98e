//! Entry-point discovery.
//!
//! An entry point is a named, lazily loaded value published under a group. Discovery is an
//! injected collaborator ([`Discover`]); with the `entry-points` feature the default collaborator
//! is [`InventoryDiscovery`], which sees every [`EntryPoint`] submitted with
//! [`crate::entry_point!`] anywhere in the final binary.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, ErrorBindings};
use crate::value::Item;

/// Value produced by loading an entry point.
pub type Loaded = Box<dyn Any + Send + Sync>;

/// Loader of an entry point.
pub type LoadFn = fn() -> Result<Loaded, BoxError>;

/// Turns a loaded entry point value into a registry item.
pub type ShapeFn<T> = Box<dyn Fn(&EntryPoint, Loaded) -> Result<Arc<T>, BoxError> + Send + Sync>;

/// A discoverable, lazily loaded value.
#[derive(Clone, Copy)]
pub struct EntryPoint {
	pub group: &'static str,
	pub name: &'static str,
	pub load: LoadFn,
}

#[cfg(feature = "entry-points")]
inventory::collect!(EntryPoint);

impl EntryPoint {
	pub const fn new(group: &'static str, name: &'static str, load: LoadFn) -> Self {
		Self { group, name, load }
	}

	/// Resolves the entry point's value.
	pub fn load(&self) -> Result<Loaded, BoxError> {
		(self.load)()
	}
}

impl fmt::Debug for EntryPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EntryPoint")
			.field("group", &self.group)
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// Finds the entry points published under a group.
pub trait Discover: Send + Sync + 'static {
	fn discover(&self, group: &str) -> Vec<EntryPoint>;
}

impl<F> Discover for F
where
	F: Fn(&str) -> Vec<EntryPoint> + Send + Sync + 'static,
{
	fn discover(&self, group: &str) -> Vec<EntryPoint> {
		self(group)
	}
}

/// Discovers entry points submitted through [`crate::entry_point!`].
#[cfg(feature = "entry-points")]
#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryDiscovery;

#[cfg(feature = "entry-points")]
impl Discover for InventoryDiscovery {
	fn discover(&self, group: &str) -> Vec<EntryPoint> {
		inventory::iter::<EntryPoint>
			.into_iter()
			.filter(|ep| ep.group == group)
			.copied()
			.collect()
	}
}

/// Publishes an [`EntryPoint`] for [`InventoryDiscovery`].
///
/// ```ignore
/// registries::entry_point!("app.backends", "sqlite", || Ok(Box::new(sqlite_backend())));
/// ```
#[cfg(feature = "entry-points")]
#[macro_export]
macro_rules! entry_point {
	($group:expr, $name:expr, $load:expr $(,)?) => {
		$crate::__private::inventory::submit! {
			$crate::EntryPoint::new($group, $name, $load)
		}
	};
}

/// What population does when an entry point fails to load or shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadErrorPolicy {
	/// Abort population with an entry-point load error.
	#[default]
	Propagate,
	/// Log the failure at `warn` and continue with the remaining entries.
	SkipAndLog,
}

/// The default shaping step found a value of another type.
#[derive(Debug, thiserror::Error)]
#[error("entry point value is not {expected}")]
pub struct UnexpectedValue {
	pub expected: &'static str,
}

/// Population source backed by entry-point discovery.
pub struct EntryPointSource<T: ?Sized> {
	group: Cow<'static, str>,
	discover: Box<dyn Discover>,
	shape: ShapeFn<T>,
	policy: LoadErrorPolicy,
}

impl<T: ?Sized> fmt::Debug for EntryPointSource<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EntryPointSource")
			.field("group", &self.group)
			.field("policy", &self.policy)
			.finish_non_exhaustive()
	}
}

impl<T: ?Sized + Item> EntryPointSource<T> {
	/// Creates a source for `group`.
	///
	/// Loaded values are expected to be `Arc<T>` unless a shaping function is supplied. Without
	/// the `entry-points` feature no entry points are discovered until
	/// [`Self::discover_with`] provides a collaborator.
	pub fn new(group: impl Into<Cow<'static, str>>) -> Self {
		Self {
			group: group.into(),
			discover: default_discovery(),
			shape: Box::new(downcast_item::<T>),
			policy: LoadErrorPolicy::default(),
		}
	}

	/// Replaces the discovery collaborator.
	pub fn discover_with(mut self, discover: impl Discover) -> Self {
		self.discover = Box::new(discover);
		self
	}

	/// Replaces the shaping function applied to every loaded value.
	pub fn shape_with<F>(mut self, shape: F) -> Self
	where
		F: Fn(&EntryPoint, Loaded) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
	{
		self.shape = Box::new(shape);
		self
	}

	pub fn on_load_error(mut self, policy: LoadErrorPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn group(&self) -> &str {
		&self.group
	}

	pub(crate) fn collect<B>(
		&self,
		registry: &'static str,
		errors: &B,
	) -> Result<Vec<Arc<T>>, B::Error>
	where
		B: ErrorBindings<T>,
	{
		let entries = self.discover.discover(&self.group);
		let mut items = Vec::with_capacity(entries.len());

		for ep in &entries {
			match ep.load().and_then(|value| (self.shape)(ep, value)) {
				Ok(item) => items.push(item),
				Err(err) => match self.policy {
					LoadErrorPolicy::Propagate => {
						return Err(errors.entry_point_load(&self.group, ep.name, err));
					}
					LoadErrorPolicy::SkipAndLog => {
						tracing::warn!(
							registry,
							group = %self.group,
							entry = ep.name,
							error = %err,
							"could not load entry point; skipping"
						);
					}
				},
			}
		}

		tracing::debug!(
			registry,
			group = %self.group,
			discovered = entries.len(),
			loaded = items.len(),
			"entry points resolved"
		);
		Ok(items)
	}
}

fn downcast_item<T: ?Sized + Item>(_: &EntryPoint, value: Loaded) -> Result<Arc<T>, BoxError> {
	value
		.downcast::<Arc<T>>()
		.map(|item| *item)
		.map_err(|_| {
			UnexpectedValue {
				expected: std::any::type_name::<Arc<T>>(),
			}
			.into()
		})
}

#[cfg(feature = "entry-points")]
fn default_discovery() -> Box<dyn Discover> {
	Box::new(InventoryDiscovery)
}

#[cfg(not(feature = "entry-points"))]
fn default_discovery() -> Box<dyn Discover> {
	Box::new(|_: &str| Vec::<EntryPoint>::new())
}
