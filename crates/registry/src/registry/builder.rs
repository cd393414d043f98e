//! Registry definitions.

use std::sync::Arc;

use super::{OrderedRegistry, Registry};
use crate::error::{BuildError, DefaultErrors, ErrorBindings};
use crate::hooks::{HookDispatcher, ItemStage, LifecycleStage};
use crate::source::{EntryPointSource, PopulationSource};
use crate::value::Item;

/// Builds a [`Registry`] from an immutable definition.
///
/// ```
/// use std::sync::Arc;
///
/// use registries::{AttrValue, Item, Query, Registry};
///
/// #[derive(Debug)]
/// struct Codec {
/// 	id: &'static str,
/// 	mime: &'static str,
/// }
///
/// impl Item for Codec {
/// 	fn attr(&self, name: &str) -> Option<AttrValue> {
/// 		match name {
/// 			"id" => Some(self.id.into()),
/// 			"mime" => Some(self.mime.into()),
/// 			_ => None,
/// 		}
/// 	}
/// }
///
/// let codecs = Registry::<Codec>::builder("codecs")
/// 	.lookup_attrs(["id", "mime"])
/// 	.defaults(|| {
/// 		vec![Arc::new(Codec {
/// 			id: "json",
/// 			mime: "application/json",
/// 		})]
/// 	})
/// 	.build()
/// 	.unwrap();
///
/// let json = codecs.get(Query::attr("mime", "application/json")).unwrap();
/// assert_eq!(json.id, "json");
/// assert_eq!(codecs.len().unwrap(), 1);
/// ```
pub struct RegistryBuilder<T, B = DefaultErrors>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	label: &'static str,
	lookup_attrs: Vec<&'static str>,
	errors: B,
	source: PopulationSource<T>,
	hooks: HookDispatcher<Registry<T, B>, T, B::Error>,
}

impl<T: ?Sized + Item> RegistryBuilder<T> {
	pub fn new(label: &'static str) -> Self {
		Self::with_errors(label, DefaultErrors)
	}
}

impl<T, B> RegistryBuilder<T, B>
where
	T: ?Sized + Item,
	B: ErrorBindings<T>,
{
	/// Starts a definition whose errors are produced by `errors`.
	pub fn with_errors(label: &'static str, errors: B) -> Self {
		Self {
			label,
			lookup_attrs: Vec::new(),
			errors,
			source: PopulationSource::Empty,
			hooks: HookDispatcher::new(),
		}
	}

	/// Appends a lookup attribute.
	pub fn lookup_attr(mut self, name: &'static str) -> Self {
		self.lookup_attrs.push(name);
		self
	}

	/// Appends several lookup attributes, in order.
	pub fn lookup_attrs(mut self, names: impl IntoIterator<Item = &'static str>) -> Self {
		self.lookup_attrs.extend(names);
		self
	}

	/// Sets a static list of default items, evaluated once per population.
	pub fn defaults<F>(mut self, defaults: F) -> Self
	where
		F: Fn() -> Vec<Arc<T>> + Send + Sync + 'static,
	{
		self.source = PopulationSource::Defaults(Box::new(defaults));
		self
	}

	/// Populates from discovered entry points.
	pub fn entry_points(mut self, source: EntryPointSource<T>) -> Self {
		self.source = PopulationSource::EntryPoints(source);
		self
	}

	pub fn source(mut self, source: PopulationSource<T>) -> Self {
		self.source = source;
		self
	}

	/// Runs before an item is validated and indexed; an error aborts the registration.
	pub fn on_registering<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>, &Arc<T>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.item_hook(ItemStage::Registering, hook)
	}

	/// Runs after an item is indexed.
	pub fn on_registered<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>, &Arc<T>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.item_hook(ItemStage::Registered, hook)
	}

	/// Runs before an item is removed; an error aborts the unregistration.
	pub fn on_unregistering<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>, &Arc<T>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.item_hook(ItemStage::Unregistering, hook)
	}

	pub fn on_unregistered<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>, &Arc<T>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.item_hook(ItemStage::Unregistered, hook)
	}

	/// Runs before default items are loaded; an error aborts population.
	pub fn on_populating<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.lifecycle_hook(LifecycleStage::Populating, hook)
	}

	pub fn on_populated<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.lifecycle_hook(LifecycleStage::Populated, hook)
	}

	/// Runs before a ready registry is cleared; an error aborts the reset.
	pub fn on_resetting<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.lifecycle_hook(LifecycleStage::Resetting, hook)
	}

	pub fn on_reset<F>(self, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.lifecycle_hook(LifecycleStage::Reset, hook)
	}

	fn item_hook<F>(mut self, stage: ItemStage, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>, &Arc<T>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.hooks.push_item(stage, Box::new(hook));
		self
	}

	fn lifecycle_hook<F>(mut self, stage: LifecycleStage, hook: F) -> Self
	where
		F: Fn(&Registry<T, B>) -> Result<(), B::Error> + Send + Sync + 'static,
	{
		self.hooks.push_lifecycle(stage, Box::new(hook));
		self
	}

	/// Builds an unordered registry.
	pub fn build(self) -> Result<Registry<T, B>, BuildError> {
		self.finish(false)
	}

	/// Builds a registry that iterates in registration order.
	pub fn build_ordered(self) -> Result<OrderedRegistry<T, B>, BuildError> {
		self.finish(true).map(OrderedRegistry::new)
	}

	fn finish(self, ordered: bool) -> Result<Registry<T, B>, BuildError> {
		if self.lookup_attrs.is_empty() {
			return Err(BuildError::NoLookupAttrs {
				registry: self.label,
			});
		}
		for (i, &attr) in self.lookup_attrs.iter().enumerate() {
			if self.lookup_attrs[..i].contains(&attr) {
				return Err(BuildError::DuplicateLookupAttr {
					registry: self.label,
					attr,
				});
			}
		}

		Ok(Registry::from_parts(
			self.label,
			self.lookup_attrs.into_boxed_slice(),
			ordered,
			self.errors,
			self.source,
			self.hooks,
		))
	}
}
