//! Registry error taxonomy.
//!
//! # Role
//!
//! The registry raises failures by *kind*. [`ErrorBindings`] resolves each kind to the concrete
//! error type of a registry definition, so a definition can replace the error produced for any
//! single kind without touching registry control flow.

use std::fmt;
use std::sync::Arc;

use crate::value::{AttrValue, Item};

/// Boxed error used for opaque collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Built-in registry errors, one variant per error kind.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError<T: ?Sized + Item> {
	/// A query referenced an attribute that is not a lookup attribute, or used a positional
	/// value against a registry with several lookup attributes.
	#[error("{}", unsupported_message(attr_name.as_deref(), lookup_attrs))]
	UnsupportedAttribute {
		/// `None` for an ambiguous positional query.
		attr_name: Option<Box<str>>,
		lookup_attrs: Box<[&'static str]>,
	},

	#[error("No item registered with {attr_name}={attr_value}.")]
	ItemNotFoundLookup {
		attr_name: &'static str,
		attr_value: AttrValue,
	},

	#[error("Could not register {item:?}: it is already registered.")]
	AlreadyRegistered { item: Arc<T> },

	#[error(
		"Could not register {item:?}: another item ({other_item:?}) is already registered with {attr_name}={attr_value}."
	)]
	RegistrationConflict {
		item: Arc<T>,
		other_item: Arc<T>,
		attr_name: &'static str,
		attr_value: AttrValue,
	},

	#[error("Could not register {item:?}: it does not have a \"{attr_name}\" attribute.")]
	InvalidItemRegistration {
		item: Arc<T>,
		attr_name: &'static str,
	},

	#[error("No item registered with {attr_name}={attr_value}.")]
	AttrNotFoundUnregistration {
		attr_name: &'static str,
		attr_value: AttrValue,
	},

	#[error("Could not unregister {item:?}: it is not registered.")]
	ItemNotFoundUnregistration { item: Arc<T> },

	#[error("Could not load entry point \"{name}\" (group {group}): {source}")]
	EntryPointLoad {
		group: Box<str>,
		name: Box<str>,
		#[source]
		source: BoxError,
	},
}

impl<T: ?Sized + Item> RegistryError<T> {
	/// Returns the kind of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::UnsupportedAttribute { .. } => ErrorKind::UnsupportedAttribute,
			Self::ItemNotFoundLookup { .. } => ErrorKind::ItemNotFoundLookup,
			Self::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
			Self::RegistrationConflict { .. } => ErrorKind::RegistrationConflict,
			Self::InvalidItemRegistration { .. } => ErrorKind::InvalidItemRegistration,
			Self::AttrNotFoundUnregistration { .. } => ErrorKind::AttrNotFoundUnregistration,
			Self::ItemNotFoundUnregistration { .. } => ErrorKind::ItemNotFoundUnregistration,
			Self::EntryPointLoad { .. } => ErrorKind::EntryPointLoad,
		}
	}
}

fn unsupported_message(attr_name: Option<&str>, lookup_attrs: &[&'static str]) -> String {
	match attr_name {
		Some(name) => format!("\"{name}\" is not a registered lookup attribute."),
		None => format!(
			"A positional value is ambiguous for this registry; name one of the lookup attributes ({}).",
			lookup_attrs.join(", ")
		),
	}
}

/// Discriminant of [`RegistryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	UnsupportedAttribute,
	ItemNotFoundLookup,
	AlreadyRegistered,
	RegistrationConflict,
	InvalidItemRegistration,
	AttrNotFoundUnregistration,
	ItemNotFoundUnregistration,
	EntryPointLoad,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::UnsupportedAttribute => "unsupported_attribute",
			Self::ItemNotFoundLookup => "item_not_found_lookup",
			Self::AlreadyRegistered => "already_registered",
			Self::RegistrationConflict => "registration_conflict",
			Self::InvalidItemRegistration => "invalid_item_registration",
			Self::AttrNotFoundUnregistration => "attr_not_found_unregistration",
			Self::ItemNotFoundUnregistration => "item_not_found_unregistration",
			Self::EntryPointLoad => "entry_point_load",
		};
		f.write_str(s)
	}
}

/// Resolves error kinds to the concrete error type of a registry definition.
///
/// Every method has a default producing the matching [`RegistryError`] variant, converted
/// through `From`. Override only the kinds that need a custom type or message:
///
/// ```
/// use std::sync::Arc;
///
/// use registries::{AttrValue, ErrorBindings, Item, RegistryError};
///
/// #[derive(Debug)]
/// struct Backend(&'static str);
///
/// impl Item for Backend {
/// 	fn attr(&self, name: &str) -> Option<AttrValue> {
/// 		(name == "id").then(|| self.0.into())
/// 	}
/// }
///
/// #[derive(Debug, thiserror::Error)]
/// enum BackendError {
/// 	#[error("backend {0} is taken")]
/// 	Taken(AttrValue),
/// 	#[error(transparent)]
/// 	Registry(#[from] RegistryError<Backend>),
/// }
///
/// struct BackendErrors;
///
/// impl ErrorBindings<Backend> for BackendErrors {
/// 	type Error = BackendError;
///
/// 	fn registration_conflict(
/// 		&self,
/// 		_item: &Arc<Backend>,
/// 		_other_item: &Arc<Backend>,
/// 		_attr_name: &'static str,
/// 		attr_value: &AttrValue,
/// 	) -> BackendError {
/// 		BackendError::Taken(attr_value.clone())
/// 	}
/// }
/// ```
pub trait ErrorBindings<T: ?Sized + Item>: Send + Sync + 'static {
	type Error: From<RegistryError<T>> + fmt::Debug + fmt::Display + Send + Sync + 'static;

	fn unsupported_attribute(
		&self,
		attr_name: Option<&str>,
		lookup_attrs: &[&'static str],
	) -> Self::Error {
		RegistryError::UnsupportedAttribute {
			attr_name: attr_name.map(Box::from),
			lookup_attrs: lookup_attrs.into(),
		}
		.into()
	}

	fn item_not_found_lookup(&self, attr_name: &'static str, attr_value: &AttrValue) -> Self::Error {
		RegistryError::ItemNotFoundLookup {
			attr_name,
			attr_value: attr_value.clone(),
		}
		.into()
	}

	fn already_registered(&self, item: &Arc<T>) -> Self::Error {
		RegistryError::AlreadyRegistered { item: item.clone() }.into()
	}

	fn registration_conflict(
		&self,
		item: &Arc<T>,
		other_item: &Arc<T>,
		attr_name: &'static str,
		attr_value: &AttrValue,
	) -> Self::Error {
		RegistryError::RegistrationConflict {
			item: item.clone(),
			other_item: other_item.clone(),
			attr_name,
			attr_value: attr_value.clone(),
		}
		.into()
	}

	fn invalid_item_registration(&self, item: &Arc<T>, attr_name: &'static str) -> Self::Error {
		RegistryError::InvalidItemRegistration {
			item: item.clone(),
			attr_name,
		}
		.into()
	}

	fn attr_not_found_unregistration(
		&self,
		attr_name: &'static str,
		attr_value: &AttrValue,
	) -> Self::Error {
		RegistryError::AttrNotFoundUnregistration {
			attr_name,
			attr_value: attr_value.clone(),
		}
		.into()
	}

	fn item_not_found_unregistration(&self, item: &Arc<T>) -> Self::Error {
		RegistryError::ItemNotFoundUnregistration { item: item.clone() }.into()
	}

	fn entry_point_load(&self, group: &str, name: &str, source: BoxError) -> Self::Error {
		RegistryError::EntryPointLoad {
			group: group.into(),
			name: name.into(),
			source,
		}
		.into()
	}
}

/// Binds every error kind to [`RegistryError`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrors;

impl<T: ?Sized + Item> ErrorBindings<T> for DefaultErrors {
	type Error = RegistryError<T>;
}

/// Invalid registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
	#[error("registry {registry:?} declares no lookup attributes")]
	NoLookupAttrs { registry: &'static str },

	#[error("registry {registry:?} declares lookup attribute {attr:?} more than once")]
	DuplicateLookupAttr {
		registry: &'static str,
		attr: &'static str,
	},
}
