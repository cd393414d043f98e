//! Item identity and attribute values.
//!
//! # Role
//!
//! Defines the only capability a registry needs from its items: reading a named lookup
//! attribute. Everything else about an item is opaque.

use std::fmt;
use std::sync::Arc;

/// Capability contract for registrable items.
///
/// A registry reads its declared lookup attributes through [`Item::attr`] exactly once per
/// registration. Returning `None` means the attribute is absent on this item, which rejects
/// the registration.
///
/// Trait objects work as items when the object trait has `Item` as a supertrait:
///
/// ```
/// use std::sync::Arc;
///
/// use registries::{AttrValue, Item, Query, Registry};
///
/// trait Backend: Item {
/// 	fn connect(&self) -> String;
/// }
///
/// #[derive(Debug)]
/// struct Sqlite;
///
/// impl Item for Sqlite {
/// 	fn attr(&self, name: &str) -> Option<AttrValue> {
/// 		(name == "id").then(|| "sqlite".into())
/// 	}
/// }
///
/// impl Backend for Sqlite {
/// 	fn connect(&self) -> String {
/// 		"sqlite://".to_owned()
/// 	}
/// }
///
/// let backends = Registry::<dyn Backend>::builder("backends")
/// 	.lookup_attr("id")
/// 	.build()
/// 	.unwrap();
/// backends.register(&(Arc::new(Sqlite) as Arc<dyn Backend>)).unwrap();
/// assert_eq!(backends.get(Query::value("sqlite")).unwrap().connect(), "sqlite://");
/// ```
pub trait Item: fmt::Debug + Send + Sync + 'static {
	/// Returns the value of the attribute `name`, or `None` if the item does not define it.
	fn attr(&self, name: &str) -> Option<AttrValue>;
}

/// Value of a lookup attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrValue {
	Str(Arc<str>),
	Int(i64),
	Bool(bool),
}

impl AttrValue {
	/// Returns the string payload, if this is a string value.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the integer payload, if this is an integer value.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(i) => Some(*i),
			_ => None,
		}
	}
}

impl fmt::Display for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(s) => write!(f, "{s:?}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Bool(b) => write!(f, "{b}"),
		}
	}
}

impl From<&str> for AttrValue {
	fn from(value: &str) -> Self {
		Self::Str(Arc::from(value))
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		Self::Str(Arc::from(value))
	}
}

impl From<Arc<str>> for AttrValue {
	fn from(value: Arc<str>) -> Self {
		Self::Str(value)
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

macro_rules! attr_value_from_int {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for AttrValue {
				fn from(value: $ty) -> Self {
					Self::Int(i64::from(value))
				}
			}
		)*
	};
}

attr_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

/// Identity of a registered item: the address of its shared allocation.
///
/// Two handles denote the same item iff they point at the same allocation, regardless of
/// attribute equality. A registry keeps every registered allocation alive, so the address of
/// a registered item is never reused while it is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

impl ItemId {
	#[inline]
	pub fn of<T: ?Sized>(item: &Arc<T>) -> Self {
		Self(Arc::as_ptr(item).cast::<()>() as usize)
	}
}
