//! Shared items for unit tests.

use std::sync::Arc;

use crate::{AttrValue, Item};

/// Item carrying an arbitrary set of attributes.
#[derive(Debug)]
pub(crate) struct TestItem {
	pub(crate) attrs: Vec<(&'static str, AttrValue)>,
}

impl Item for TestItem {
	fn attr(&self, name: &str) -> Option<AttrValue> {
		self.attrs
			.iter()
			.find(|(attr, _)| *attr == name)
			.map(|(_, value)| value.clone())
	}
}

/// Builds an item from `(attribute, value)` pairs.
pub(crate) fn item<const N: usize>(attrs: [(&'static str, AttrValue); N]) -> Arc<TestItem> {
	Arc::new(TestItem {
		attrs: attrs.into(),
	})
}

/// Builds an item with only an `id` attribute.
pub(crate) fn with_id(id: impl Into<AttrValue>) -> Arc<TestItem> {
	item([("id", id.into())])
}
