//! Population from entry points published with `registries::entry_point!`.

#![cfg(feature = "entry-points")]

use std::sync::Arc;

use registries::{
	AttrValue, EntryPointSource, ErrorKind, InventoryDiscovery, Item, LoadErrorPolicy, Query,
	Registry,
};

#[derive(Debug)]
struct Codec {
	name: &'static str,
	extension: &'static str,
}

impl Item for Codec {
	fn attr(&self, name: &str) -> Option<AttrValue> {
		match name {
			"name" => Some(self.name.into()),
			"extension" => Some(self.extension.into()),
			_ => None,
		}
	}
}

registries::entry_point!("tests.codecs", "gzip", || {
	Ok(Box::new(Arc::new(Codec {
		name: "gzip",
		extension: "gz",
	})))
});

registries::entry_point!("tests.codecs", "zstd", || {
	Ok(Box::new(Arc::new(Codec {
		name: "zstd",
		extension: "zst",
	})))
});

registries::entry_point!("tests.broken", "missing", || Err("shared object not found".into()));

registries::entry_point!("tests.broken", "lz4", || {
	Ok(Box::new(Arc::new(Codec {
		name: "lz4",
		extension: "lz4",
	})))
});

fn codecs(group: &'static str, policy: LoadErrorPolicy) -> Registry<Codec> {
	Registry::<Codec>::builder("codecs")
		.lookup_attrs(["name", "extension"])
		.entry_points(
			EntryPointSource::new(group)
				.discover_with(InventoryDiscovery)
				.on_load_error(policy),
		)
		.build()
		.unwrap()
}

#[test]
fn test_discovers_submitted_entry_points() {
	let registry = codecs("tests.codecs", LoadErrorPolicy::Propagate);

	assert_eq!(registry.len().unwrap(), 2);
	let zstd = registry.get(Query::attr("extension", "zst")).unwrap();
	assert_eq!(zstd.name, "zstd");
	assert!(registry.get_or_none(Query::attr("name", "lz4")).unwrap().is_none());
}

#[test]
fn test_load_failure_policies() {
	let strict = codecs("tests.broken", LoadErrorPolicy::Propagate);
	let err = strict.len().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::EntryPointLoad);
	assert!(err.to_string().contains("shared object not found"), "{err}");

	let lenient = codecs("tests.broken", LoadErrorPolicy::SkipAndLog);
	assert_eq!(lenient.len().unwrap(), 1);
	assert_eq!(lenient.get(Query::attr("name", "lz4")).unwrap().extension, "lz4");
}

#[test]
fn test_unknown_group_is_empty() {
	let registry = codecs("tests.nothing", LoadErrorPolicy::Propagate);
	assert!(registry.is_empty().unwrap());
}
