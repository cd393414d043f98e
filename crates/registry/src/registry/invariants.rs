#![allow(dead_code)]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;

use super::{Query, Registry, RegistryState};
use crate::error::ErrorKind;
use crate::test_fixtures::{TestItem, item};
use crate::value::{AttrValue, Item, ItemId};

const ATTRS: [&str; 2] = ["id", "name"];

fn two_key_registry() -> Registry<TestItem> {
	Registry::<TestItem>::builder("invariants")
		.lookup_attrs(ATTRS)
		.build()
		.unwrap()
}

fn pair(id: i64, name: i64) -> Arc<TestItem> {
	item([("id", id.into()), ("name", format!("n{name}").into())])
}

/// A registration or unregistration step in a generated history.
#[derive(Clone, Debug)]
enum Op {
	Register { id: i64, name: i64 },
	/// Unregisters the registered item at `pick % len`.
	Unregister { pick: usize },
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
	let op = prop_oneof![
		3 => (0i64..6, 0i64..6).prop_map(|(id, name)| Op::Register { id, name }),
		1 => any::<usize>().prop_map(|pick| Op::Unregister { pick }),
	];
	prop::collection::vec(op, 0..48)
}

/// Replays `ops`, returning the items expected to be registered.
fn replay(registry: &Registry<TestItem>, ops: &[Op]) -> Vec<Arc<TestItem>> {
	let mut live: Vec<Arc<TestItem>> = Vec::new();
	for op in ops {
		match *op {
			Op::Register { id, name } => {
				let candidate = pair(id, name);
				if registry.register(&candidate).is_ok() {
					live.push(candidate);
				}
			}
			Op::Unregister { pick } if !live.is_empty() => {
				let victim = live.remove(pick % live.len());
				registry.unregister(&victim).unwrap();
			}
			Op::Unregister { .. } => {}
		}
	}
	live
}

/// Invariant: No two registered items share a value for any lookup attribute.
pub(crate) fn inv_uniqueness() {
	proptest!(|(ops in arb_ops())| {
		let registry = two_key_registry();
		let live = replay(&registry, &ops);

		let items: Vec<_> = registry.iter().unwrap().collect();
		prop_assert_eq!(items.len(), live.len());
		for attr in ATTRS {
			let mut seen: Vec<AttrValue> = items.iter().map(|it| it.attr(attr).unwrap()).collect();
			seen.sort();
			let before = seen.len();
			seen.dedup();
			prop_assert_eq!(seen.len(), before, "duplicate value under {}", attr);
		}
	});
}

#[cfg_attr(test, test)]
pub(crate) fn test_uniqueness() {
	inv_uniqueness()
}

/// Invariant: A registered item is found under every lookup attribute by its own value.
///
/// After unregistration, the same lookups miss.
pub(crate) fn inv_round_trip() {
	proptest!(|(ops in arb_ops())| {
		let registry = two_key_registry();
		let live = replay(&registry, &ops);

		for it in &live {
			for attr in ATTRS {
				let found = registry.get(Query::attr(attr, it.attr(attr).unwrap())).unwrap();
				prop_assert!(Arc::ptr_eq(&found, it));
			}
		}
		for it in &live {
			registry.unregister(it).unwrap();
			for attr in ATTRS {
				let err = registry.get(Query::attr(attr, it.attr(attr).unwrap())).unwrap_err();
				prop_assert_eq!(err.kind(), ErrorKind::ItemNotFoundLookup);
			}
		}
	});
}

#[cfg_attr(test, test)]
pub(crate) fn test_round_trip() {
	inv_round_trip()
}

/// Invariant: Unregistering an absent item fails and changes nothing.
///
/// Once unregistered, an item is absent from membership and from every attribute lookup.
pub(crate) fn inv_idempotent_absence() {
	let registry = two_key_registry();
	let kept = pair(1, 1);
	registry.register(&kept).unwrap();

	let stranger = pair(2, 2);
	let before = registry.index().bindings();
	let err = registry.unregister(&stranger).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ItemNotFoundUnregistration);
	assert_eq!(registry.index().bindings(), before);

	// Equal attributes do not make a different item registered.
	let twin = pair(1, 1);
	let err = registry.unregister(&twin).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ItemNotFoundUnregistration);
	assert!(registry.contains(&kept).unwrap());

	registry.unregister(&kept).unwrap();
	assert!(!registry.contains(&kept).unwrap());
	for attr in ATTRS {
		let err = registry.get(Query::attr(attr, kept.attr(attr).unwrap())).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::ItemNotFoundLookup);
	}
	let err = registry.unregister(&kept).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ItemNotFoundUnregistration);
	assert!(registry.is_empty().unwrap());
}

#[cfg_attr(test, test)]
pub(crate) fn test_idempotent_absence() {
	inv_idempotent_absence()
}

/// Invariant: A rejected registration binds none of the candidate's attributes.
pub(crate) fn inv_atomic_conflict() {
	proptest!(|(ops in arb_ops(), id in 0i64..6, name in 0i64..6)| {
		let registry = two_key_registry();
		replay(&registry, &ops);

		let bindings: Vec<(usize, AttrValue, ItemId)> = registry.index().bindings();
		let ids = registry.index().ids();
		let candidate = pair(id, name);

		if let Err(err) = registry.register(&candidate) {
			prop_assert_eq!(err.kind(), ErrorKind::RegistrationConflict);
			prop_assert_eq!(registry.index().bindings(), bindings);
			prop_assert_eq!(registry.index().ids(), ids);
			prop_assert!(!registry.contains(&candidate).unwrap());
		} else {
			prop_assert_eq!(registry.index().bindings().len(), bindings.len() + ATTRS.len());
		}
	});
}

#[cfg_attr(test, test)]
pub(crate) fn test_atomic_conflict() {
	inv_atomic_conflict()
}

/// Invariant: Concurrent first access loads the defaults exactly once.
pub(crate) fn inv_exactly_once_population() {
	const THREADS: usize = 8;

	let loads = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&loads);
	let registry = Registry::<TestItem>::builder("invariants")
		.lookup_attr("id")
		.defaults(move || {
			counter.fetch_add(1, Ordering::SeqCst);
			thread::yield_now();
			(0i64..16).map(crate::test_fixtures::with_id).collect()
		})
		.build()
		.unwrap();
	let barrier = Barrier::new(THREADS);

	thread::scope(|s| {
		for _ in 0..THREADS {
			s.spawn(|| {
				barrier.wait();
				assert_eq!(registry.len().unwrap(), 16);
			});
		}
	});

	assert_eq!(loads.load(Ordering::SeqCst), 1);
	assert_eq!(registry.state(), RegistryState::Ready);
}

#[cfg_attr(test, test)]
pub(crate) fn test_exactly_once_population() {
	inv_exactly_once_population()
}

/// Invariant: Ordered registries iterate in first-registration order.
///
/// Unregistering keeps the relative order of the remaining items; re-registering appends.
pub(crate) fn inv_order_preservation() {
	let registry = Registry::<TestItem>::builder("invariants")
		.lookup_attr("id")
		.build_ordered()
		.unwrap();
	let items: Vec<_> = [5i64, 3, 9, 1, 7].into_iter().map(crate::test_fixtures::with_id).collect();
	for it in &items {
		registry.register(it).unwrap();
	}

	fn ids(registry: &Registry<TestItem>) -> Vec<AttrValue> {
		registry.iter().unwrap().map(|it| it.attr("id").unwrap()).collect()
	}
	assert_eq!(ids(&registry), [5i64, 3, 9, 1, 7].map(AttrValue::from));

	registry.unregister(&items[2]).unwrap();
	registry.unregister(&items[0]).unwrap();
	assert_eq!(ids(&registry), [3i64, 1, 7].map(AttrValue::from));

	registry.register(&items[0]).unwrap();
	assert_eq!(ids(&registry), [3i64, 1, 7, 5].map(AttrValue::from));
}

#[cfg_attr(test, test)]
pub(crate) fn test_order_preservation() {
	inv_order_preservation()
}

/// Invariant: A failed or panicking population leaves an empty, retryable registry.
pub(crate) fn inv_failed_population_recovers() {
	let attempts = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&attempts);
	let registry = Registry::<TestItem>::builder("invariants")
		.lookup_attr("id")
		.defaults(move || {
			// The first attempt carries a duplicate default.
			let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
			let mut items = vec![crate::test_fixtures::with_id("a")];
			items.push(crate::test_fixtures::with_id(if first { "a" } else { "b" }));
			items
		})
		.build()
		.unwrap();

	let err = registry.len().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::RegistrationConflict);
	assert_eq!(registry.state(), RegistryState::Pending);
	assert!(registry.index().is_empty());

	assert_eq!(registry.len().unwrap(), 2);
	assert_eq!(attempts.load(Ordering::SeqCst), 2);

	let panics = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&panics);
	let registry = Registry::<TestItem>::builder("invariants")
		.lookup_attr("id")
		.defaults(|| vec![crate::test_fixtures::with_id("a")])
		.on_populating(move |_| {
			if counter.fetch_add(1, Ordering::SeqCst) == 0 {
				panic!("populating hook panicked");
			}
			Ok(())
		})
		.build()
		.unwrap();

	let unwound = catch_unwind(AssertUnwindSafe(|| registry.populate()));
	assert!(unwound.is_err());
	assert_eq!(registry.state(), RegistryState::Pending);
	assert!(registry.index().is_empty());

	registry.populate().unwrap();
	assert_eq!(registry.state(), RegistryState::Ready);
	assert_eq!(registry.len().unwrap(), 1);
}

#[cfg_attr(test, test)]
pub(crate) fn test_failed_population_recovers() {
	inv_failed_population_recovers()
}

/// Invariant: Readers racing writes and resets only ever see complete snapshots.
///
/// Every default stays reachable under both attributes, and every visible item is bound under
/// both of its values.
pub(crate) fn inv_linearizable_reads() {
	const DEFAULTS: i64 = 4;
	const ROUNDS: i64 = 2000;
	const READERS: usize = 3;

	let registry = Registry::<TestItem>::builder("invariants")
		.lookup_attrs(ATTRS)
		.defaults(|| (0..DEFAULTS).map(|i| pair(i, i)).collect())
		.build()
		.unwrap();
	registry.populate().unwrap();
	let done = AtomicBool::new(false);

	thread::scope(|s| {
		s.spawn(|| {
			for k in 0..ROUNDS {
				let extra = pair(100 + k, 100 + k);
				registry.register(&extra).unwrap();
				registry.unregister(&extra).unwrap();
				if k % 50 == 0 {
					registry.reset().unwrap();
				}
			}
			done.store(true, Ordering::SeqCst);
		});

		for _ in 0..READERS {
			s.spawn(|| {
				while !done.load(Ordering::SeqCst) {
					let index = Arc::clone(&registry.iter().unwrap().index);
					let len = index.len();
					assert!(len == DEFAULTS as usize || len == DEFAULTS as usize + 1);
					assert_eq!(index.bindings().len(), len * ATTRS.len());
					for i in 0..DEFAULTS {
						assert!(index.lookup(0, &AttrValue::from(i)).is_some(), "default {i} missing");
					}
					for pos in 0..len {
						let it = index.get_index(pos).unwrap();
						for (attr, name) in ATTRS.iter().enumerate() {
							let bound = index.lookup(attr, &it.attr(name).unwrap()).unwrap();
							assert!(Arc::ptr_eq(bound, it));
						}
					}

					for i in 0..DEFAULTS {
						let by_id = registry.get(Query::attr("id", i)).unwrap();
						let by_name = registry.get(Query::attr("name", format!("n{i}"))).unwrap();
						assert!(Arc::ptr_eq(&by_id, &by_name));
					}
					let len = registry.len().unwrap();
					assert!(len == DEFAULTS as usize || len == DEFAULTS as usize + 1);
				}
			});
		}
	});

	assert_eq!(registry.len().unwrap(), DEFAULTS as usize);
}

#[cfg_attr(test, test)]
pub(crate) fn test_linearizable_reads() {
	inv_linearizable_reads()
}
