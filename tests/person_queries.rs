//! Person Query Tests
//!
//! End-to-end queries over a small Person collection:
//! - Multiplicity equality is containment, inequality its complement
//! - Empty AND/OR match every row
//! - Cursors are immutable, windowed, ordered and lazy

use std::sync::Arc;

use tablemongo::query::{and, not, or, Clause};
use tablemongo::{
    Database, Entity, EntityType, FieldDescriptor, FieldKind, FieldValue, MemoryStore,
    ModelRegistry,
};

// =============================================================================
// Helper Functions
// =============================================================================

struct Fixture {
    db: Database,
    store: Arc<MemoryStore>,
    person: Arc<EntityType>,
}

const PEOPLE: [(&str, f64, &[&str]); 5] = [
    ("Jane Doe", 18.2, &["Chair", "Tea"]),
    ("John Doe", 22.9, &["Chair"]),
    ("Uncle Doe", 34.1, &["Tea", "Chair", "Lamp"]),
    ("Aunty Doe", 42.6, &["Tea"]),
    ("Baby Doe", 1.5, &[]),
];

fn setup() -> Fixture {
    let registry = ModelRegistry::new();
    let person = EntityType::builder("Person")
        .field(FieldDescriptor::string("name"))
        .field(FieldDescriptor::float("age"))
        .field(
            FieldDescriptor::builder("things", FieldKind::String)
                .multiple()
                .build()
                .unwrap(),
        )
        .register(&registry)
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    let db = Database::new(store.clone(), Arc::new(registry));

    for (name, age, things) in PEOPLE {
        Entity::with_values(
            &person,
            [
                ("name", FieldValue::from(name)),
                ("age", FieldValue::from(age)),
                ("things", FieldValue::from(things.to_vec())),
            ],
        )
        .unwrap()
        .save(&db)
        .unwrap();
    }

    Fixture { db, store, person }
}

fn field(fixture: &Fixture, name: &str) -> FieldDescriptor {
    fixture.person.field(name).unwrap().clone()
}

fn names(entities: &[Entity]) -> Vec<String> {
    let mut names: Vec<String> = entities
        .iter()
        .map(|e| e.get("name").unwrap().as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

fn everyone() -> Vec<Clause> {
    Vec::new()
}

// =============================================================================
// Multiplicity Containment Tests
// =============================================================================

/// `things == [Chair, Tea]` matches people holding both items.
#[test]
fn test_multiplicity_equality_is_containment() {
    let fx = setup();
    let things = field(&fx, "things");

    let query = fx.db.query(&fx.person, [things.equals(vec!["Chair", "Tea"])]);
    let found = query.fetch(None, 0).unwrap();

    assert_eq!(names(&found), vec!["Jane Doe", "Uncle Doe"]);
    assert_eq!(query.count().unwrap(), 2);
}

/// `things != [Chair, Tea]` matches exactly the rest.
#[test]
fn test_multiplicity_inequality_is_complement() {
    let fx = setup();
    let things = field(&fx, "things");

    let query = fx
        .db
        .query(&fx.person, [things.not_equals(vec!["Chair", "Tea"]).unwrap()]);
    let found = query.fetch(None, 0).unwrap();

    assert_eq!(names(&found), vec!["Aunty Doe", "Baby Doe", "John Doe"]);
}

/// Single-element containment through `contains`.
#[test]
fn test_contains_single_item() {
    let fx = setup();
    let things = field(&fx, "things");

    let query = fx.db.query(&fx.person, [things.contains("Lamp").unwrap()]);
    assert_eq!(names(&query.fetch(None, 0).unwrap()), vec!["Uncle Doe"]);
}

/// OR of per-item equalities matches holders of either item.
#[test]
fn test_or_of_items() {
    let fx = setup();
    let things = field(&fx, "things");

    let query = fx
        .db
        .query(&fx.person, [or([things.equals("Lamp"), things.equals("Chair")])]);
    assert_eq!(query.count().unwrap(), 3);
}

// =============================================================================
// Logic Tree Tests
// =============================================================================

/// Empty AND and OR both match every row.
#[test]
fn test_empty_groups_match_all() {
    let fx = setup();

    let all_and = fx.db.query(&fx.person, [and(everyone())]);
    let all_or = fx.db.query(&fx.person, [or(everyone())]);

    assert_eq!(all_and.count().unwrap(), 5);
    assert_eq!(all_or.count().unwrap(), 5);
}

/// NOT over a range conjunction selects the people outside the range.
#[test]
fn test_not_range() {
    let fx = setup();
    let age = field(&fx, "age");

    let adults_under_forty = and([age.greater_or_equal(18.0), age.less_than(40.0)]);
    let query = fx.db.query(&fx.person, [not(adults_under_forty).unwrap()]);

    assert_eq!(names(&query.fetch(None, 0).unwrap()), vec!["Aunty Doe", "Baby Doe"]);
}

/// Regex predicates select by pattern and refuse negation.
#[test]
fn test_regex() {
    let fx = setup();
    let name = field(&fx, "name");

    let query = fx.db.query(&fx.person, [name.matches("^J")]);
    assert_eq!(names(&query.fetch(None, 0).unwrap()), vec!["Jane Doe", "John Doe"]);

    assert!(not(name.matches("^J")).is_err());
}

// =============================================================================
// Cursor Tests
// =============================================================================

/// `filter` returns a new cursor and leaves the original untouched.
#[test]
fn test_filter_does_not_mutate() {
    let fx = setup();
    let age = field(&fx, "age");

    let base = fx.db.query(&fx.person, everyone());
    let narrowed = base.filter([age.greater_than(30.0)]);

    assert_eq!(base.count().unwrap(), 5);
    assert_eq!(narrowed.count().unwrap(), 2);
    assert_eq!(
        base.compiled_filter().unwrap(),
        serde_json::json!({})
    );
}

/// Ordering and windows apply in the store; count ignores the window.
#[test]
fn test_order_offset_limit() {
    let fx = setup();
    let age = field(&fx, "age");

    let query = fx
        .db
        .query(&fx.person, everyone())
        .order_by(age.descending())
        .offset(1)
        .limit(2);

    let found: Vec<String> = query
        .iter()
        .unwrap()
        .map(|e| e.unwrap().get("name").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(found, vec!["Uncle Doe", "John Doe"]);
    assert_eq!(query.count().unwrap(), 5);

    let page = fx
        .db
        .query(&fx.person, everyone())
        .order_by(age.ascending())
        .fetch(Some(2), 3)
        .unwrap();
    let ages: Vec<f64> = page
        .iter()
        .map(|e| e.get("age").unwrap().as_f64().unwrap())
        .collect();
    assert_eq!(ages, vec![34.1, 42.6]);
}

/// Offsets past the end, however large, yield nothing.
#[test]
fn test_huge_offsets_are_empty() {
    let fx = setup();
    let query = fx.db.query(&fx.person, everyone()).offset(u64::MAX);

    assert!(query.fetch(None, u64::MAX).unwrap().is_empty());
    assert!(query.fetch_keys(Some(1), 5).unwrap().is_empty());
    assert!(query.get().unwrap().is_none());
}

/// Key-only fetches return keys of the queried type.
#[test]
fn test_fetch_keys() {
    let fx = setup();
    let things = field(&fx, "things");

    let query = fx.db.query(&fx.person, [things.equals("Tea")]);
    let keys = query.fetch_keys(None, 0).unwrap();

    assert_eq!(keys.len(), 3);
    for key in &keys {
        assert_eq!(key.kind(), "Person");
        assert!(key.get(&fx.db).unwrap().is_some());
    }
    assert_eq!(query.get_key().unwrap(), Some(keys[0].clone()));
}

/// `get` returns the first match, or `None` without error.
#[test]
fn test_get_first_or_none() {
    let fx = setup();
    let name = field(&fx, "name");

    let found = fx
        .db
        .query(&fx.person, [name.equals("Aunty Doe")])
        .get()
        .unwrap()
        .unwrap();
    assert_eq!(found.get("age").unwrap(), &FieldValue::Float(42.6));

    let missing = fx.db.query(&fx.person, [name.equals("Nobody")]);
    assert!(missing.get().unwrap().is_none());
    assert!(missing.get_key().unwrap().is_none());
}

/// Iteration pulls rows on demand and ends in a terminal state.
#[test]
fn test_iteration_is_lazy() {
    let fx = setup();
    let query = fx.db.query(&fx.person, everyone());

    let mut iter = query.iter().unwrap();
    let first = iter.next().unwrap().unwrap();
    assert!(first.key().is_some());
    assert_eq!(fx.store.documents_served(), 1);
    assert!(!iter.is_exhausted());

    assert_eq!(iter.by_ref().count(), 4);
    assert!(iter.is_exhausted());
    assert!(iter.next().is_none());
}

/// Key iteration reads ids only.
#[test]
fn test_iter_keys() {
    let fx = setup();
    let age = field(&fx, "age");

    let keys: Vec<_> = fx
        .db
        .query(&fx.person, [age.less_than(20.0)])
        .iter_keys()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(keys.len(), 2);
}

/// A value of the wrong type fails when the filter is compiled.
#[test]
fn test_bad_value_in_query() {
    let fx = setup();
    let age = field(&fx, "age");

    let query = fx.db.query(&fx.person, [age.equals("old")]);
    assert!(query.count().is_err());
    assert!(query.fetch(None, 0).is_err());
}
