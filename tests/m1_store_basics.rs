//! Tests for M1: Store Basics
//! Covers TC-1.1 (keyed buckets), TC-1.2 (undefined keys), TC-1.3 (updates
//! and removal), TC-1.4 (index resolution)
//!
//! Run individual tests with:
//! cargo test tc_1_1 -- --nocapture
//! cargo test m1_store_basics -- --nocapture

use entcache::{Entity, Error, IndexDefinition, IndexKey, Store};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Doc {
    id: Uuid,
    name: &'static str,
    key: Option<&'static str>,
}

impl Entity for Doc {
    type Id = Uuid;
    fn id(&self) -> Uuid {
        self.id
    }
}

fn doc(name: &'static str, key: Option<&'static str>) -> Doc {
    Doc { id: Uuid::new_v4(), name, key }
}

fn by_key() -> IndexDefinition<Doc, &'static str> {
    IndexDefinition::new("key", |d: &Doc| d.key)
}

fn setup_store() -> Store<Doc> {
    Store::builder().with_index(&by_key()).build().unwrap()
}

fn names(docs: &[Arc<Doc>]) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = docs.iter().map(|d| d.name).collect();
    names.sort();
    names
}

mod tc_1_1_keyed_buckets {
    use super::*;

    #[test]
    fn test_get_by_key_then_remove() {
        let store = setup_store();
        let a = doc("A", Some("x"));
        let a_id = a.id;
        store.add_or_update_range(vec![a, doc("B", Some("x")), doc("C", Some("y"))]);

        let index = store.index(&by_key()).unwrap();
        assert_eq!(names(&index.get("x").unwrap()), vec!["A", "B"]);
        assert_eq!(names(&index.get("y").unwrap()), vec!["C"]);

        store.remove(&a_id);
        assert_eq!(names(&index.get("x").unwrap()), vec!["B"]);
        assert!(!store.contains(&a_id));
    }

    #[test]
    fn test_each_entity_in_exactly_one_bucket() {
        let store = setup_store();
        store.add_or_update_range(vec![
            doc("A", Some("x")),
            doc("B", Some("y")),
            doc("C", None),
            doc("D", Some("x")),
        ]);

        let index = store.index(&by_key()).unwrap();
        let mut total = index.get_with_undefined().len();
        for key in index.keys() {
            total += index.get(key).unwrap().len();
        }
        assert_eq!(total, store.len());
        assert_eq!(index.len(), store.len());
    }

    #[test]
    fn test_unknown_key_is_empty() {
        let store = setup_store();
        store.add_or_update(doc("A", Some("x")));
        assert!(store.index(&by_key()).unwrap().get("nope").unwrap().is_empty());
    }
}

mod tc_1_2_undefined_keys {
    use super::*;

    #[test]
    fn test_undefined_key_bucket() {
        let store = setup_store();
        store.add_or_update(doc("A", None));
        store.add_or_update(doc("B", Some("x")));

        let index = store.index(&by_key()).unwrap();
        assert_eq!(names(&index.get_with_undefined()), vec!["A"]);
        assert_eq!(index.keys(), vec!["x"]);
    }

    #[test]
    fn test_get_with_undefined_key_is_invalid_argument() {
        let store = setup_store();
        let err = store.index(&by_key()).unwrap().get(None::<&str>).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        println!("error: {}", err);
    }

    #[test]
    fn test_panicking_key_function_lands_in_undefined() {
        let fragile = IndexDefinition::new("fragile", |d: &Doc| {
            if d.name == "boom" {
                panic!("key extraction failed");
            }
            d.key
        });
        let store = Store::builder().with_index(&fragile).build().unwrap();
        let boom = doc("boom", Some("x"));
        let boom_id = boom.id;
        store.add_or_update(boom);
        store.add_or_update(doc("fine", Some("x")));

        let index = store.index(&fragile).unwrap();
        assert_eq!(names(&index.get_with_undefined()), vec!["boom"]);
        assert_eq!(names(&index.get("x").unwrap()), vec!["fine"]);
        assert_eq!(index.key_of(&boom_id), Some(IndexKey::Undefined));
        assert!(store.contains(&boom_id));
    }
}

mod tc_1_3_updates_and_removal {
    use super::*;

    #[test]
    fn test_add_or_update_is_idempotent() {
        let store = setup_store();
        let a = Arc::new(doc("A", Some("x")));
        store.add_or_update(Arc::clone(&a));
        store.add_or_update(Arc::clone(&a));

        let index = store.index(&by_key()).unwrap();
        assert_eq!(index.get("x").unwrap().len(), 1);
        assert_eq!(index.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_relocates_between_keys() {
        let store = setup_store();
        let a = doc("A", Some("x"));
        let id = a.id;
        store.add_or_update(a.clone());
        store.add_or_update(Doc { key: Some("y"), ..a.clone() });

        let index = store.index(&by_key()).unwrap();
        assert!(index.get("x").unwrap().is_empty());
        assert_eq!(names(&index.get("y").unwrap()), vec!["A"]);

        store.add_or_update(Doc { key: None, ..a });
        assert!(index.get("y").unwrap().is_empty());
        assert_eq!(index.ids_with_undefined_key(), vec![id]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let store = setup_store();
        store.add_or_update(doc("A", Some("x")));
        assert!(store.remove(&Uuid::new_v4()).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing_entity() {
        let store = setup_store();
        let err = store.get(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::EntityNotFound { .. }));
        assert!(store.try_get(&Uuid::new_v4()).is_none());
    }
}

mod tc_1_4_index_resolution {
    use super::*;

    #[test]
    fn test_undeclared_index_not_found() {
        let store = setup_store();
        let by_name = IndexDefinition::new("name", |d: &Doc| Some(d.name));

        assert!(store.contains_index_on(&by_key()));
        assert!(!store.contains_index_on(&by_name));
        assert!(matches!(store.index(&by_name), Err(Error::IndexNotFound { .. })));
    }

    #[test]
    fn test_index_handle_tracks_later_mutations() {
        let store = setup_store();
        let index = store.index(&by_key()).unwrap();
        store.add_or_update(doc("A", Some("x")));
        assert_eq!(index.get("x").unwrap().len(), 1);
    }
}
