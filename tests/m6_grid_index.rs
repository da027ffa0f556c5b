//! Tests for M6: Grid Indexes
//! Covers TC-6.1 (lookups through the store), TC-6.2 (maintenance on
//! update and removal)
//!
//! Run individual tests with:
//! cargo test tc_6_1 -- --nocapture
//! cargo test m6_grid_index -- --nocapture

use entcache::{Entity, Error, GridDefinition, IndexDefinition, Store};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Flight {
    id: u32,
    origin: Option<&'static str>,
    carrier: Option<&'static str>,
}

impl Entity for Flight {
    type Id = u32;
    fn id(&self) -> u32 {
        self.id
    }
}

fn flight(id: u32, origin: Option<&'static str>, carrier: Option<&'static str>) -> Flight {
    Flight { id, origin, carrier }
}

fn by_route() -> GridDefinition<Flight, &'static str, &'static str> {
    GridDefinition::new("route", |f: &Flight| f.origin, |f: &Flight| f.carrier)
}

fn setup_store() -> Store<Flight> {
    Store::builder()
        .with_grid_index(&by_route())
        .with_index(&IndexDefinition::new("carrier", |f: &Flight| f.carrier))
        .build_with(vec![
            flight(1, Some("CGK"), Some("GA")),
            flight(2, Some("CGK"), Some("QZ")),
            flight(3, Some("DPS"), Some("GA")),
            flight(4, None, Some("GA")),
            flight(5, Some("DPS"), None),
            flight(6, None, None),
        ])
        .unwrap()
}

fn ids(flights: Vec<Arc<Flight>>) -> Vec<u32> {
    let mut ids: Vec<u32> = flights.iter().map(|f| f.id).collect();
    ids.sort();
    ids
}

mod tc_6_1_lookups {
    use super::*;

    #[test]
    fn test_every_lookup_shape() {
        let store = setup_store();
        let grid = store.grid_index(&by_route()).unwrap();

        assert_eq!(ids(grid.get("CGK", "GA").unwrap()), vec![1]);
        assert_eq!(ids(grid.get_from_first("CGK").unwrap()), vec![1, 2]);
        assert_eq!(ids(grid.get_from_second("GA").unwrap()), vec![1, 3, 4]);
        assert_eq!(ids(grid.get_with_first_undefined("GA").unwrap()), vec![4]);
        assert_eq!(ids(grid.get_with_second_undefined("DPS").unwrap()), vec![5]);
        assert_eq!(ids(grid.get_with_both_undefined()), vec![6]);
        assert_eq!(grid.len(), 6);
    }

    #[test]
    fn test_undefined_key_rejected_by_keyed_lookups() {
        let store = setup_store();
        let grid = store.grid_index(&by_route()).unwrap();

        assert!(matches!(grid.get(None::<&str>, "GA"), Err(Error::InvalidArgument { .. })));
        assert!(matches!(grid.get_from_second(None::<&str>), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_grid_resolution() {
        let store = setup_store();
        let other = GridDefinition::new("legs", |f: &Flight| f.origin, |f: &Flight| f.carrier);

        assert!(store.contains_grid_index_on(&by_route()));
        assert!(!store.contains_grid_index_on(&other));
        assert!(matches!(store.grid_index(&other), Err(Error::IndexNotFound { .. })));
        // A grid is not a one-key index, even under the same name.
        assert!(!store.contains_index_on(&IndexDefinition::new("route", |f: &Flight| f.origin)));
        assert_eq!(store.index_names(), vec!["route", "carrier"]);
    }
}

mod tc_6_2_maintenance {
    use super::*;

    #[test]
    fn test_update_moves_cell_and_prunes_axes() {
        let store = setup_store();
        let grid = store.grid_index(&by_route()).unwrap();

        store.add_or_update(flight(2, Some("DPS"), Some("GA")));
        assert!(grid.get_from_second("QZ").unwrap().is_empty());
        assert_eq!(ids(grid.get("DPS", "GA").unwrap()), vec![2, 3]);

        let mut carriers = grid.second_keys();
        carriers.sort();
        assert_eq!(carriers, vec!["GA"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = setup_store();
        let grid = store.grid_index(&by_route()).unwrap();

        store.remove(&6);
        assert!(grid.get_with_both_undefined().is_empty());
        store.remove_range(&[1, 2]);
        assert!(grid.get_from_first("CGK").unwrap().is_empty());
        assert!(!grid.first_keys().contains(&"CGK"));

        store.clear();
        assert!(grid.is_empty());
        assert!(grid.first_keys().is_empty());
    }
}
