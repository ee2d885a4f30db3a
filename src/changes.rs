//! Regeneration filtering against previously generated entities.
//!
//! The store of prior definitions is injected; how and where they were
//! persisted is the embedder's business. The comparison is structural and
//! ignores changelog stamps, so regenerating an untouched model selects
//! nothing.

use crate::entities::EntityDefinition;
use std::collections::{BTreeMap, HashMap};

/// Lookup of previously generated entity definitions by class name.
pub trait EntityStore {
    fn load(&self, name: &str) -> Option<EntityDefinition>;
}

/// Map-backed store for tests and embedders that keep definitions in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entities: HashMap<String, EntityDefinition>,
}

impl InMemoryStore {
    pub fn insert(&mut self, name: &str, definition: EntityDefinition) {
        self.entities.insert(name.to_string(), definition);
    }
}

impl EntityStore for InMemoryStore {
    fn load(&self, name: &str) -> Option<EntityDefinition> {
        self.entities.get(name).cloned()
    }
}

/// Keeps the candidates whose computed definition is new or differs from the
/// stored one, preserving candidate order.
pub fn filter_changed(
    candidates: &[String],
    computed: &BTreeMap<String, EntityDefinition>,
    store: &dyn EntityStore,
) -> Vec<String> {
    candidates
        .iter()
        .filter(|name| {
            let Some(current) = computed.get(name.as_str()) else {
                return false;
            };
            match store.load(name) {
                Some(previous) => differs(&previous, current),
                None => true,
            }
        })
        .cloned()
        .collect()
}

/// Field and relationship lists are compared in order; changelog dates are
/// excluded so an unchanged model does not look dirty on every run.
fn differs(previous: &EntityDefinition, current: &EntityDefinition) -> bool {
    previous.fields != current.fields
        || previous.relationships != current.relationships
        || previous.entity_table_name != current.entity_table_name
        || previous.dto != current.dto
        || previous.pagination != current.pagination
        || previous.service != current.service
        || previous.microservice_name != current.microservice_name
        || previous.search_engine != current.search_engine
        || previous.fluent_methods != current.fluent_methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::FieldDefinition;

    fn definition(table: &str) -> EntityDefinition {
        EntityDefinition {
            fields: Vec::new(),
            relationships: Vec::new(),
            changelog_date: "20160905101010".to_string(),
            javadoc: None,
            entity_table_name: table.to_string(),
            dto: "no".to_string(),
            pagination: "no".to_string(),
            service: "no".to_string(),
            microservice_name: None,
            search_engine: None,
            skip_client: false,
            skip_server: false,
            fluent_methods: true,
        }
    }

    fn field(name: &str) -> FieldDefinition {
        FieldDefinition {
            field_id: 1,
            field_name: name.to_string(),
            field_type: "String".to_string(),
            field_type_blob_content: None,
            field_values: None,
            javadoc: None,
            field_validate_rules: Vec::new(),
            field_validate_values: Default::default(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_entities_are_changed() {
        let computed = BTreeMap::from([("Region".to_string(), definition("region"))]);
        let changed = filter_changed(&names(&["Region"]), &computed, &InMemoryStore::default());
        assert_eq!(changed, names(&["Region"]));
    }

    #[test]
    fn test_identical_entities_are_filtered_out() {
        let computed = BTreeMap::from([("Region".to_string(), definition("region"))]);
        let mut store = InMemoryStore::default();
        store.insert("Region", definition("region"));

        let changed = filter_changed(&names(&["Region"]), &computed, &store);
        assert!(changed.is_empty());
    }

    #[test]
    fn test_changelog_date_alone_is_not_a_change() {
        let computed = BTreeMap::from([("Region".to_string(), definition("region"))]);
        let mut previous = definition("region");
        previous.changelog_date = "19990101000000".to_string();
        let mut store = InMemoryStore::default();
        store.insert("Region", previous);

        assert!(filter_changed(&names(&["Region"]), &computed, &store).is_empty());
    }

    #[test]
    fn test_field_change_is_detected() {
        let mut current = definition("region");
        current.fields.push(field("regionName"));
        let computed = BTreeMap::from([("Region".to_string(), current)]);
        let mut store = InMemoryStore::default();
        store.insert("Region", definition("region"));

        let changed = filter_changed(&names(&["Region"]), &computed, &store);
        assert_eq!(changed, names(&["Region"]));
    }

    #[test]
    fn test_option_change_is_detected() {
        let mut current = definition("region");
        current.dto = "mapstruct".to_string();
        let computed = BTreeMap::from([("Region".to_string(), current)]);
        let mut store = InMemoryStore::default();
        store.insert("Region", definition("region"));

        assert_eq!(
            filter_changed(&names(&["Region"]), &computed, &store),
            names(&["Region"])
        );
    }

    #[test]
    fn test_candidate_order_is_preserved() {
        let computed = BTreeMap::from([
            ("Alpha".to_string(), definition("alpha")),
            ("Beta".to_string(), definition("beta")),
            ("Gamma".to_string(), definition("gamma")),
        ]);
        let mut store = InMemoryStore::default();
        store.insert("Beta", definition("beta"));

        let changed = filter_changed(&names(&["Gamma", "Beta", "Alpha"]), &computed, &store);
        assert_eq!(changed, names(&["Gamma", "Alpha"]));
    }
}
