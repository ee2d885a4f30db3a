//! Entity and relationship assembly.
//!
//! Turns the canonical model into generator-facing entity definitions: one
//! entity per class carrying field records, relationship records derived
//! from the validated associations, resolved generation options and a
//! changelog stamp. Only the classes change here; the model itself is never
//! mutated.

use crate::changes::EntityStore;
use crate::database::DatabaseKind;
use crate::error::ModelError;
use crate::model::{AssociationData, Cardinality, ClassId, ParsedModel, TypeRef};
use crate::validator;
use chrono::{Duration, NaiveDateTime};
use heck::ToLowerCamelCase;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-entity generation options supplied by the caller. Maps and lists are
/// keyed by class name; names that match no parsed class are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectOptions {
    pub dto: HashMap<String, String>,
    pub pagination: HashMap<String, String>,
    pub service: HashMap<String, String>,
    pub microservice_names: HashMap<String, String>,
    pub search_engines: HashMap<String, String>,
    pub skip_client: Vec<String>,
    pub skip_server: Vec<String>,
    pub no_fluent_methods: Vec<String>,
    /// Base instant for fresh changelog stamps. Callers pass the wall
    /// clock; tests pass a fixed date.
    pub changelog_base: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub fields: Vec<FieldDefinition>,
    pub relationships: Vec<Relationship>,
    pub changelog_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub javadoc: Option<String>,
    pub entity_table_name: String,
    pub dto: String,
    pub pagination: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microservice_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_engine: Option<String>,
    #[serde(default)]
    pub skip_client: bool,
    #[serde(default)]
    pub skip_server: bool,
    #[serde(default = "fluent_methods_default")]
    pub fluent_methods: bool,
}

fn fluent_methods_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub field_id: u32,
    pub field_name: String,
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type_blob_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub javadoc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_validate_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_validate_values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub relationship_id: u32,
    pub relationship_name: String,
    pub relationship_type: Cardinality,
    pub other_entity_name: String,
    pub other_entity_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_side: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_entity_relationship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub javadoc: Option<String>,
}

/// Builds one entity definition per parsed class.
///
/// Associations are validated first and any validator error propagates
/// unchanged. Classes named `User` are built like the rest so that
/// relationships into them resolve, then dropped from the final map.
pub fn create_entities(
    model: &ParsedModel,
    database: DatabaseKind,
    options: &ProjectOptions,
    store: &dyn EntityStore,
) -> Result<BTreeMap<String, EntityDefinition>, ModelError> {
    if !database.supports_relationships() && model.associations().next().is_some() {
        return Err(ModelError::UnsupportedModeling { database });
    }
    for (_, association) in model.associations() {
        validator::validate_association(model, association)?;
    }

    let base = options.changelog_base.unwrap_or_default();
    let mut fresh_stamps: i64 = 0;

    // Relationship lists are built for every class up front because a
    // one-to-many with no declared inverse writes a back-reference into its
    // target's list, not its own.
    let mut relationships: HashMap<ClassId, Vec<Relationship>> = HashMap::new();
    for (id, _) in model.classes() {
        relationships.insert(id, Vec::new());
    }
    for (id, _) in model.classes() {
        build_relationships(model, id, &mut relationships);
    }

    let mut entities = BTreeMap::new();
    for (class_id, class) in model.classes() {
        let changelog_date = match store.load(&class.name) {
            Some(previous) => previous.changelog_date,
            None => {
                let stamp = base + Duration::seconds(fresh_stamps);
                fresh_stamps += 1;
                stamp.format("%Y%m%d%H%M%S").to_string()
            }
        };

        let definition = EntityDefinition {
            fields: build_fields(model, class_id),
            relationships: relationships.remove(&class_id).unwrap_or_default(),
            changelog_date,
            javadoc: class.comment.clone(),
            entity_table_name: class.table_name.clone(),
            dto: resolve(&options.dto, &class.name, &class.dto),
            pagination: resolve(&options.pagination, &class.name, &class.pagination),
            service: resolve(&options.service, &class.name, &class.service),
            microservice_name: options.microservice_names.get(&class.name).cloned(),
            search_engine: options.search_engines.get(&class.name).cloned(),
            skip_client: options.skip_client.iter().any(|n| n == &class.name),
            skip_server: options.skip_server.iter().any(|n| n == &class.name),
            fluent_methods: !options.no_fluent_methods.iter().any(|n| n == &class.name),
        };
        entities.insert(class.name.clone(), definition);
    }

    // The built-in user entity is managed by the platform: everything
    // pointing at it stays, the entity itself is not generated.
    if let Some(user) = model.user_class {
        entities.remove(&model.class(user).name);
    }

    Ok(entities)
}

fn resolve(overrides: &HashMap<String, String>, name: &str, fallback: &str) -> String {
    match overrides.get(name) {
        Some(value) => value.clone(),
        None => fallback.to_string(),
    }
}

fn build_fields(model: &ParsedModel, class_id: ClassId) -> Vec<FieldDefinition> {
    let mut fields = Vec::new();
    for &field_id in &model.class(class_id).fields {
        let field = model.field(field_id);
        let mut definition = FieldDefinition {
            field_id: fields.len() as u32 + 1,
            field_name: field.name.clone(),
            field_type: model.type_name(field.field_type).to_string(),
            field_type_blob_content: None,
            field_values: None,
            javadoc: field.comment.clone(),
            field_validate_rules: Vec::new(),
            field_validate_values: BTreeMap::new(),
        };

        match field.field_type {
            TypeRef::Enum(id) => {
                definition.field_values = Some(model.enumeration(id).values.clone());
            }
            TypeRef::Scalar(_) => {
                if let Some(content) = blob_content(&definition.field_type) {
                    definition.field_type = "byte[]".to_string();
                    definition.field_type_blob_content = Some(content.to_string());
                }
            }
        }

        for validation in &field.validations {
            definition.field_validate_rules.push(validation.name.clone());
            if let Some(value) = &validation.value {
                definition
                    .field_validate_values
                    .insert(validation.name.clone(), value.clone());
            }
        }
        fields.push(definition);
    }
    fields
}

/// Blob subtypes collapse into one byte-array type tagged with what the
/// bytes hold.
fn blob_content(type_name: &str) -> Option<&'static str> {
    match type_name {
        "ImageBlob" => Some("image"),
        "Blob" | "AnyBlob" => Some("any"),
        "TextBlob" => Some("text"),
        _ => None,
    }
}

fn build_relationships(
    model: &ParsedModel,
    class_id: ClassId,
    relationships: &mut HashMap<ClassId, Vec<Relationship>>,
) {
    for (_, association) in model.associations() {
        if association.from == class_id {
            add_from_side(model, association, relationships);
        }
    }
    for (_, association) in model.associations() {
        if association.to == class_id && association.injected_field_in_to.is_some() {
            add_to_side(model, association, relationships);
        }
    }
}

/// Relationship records for the owning ("from") end of an association.
fn add_from_side(
    model: &ParsedModel,
    association: &AssociationData,
    relationships: &mut HashMap<ClassId, Vec<Relationship>>,
) {
    let Some(kind) = association.kind else { return };
    let from_name = &model.class(association.from).name;
    let to_name = &model.class(association.to).name;
    let reference = extract_field(association.injected_field_in_from.as_deref());
    let inverse = extract_field(association.injected_field_in_to.as_deref());

    let record = match kind {
        Cardinality::OneToOne => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, to_name),
            relationship_type: kind,
            other_entity_name: to_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: Some(true),
            other_entity_relationship_name: Some(name_or(&inverse, from_name)),
            javadoc: association.comment_in_from.clone(),
        },
        Cardinality::OneToMany => {
            if association.injected_field_in_to.is_none() {
                // No declared inverse: the referenced side still needs a
                // back-reference, named after the owning class.
                push(
                    relationships,
                    association.to,
                    Relationship {
                        relationship_id: 0,
                        relationship_name: from_name.to_lower_camel_case(),
                        relationship_type: Cardinality::ManyToOne,
                        other_entity_name: from_name.to_lower_camel_case(),
                        other_entity_field: "id".to_string(),
                        owner_side: None,
                        other_entity_relationship_name: None,
                        javadoc: None,
                    },
                );
            }
            Relationship {
                relationship_id: 0,
                relationship_name: name_or(&reference, to_name),
                relationship_type: kind,
                other_entity_name: to_name.to_lower_camel_case(),
                other_entity_field: reference.other_field,
                owner_side: None,
                other_entity_relationship_name: Some(name_or(&inverse, from_name)),
                javadoc: association.comment_in_from.clone(),
            }
        }
        Cardinality::ManyToOne => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, to_name),
            relationship_type: kind,
            other_entity_name: to_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: None,
            other_entity_relationship_name: None,
            javadoc: association.comment_in_from.clone(),
        },
        Cardinality::ManyToMany => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, to_name),
            relationship_type: kind,
            other_entity_name: to_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: Some(true),
            other_entity_relationship_name: Some(name_or(&inverse, from_name)),
            javadoc: association.comment_in_from.clone(),
        },
    };
    push(relationships, association.from, record);
}

/// Relationship records for the referenced ("to") end. Only reached when
/// that end declares an injected field.
fn add_to_side(
    model: &ParsedModel,
    association: &AssociationData,
    relationships: &mut HashMap<ClassId, Vec<Relationship>>,
) {
    let Some(kind) = association.kind else { return };
    let from_name = &model.class(association.from).name;
    let to_name = &model.class(association.to).name;
    let reference = extract_field(association.injected_field_in_to.as_deref());
    let inverse = extract_field(association.injected_field_in_from.as_deref());

    let record = match kind {
        Cardinality::OneToOne => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, from_name),
            relationship_type: kind,
            other_entity_name: from_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: Some(false),
            other_entity_relationship_name: Some(name_or(&inverse, to_name)),
            javadoc: association.comment_in_to.clone(),
        },
        // Seen from the referenced side a one-to-many is a many-to-one,
        // and vice versa.
        Cardinality::OneToMany => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, from_name),
            relationship_type: Cardinality::ManyToOne,
            other_entity_name: from_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: None,
            other_entity_relationship_name: None,
            javadoc: association.comment_in_to.clone(),
        },
        Cardinality::ManyToOne => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, from_name),
            relationship_type: Cardinality::OneToMany,
            other_entity_name: from_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: None,
            other_entity_relationship_name: None,
            javadoc: association.comment_in_to.clone(),
        },
        Cardinality::ManyToMany => Relationship {
            relationship_id: 0,
            relationship_name: name_or(&reference, from_name),
            relationship_type: kind,
            other_entity_name: from_name.to_lower_camel_case(),
            other_entity_field: reference.other_field,
            owner_side: Some(false),
            other_entity_relationship_name: Some(name_or(&inverse, to_name)),
            javadoc: association.comment_in_to.clone(),
        },
    };
    push(relationships, association.to, record);
}

fn push(
    relationships: &mut HashMap<ClassId, Vec<Relationship>>,
    owner: ClassId,
    mut record: Relationship,
) {
    let list = relationships.entry(owner).or_default();
    record.relationship_id = list.len() as u32 + 1;
    list.push(record);
}

struct FieldReference {
    name: Option<String>,
    other_field: String,
}

/// Splits the `"name(otherField)"` mini-syntax carried by injected field
/// names. The other-entity field defaults to `id`; stray or unbalanced
/// parens degrade to the defaults.
fn extract_field(reference: Option<&str>) -> FieldReference {
    let mut result = FieldReference {
        name: None,
        other_field: "id".to_string(),
    };
    let Some(reference) = reference else {
        return result;
    };
    match reference.find('(') {
        Some(open) => {
            // Only a close paren past the open one counts; a stray close
            // earlier in the name would invert the slice.
            let close = reference[open + 1..]
                .find(')')
                .map(|at| open + 1 + at)
                .unwrap_or(reference.len());
            result.name = Some(reference[..open].to_string());
            let inner = &reference[open + 1..close];
            if !inner.is_empty() {
                result.other_field = inner.to_string();
            }
        }
        None if !reference.is_empty() => {
            result.name = Some(reference.to_string());
        }
        None => {}
    }
    result
}

fn name_or(reference: &FieldReference, fallback: &str) -> String {
    match &reference.name {
        Some(name) => name.to_lower_camel_case(),
        None => fallback.to_lower_camel_case(),
    }
}
