//! Canonical, dialect-independent model every XMI walker produces.
//!
//! Nodes live in arenas addressed by small integer handles; the source
//! document's opaque `xmi:id` strings are kept in lookup tables so walkers
//! can resolve cross-references while they go. Arena order is document
//! order, which later stages rely on for deterministic output.

use crate::error::ModelError;
use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssociationId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

impl Cardinality {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "one-to-one" => Some(Self::OneToOne),
            "one-to-many" => Some(Self::OneToMany),
            "many-to-one" => Some(Self::ManyToOne),
            "many-to-many" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
        }
    }

    /// The same association read from the other end.
    pub fn inverted(self) -> Self {
        match self {
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            symmetric => symmetric,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeData {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumData {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassData {
    pub name: String,
    pub table_name: String,
    pub fields: Vec<FieldId>,
    pub comment: Option<String>,
    pub dto: String,
    pub pagination: String,
    pub service: String,
}

impl ClassData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table_name: name.to_snake_case(),
            fields: Vec::new(),
            comment: None,
            dto: "no".to_string(),
            pagination: "no".to_string(),
            service: "no".to_string(),
        }
    }
}

/// A field's type is either a database scalar type or a declared enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Scalar(TypeId),
    Enum(EnumId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    pub name: String,
    pub field_type: TypeRef,
    pub comment: Option<String>,
    pub validations: Vec<ValidationData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationData {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssociationData {
    pub from: ClassId,
    pub to: ClassId,
    pub kind: Option<Cardinality>,
    pub injected_field_in_from: Option<String>,
    pub injected_field_in_to: Option<String>,
    pub comment_in_from: Option<String>,
    pub comment_in_to: Option<String>,
}

impl AssociationData {
    pub fn new(from: ClassId, to: ClassId) -> Self {
        Self {
            from,
            to,
            kind: None,
            injected_field_in_from: None,
            injected_field_in_to: None,
            comment_in_from: None,
            comment_in_to: None,
        }
    }

    /// Restates the association from its other end. A many-to-one read this
    /// way becomes the equivalent one-to-many; only the naming changes.
    pub fn invert(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
        std::mem::swap(
            &mut self.injected_field_in_from,
            &mut self.injected_field_in_to,
        );
        std::mem::swap(&mut self.comment_in_from, &mut self.comment_in_to);
        self.kind = self.kind.map(Cardinality::inverted);
    }
}

/// One side of an association, materialized as a field owned by a class.
/// This is what the scheduler traverses.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectedFieldData {
    pub name: String,
    /// The class the field lives on.
    pub class: ClassId,
    /// The class the field points at.
    pub target: ClassId,
    pub association: AssociationId,
    pub cardinality: Cardinality,
    /// Whether this side's upper bound is unbounded (collection-valued).
    pub collection: bool,
}

#[derive(Debug, Default)]
pub struct ParsedModel {
    classes: Vec<ClassData>,
    fields: Vec<FieldData>,
    types: Vec<TypeData>,
    enums: Vec<EnumData>,
    associations: Vec<AssociationData>,
    injected_fields: Vec<InjectedFieldData>,
    class_lookup: HashMap<String, ClassId>,
    type_lookup: HashMap<String, TypeId>,
    enum_lookup: HashMap<String, EnumId>,
    association_lookup: HashMap<String, AssociationId>,
    /// The class standing in for the platform's built-in user entity, when
    /// one was declared and user management is not excluded.
    pub user_class: Option<ClassId>,
}

impl ParsedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, xmi_id: &str, data: ClassData) -> Result<ClassId, ModelError> {
        if data.name.is_empty() {
            return Err(ModelError::MissingValue("class name"));
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(data);
        self.class_lookup.insert(xmi_id.to_string(), id);
        Ok(id)
    }

    pub fn class(&self, id: ClassId) -> &ClassData {
        &self.classes[id.0 as usize]
    }

    pub fn lookup_class(&self, xmi_id: &str) -> Option<ClassId> {
        self.class_lookup.get(xmi_id).copied()
    }

    /// Classes in document order.
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassData)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u32), c))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn add_field(&mut self, class: ClassId, data: FieldData) -> Result<FieldId, ModelError> {
        if data.name.is_empty() {
            return Err(ModelError::MissingValue("field name"));
        }
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(data);
        self.classes[class.0 as usize].fields.push(id);
        Ok(id)
    }

    pub fn field(&self, id: FieldId) -> &FieldData {
        &self.fields[id.0 as usize]
    }

    /// Registers a scalar type under the document's reference key. Repeated
    /// registrations under the same key return the original handle.
    pub fn register_type(&mut self, key: &str, name: &str) -> Result<TypeId, ModelError> {
        if name.is_empty() {
            return Err(ModelError::MissingValue("type name"));
        }
        if let Some(&id) = self.type_lookup.get(key) {
            return Ok(id);
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData {
            name: name.to_string(),
        });
        self.type_lookup.insert(key.to_string(), id);
        Ok(id)
    }

    pub fn scalar_type(&self, id: TypeId) -> &TypeData {
        &self.types[id.0 as usize]
    }

    pub fn lookup_type(&self, key: &str) -> Option<TypeId> {
        self.type_lookup.get(key).copied()
    }

    /// Registers an enum. Literal values are normalized to uppercase and
    /// deduplicated; an empty name or literal is a hard parse error.
    pub fn register_enum(
        &mut self,
        key: &str,
        name: &str,
        values: &[String],
    ) -> Result<EnumId, ModelError> {
        if name.is_empty() {
            return Err(ModelError::MissingValue("enum name"));
        }
        if values.is_empty() {
            return Err(ModelError::MissingValue("enum values"));
        }
        let mut normalized: Vec<String> = Vec::with_capacity(values.len());
        for value in values {
            if value.is_empty() {
                return Err(ModelError::MissingValue("enum value name"));
            }
            let upper = value.to_uppercase();
            if !normalized.contains(&upper) {
                normalized.push(upper);
            }
        }
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumData {
            name: name.to_string(),
            values: normalized,
        });
        self.enum_lookup.insert(key.to_string(), id);
        Ok(id)
    }

    pub fn enumeration(&self, id: EnumId) -> &EnumData {
        &self.enums[id.0 as usize]
    }

    pub fn lookup_enum(&self, key: &str) -> Option<EnumId> {
        self.enum_lookup.get(key).copied()
    }

    /// The display name of whatever a field's type reference points at.
    pub fn type_name(&self, field_type: TypeRef) -> &str {
        match field_type {
            TypeRef::Scalar(id) => &self.scalar_type(id).name,
            TypeRef::Enum(id) => &self.enumeration(id).name,
        }
    }

    pub fn add_association(&mut self, xmi_id: &str, data: AssociationData) -> AssociationId {
        let id = AssociationId(self.associations.len() as u32);
        self.associations.push(data);
        self.association_lookup.insert(xmi_id.to_string(), id);
        id
    }

    pub fn association(&self, id: AssociationId) -> &AssociationData {
        &self.associations[id.0 as usize]
    }

    pub fn association_mut(&mut self, id: AssociationId) -> &mut AssociationData {
        &mut self.associations[id.0 as usize]
    }

    pub fn lookup_association(&self, xmi_id: &str) -> Option<AssociationId> {
        self.association_lookup.get(xmi_id).copied()
    }

    pub fn associations(&self) -> impl Iterator<Item = (AssociationId, &AssociationData)> {
        self.associations
            .iter()
            .enumerate()
            .map(|(i, a)| (AssociationId(i as u32), a))
    }

    pub fn add_injected_field(&mut self, data: InjectedFieldData) {
        self.injected_fields.push(data);
    }

    pub fn injected_fields(&self) -> &[InjectedFieldData] {
        &self.injected_fields
    }

    pub fn is_user_class(&self, id: ClassId) -> bool {
        self.user_class == Some(id)
    }
}
