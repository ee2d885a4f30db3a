//! UML/XMI document parsing into the canonical model.
//!
//! One walker per modeling tool, all emitting the same `ParsedModel`. The
//! walkers share the parse session (registration, name checks, reference
//! resolution) and the cardinality math below; what differs per tool is
//! where declarations live, how multiplicity bounds are encoded and where
//! comments sit.

mod dialect;
mod genmymodel;
mod modelio;
mod umldesigner;
mod visualparadigm;

pub use dialect::Dialect;

use crate::database::DatabaseKind;
use crate::document::Element;
use crate::error::ModelError;
use crate::model::{
    AssociationData, AssociationId, Cardinality, ClassData, ClassId, EnumId, FieldData, FieldId,
    InjectedFieldData, ParsedModel, TypeId, TypeRef, ValidationData,
};
use heck::ToLowerCamelCase;
use std::collections::HashMap;

/// What a parse run needs to know besides the document itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub database: DatabaseKind,
    /// When set, a class named "User" is a regular entity instead of the
    /// platform's built-in user.
    pub skip_user_management: bool,
    /// Reserved table names fail instead of warning.
    pub enforce_table_names: bool,
}

/// Parses a tool export into the canonical model.
pub fn parse_document(
    root: &Element,
    dialect: Dialect,
    options: &ParseOptions,
) -> Result<ParsedModel, ModelError> {
    let dialect = dialect.resolve(root)?;
    let model_element = model_root(root)?;
    let mut session = Session::new(options);
    match dialect {
        Dialect::Auto => return Err(ModelError::UnknownDialect),
        Dialect::Modelio => modelio::parse(model_element, &mut session)?,
        Dialect::UmlDesigner => umldesigner::parse(model_element, &mut session)?,
        Dialect::GenMyModel => genmymodel::parse(model_element, &mut session)?,
        Dialect::VisualParadigm => visualparadigm::parse(model_element, &mut session)?,
    }
    Ok(session.finish())
}

/// The model element, unwrapped from an `xmi:XMI` envelope when present.
fn model_root(root: &Element) -> Result<&Element, ModelError> {
    if is_model(root) {
        return Ok(root);
    }
    root.children.iter().find(|c| is_model(c)).ok_or_else(|| {
        ModelError::InvalidDocument("document contains no uml:Model element".to_string())
    })
}

fn is_model(element: &Element) -> bool {
    element.tag == "uml:Model" || element.xmi_type() == Some("uml:Model")
}

fn required_id(element: &Element) -> Result<&str, ModelError> {
    element.xmi_id().ok_or_else(|| {
        ModelError::InvalidDocument(format!("{} element without an xmi:id", element.tag))
    })
}

/// Whether an upper bound marks a collection-valued end. Bounded uppers
/// above one have no relationship cardinality to map to.
fn collection_upper(value: Option<&str>) -> Result<bool, ModelError> {
    match value {
        None | Some("0") | Some("1") => Ok(false),
        Some("*") | Some("-1") => Ok(true),
        Some(other) => Err(ModelError::UnsupportedAssociation {
            kind: format!("upper bound {other}"),
        }),
    }
}

/// Whether a lower bound makes the element mandatory.
fn required_lower(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .is_some_and(|n| n >= 1)
}

/// The element's `name` attribute; tools write empty strings for unnamed
/// ends, which count as absent.
fn declared_name(element: &Element) -> Option<String> {
    element
        .attr("name")
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// How a class participates in an association, read off one end: if this
/// end is collection-valued its holder keeps many of the target, and the
/// opposite end says how many holders each target accepts.
fn end_cardinality(collection: bool, other_collection: bool) -> Cardinality {
    match (collection, other_collection) {
        (true, true) => Cardinality::ManyToMany,
        (true, false) => Cardinality::OneToMany,
        (false, true) => Cardinality::ManyToOne,
        (false, false) => Cardinality::OneToOne,
    }
}

/// One association end as the walkers hand it over: resolved participant
/// classes plus whatever the document declared on the end itself.
struct AssociationEnd {
    /// The class the end's field lives on (or would live on).
    holder: ClassId,
    /// The class the end points at.
    target: ClassId,
    name: Option<String>,
    collection: bool,
    comment: Option<String>,
    /// Navigable ends are `ownedAttribute`s of a class and materialize as
    /// injected fields; non-navigable ends only carry multiplicity.
    navigable: bool,
}

/// A non-navigable end parsed off the association element itself.
struct OwnedEnd {
    target: ClassId,
    name: Option<String>,
    collection: bool,
}

/// Pairs an association's ends. Navigable ends arrive from the class walk;
/// owned ends belong to the association element and their holder is the
/// opposite participant.
fn pair_ends(
    xmi_id: &str,
    mut navigable: Vec<AssociationEnd>,
    mut owned: Vec<OwnedEnd>,
) -> Result<(AssociationEnd, AssociationEnd), ModelError> {
    match (navigable.len(), owned.len()) {
        (2, 0) => {
            let first = navigable.remove(0);
            let second = navigable.remove(0);
            Ok((first, second))
        }
        (1, 1) => {
            let first = navigable.remove(0);
            let end = owned.remove(0);
            let second = AssociationEnd {
                holder: first.target,
                target: end.target,
                name: end.name,
                collection: end.collection,
                comment: None,
                navigable: false,
            };
            Ok((first, second))
        }
        (0, 2) => {
            let a = owned.remove(0);
            let b = owned.remove(0);
            let first = AssociationEnd {
                holder: b.target,
                target: a.target,
                name: a.name,
                collection: a.collection,
                comment: None,
                navigable: false,
            };
            let second = AssociationEnd {
                holder: first.target,
                target: b.target,
                name: b.name,
                collection: b.collection,
                comment: None,
                navigable: false,
            };
            Ok((first, second))
        }
        _ => Err(ModelError::InvalidDocument(format!(
            "association {xmi_id} must connect exactly two ends"
        ))),
    }
}

/// Collects a class's `ownedRule` constraints, keyed by the constrained
/// attribute's id. Most tools keep the rule value in a `specification`
/// child element; GenMyModel uses a `specification` attribute.
fn class_rules(
    class_element: &Element,
    value_in_attr: bool,
) -> Result<HashMap<String, Vec<ValidationData>>, ModelError> {
    let mut rules: HashMap<String, Vec<ValidationData>> = HashMap::new();
    for rule in class_element.children_named("ownedRule") {
        let name = rule
            .attr("name")
            .ok_or(ModelError::MissingValue("validation name"))?;
        let Some(constrained) = rule.attr("constrainedElement") else {
            continue;
        };
        let value = if value_in_attr {
            rule.attr("specification").map(str::to_string)
        } else {
            rule.child("specification")
                .and_then(|spec| spec.attr("value"))
                .map(str::to_string)
        };
        rules
            .entry(constrained.to_string())
            .or_default()
            .push(ValidationData {
                name: name.to_string(),
                value,
            });
    }
    Ok(rules)
}

/// Carries the model under construction plus everything registration has
/// to check it against.
struct Session {
    database: DatabaseKind,
    skip_user_management: bool,
    enforce_table_names: bool,
    model: ParsedModel,
}

impl Session {
    fn new(options: &ParseOptions) -> Self {
        Self {
            database: options.database,
            skip_user_management: options.skip_user_management,
            enforce_table_names: options.enforce_table_names,
            model: ParsedModel::new(),
        }
    }

    fn finish(self) -> ParsedModel {
        self.model
    }

    fn register_class(
        &mut self,
        xmi_id: &str,
        name: Option<&str>,
        comment: Option<String>,
    ) -> Result<ClassId, ModelError> {
        let name = name.ok_or(ModelError::MissingValue("class name"))?;
        // The built-in user entity is dropped after assembly; its name and
        // table belong to the platform, so reserved-word checks do not
        // apply to it.
        let built_in_user = !self.skip_user_management && name.eq_ignore_ascii_case("user");
        let mut data = ClassData::new(name);
        data.comment = comment;
        if !built_in_user {
            self.database.check_class_name(name)?;
            self.database
                .check_table_name(&data.table_name, self.enforce_table_names)?;
        }
        let id = self.model.add_class(xmi_id, data)?;
        if built_in_user {
            self.model.user_class = Some(id);
        }
        Ok(id)
    }

    fn register_scalar_type(
        &mut self,
        key: &str,
        name: Option<&str>,
    ) -> Result<TypeId, ModelError> {
        let name = name.ok_or(ModelError::MissingValue("type name"))?;
        if !self.database.supports_type(name) {
            return Err(ModelError::UnsupportedType {
                name: name.to_string(),
                database: self.database,
            });
        }
        self.model.register_type(key, name)
    }

    fn register_enum(
        &mut self,
        xmi_id: &str,
        name: Option<&str>,
        values: &[String],
    ) -> Result<EnumId, ModelError> {
        let name = name.ok_or(ModelError::MissingValue("enum name"))?;
        self.model.register_enum(xmi_id, name, values)
    }

    fn register_field(
        &mut self,
        class: ClassId,
        name: Option<&str>,
        field_type: TypeRef,
        comment: Option<String>,
        validations: Vec<ValidationData>,
    ) -> Result<FieldId, ModelError> {
        let name = name.ok_or(ModelError::MissingValue("field name"))?;
        self.database.check_field_name(name);
        let table_key = match field_type {
            TypeRef::Scalar(id) => self.model.scalar_type(id).name.clone(),
            TypeRef::Enum(id) => {
                if !self.database.supports_enums() {
                    return Err(ModelError::UnsupportedType {
                        name: self.model.enumeration(id).name.clone(),
                        database: self.database,
                    });
                }
                "Enum".to_string()
            }
        };
        for validation in &validations {
            self.database.check_validation(&table_key, &validation.name)?;
        }
        self.model.add_field(
            class,
            FieldData {
                name: name.to_string(),
                field_type,
                comment,
                validations,
            },
        )
    }

    /// Resolves an attribute's `type` reference to a declared enum or
    /// scalar type. A class reference here is a relationship end that lost
    /// its `association` attribute.
    fn field_type(&self, reference: &str) -> Result<TypeRef, ModelError> {
        if let Some(id) = self.model.lookup_enum(reference) {
            return Ok(TypeRef::Enum(id));
        }
        if let Some(id) = self.model.lookup_type(reference) {
            return Ok(TypeRef::Scalar(id));
        }
        if let Some(id) = self.model.lookup_class(reference) {
            return Err(ModelError::InvalidDocument(format!(
                "attribute typed by class {} carries no association",
                self.model.class(id).name
            )));
        }
        Err(ModelError::InvalidDocument(format!(
            "unknown type reference {reference}"
        )))
    }

    fn class_by_ref(&self, reference: &str) -> Result<ClassId, ModelError> {
        self.model.lookup_class(reference).ok_or_else(|| {
            ModelError::InvalidDocument(format!(
                "association end references unknown class {reference}"
            ))
        })
    }

    /// Stores the association in its canonical reading and one injected
    /// field per navigable end.
    ///
    /// The source side is the end whose class owns the reference: the
    /// declared collection side when there is one, otherwise the
    /// field-bearing side (document order breaks remaining ties).
    fn record_association(
        &mut self,
        xmi_id: &str,
        first: AssociationEnd,
        second: AssociationEnd,
    ) -> AssociationId {
        let first_is_source = if !first.collection && second.collection {
            first.navigable && !second.navigable
        } else {
            first.navigable || !second.navigable
        };
        let (source, target) = if first_is_source {
            (first, second)
        } else {
            (second, first)
        };

        let mut data = AssociationData::new(source.holder, target.holder);
        data.kind = Some(end_cardinality(source.collection, target.collection));
        if source.navigable {
            data.injected_field_in_from = source.name.clone();
            data.comment_in_from = source.comment.clone();
        }
        if target.navigable {
            data.injected_field_in_to = target.name.clone();
            data.comment_in_to = target.comment.clone();
        }
        let id = self.model.add_association(xmi_id, data);

        for (end, other) in [(&source, &target), (&target, &source)] {
            if !end.navigable {
                continue;
            }
            let name = end
                .name
                .clone()
                .unwrap_or_else(|| self.model.class(end.target).name.to_lower_camel_case());
            self.model.add_injected_field(InjectedFieldData {
                name,
                class: end.holder,
                target: end.target,
                association: id,
                cardinality: end_cardinality(end.collection, other.collection),
                collection: end.collection,
            });
        }
        id
    }

    fn association_kind(&self, id: AssociationId) -> Option<Cardinality> {
        self.model.association(id).kind
    }

    fn invert_association(&mut self, id: AssociationId) {
        self.model.association_mut(id).invert();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&ParseOptions::default())
    }

    fn end(holder: ClassId, target: ClassId, name: &str, collection: bool) -> AssociationEnd {
        AssociationEnd {
            holder,
            target,
            name: Some(name.to_string()),
            collection,
            comment: None,
            navigable: true,
        }
    }

    fn silent_end(holder: ClassId, target: ClassId, collection: bool) -> AssociationEnd {
        AssociationEnd {
            holder,
            target,
            name: None,
            collection,
            comment: None,
            navigable: false,
        }
    }

    #[test]
    fn test_end_cardinality_table() {
        assert_eq!(end_cardinality(false, false), Cardinality::OneToOne);
        assert_eq!(end_cardinality(true, false), Cardinality::OneToMany);
        assert_eq!(end_cardinality(false, true), Cardinality::ManyToOne);
        assert_eq!(end_cardinality(true, true), Cardinality::ManyToMany);
    }

    #[test]
    fn test_collection_upper_bounds() {
        assert!(!collection_upper(None).unwrap());
        assert!(!collection_upper(Some("1")).unwrap());
        assert!(collection_upper(Some("*")).unwrap());
        assert!(collection_upper(Some("-1")).unwrap());
        assert!(matches!(
            collection_upper(Some("5")),
            Err(ModelError::UnsupportedAssociation { .. })
        ));
    }

    #[test]
    fn test_required_lower_bounds() {
        assert!(required_lower(Some("1")));
        assert!(required_lower(Some("2")));
        assert!(!required_lower(Some("0")));
        assert!(!required_lower(None));
        assert!(!required_lower(Some("*")));
    }

    #[test]
    fn test_bidirectional_one_to_many_canonicalizes_to_collection_side() {
        let mut session = session();
        let dept = session
            .register_class("_d", Some("Department"), None)
            .unwrap();
        let emp = session.register_class("_e", Some("Employee"), None).unwrap();

        // Scalar end first: the collection side must still come out as the
        // association's source.
        session.record_association(
            "_a",
            end(emp, dept, "department", false),
            end(dept, emp, "employee", true),
        );

        let model = session.finish();
        let (_, association) = model.associations().next().unwrap();
        assert_eq!(association.kind, Some(Cardinality::OneToMany));
        assert_eq!(association.from, dept);
        assert_eq!(association.to, emp);
        assert_eq!(association.injected_field_in_from.as_deref(), Some("employee"));
        assert_eq!(
            association.injected_field_in_to.as_deref(),
            Some("department")
        );

        let fields = model.injected_fields();
        assert_eq!(fields.len(), 2);
        let forward = fields.iter().find(|f| f.class == dept).unwrap();
        assert_eq!(forward.cardinality, Cardinality::OneToMany);
        assert!(forward.collection);
        let back = fields.iter().find(|f| f.class == emp).unwrap();
        assert_eq!(back.cardinality, Cardinality::ManyToOne);
        assert!(!back.collection);
    }

    #[test]
    fn test_unidirectional_many_to_one_keeps_field_bearing_source() {
        let mut session = session();
        let car = session.register_class("_c", Some("Car"), None).unwrap();
        let driver = session.register_class("_dr", Some("Driver"), None).unwrap();

        session.record_association(
            "_a",
            end(car, driver, "driver", false),
            silent_end(driver, car, true),
        );

        let model = session.finish();
        let (_, association) = model.associations().next().unwrap();
        assert_eq!(association.kind, Some(Cardinality::ManyToOne));
        assert_eq!(association.from, car);
        assert_eq!(association.injected_field_in_from.as_deref(), Some("driver"));
        assert_eq!(association.injected_field_in_to, None);
        assert_eq!(model.injected_fields().len(), 1);
    }

    #[test]
    fn test_unnamed_navigable_end_defaults_injected_field_name() {
        let mut session = session();
        let dept = session
            .register_class("_d", Some("Department"), None)
            .unwrap();
        let emp = session.register_class("_e", Some("Employee"), None).unwrap();

        let mut forward = end(dept, emp, "", true);
        forward.name = None;
        session.record_association("_a", forward, silent_end(emp, dept, false));

        let model = session.finish();
        assert_eq!(model.injected_fields()[0].name, "employee");
        let (_, association) = model.associations().next().unwrap();
        assert_eq!(association.injected_field_in_from, None);
    }

    #[test]
    fn test_pair_ends_rejects_odd_counts() {
        assert!(matches!(
            pair_ends("_a", Vec::new(), Vec::new()),
            Err(ModelError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_user_class_registration() {
        let mut session = session();
        let user = session.register_class("_u", Some("User"), None).unwrap();
        let model = session.finish();
        assert_eq!(model.user_class, Some(user));

        let mut session = Session::new(&ParseOptions {
            skip_user_management: true,
            ..ParseOptions::default()
        });
        // A regular User entity collides with the reserved SQL word.
        assert!(matches!(
            session.register_class("_u", Some("User"), None),
            Err(ModelError::IllegalName { .. })
        ));
    }

    #[test]
    fn test_field_validations_checked_against_type() {
        let mut session = session();
        let class = session.register_class("_c", Some("Region"), None).unwrap();
        let ty = session.register_scalar_type("_t", Some("Boolean")).unwrap();
        let err = session
            .register_field(
                class,
                Some("active"),
                TypeRef::Scalar(ty),
                None,
                vec![ValidationData {
                    name: "minlength".to_string(),
                    value: Some("2".to_string()),
                }],
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedValidation { .. }));
    }

    #[test]
    fn test_unsupported_scalar_type_is_rejected_at_registration() {
        let mut session = Session::new(&ParseOptions {
            database: DatabaseKind::Cassandra,
            ..ParseOptions::default()
        });
        assert!(matches!(
            session.register_scalar_type("_t", Some("ZonedDateTime")),
            Err(ModelError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_model_root_unwraps_envelope() {
        let root = Element::new("xmi:XMI")
            .with_child(Element::new("xmi:Documentation"))
            .with_child(Element::new("uml:Model").with_attr("name", "shop"));
        assert_eq!(model_root(&root).unwrap().attr("name"), Some("shop"));

        let bare = Element::new("html");
        assert!(matches!(
            model_root(&bare),
            Err(ModelError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_parse_document_requires_a_known_dialect() {
        let root = Element::new("uml:Model");
        assert!(matches!(
            parse_document(&root, Dialect::Auto, &ParseOptions::default()),
            Err(ModelError::UnknownDialect)
        ));
    }
}
