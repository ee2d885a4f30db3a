//! Modelio export walker.
//!
//! Modelio keeps every declaration as a flat `packagedElement` under the
//! model root. Library primitives are referenced through a `type` child
//! carrying an `href` fragment, multiplicity bounds sit in
//! `lowerValue`/`upperValue` children and comments in an `ownedComment`
//! child's `body` element.

use super::{
    class_rules, collection_upper, declared_name, pair_ends, required_id, required_lower,
    AssociationEnd, OwnedEnd, Session,
};
use crate::document::Element;
use crate::error::ModelError;
use crate::model::{ClassId, TypeRef, ValidationData};
use std::collections::HashMap;

pub fn parse(model: &Element, session: &mut Session) -> Result<(), ModelError> {
    let mut classes: Vec<(&Element, ClassId)> = Vec::new();
    let mut associations: Vec<&Element> = Vec::new();

    // Declarations first so every cross-reference resolves during the
    // attribute walk, whatever order the tool exported them in.
    for element in model.children_named("packagedElement") {
        match element.xmi_type() {
            Some("uml:Class") => {
                let id = session.register_class(
                    required_id(element)?,
                    element.attr("name"),
                    comment(element),
                )?;
                classes.push((element, id));
            }
            Some("uml:Enumeration") => register_enumeration(element, session)?,
            Some("uml:PrimitiveType") | Some("uml:DataType") => {
                session.register_scalar_type(required_id(element)?, element.attr("name"))?;
            }
            Some("uml:Association") => associations.push(element),
            _ => {}
        }
    }

    let mut pending: HashMap<String, Vec<AssociationEnd>> = HashMap::new();
    for (element, id) in &classes {
        walk_class(element, *id, session, &mut pending)?;
    }

    for element in associations {
        let id = required_id(element)?;
        let navigable = pending.remove(id).unwrap_or_default();
        let owned = owned_ends(element, session)?;
        let (first, second) = pair_ends(id, navigable, owned)?;
        session.record_association(id, first, second);
    }

    if let Some(id) = pending.keys().next() {
        return Err(ModelError::InvalidDocument(format!(
            "relationship end references unknown association {id}"
        )));
    }
    Ok(())
}

fn register_enumeration(element: &Element, session: &mut Session) -> Result<(), ModelError> {
    let mut values = Vec::new();
    for literal in element.children_named("ownedLiteral") {
        values.push(
            literal
                .attr("name")
                .ok_or(ModelError::MissingValue("enum value name"))?
                .to_string(),
        );
    }
    session.register_enum(required_id(element)?, element.attr("name"), &values)?;
    Ok(())
}

fn walk_class(
    element: &Element,
    class: ClassId,
    session: &mut Session,
    pending: &mut HashMap<String, Vec<AssociationEnd>>,
) -> Result<(), ModelError> {
    let mut rules = class_rules(element, false)?;

    for attribute in element.children_named("ownedAttribute") {
        if let Some(association) = attribute.attr("association") {
            let reference = attribute
                .attr("type")
                .ok_or(ModelError::MissingValue("association end type"))?;
            pending
                .entry(association.to_string())
                .or_default()
                .push(AssociationEnd {
                    holder: class,
                    target: session.class_by_ref(reference)?,
                    name: declared_name(attribute),
                    collection: collection_upper(bound(attribute, "upperValue"))?,
                    comment: comment(attribute),
                    navigable: true,
                });
            continue;
        }

        let field_type = attribute_type(attribute, session)?;
        let mut validations = Vec::new();
        if required_lower(bound(attribute, "lowerValue")) {
            validations.push(ValidationData {
                name: "required".to_string(),
                value: None,
            });
        }
        if let Some(id) = attribute.xmi_id() {
            validations.extend(rules.remove(id).unwrap_or_default());
        }
        session.register_field(
            class,
            attribute.attr("name"),
            field_type,
            comment(attribute),
            validations,
        )?;
    }
    Ok(())
}

/// An attribute's type: an id reference to a declared type, or a library
/// primitive pulled in by href.
fn attribute_type(attribute: &Element, session: &mut Session) -> Result<TypeRef, ModelError> {
    if let Some(reference) = attribute.attr("type") {
        return session.field_type(reference);
    }
    if let Some(href) = attribute.child("type").and_then(|t| t.attr("href")) {
        let name = match href.rsplit_once('#') {
            Some((_, name)) => name,
            None => href,
        };
        let id = session.register_scalar_type(name, Some(name))?;
        return Ok(TypeRef::Scalar(id));
    }
    Err(ModelError::MissingValue("field type"))
}

fn owned_ends(element: &Element, session: &Session) -> Result<Vec<OwnedEnd>, ModelError> {
    let mut ends = Vec::new();
    for end in element.children_named("ownedEnd") {
        let reference = end
            .attr("type")
            .ok_or(ModelError::MissingValue("association end type"))?;
        ends.push(OwnedEnd {
            target: session.class_by_ref(reference)?,
            name: declared_name(end),
            collection: collection_upper(bound(end, "upperValue"))?,
        });
    }
    Ok(ends)
}

fn comment(element: &Element) -> Option<String> {
    element
        .child("ownedComment")
        .and_then(|c| c.child_text("body"))
        .map(str::to_string)
}

fn bound<'a>(element: &'a Element, tag: &str) -> Option<&'a str> {
    element.child(tag).and_then(|b| b.attr("value"))
}

#[cfg(test)]
mod tests {
    use super::super::ParseOptions;
    use super::*;
    use crate::model::Cardinality;

    fn class(id: &str, name: &str) -> Element {
        Element::new("packagedElement")
            .with_attr("xmi:type", "uml:Class")
            .with_attr("xmi:id", id)
            .with_attr("name", name)
    }

    fn value_child(tag: &str, value: &str) -> Element {
        Element::new(tag).with_attr("value", value)
    }

    fn parsed(model: &Element) -> crate::model::ParsedModel {
        let mut session = Session::new(&ParseOptions::default());
        parse(model, &mut session).unwrap();
        session.finish()
    }

    #[test]
    fn test_classes_fields_and_rules() {
        let model = Element::new("uml:Model")
            .with_child(
                Element::new("packagedElement")
                    .with_attr("xmi:type", "uml:PrimitiveType")
                    .with_attr("xmi:id", "_long")
                    .with_attr("name", "Long"),
            )
            .with_child(
                Element::new("packagedElement")
                    .with_attr("xmi:type", "uml:Enumeration")
                    .with_attr("xmi:id", "_lang")
                    .with_attr("name", "Language")
                    .with_child(Element::new("ownedLiteral").with_attr("name", "french"))
                    .with_child(Element::new("ownedLiteral").with_attr("name", "english")),
            )
            .with_child(
                class("_region", "Region")
                    .with_child(
                        Element::new("ownedComment")
                            .with_child(Element::new("body").with_text("A geographic region.")),
                    )
                    .with_child(
                        Element::new("ownedAttribute")
                            .with_attr("xmi:id", "_r_name")
                            .with_attr("name", "regionName")
                            .with_child(
                                Element::new("type")
                                    .with_attr("href", "pathmap://UML_LIBRARIES#String"),
                            )
                            .with_child(value_child("lowerValue", "1")),
                    )
                    .with_child(
                        Element::new("ownedAttribute")
                            .with_attr("xmi:id", "_r_code")
                            .with_attr("name", "code")
                            .with_attr("type", "_long"),
                    )
                    .with_child(
                        Element::new("ownedAttribute")
                            .with_attr("xmi:id", "_r_lang")
                            .with_attr("name", "language")
                            .with_attr("type", "_lang"),
                    )
                    .with_child(
                        Element::new("ownedRule")
                            .with_attr("name", "maxlength")
                            .with_attr("constrainedElement", "_r_name")
                            .with_child(value_child("specification", "50")),
                    ),
            );

        let parsed = parsed(&model);
        let (_, region) = parsed.classes().next().unwrap();
        assert_eq!(region.name, "Region");
        assert_eq!(region.comment.as_deref(), Some("A geographic region."));
        assert_eq!(region.fields.len(), 3);

        let name_field = parsed.field(region.fields[0]);
        assert_eq!(parsed.type_name(name_field.field_type), "String");
        let rule_names: Vec<&str> = name_field
            .validations
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(rule_names, vec!["required", "maxlength"]);
        assert_eq!(name_field.validations[1].value.as_deref(), Some("50"));

        assert_eq!(
            parsed.type_name(parsed.field(region.fields[1]).field_type),
            "Long"
        );
        let lang = parsed.field(region.fields[2]);
        assert!(matches!(lang.field_type, TypeRef::Enum(_)));
        assert_eq!(parsed.type_name(lang.field_type), "Language");
    }

    #[test]
    fn test_bidirectional_one_to_many() {
        let model = Element::new("uml:Model")
            .with_child(
                class("_dept", "Department").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_d_emp")
                        .with_attr("name", "employee")
                        .with_attr("type", "_emp")
                        .with_attr("association", "_works_in")
                        .with_child(value_child("upperValue", "*")),
                ),
            )
            .with_child(
                class("_emp", "Employee").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_e_dept")
                        .with_attr("name", "department")
                        .with_attr("type", "_dept")
                        .with_attr("association", "_works_in"),
                ),
            )
            .with_child(
                Element::new("packagedElement")
                    .with_attr("xmi:type", "uml:Association")
                    .with_attr("xmi:id", "_works_in"),
            );

        let parsed = parsed(&model);
        let (_, association) = parsed.associations().next().unwrap();
        assert_eq!(association.kind, Some(Cardinality::OneToMany));
        assert_eq!(parsed.class(association.from).name, "Department");
        assert_eq!(parsed.class(association.to).name, "Employee");
        assert_eq!(
            association.injected_field_in_from.as_deref(),
            Some("employee")
        );
        assert_eq!(
            association.injected_field_in_to.as_deref(),
            Some("department")
        );
        assert_eq!(parsed.injected_fields().len(), 2);
    }

    #[test]
    fn test_unidirectional_many_to_one_with_owned_end() {
        let model = Element::new("uml:Model")
            .with_child(
                class("_car", "Car").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_c_drv")
                        .with_attr("name", "driver")
                        .with_attr("type", "_drv")
                        .with_attr("association", "_drives"),
                ),
            )
            .with_child(class("_drv", "Driver"))
            .with_child(
                Element::new("packagedElement")
                    .with_attr("xmi:type", "uml:Association")
                    .with_attr("xmi:id", "_drives")
                    .with_child(
                        Element::new("ownedEnd")
                            .with_attr("xmi:id", "_drives_src")
                            .with_attr("type", "_car")
                            .with_child(value_child("upperValue", "*")),
                    ),
            );

        let parsed = parsed(&model);
        let (_, association) = parsed.associations().next().unwrap();
        assert_eq!(association.kind, Some(Cardinality::ManyToOne));
        assert_eq!(parsed.class(association.from).name, "Car");
        assert_eq!(association.injected_field_in_from.as_deref(), Some("driver"));
        assert_eq!(association.injected_field_in_to, None);
        assert_eq!(parsed.injected_fields().len(), 1);
    }

    #[test]
    fn test_end_referencing_unknown_association_fails() {
        let model = Element::new("uml:Model").with_child(
            class("_a", "Alpha").with_child(
                Element::new("ownedAttribute")
                    .with_attr("xmi:id", "_a_b")
                    .with_attr("name", "beta")
                    .with_attr("type", "_a")
                    .with_attr("association", "_missing"),
            ),
        );

        let mut session = Session::new(&ParseOptions::default());
        assert!(matches!(
            parse(&model, &mut session),
            Err(ModelError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_class_typed_attribute_without_association_fails() {
        let model = Element::new("uml:Model")
            .with_child(class("_a", "Alpha"))
            .with_child(
                class("_b", "Beta").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_b_a")
                        .with_attr("name", "alpha")
                        .with_attr("type", "_a"),
                ),
            );

        let mut session = Session::new(&ParseOptions::default());
        assert!(matches!(
            parse(&model, &mut session),
            Err(ModelError::InvalidDocument(_))
        ));
    }
}
