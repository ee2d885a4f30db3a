//! GenMyModel export walker.
//!
//! Flat layout again, but multiplicity bounds are `upper`/`lower`
//! attributes on the end itself and constraint values sit in a
//! `specification` attribute. The tool also stores a unidirectional
//! many-to-one with its ends swapped, so such associations are restated as
//! the equivalent one-to-many after recording.

use super::{
    class_rules, collection_upper, declared_name, pair_ends, required_id, required_lower,
    AssociationEnd, OwnedEnd, Session,
};
use crate::document::Element;
use crate::error::ModelError;
use crate::model::{Cardinality, ClassId, ValidationData};
use std::collections::HashMap;

pub fn parse(model: &Element, session: &mut Session) -> Result<(), ModelError> {
    let mut classes: Vec<(&Element, ClassId)> = Vec::new();
    let mut associations: Vec<&Element> = Vec::new();

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
        let recorded = session.record_association(id, first, second);
        // The swapped-end encoding: what parses as many-to-one is the
        // one-to-many the user drew, read from the wrong side.
        if session.association_kind(recorded) == Some(Cardinality::ManyToOne) {
            session.invert_association(recorded);
        }
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
    let mut rules = class_rules(element, true)?;

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
                    collection: collection_upper(attribute.attr("upper"))?,
                    comment: comment(attribute),
                    navigable: true,
                });
            continue;
        }

        let reference = attribute
            .attr("type")
            .ok_or(ModelError::MissingValue("field type"))?;
        let field_type = session.field_type(reference)?;
        let mut validations = Vec::new();
        if required_lower(attribute.attr("lower")) {
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

fn owned_ends(element: &Element, session: &Session) -> Result<Vec<OwnedEnd>, ModelError> {
    let mut ends = Vec::new();
    for end in element.children_named("ownedEnd") {
        let reference = end
            .attr("type")
            .ok_or(ModelError::MissingValue("association end type"))?;
        ends.push(OwnedEnd {
            target: session.class_by_ref(reference)?,
            name: declared_name(end),
            collection: collection_upper(end.attr("upper"))?,
        });
    }
    Ok(ends)
}

fn comment(element: &Element) -> Option<String> {
    element
        .child("ownedComment")
        .and_then(|c| c.attr("body"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::super::ParseOptions;
    use super::*;
    use crate::model::TypeRef;

    fn class(id: &str, name: &str) -> Element {
        Element::new("packagedElement")
            .with_attr("xmi:type", "uml:Class")
            .with_attr("xmi:id", id)
            .with_attr("name", name)
    }

    fn parsed(model: &Element) -> crate::model::ParsedModel {
        let mut session = Session::new(&ParseOptions::default());
        parse(model, &mut session).unwrap();
        session.finish()
    }

    #[test]
    fn test_bounds_and_rules_read_from_attributes() {
        let model = Element::new("uml:Model")
            .with_child(
                Element::new("packagedElement")
                    .with_attr("xmi:type", "uml:PrimitiveType")
                    .with_attr("xmi:id", "_string")
                    .with_attr("name", "String"),
            )
            .with_child(
                class("_product", "Product")
                    .with_child(
                        Element::new("ownedAttribute")
                            .with_attr("xmi:id", "_p_name")
                            .with_attr("name", "label")
                            .with_attr("type", "_string")
                            .with_attr("lower", "1"),
                    )
                    .with_child(
                        Element::new("ownedRule")
                            .with_attr("name", "maxlength")
                            .with_attr("constrainedElement", "_p_name")
                            .with_attr("specification", "30"),
                    ),
            );

        let parsed = parsed(&model);
        let (_, product) = parsed.classes().next().unwrap();
        let field = parsed.field(product.fields[0]);
        assert!(matches!(field.field_type, TypeRef::Scalar(_)));
        let names: Vec<&str> = field.validations.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["required", "maxlength"]);
        assert_eq!(field.validations[1].value.as_deref(), Some("30"));
    }

    #[test]
    fn test_unidirectional_many_to_one_is_restated_as_one_to_many() {
        let model = Element::new("uml:Model")
            .with_child(
                class("_car", "Car").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_c_drv")
                        .with_attr("name", "driver")
                        .with_attr("type", "_drv")
                        .with_attr("association", "_drives")
                        .with_attr("upper", "1"),
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
                            .with_attr("upper", "*"),
                    ),
            );

        let parsed = parsed(&model);
        let (_, association) = parsed.associations().next().unwrap();
        assert_eq!(association.kind, Some(Cardinality::OneToMany));
        assert_eq!(parsed.class(association.from).name, "Driver");
        assert_eq!(parsed.class(association.to).name, "Car");
        assert_eq!(association.injected_field_in_from, None);
        assert_eq!(association.injected_field_in_to.as_deref(), Some("driver"));

        // Restating the association does not move the reference: the field
        // stays on Car and stays non-blocking for scheduling.
        let fields = parsed.injected_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(parsed.class(fields[0].class).name, "Car");
        assert_eq!(fields[0].cardinality, Cardinality::ManyToOne);
    }

    #[test]
    fn test_bidirectional_one_to_many_is_kept_as_drawn() {
        let model = Element::new("uml:Model")
            .with_child(
                class("_dept", "Department").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_d_emp")
                        .with_attr("name", "employee")
                        .with_attr("type", "_emp")
                        .with_attr("association", "_works_in")
                        .with_attr("upper", "*"),
                ),
            )
            .with_child(
                class("_emp", "Employee").with_child(
                    Element::new("ownedAttribute")
                        .with_attr("xmi:id", "_e_dept")
                        .with_attr("name", "department")
                        .with_attr("type", "_dept")
                        .with_attr("association", "_works_in")
                        .with_attr("upper", "1"),
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
        assert_eq!(parsed.injected_fields().len(), 2);
    }
}
