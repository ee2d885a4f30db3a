//! Visual Paradigm export walker.
//!
//! Visual Paradigm nests declarations inside `uml:Package` elements, so the
//! declaration sweep recurses. Bounds and comments follow the Modelio
//! encoding (`upperValue`/`lowerValue` children, `body` child element).

use super::{
    class_rules, collection_upper, declared_name, pair_ends, required_id, required_lower,
    AssociationEnd, OwnedEnd, Session,
};
use crate::document::Element;
use crate::error::ModelError;
use crate::model::{ClassId, ValidationData};
use std::collections::HashMap;

pub fn parse(model: &Element, session: &mut Session) -> Result<(), ModelError> {
    let mut classes: Vec<(&Element, ClassId)> = Vec::new();
    let mut associations: Vec<&Element> = Vec::new();
    collect(model, session, &mut classes, &mut associations)?;

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

/// Registers declarations in document order, descending into packages.
fn collect<'a>(
    container: &'a Element,
    session: &mut Session,
    classes: &mut Vec<(&'a Element, ClassId)>,
    associations: &mut Vec<&'a Element>,
) -> Result<(), ModelError> {
    for element in container.children_named("packagedElement") {
        match element.xmi_type() {
            Some("uml:Package") => collect(element, session, classes, associations)?,
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

        let reference = attribute
            .attr("type")
            .ok_or(ModelError::MissingValue("field type"))?;
        let field_type = session.field_type(reference)?;
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
