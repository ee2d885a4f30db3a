//! Association validation ahead of relationship assembly.

use crate::error::ModelError;
use crate::model::{AssociationData, Cardinality, ParsedModel};

/// Checks an association against the directionality rules its cardinality
/// imposes. Read-only, so repeated calls on the same association agree.
pub fn validate_association(
    model: &ParsedModel,
    association: &AssociationData,
) -> Result<(), ModelError> {
    let kind = association
        .kind
        .ok_or(ModelError::MissingValue("association cardinality"))?;
    let from = model.class(association.from).name.as_str();
    let to = model.class(association.to).name.as_str();

    match kind {
        Cardinality::OneToOne => {
            if association.injected_field_in_from.is_none() {
                return Err(malformed(
                    kind,
                    from,
                    to,
                    "a one-to-one association needs an injected field on its source side",
                ));
            }
        }
        Cardinality::OneToMany => {
            if association.injected_field_in_from.is_none() {
                log::warn!(
                    "in the one-to-many association between {from} and {to}, the source-side \
                     field name is missing and will default to the target class name"
                );
            }
            if association.injected_field_in_to.is_none() {
                log::warn!(
                    "in the one-to-many association between {from} and {to}, the inverse field \
                     is missing; a back-reference will be created on {to}"
                );
            }
        }
        Cardinality::ManyToOne => {
            if association.injected_field_in_from.is_some()
                && association.injected_field_in_to.is_some()
            {
                return Err(malformed(
                    kind,
                    from,
                    to,
                    "a many-to-one association cannot have injected fields on both sides; \
                     model it as a bidirectional one-to-many instead",
                ));
            }
        }
        Cardinality::ManyToMany => {
            if association.injected_field_in_from.is_none()
                || association.injected_field_in_to.is_none()
            {
                return Err(malformed(
                    kind,
                    from,
                    to,
                    "a many-to-many association needs injected fields on both sides",
                ));
            }
        }
    }
    Ok(())
}

fn malformed(kind: Cardinality, from: &str, to: &str, reason: &'static str) -> ModelError {
    ModelError::MalformedAssociation {
        kind,
        from: from.to_string(),
        to: to.to_string(),
        reason,
    }
}
