//! Modeling-tool dialect detection and handling.

use crate::document::Element;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// XMI dialect variants, one per supported CASE tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Auto-detect from the document's exporter marks
    #[default]
    Auto,
    /// Modelio
    Modelio,
    /// UML Designer
    UmlDesigner,
    /// GenMyModel
    GenMyModel,
    /// Visual Paradigm
    VisualParadigm,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "modelio" => Some(Self::Modelio),
            "umldesigner" | "uml-designer" => Some(Self::UmlDesigner),
            "genmymodel" => Some(Self::GenMyModel),
            "visualparadigm" | "visual-paradigm" => Some(Self::VisualParadigm),
            _ => None,
        }
    }

    /// Detect the exporting tool from the document root. Checks the root
    /// element itself and, when the model is wrapped in an `xmi:XMI`
    /// envelope, its direct children.
    pub fn detect(root: &Element) -> Option<Self> {
        Self::detect_marks(root).or_else(|| root.children.iter().find_map(Self::detect_marks))
    }

    fn detect_marks(element: &Element) -> Option<Self> {
        // Visual Paradigm stamps an exporter documentation element.
        for doc in element.children_named("xmi:Documentation") {
            if let Some(exporter) = doc.attr("exporter") {
                if exporter.contains("Visual Paradigm") {
                    return Some(Self::VisualParadigm);
                }
            }
        }

        // Modelio and GenMyModel annotate the model element itself.
        for annotation in element.children_named("eAnnotations") {
            match annotation.attr("source") {
                Some("Objing") => return Some(Self::Modelio),
                Some("genmymodel") => return Some(Self::GenMyModel),
                _ => {}
            }
        }

        // UML Designer leaves no exporter mark; its Eclipse UML2 namespace
        // declaration does.
        if element
            .attr("xmlns:uml")
            .is_some_and(|ns| ns.contains("eclipse.org/uml2"))
        {
            return Some(Self::UmlDesigner);
        }

        None
    }

    /// Resolve Auto to a concrete dialect.
    pub fn resolve(self, root: &Element) -> Result<Self, ModelError> {
        match self {
            Self::Auto => Self::detect(root).ok_or(ModelError::UnknownDialect),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_modelio() {
        let root = Element::new("uml:Model")
            .with_child(Element::new("eAnnotations").with_attr("source", "Objing"));
        assert_eq!(Dialect::detect(&root), Some(Dialect::Modelio));
    }

    #[test]
    fn test_detect_genmymodel() {
        let root = Element::new("uml:Model")
            .with_child(Element::new("eAnnotations").with_attr("source", "genmymodel"));
        assert_eq!(Dialect::detect(&root), Some(Dialect::GenMyModel));
    }

    #[test]
    fn test_detect_visual_paradigm_envelope() {
        let root = Element::new("xmi:XMI")
            .with_child(
                Element::new("xmi:Documentation").with_attr("exporter", "Visual Paradigm 15.0"),
            )
            .with_child(Element::new("uml:Model"));
        assert_eq!(Dialect::detect(&root), Some(Dialect::VisualParadigm));
    }

    #[test]
    fn test_detect_uml_designer_namespace() {
        let root = Element::new("uml:Model")
            .with_attr("xmlns:uml", "http://www.eclipse.org/uml2/5.0.0/UML");
        assert_eq!(Dialect::detect(&root), Some(Dialect::UmlDesigner));
    }

    #[test]
    fn test_unmarked_document_detects_nothing() {
        let root = Element::new("uml:Model");
        assert_eq!(Dialect::detect(&root), None);
        assert!(matches!(
            Dialect::Auto.resolve(&root),
            Err(ModelError::UnknownDialect)
        ));
    }

    #[test]
    fn test_explicit_dialect_skips_detection() {
        let root = Element::new("uml:Model");
        assert_eq!(
            Dialect::GenMyModel.resolve(&root).unwrap(),
            Dialect::GenMyModel
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Dialect::from_str("modelio"), Some(Dialect::Modelio));
        assert_eq!(Dialect::from_str("uml-designer"), Some(Dialect::UmlDesigner));
        assert_eq!(Dialect::from_str("GenMyModel"), Some(Dialect::GenMyModel));
        assert_eq!(
            Dialect::from_str("visualparadigm"),
            Some(Dialect::VisualParadigm)
        );
        assert_eq!(Dialect::from_str("rational-rose"), None);
    }
}
