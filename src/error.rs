use crate::xstypes::QName;
use thiserror::Error;

/// Errors raised while mapping a schema document to schema components.
///
/// The variants fall into three families, all of which abort the parse:
/// structural errors (the document violates a representation constraint),
/// resolution errors (a named reference has no target at the point of use)
/// and value errors (a lexical form is rejected by the simple type it is
/// parsed against).
#[derive(Debug, Error)]
pub enum XsdError {
    // Structural errors

    #[error("missing required attribute {attribute:?} on <{element}>")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("missing required <{child}> child of <{element}>")]
    MissingChild {
        element: String,
        child: &'static str,
    },

    #[error("<simpleType> must contain one of <restriction>, <list>, <union>")]
    MissingSimpleTypeVariant,

    #[error("invalid value {value:?} for attribute {attribute:?} on <{element}>")]
    InvalidAttributeValue {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("unsupported facet element <{0}>")]
    UnknownFacet(String),

    // Resolution errors

    #[error("failed to resolve prefix {0:?} to a namespace URI")]
    NamePrefixNotResolved(String),

    #[error("no type definition named {0}")]
    UnresolvedType(QName),

    #[error("{0} is not a simple type definition")]
    NotASimpleType(QName),

    #[error("{0} is not a complex type definition")]
    NotAComplexType(QName),

    #[error("no top-level attribute declaration named {0}")]
    UnresolvedAttribute(QName),

    #[error("no top-level element declaration named {0}")]
    UnresolvedElement(QName),

    #[error("no model group definition named {0}")]
    UnresolvedGroup(QName),

    #[error("no attribute group definition named {0}")]
    UnresolvedAttributeGroup(QName),

    #[error("no identity constraint definition named {0}")]
    UnresolvedIdentityConstraint(QName),

    // Value errors

    #[error("the item type of a list type cannot itself be a list type")]
    ListItemIsList,

    #[error("value {value:?} is not valid for type {type_name}: {constraint}")]
    InvalidValue {
        value: String,
        type_name: String,
        constraint: String,
    },

    #[error("value {value:?} matches no member type of union {type_name}")]
    NoMatchingMember { value: String, type_name: String },

    #[error("cannot compile pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl XsdError {
    pub(crate) fn missing_attribute(element: roxmltree::Node, attribute: &'static str) -> Self {
        Self::MissingAttribute {
            element: element.tag_name().name().to_string(),
            attribute,
        }
    }

    pub(crate) fn missing_child(element: roxmltree::Node, child: &'static str) -> Self {
        Self::MissingChild {
            element: element.tag_name().name().to_string(),
            child,
        }
    }
}
