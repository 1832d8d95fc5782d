//! Identity-constraint definitions (pt. 1, §3.11).

use crate::xstypes::{AnyURI, NCName, QName, Sequence};

/// An XPath expression together with the namespace bindings that were in
/// scope where it was written, so a consumer can evaluate it later.
#[derive(Clone, Debug, PartialEq)]
pub struct XPathExpression {
    pub expression: String,
    pub default_namespace: Option<AnyURI>,
    pub namespace_bindings: Sequence<(NCName, AnyURI)>,
}

/// The `{identity-constraint category}` property. A key reference carries
/// the name of the key or unique constraint it refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum IdentityConstraintCategory {
    Key,
    KeyRef { referenced_key: QName },
    Unique,
}

/// Schema Component: Identity-Constraint Definition (pt. 1, §3.11)
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityConstraintDefinition {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub category: IdentityConstraintCategory,
    pub selector: XPathExpression,
    pub fields: Sequence<XPathExpression>,
}
