//! Attribute declarations (pt. 1, §3.2).

use crate::components::{Scope, ValueConstraint};
use crate::registry::TypeId;
use crate::xstypes::{AnyURI, NCName};

/// Schema Component: Attribute Declaration (pt. 1, §3.2)
///
/// `{type definition}` is always a simple type.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDeclaration {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub type_definition: TypeId,
    pub scope: Scope,
    pub value_constraint: Option<ValueConstraint>,
    pub inheritable: bool,
}
