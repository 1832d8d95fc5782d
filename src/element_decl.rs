//! Element declarations (pt. 1, §3.3).

use crate::components::{DerivationSet, Scope, ValueConstraint};
use crate::identity_constraint::{IdentityConstraintDefinition, XPathExpression};
use crate::registry::TypeId;
use crate::xstypes::{AnyURI, NCName, QName, Sequence, Set};

/// Schema Component: Element Declaration (pt. 1, §3.3)
#[derive(Clone, Debug, PartialEq)]
pub struct ElementDeclaration {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub type_definition: TypeId,
    pub type_table: Option<TypeTable>,
    pub scope: Scope,
    pub value_constraint: Option<ValueConstraint>,
    pub nillable: bool,
    pub abstract_: bool,
    /// Names of the global element declarations this one may substitute for.
    pub substitution_group_affiliations: Sequence<QName>,
    /// The `{substitution group exclusions}` set, from `final`.
    pub substitution_group_exclusions: DerivationSet,
    /// The `{disallowed substitutions}` set, from `block`.
    pub disallowed_substitutions: Set<BlockedSubstitution>,
    pub identity_constraint_definitions: Sequence<IdentityConstraintDefinition>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockedSubstitution {
    Substitution,
    Extension,
    Restriction,
}

/// Property Record: Type Table (pt. 1, §3.3.2.2), from `<alternative>`
/// children.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeTable {
    pub alternatives: Sequence<TypeAlternative>,
    pub default_type: TypeAlternative,
}

/// Schema Component: Type Alternative (pt. 1, §3.12)
#[derive(Clone, Debug, PartialEq)]
pub struct TypeAlternative {
    pub test: Option<XPathExpression>,
    pub type_definition: TypeId,
}
