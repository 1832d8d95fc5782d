//! Attribute uses (pt. 1, §3.5).

use crate::attribute_decl::AttributeDeclaration;
use crate::components::ValueConstraint;
use crate::xstypes::QName;

/// Schema Component: Attribute Use (pt. 1, §3.5)
///
/// A prohibited use is represented explicitly instead of being elided, so
/// derivation by restriction can see it when deciding which base uses are
/// shadowed. Prohibited uses are removed from a complex type's final
/// `{attribute uses}` once derivation is resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeUse {
    pub required: bool,
    pub prohibited: bool,
    pub attribute_declaration: AttributeDeclaration,
    pub value_constraint: Option<ValueConstraint>,
    pub inheritable: bool,
}

impl AttributeUse {
    /// The expanded name identifying this use during derivation overlap
    /// checks.
    pub fn expanded_name(&self) -> QName {
        QName::with_optional_namespace(
            self.attribute_declaration.target_namespace.clone(),
            self.attribute_declaration.name.clone(),
        )
    }
}
