//! Shared component data types and the [`Schema`] aggregate (pt. 1, §3.17,
//! §3.7, §3.6, §3.12 and §3.15).

use crate::attribute_decl::AttributeDeclaration;
use crate::attribute_use::AttributeUse;
use crate::complex_type_def::{ComplexTypeDefinition, OpenContent};
use crate::element_decl::ElementDeclaration;
use crate::identity_constraint::IdentityConstraintDefinition;
use crate::model_group::ModelGroup;
use crate::registry::TypeId;
use crate::simple_type_def::SimpleTypeDefinition;
use crate::values::Value;
use crate::wildcard::Wildcard;
use crate::xstypes::{AnyURI, NCName, QName, Sequence, Set};

/// Type Definition (pt. 1, §3.16.1): simple or complex.
///
/// The `Unresolved` variant is a transient placeholder occupying a
/// registry slot while the named type it stands for is still being
/// parsed, so a type can refer to itself through its own name. It never
/// survives a completed parse.
#[derive(Clone, Debug)]
pub enum TypeDefinition {
    Simple(SimpleTypeDefinition),
    Complex(ComplexTypeDefinition),
    Unresolved(QName),
}

impl TypeDefinition {
    pub fn name(&self) -> Option<&NCName> {
        match self {
            TypeDefinition::Simple(simple) => simple.name.as_ref(),
            TypeDefinition::Complex(complex) => complex.name.as_ref(),
            TypeDefinition::Unresolved(name) => Some(&name.local_name),
        }
    }

    pub fn target_namespace(&self) -> Option<&AnyURI> {
        match self {
            TypeDefinition::Simple(simple) => simple.target_namespace.as_ref(),
            TypeDefinition::Complex(complex) => complex.target_namespace.as_ref(),
            TypeDefinition::Unresolved(name) => name.namespace_name.as_ref(),
        }
    }

    pub fn base_type(&self) -> Option<TypeId> {
        match self {
            TypeDefinition::Simple(simple) => Some(simple.base_type),
            TypeDefinition::Complex(complex) => Some(complex.base_type),
            TypeDefinition::Unresolved(_) => None,
        }
    }
}

/// The declaration a component anonymous to another component belongs to
/// (the `{context}` property). Carried as a name rather than a reference,
/// for lookup only.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentContext {
    ElementDeclaration(QName),
    AttributeDeclaration(QName),
    TypeDefinition(TypeId),
}

/// Property Record: Scope (pt. 1, §3.3.2.4)
#[derive(Clone, Debug, PartialEq)]
pub enum Scope {
    Global,
    Local(ScopeParent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScopeParent {
    TypeDefinition(TypeId),
    AttributeGroupDefinition(QName),
    ModelGroupDefinition(QName),
}

/// Property Record: Value Constraint (pt. 1, §3.3.2.5)
#[derive(Clone, Debug, PartialEq)]
pub struct ValueConstraint {
    pub variety: ValueConstraintVariety,
    pub value: Value,
    pub lexical_form: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueConstraintVariety {
    Default,
    Fixed,
}

/// The derivation-control keywords appearing in `final`, `block` and
/// `prohibitedSubstitutions` sets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivationControl {
    Extension,
    Restriction,
    List,
    Union,
    Substitution,
}

pub type DerivationSet = Set<DerivationControl>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivationMethod {
    Extension,
    Restriction,
}

/// Form of local element and attribute declarations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Form {
    Qualified,
    Unqualified,
}

/// Schema Component: Annotation (pt. 1, §3.15). The text of `<appinfo>`
/// and `<documentation>` children is kept verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotation {
    pub application_information: Sequence<String>,
    pub user_information: Sequence<String>,
}

/// Schema Component: Model Group Definition (pt. 1, §3.7)
#[derive(Clone, Debug, PartialEq)]
pub struct ModelGroupDefinition {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub model_group: ModelGroup,
}

/// Schema Component: Attribute Group Definition (pt. 1, §3.6)
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeGroupDefinition {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub attribute_uses: Sequence<AttributeUse>,
    pub attribute_wildcard: Option<Wildcard>,
}

/// Schema Component: Notation Declaration (pt. 1, §3.14)
#[derive(Clone, Debug, PartialEq)]
pub struct NotationDeclaration {
    pub name: NCName,
    pub target_namespace: Option<AnyURI>,
    pub system_identifier: Option<AnyURI>,
    pub public_identifier: Option<String>,
}

/// Schema Component: Schema (pt. 1, §3.17)
///
/// The root aggregate a parse produces. Type definitions are held as
/// registry handles; everything else is owned directly.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub target_namespace: Option<AnyURI>,
    pub element_form_default: Option<Form>,
    pub attribute_form_default: Option<Form>,
    pub block_default: DerivationSet,
    pub final_default: DerivationSet,
    pub default_open_content: Option<OpenContent>,
    pub default_open_content_applies_to_empty: bool,
    pub default_attributes: Option<NCName>,

    pub type_definitions: Sequence<TypeId>,
    pub element_declarations: Sequence<ElementDeclaration>,
    pub attribute_declarations: Sequence<AttributeDeclaration>,
    pub model_group_definitions: Sequence<ModelGroupDefinition>,
    pub attribute_group_definitions: Sequence<AttributeGroupDefinition>,
    pub notation_declarations: Sequence<NotationDeclaration>,
    pub identity_constraint_definitions: Sequence<IdentityConstraintDefinition>,
    pub annotations: Sequence<Annotation>,
}

impl Schema {
    fn matches(name: &NCName, target_namespace: Option<&AnyURI>, wanted: &QName) -> bool {
        *name == wanted.local_name && target_namespace == wanted.namespace_name.as_ref()
    }

    pub fn find_element_declaration(&self, name: &QName) -> Option<&ElementDeclaration> {
        self.element_declarations
            .iter()
            .find(|e| Self::matches(&e.name, e.target_namespace.as_ref(), name))
    }

    pub fn find_attribute_declaration(&self, name: &QName) -> Option<&AttributeDeclaration> {
        self.attribute_declarations
            .iter()
            .find(|a| Self::matches(&a.name, a.target_namespace.as_ref(), name))
    }

    pub fn find_model_group_definition(&self, name: &QName) -> Option<&ModelGroupDefinition> {
        self.model_group_definitions
            .iter()
            .find(|g| Self::matches(&g.name, g.target_namespace.as_ref(), name))
    }

    pub fn find_attribute_group_definition(
        &self,
        name: &QName,
    ) -> Option<&AttributeGroupDefinition> {
        self.attribute_group_definitions
            .iter()
            .find(|g| Self::matches(&g.name, g.target_namespace.as_ref(), name))
    }

    pub fn find_identity_constraint_definition(
        &self,
        name: &QName,
    ) -> Option<&IdentityConstraintDefinition> {
        self.identity_constraint_definitions
            .iter()
            .find(|c| Self::matches(&c.name, c.target_namespace.as_ref(), name))
    }
}
