//! An implementation of the XML Schema (XSD) 1.1 schema component model:
//! the built-in simple types with their facets, a registry of type
//! definitions, and a mapper from schema documents to schema components.

pub mod attribute_decl;
pub mod attribute_use;
pub mod complex_type_def;
pub mod components;
pub mod element_decl;
pub mod error;
pub mod facet;
pub mod fundamental_facet;
pub mod identity_constraint;
pub mod model_group;
pub mod parser;
pub mod particle;
pub mod registry;
pub mod simple_type_def;
pub mod values;
pub mod wildcard;
pub mod xstypes;

mod builtins;
mod dom;

pub use attribute_decl::AttributeDeclaration;
pub use attribute_use::AttributeUse;
pub use complex_type_def::{ComplexTypeDefinition, ContentType, OpenContent, OpenContentMode};
pub use components::{
    Annotation, AttributeGroupDefinition, ComponentContext, DerivationControl, DerivationMethod,
    DerivationSet, Form, ModelGroupDefinition, NotationDeclaration, Schema, Scope, ScopeParent,
    TypeDefinition, ValueConstraint, ValueConstraintVariety,
};
pub use element_decl::{BlockedSubstitution, ElementDeclaration, TypeAlternative, TypeTable};
pub use error::XsdError;
pub use facet::{Assertion, Facet, FacetKind, Facets};
pub use fundamental_facet::{Cardinality, FundamentalFacets, Ordered};
pub use identity_constraint::{
    IdentityConstraintCategory, IdentityConstraintDefinition, XPathExpression,
};
pub use model_group::{Compositor, ModelGroup};
pub use parser::Parser;
pub use particle::{MaxOccurs, Particle, Term};
pub use registry::{TypeId, TypeRegistry};
pub use simple_type_def::{SimpleTypeDefinition, Variety};
pub use values::{PrimitiveKind, Value};
pub use wildcard::{NamespaceConstraint, ProcessContents, Wildcard};
pub use xstypes::{QName, XSI_NAMESPACE, XS_NAMESPACE};

/// Maps the schema document rooted at `root` to its schema components.
///
/// Convenience wrapper over [`Parser`]; the returned registry holds the
/// built-in types alongside every type definition the document declares.
pub fn parse_schema(root: roxmltree::Node) -> Result<(Schema, TypeRegistry), XsdError> {
    Parser::new().parse(root)
}
