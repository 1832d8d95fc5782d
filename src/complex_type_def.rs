//! Complex type definitions and content types (pt. 1, §3.4).

use crate::attribute_use::AttributeUse;
use crate::components::{ComponentContext, DerivationMethod, DerivationSet};
use crate::facet::Assertion;
use crate::particle::Particle;
use crate::registry::TypeId;
use crate::wildcard::Wildcard;
use crate::xstypes::{AnyURI, NCName, Sequence};

/// Schema Component: Complex Type Definition (pt. 1, §3.4)
#[derive(Clone, Debug)]
pub struct ComplexTypeDefinition {
    pub name: Option<NCName>,
    pub target_namespace: Option<AnyURI>,
    pub context: Option<ComponentContext>,
    pub base_type: TypeId,
    pub derivation_method: DerivationMethod,
    pub content_type: ContentType,
    pub attribute_uses: Sequence<AttributeUse>,
    pub attribute_wildcard: Option<Wildcard>,
    pub abstract_: bool,
    /// The `{prohibited substitutions}` set, from `block`.
    pub prohibited_substitutions: DerivationSet,
    pub final_: DerivationSet,
    pub assertions: Sequence<Assertion>,
}

/// The `{content type}` property (pt. 1, §3.4.1)
#[derive(Clone, Debug)]
pub enum ContentType {
    Empty,
    Simple {
        simple_type_definition: TypeId,
    },
    Mixed {
        particle: Particle,
        open_content: Option<OpenContent>,
    },
    ElementOnly {
        particle: Particle,
        open_content: Option<OpenContent>,
    },
}

impl ContentType {
    pub fn is_empty(&self) -> bool {
        matches!(self, ContentType::Empty)
    }

    pub fn particle(&self) -> Option<&Particle> {
        match self {
            ContentType::Mixed { particle, .. } | ContentType::ElementOnly { particle, .. } => {
                Some(particle)
            }
            ContentType::Empty | ContentType::Simple { .. } => None,
        }
    }

    pub fn open_content(&self) -> Option<&OpenContent> {
        match self {
            ContentType::Mixed { open_content, .. }
            | ContentType::ElementOnly { open_content, .. } => open_content.as_ref(),
            ContentType::Empty | ContentType::Simple { .. } => None,
        }
    }

    pub fn simple_type_definition(&self) -> Option<TypeId> {
        match self {
            ContentType::Simple {
                simple_type_definition,
            } => Some(*simple_type_definition),
            _ => None,
        }
    }
}

/// Property Record: Open Content (pt. 1, §3.4.2.4)
#[derive(Clone, Debug, PartialEq)]
pub struct OpenContent {
    pub mode: OpenContentMode,
    pub wildcard: Wildcard,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenContentMode {
    Interleave,
    Suffix,
}
