//! Simple type definitions (pt. 2, §4.1).

use crate::components::{ComponentContext, DerivationSet};
use crate::facet::Facets;
use crate::fundamental_facet::FundamentalFacets;
use crate::registry::TypeId;
use crate::values::PrimitiveKind;
use crate::xstypes::{AnyURI, NCName, Sequence};

/// Schema Component: Simple Type Definition (pt. 2, §4.1.1)
#[derive(Clone, Debug)]
pub struct SimpleTypeDefinition {
    pub name: Option<NCName>,
    pub target_namespace: Option<AnyURI>,
    /// Anonymous types record the declaration that contains them.
    pub context: Option<ComponentContext>,
    pub base_type: TypeId,
    pub final_: DerivationSet,
    /// `None` only for `anySimpleType`, whose variety is absent.
    pub variety: Option<Variety>,
    pub facets: Facets,
    pub fundamental_facets: FundamentalFacets,
}

/// The `{variety}` property and its variety-specific payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Variety {
    Atomic {
        /// The primitive this type is ultimately derived from. A primitive
        /// type is its own `{primitive type definition}`, the fixed point
        /// marking the root of an atomic derivation chain.
        primitive_type: TypeId,
        /// The lexical codec, present on the built-in primitives only.
        primitive_kind: Option<PrimitiveKind>,
    },
    List {
        item_type: TypeId,
    },
    Union {
        member_types: Sequence<TypeId>,
    },
}

impl SimpleTypeDefinition {
    pub fn is_list(&self) -> bool {
        matches!(self.variety, Some(Variety::List { .. }))
    }

    /// Whether this definition is its own primitive, i.e. one of the
    /// nineteen built-in primitive types.
    pub fn is_primitive(&self, own_id: TypeId) -> bool {
        matches!(
            self.variety,
            Some(Variety::Atomic { primitive_type, .. }) if primitive_type == own_id
        )
    }
}
