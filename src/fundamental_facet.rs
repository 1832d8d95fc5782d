//! Fundamental facets (pt. 2, §4.2).

/// Schema Component: ordered, a kind of Fundamental Facet (pt. 2, §4.2.1)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ordered {
    False,
    Partial,
    Total,
}

/// Schema Component: cardinality, a kind of Fundamental Facet (pt. 2, §4.2.3)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Finite,
    CountablyInfinite,
}

/// The four fundamental facets every simple type definition carries.
///
/// Computed during type construction from the variety, the base type and
/// the constraining facets; never written by the schema document itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FundamentalFacets {
    pub ordered: Ordered,
    pub bounded: bool,
    pub cardinality: Cardinality,
    pub numeric: bool,
}

impl FundamentalFacets {
    /// The profile of every list type, and the fallback for types whose
    /// base contributes nothing (pt. 2, §4.2).
    pub const UNORDERED_INFINITE: FundamentalFacets = FundamentalFacets {
        ordered: Ordered::False,
        bounded: false,
        cardinality: Cardinality::CountablyInfinite,
        numeric: false,
    };
}

impl Default for FundamentalFacets {
    fn default() -> Self {
        Self::UNORDERED_INFINITE
    }
}
