//! Constraining facets (pt. 2, §4.3).

use crate::identity_constraint::XPathExpression;
use crate::xstypes::Sequence;

/// Constraining facet (pt. 2, §4.3)
///
/// One variant per facet kind. Bounds facets keep their `{value}` as the
/// lexical form it was written in; the value engine interprets it against
/// the owning type's primitive when a comparison is needed.
#[derive(Clone, Debug, PartialEq)]
pub enum Facet {
    /// Schema Component: length, a kind of Constraining Facet (pt. 2, §4.3.1)
    Length { value: u64, fixed: bool },
    /// Schema Component: minLength, a kind of Constraining Facet (pt. 2, §4.3.2)
    MinLength { value: u64, fixed: bool },
    /// Schema Component: maxLength, a kind of Constraining Facet (pt. 2, §4.3.3)
    MaxLength { value: u64, fixed: bool },
    /// Schema Component: pattern, a kind of Constraining Facet (pt. 2, §4.3.4)
    ///
    /// A valid value must match every pattern in the set.
    Pattern(Sequence<String>),
    /// Schema Component: enumeration, a kind of Constraining Facet (pt. 2, §4.3.5)
    Enumeration(Sequence<String>),
    /// Schema Component: whiteSpace, a kind of Constraining Facet (pt. 2, §4.3.6)
    WhiteSpace { value: WhiteSpace, fixed: bool },
    /// Schema Component: maxInclusive, a kind of Constraining Facet (pt. 2, §4.3.7)
    MaxInclusive { value: String, fixed: bool },
    /// Schema Component: maxExclusive, a kind of Constraining Facet (pt. 2, §4.3.8)
    MaxExclusive { value: String, fixed: bool },
    /// Schema Component: minExclusive, a kind of Constraining Facet (pt. 2, §4.3.9)
    MinExclusive { value: String, fixed: bool },
    /// Schema Component: minInclusive, a kind of Constraining Facet (pt. 2, §4.3.10)
    MinInclusive { value: String, fixed: bool },
    /// Schema Component: totalDigits, a kind of Constraining Facet (pt. 2, §4.3.11)
    TotalDigits { value: u64, fixed: bool },
    /// Schema Component: fractionDigits, a kind of Constraining Facet (pt. 2, §4.3.12)
    FractionDigits { value: u64, fixed: bool },
    /// Schema Component: assertions, a kind of Constraining Facet (pt. 2, §4.3.13)
    Assertions(Sequence<Assertion>),
    /// Schema Component: explicitTimezone, a kind of Constraining Facet (pt. 2, §4.3.14)
    ExplicitTimezone { value: ExplicitTimezone, fixed: bool },
}

/// Schema Component: assertion (pt. 1, §3.13)
#[derive(Clone, Debug, PartialEq)]
pub struct Assertion {
    pub test: XPathExpression,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WhiteSpace {
    Preserve,
    Replace,
    Collapse,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExplicitTimezone {
    Required,
    Prohibited,
    Optional,
}

/// Discriminant-only view of a [`Facet`], for kind comparisons.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FacetKind {
    Length,
    MinLength,
    MaxLength,
    Pattern,
    Enumeration,
    WhiteSpace,
    MaxInclusive,
    MaxExclusive,
    MinExclusive,
    MinInclusive,
    TotalDigits,
    FractionDigits,
    Assertions,
    ExplicitTimezone,
}

impl Facet {
    pub fn kind(&self) -> FacetKind {
        match self {
            Facet::Length { .. } => FacetKind::Length,
            Facet::MinLength { .. } => FacetKind::MinLength,
            Facet::MaxLength { .. } => FacetKind::MaxLength,
            Facet::Pattern(_) => FacetKind::Pattern,
            Facet::Enumeration(_) => FacetKind::Enumeration,
            Facet::WhiteSpace { .. } => FacetKind::WhiteSpace,
            Facet::MaxInclusive { .. } => FacetKind::MaxInclusive,
            Facet::MaxExclusive { .. } => FacetKind::MaxExclusive,
            Facet::MinExclusive { .. } => FacetKind::MinExclusive,
            Facet::MinInclusive { .. } => FacetKind::MinInclusive,
            Facet::TotalDigits { .. } => FacetKind::TotalDigits,
            Facet::FractionDigits { .. } => FacetKind::FractionDigits,
            Facet::Assertions(_) => FacetKind::Assertions,
            Facet::ExplicitTimezone { .. } => FacetKind::ExplicitTimezone,
        }
    }

    pub fn is_of_same_kind_as(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }

    /// The `{fixed}` property, for the facet kinds that carry one.
    /// Parsed and stored but not enforced against further restriction.
    pub fn fixed(&self) -> Option<bool> {
        match *self {
            Facet::Length { fixed, .. }
            | Facet::MinLength { fixed, .. }
            | Facet::MaxLength { fixed, .. }
            | Facet::WhiteSpace { fixed, .. }
            | Facet::MaxInclusive { fixed, .. }
            | Facet::MaxExclusive { fixed, .. }
            | Facet::MinExclusive { fixed, .. }
            | Facet::MinInclusive { fixed, .. }
            | Facet::TotalDigits { fixed, .. }
            | Facet::FractionDigits { fixed, .. }
            | Facet::ExplicitTimezone { fixed, .. } => Some(fixed),
            Facet::Pattern(_) | Facet::Enumeration(_) | Facet::Assertions(_) => None,
        }
    }
}

/// Container for constraining facets, ordered most specific first.
///
/// A derived type's container holds its own facets followed by the facet
/// kinds inherited from its base chain (see [`Facets::overlay`]), so a
/// linear scan finds the most specific facet of any kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Facets(Vec<Facet>);

impl Facets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, facet: Facet) {
        self.0.push(facet);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The most specific facet of the given kind, if any.
    pub fn get(&self, kind: FacetKind) -> Option<&Facet> {
        self.0.iter().find(|f| f.kind() == kind)
    }

    pub fn white_space(&self) -> Option<WhiteSpace> {
        match self.get(FacetKind::WhiteSpace) {
            Some(&Facet::WhiteSpace { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Overlays `new` facets on top of `base` facets: every new facet is
    /// kept, and a base facet survives only when no new facet of the same
    /// kind is present. The result keeps new facets first.
    pub fn overlay(base: &Facets, new: Facets) -> Facets {
        let mut result = new;
        for facet in base.iter() {
            if result.get(facet.kind()).is_none() {
                result.push(facet.clone());
            }
        }
        result
    }
}

impl From<Vec<Facet>> for Facets {
    fn from(facets: Vec<Facet>) -> Self {
        Self(facets)
    }
}

impl FromIterator<Facet> for Facets {
    fn from_iter<I: IntoIterator<Item = Facet>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Facets {
    type Item = Facet;
    type IntoIter = std::vec::IntoIter<Facet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_inclusive(value: &str) -> Facet {
        Facet::MinInclusive {
            value: value.to_string(),
            fixed: false,
        }
    }

    #[test]
    fn overlay_prefers_new_facets_per_kind() {
        let base = Facets::from(vec![
            min_inclusive("0"),
            Facet::WhiteSpace {
                value: WhiteSpace::Collapse,
                fixed: true,
            },
        ]);
        let new = Facets::from(vec![min_inclusive("10")]);

        let overlaid = Facets::overlay(&base, new);
        assert_eq!(overlaid.len(), 2);
        assert_eq!(overlaid.get(FacetKind::MinInclusive), Some(&min_inclusive("10")));
        assert_eq!(overlaid.white_space(), Some(WhiteSpace::Collapse));
    }

    #[test]
    fn overlay_keeps_base_kinds_absent_from_new() {
        let base = Facets::from(vec![Facet::Pattern(vec!["[0-9]+".to_string()])]);
        let overlaid = Facets::overlay(&base, Facets::new());
        assert_eq!(overlaid.get(FacetKind::Pattern), Some(&Facet::Pattern(vec!["[0-9]+".to_string()])));
    }
}
