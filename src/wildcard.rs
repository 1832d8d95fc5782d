//! Wildcards and the namespace-constraint algebra (pt. 1, §3.10).

use crate::xstypes::{AnyURI, QName, Set};

/// Schema Component: Wildcard (pt. 1, §3.10)
#[derive(Clone, Debug, PartialEq)]
pub struct Wildcard {
    pub namespace_constraint: NamespaceConstraint,
    pub process_contents: ProcessContents,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessContents {
    Skip,
    Lax,
    Strict,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NamespaceConstraintVariety {
    Any,
    Enumeration,
    Not,
}

/// An entry of the `{disallowed names}` property: a specific expanded
/// name, or one of the keywords `##defined` / `##definedSibling`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisallowedName {
    Name(QName),
    Defined,
    Sibling,
}

/// The `{namespace constraint}` property of a wildcard. `namespaces`
/// entries of `None` stand for the absent namespace name.
#[derive(Clone, Debug, PartialEq)]
pub struct NamespaceConstraint {
    pub variety: NamespaceConstraintVariety,
    pub namespaces: Set<Option<AnyURI>>,
    pub disallowed_names: Set<DisallowedName>,
}

impl NamespaceConstraint {
    pub fn any() -> Self {
        Self {
            variety: NamespaceConstraintVariety::Any,
            namespaces: Set::new(),
            disallowed_names: Set::new(),
        }
    }

    pub fn enumeration(namespaces: Set<Option<AnyURI>>) -> Self {
        Self {
            variety: NamespaceConstraintVariety::Enumeration,
            namespaces,
            disallowed_names: Set::new(),
        }
    }

    pub fn not(namespaces: Set<Option<AnyURI>>) -> Self {
        Self {
            variety: NamespaceConstraintVariety::Not,
            namespaces,
            disallowed_names: Set::new(),
        }
    }

    /// Wildcard allows Namespace Name (pt. 1, §3.10.4.3)
    pub fn allows_namespace(&self, namespace: &Option<AnyURI>) -> bool {
        match self.variety {
            NamespaceConstraintVariety::Any => true,
            NamespaceConstraintVariety::Not => !self.namespaces.contains(namespace),
            NamespaceConstraintVariety::Enumeration => self.namespaces.contains(namespace),
        }
    }

    /// Wildcard allows Expanded Name (pt. 1, §3.10.4.2)
    pub fn allows_expanded_name(&self, name: &QName) -> bool {
        self.allows_namespace(&name.namespace_name)
            && !self
                .disallowed_names
                .iter()
                .any(|d| matches!(d, DisallowedName::Name(n) if n == name))
    }

    /// Attribute Wildcard Union (pt. 1, §3.10.6.3)
    ///
    /// The six-case table over the two varieties, plus the disallowed-name
    /// rules: `##defined` survives only when both operands disallow it,
    /// and a disallowed expanded name survives only when the other operand
    /// would not have allowed it anyway.
    pub fn union(&self, other: &Self) -> Self {
        use NamespaceConstraintVariety::*;

        let (variety, namespaces) = if self.variety == other.variety
            && same_set(&self.namespaces, &other.namespaces)
        {
            (self.variety, self.namespaces.clone())
        } else if self.variety == Any {
            (other.variety, other.namespaces.clone())
        } else if other.variety == Any {
            (self.variety, self.namespaces.clone())
        } else if self.variety == Enumeration && other.variety == Enumeration {
            (Enumeration, set_union(&self.namespaces, &other.namespaces))
        } else if self.variety == Not && other.variety == Not {
            let namespaces = set_intersection(&self.namespaces, &other.namespaces);
            if namespaces.is_empty() {
                (Any, namespaces)
            } else {
                (Not, namespaces)
            }
        } else {
            // One operand negates, the other enumerates.
            let (negated, enumerated) = if self.variety == Not {
                (&self.namespaces, &other.namespaces)
            } else {
                (&other.namespaces, &self.namespaces)
            };
            let namespaces = set_difference(negated, enumerated);
            if namespaces.is_empty() {
                (Any, namespaces)
            } else {
                (Not, namespaces)
            }
        };

        let mut disallowed_names = Set::new();
        if self.disallows_defined() && other.disallows_defined() {
            disallowed_names.push(DisallowedName::Defined);
        }
        for name in self.disallowed_qnames() {
            if !other.allows_expanded_name(name) {
                push_unique(&mut disallowed_names, DisallowedName::Name(name.clone()));
            }
        }
        for name in other.disallowed_qnames() {
            if !self.allows_expanded_name(name) {
                push_unique(&mut disallowed_names, DisallowedName::Name(name.clone()));
            }
        }

        Self {
            variety,
            namespaces,
            disallowed_names,
        }
    }

    /// Attribute Wildcard Intersection (pt. 1, §3.10.6.4)
    ///
    /// `##defined` survives when either operand disallows it, and a
    /// disallowed expanded name survives when the other operand's
    /// namespace constraint allows the name's namespace.
    pub fn intersection(&self, other: &Self) -> Self {
        use NamespaceConstraintVariety::*;

        let (variety, namespaces) = if self.variety == other.variety
            && same_set(&self.namespaces, &other.namespaces)
        {
            (self.variety, self.namespaces.clone())
        } else if self.variety == Any {
            (other.variety, other.namespaces.clone())
        } else if other.variety == Any {
            (self.variety, self.namespaces.clone())
        } else if self.variety == Enumeration && other.variety == Enumeration {
            (
                Enumeration,
                set_intersection(&self.namespaces, &other.namespaces),
            )
        } else if self.variety == Not && other.variety == Not {
            (Not, set_union(&self.namespaces, &other.namespaces))
        } else {
            // One operand negates, the other enumerates: the enumerated
            // namespaces minus the negated ones.
            let (negated, enumerated) = if self.variety == Not {
                (&self.namespaces, &other.namespaces)
            } else {
                (&other.namespaces, &self.namespaces)
            };
            (Enumeration, set_difference(enumerated, negated))
        };

        let mut disallowed_names = Set::new();
        if self.disallows_defined() || other.disallows_defined() {
            disallowed_names.push(DisallowedName::Defined);
        }
        for name in self.disallowed_qnames() {
            if other.allows_namespace(&name.namespace_name) {
                push_unique(&mut disallowed_names, DisallowedName::Name(name.clone()));
            }
        }
        for name in other.disallowed_qnames() {
            if self.allows_namespace(&name.namespace_name) {
                push_unique(&mut disallowed_names, DisallowedName::Name(name.clone()));
            }
        }

        Self {
            variety,
            namespaces,
            disallowed_names,
        }
    }

    fn disallows_defined(&self) -> bool {
        self.disallowed_names
            .iter()
            .any(|d| matches!(d, DisallowedName::Defined))
    }

    fn disallowed_qnames(&self) -> impl Iterator<Item = &QName> {
        self.disallowed_names.iter().filter_map(|d| match d {
            DisallowedName::Name(name) => Some(name),
            _ => None,
        })
    }
}

fn same_set(a: &Set<Option<AnyURI>>, b: &Set<Option<AnyURI>>) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}

fn set_union(a: &Set<Option<AnyURI>>, b: &Set<Option<AnyURI>>) -> Set<Option<AnyURI>> {
    let mut result = a.clone();
    for x in b {
        if !result.contains(x) {
            result.push(x.clone());
        }
    }
    result
}

fn set_intersection(a: &Set<Option<AnyURI>>, b: &Set<Option<AnyURI>>) -> Set<Option<AnyURI>> {
    a.iter().filter(|x| b.contains(x)).cloned().collect()
}

fn set_difference(a: &Set<Option<AnyURI>>, b: &Set<Option<AnyURI>>) -> Set<Option<AnyURI>> {
    a.iter().filter(|x| !b.contains(x)).cloned().collect()
}

fn push_unique(set: &mut Set<DisallowedName>, name: DisallowedName) {
    if !set.contains(&name) {
        set.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(names: &[&str]) -> Set<Option<AnyURI>> {
        names.iter().map(|n| Some(n.to_string())).collect()
    }

    #[test]
    fn union_with_any_takes_the_other_operand() {
        let any = NamespaceConstraint::any();
        let enumeration = NamespaceConstraint::enumeration(ns(&["urn:a"]));
        assert_eq!(
            any.union(&enumeration).variety,
            NamespaceConstraintVariety::Enumeration
        );
        assert_eq!(any.union(&any), any);
    }

    #[test]
    fn union_of_enumerations_unions_namespaces() {
        let a = NamespaceConstraint::enumeration(ns(&["urn:a", "urn:b"]));
        let b = NamespaceConstraint::enumeration(ns(&["urn:b", "urn:c"]));
        let result = a.union(&b);
        assert_eq!(result.variety, NamespaceConstraintVariety::Enumeration);
        assert_eq!(result.namespaces, ns(&["urn:a", "urn:b", "urn:c"]));
    }

    #[test]
    fn union_of_negations_intersects_namespaces() {
        let a = NamespaceConstraint::not(ns(&["urn:a", "urn:b"]));
        let b = NamespaceConstraint::not(ns(&["urn:b", "urn:c"]));
        let result = a.union(&b);
        assert_eq!(result.variety, NamespaceConstraintVariety::Not);
        assert_eq!(result.namespaces, ns(&["urn:b"]));

        // Disjoint negations cancel out entirely.
        let c = NamespaceConstraint::not(ns(&["urn:d"]));
        assert_eq!(a.union(&c).variety, NamespaceConstraintVariety::Any);
    }

    #[test]
    fn union_is_commutative() {
        let cases = [
            NamespaceConstraint::any(),
            NamespaceConstraint::enumeration(ns(&["urn:a", "urn:b"])),
            NamespaceConstraint::not(ns(&["urn:b"])),
        ];
        for a in &cases {
            for b in &cases {
                assert_eq!(a.union(b), b.union(a));
            }
        }
    }

    #[test]
    fn intersection_is_commutative_and_idempotent() {
        let cases = [
            NamespaceConstraint::any(),
            NamespaceConstraint::enumeration(ns(&["urn:a", "urn:b"])),
            NamespaceConstraint::not(ns(&["urn:b"])),
        ];
        for a in &cases {
            assert_eq!(a.intersection(a), *a);
            for b in &cases {
                assert_eq!(a.intersection(b), b.intersection(a));
            }
        }
    }

    #[test]
    fn intersection_of_negation_and_enumeration() {
        let negated = NamespaceConstraint::not(ns(&["urn:a"]));
        let enumerated = NamespaceConstraint::enumeration(ns(&["urn:a", "urn:b"]));
        let result = negated.intersection(&enumerated);
        assert_eq!(result.variety, NamespaceConstraintVariety::Enumeration);
        assert_eq!(result.namespaces, ns(&["urn:b"]));
    }

    #[test]
    fn defined_propagation() {
        let mut a = NamespaceConstraint::any();
        a.disallowed_names.push(DisallowedName::Defined);
        let b = NamespaceConstraint::any();

        assert!(a.union(&b).disallowed_names.is_empty());
        assert_eq!(
            a.intersection(&b).disallowed_names,
            vec![DisallowedName::Defined]
        );
    }

    #[test]
    fn disallowed_qname_survives_union_only_if_other_side_disallows_it() {
        let name = QName::with_namespace("urn:a", "attr");
        let mut negated = NamespaceConstraint::not(ns(&["urn:b"]));
        negated
            .disallowed_names
            .push(DisallowedName::Name(name.clone()));

        // The other operand allows urn:a, so the union allows the name.
        let allows = NamespaceConstraint::enumeration(ns(&["urn:a"]));
        assert!(negated.union(&allows).disallowed_names.is_empty());

        // The other operand excludes urn:a, so the name stays disallowed.
        let excludes = NamespaceConstraint::enumeration(ns(&["urn:c"]));
        assert_eq!(
            negated.union(&excludes).disallowed_names,
            vec![DisallowedName::Name(name)]
        );
    }
}
