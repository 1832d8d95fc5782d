//! The type registry: owner of every type definition in a schema.
//!
//! Type definitions form an arbitrary graph (a type may refer to itself
//! through its own name, `anyType` is its own base), so they live in a
//! single arena owned by the registry and refer to each other through
//! [`TypeId`] handles. Named types are additionally indexed by expanded
//! name. A fresh registry is bootstrapped with the complete set of
//! built-in types (pt. 2, §3 and §4.1.6) before any document is parsed.

use std::collections::HashMap;

use crate::builtins;
use crate::components::TypeDefinition;
use crate::error::XsdError;
use crate::facet::{Facet, Facets};
use crate::fundamental_facet::{Cardinality, FundamentalFacets, Ordered};
use crate::simple_type_def::{SimpleTypeDefinition, Variety};
use crate::values::PrimitiveKind;
use crate::xstypes::QName;

/// Handle to a type definition in a [`TypeRegistry`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handles to the three special built-in types, cached so they can be
/// reached without a name lookup.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct SpecialTypes {
    pub(crate) any_type: TypeId,
    pub(crate) any_simple_type: TypeId,
    pub(crate) any_atomic_type: TypeId,
}

#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeDefinition>,
    by_name: HashMap<QName, TypeId>,
    /// Named types in registration order. Drives the member scan that
    /// `anySimpleType` value parsing performs.
    named_order: Vec<TypeId>,
    pub(crate) special: SpecialTypes,
}

impl TypeRegistry {
    /// Creates a registry holding the built-in types: `anyType`,
    /// `anySimpleType`, `anyAtomicType`, the nineteen primitives and the
    /// twenty-eight ordinary built-in types derived from them.
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::new(),
            by_name: HashMap::new(),
            named_order: Vec::new(),
            special: SpecialTypes::default(),
        };
        builtins::register(&mut registry);
        registry
    }

    pub fn any_type(&self) -> TypeId {
        self.special.any_type
    }

    pub fn any_simple_type(&self) -> TypeId {
        self.special.any_simple_type
    }

    pub fn any_atomic_type(&self) -> TypeId {
        self.special.any_atomic_type
    }

    fn is_special(&self, id: TypeId) -> bool {
        id == self.special.any_type
            || id == self.special.any_simple_type
            || id == self.special.any_atomic_type
    }

    /// Registers a definition, indexing it by expanded name when it has
    /// one, and returns its handle.
    pub fn register(&mut self, definition: TypeDefinition) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        if let Some(name) = definition.name() {
            let key = QName::with_optional_namespace(
                definition.target_namespace().cloned(),
                name.clone(),
            );
            self.by_name.insert(key, id);
            self.named_order.push(id);
        }
        self.types.push(definition);
        id
    }

    /// Reserves a slot for a named type whose definition is still being
    /// parsed. The slot holds [`TypeDefinition::Unresolved`] until
    /// [`complete`](Self::complete) fills it in; in between, the name
    /// resolves to the reserved handle, which is what lets a type refer
    /// to itself.
    pub fn reserve(&mut self, name: QName) -> TypeId {
        self.register(TypeDefinition::Unresolved(name))
    }

    /// Reserves a slot for an anonymous type whose definition is still
    /// being parsed, without indexing it by name.
    pub fn reserve_anonymous(&mut self) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types
            .push(TypeDefinition::Unresolved(QName::with_optional_namespace(
                None::<String>,
                "(anonymous)",
            )));
        id
    }

    pub fn complete(&mut self, id: TypeId, definition: TypeDefinition) {
        self.types[id.index()] = definition;
    }

    pub fn get(&self, name: &QName) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn require(&self, name: &QName) -> Result<TypeId, XsdError> {
        self.get(name)
            .ok_or_else(|| XsdError::UnresolvedType(name.clone()))
    }

    /// The built-in type with the given local name in the `xs` namespace.
    pub fn builtin(&self, local_name: &str) -> Result<TypeId, XsdError> {
        self.require(&QName::xs(local_name))
    }

    pub fn get_def(&self, id: TypeId) -> &TypeDefinition {
        &self.types[id.index()]
    }

    fn qname_of(&self, id: TypeId) -> QName {
        let definition = self.get_def(id);
        QName::with_optional_namespace(
            definition.target_namespace().cloned(),
            definition
                .name()
                .cloned()
                .unwrap_or_else(|| "(anonymous)".to_string()),
        )
    }

    pub fn display_name(&self, id: TypeId) -> String {
        self.qname_of(id).to_string()
    }

    pub fn simple(&self, id: TypeId) -> Result<&SimpleTypeDefinition, XsdError> {
        match self.get_def(id) {
            TypeDefinition::Simple(simple) => Ok(simple),
            _ => Err(XsdError::NotASimpleType(self.qname_of(id))),
        }
    }

    pub fn complex(&self, id: TypeId) -> Result<&crate::complex_type_def::ComplexTypeDefinition, XsdError> {
        match self.get_def(id) {
            TypeDefinition::Complex(complex) => Ok(complex),
            _ => Err(XsdError::NotAComplexType(self.qname_of(id))),
        }
    }

    /// The `{primitive type definition}` of an atomic type.
    pub fn primitive_type_of(&self, id: TypeId) -> Option<TypeId> {
        match self.simple(id).ok()?.variety.as_ref()? {
            Variety::Atomic { primitive_type, .. } => Some(*primitive_type),
            _ => None,
        }
    }

    /// The lexical codec of an atomic type, read off its primitive.
    pub fn primitive_kind_of(&self, id: TypeId) -> Option<PrimitiveKind> {
        let primitive = self.primitive_type_of(id)?;
        match self.simple(primitive).ok()?.variety.as_ref()? {
            Variety::Atomic { primitive_kind, .. } => *primitive_kind,
            _ => None,
        }
    }

    /// Every named simple type other than the three specials, in
    /// registration order.
    pub fn ordinary_simple_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.named_order.iter().copied().filter(|&id| {
            !self.is_special(id) && matches!(self.get_def(id), TypeDefinition::Simple(_))
        })
    }

    /// Builds an anonymous list type over `item_type` (pt. 2, §4.1.2.1).
    /// The base is `anySimpleType` and whitespace is collapsed, as for
    /// every list type.
    pub fn list_of(&mut self, item_type: TypeId) -> Result<TypeId, XsdError> {
        let definition = self.derive_list(item_type)?;
        Ok(self.register(TypeDefinition::Simple(definition)))
    }

    /// Builds an anonymous union type over `member_types`.
    pub fn union_of(&mut self, member_types: Vec<TypeId>) -> TypeId {
        let definition = self.derive_union(member_types);
        self.register(TypeDefinition::Simple(definition))
    }

    /// Builds an anonymous restriction of `base` with the given facets
    /// overlaid on the base's facets.
    pub fn restriction_of(
        &mut self,
        base: TypeId,
        facets: impl Into<Facets>,
    ) -> Result<TypeId, XsdError> {
        let definition = self.derive_restriction(base, facets.into())?;
        Ok(self.register(TypeDefinition::Simple(definition)))
    }

    /// Builds an anonymous string enumeration: an atomic restriction of
    /// `xs:string` accepting exactly the given values. Unlike a general
    /// restriction its value space is known to be bounded and finite.
    pub fn simple_enumeration(
        &mut self,
        values: Vec<String>,
    ) -> Result<TypeId, XsdError> {
        let string = self.builtin("string")?;
        let mut definition =
            self.derive_restriction(string, Facets::from(vec![Facet::Enumeration(values)]))?;
        definition.fundamental_facets.bounded = true;
        definition.fundamental_facets.cardinality = Cardinality::Finite;
        Ok(self.register(TypeDefinition::Simple(definition)))
    }

    /// Constructs (without registering) a list type definition over
    /// `item_type`. A list item must not itself be a list.
    pub fn derive_list(&self, item_type: TypeId) -> Result<SimpleTypeDefinition, XsdError> {
        if self.simple(item_type)?.is_list() {
            return Err(XsdError::ListItemIsList);
        }
        let variety = Variety::List { item_type };
        let facets = Facets::from(vec![Facet::WhiteSpace {
            value: crate::facet::WhiteSpace::Collapse,
            fixed: false,
        }]);
        let fundamental_facets = self.inherit_fundamental_facets(
            self.special.any_simple_type,
            Some(&variety),
            &facets,
        );
        Ok(SimpleTypeDefinition {
            name: None,
            target_namespace: None,
            context: None,
            base_type: self.special.any_simple_type,
            final_: Vec::new(),
            variety: Some(variety),
            facets,
            fundamental_facets,
        })
    }

    /// Constructs (without registering) a union type definition over
    /// `member_types`.
    pub fn derive_union(&self, member_types: Vec<TypeId>) -> SimpleTypeDefinition {
        let variety = Variety::Union { member_types };
        let facets = Facets::new();
        let fundamental_facets = self.inherit_fundamental_facets(
            self.special.any_simple_type,
            Some(&variety),
            &facets,
        );
        SimpleTypeDefinition {
            name: None,
            target_namespace: None,
            context: None,
            base_type: self.special.any_simple_type,
            final_: Vec::new(),
            variety: Some(variety),
            facets,
            fundamental_facets,
        }
    }

    /// Constructs (without registering) a restriction of `base`. The
    /// variety and its payload carry over from the base; the facets are
    /// overlaid so the restriction's own facets shadow inherited ones of
    /// the same kind.
    pub fn derive_restriction(
        &self,
        base: TypeId,
        facets: Facets,
    ) -> Result<SimpleTypeDefinition, XsdError> {
        let base_def = self.simple(base)?;
        let variety = match base_def.variety.as_ref() {
            Some(Variety::Atomic { primitive_type, .. }) => Some(Variety::Atomic {
                primitive_type: *primitive_type,
                primitive_kind: None,
            }),
            Some(Variety::List { item_type }) => Some(Variety::List {
                item_type: *item_type,
            }),
            Some(Variety::Union { member_types }) => Some(Variety::Union {
                member_types: member_types.clone(),
            }),
            None => None,
        };
        let facets = Facets::overlay(&base_def.facets, facets);
        let fundamental_facets =
            self.inherit_fundamental_facets(base, variety.as_ref(), &facets);
        Ok(SimpleTypeDefinition {
            name: None,
            target_namespace: None,
            context: None,
            base_type: base,
            final_: Vec::new(),
            variety,
            facets,
            fundamental_facets,
        })
    }

    fn fundamental_facets_of(&self, id: TypeId) -> FundamentalFacets {
        self.simple(id)
            .map(|simple| simple.fundamental_facets)
            .unwrap_or_default()
    }

    /// Computes the fundamental facets of a simple type from its variety,
    /// base type and constraining facets (pt. 2, §4.2).
    pub fn inherit_fundamental_facets(
        &self,
        base: TypeId,
        variety: Option<&Variety>,
        facets: &Facets,
    ) -> FundamentalFacets {
        use crate::facet::FacetKind;

        let has = |kind: FacetKind| facets.get(kind).is_some();

        match variety {
            Some(Variety::Atomic { primitive_type, .. }) => {
                let base_facets = self.fundamental_facets_of(base);
                let has_min = has(FacetKind::MinInclusive) || has(FacetKind::MinExclusive);
                let has_max = has(FacetKind::MaxInclusive) || has(FacetKind::MaxExclusive);
                let has_length = has(FacetKind::Length)
                    || has(FacetKind::MaxLength)
                    || has(FacetKind::TotalDigits);
                let base_finite = base_facets.cardinality == Cardinality::Finite;
                let counted = has(FacetKind::FractionDigits)
                    || self
                        .primitive_kind_of(*primitive_type)
                        .is_some_and(PrimitiveKind::is_calendar);
                FundamentalFacets {
                    ordered: base_facets.ordered,
                    bounded: has_min && has_max,
                    cardinality: if base_finite
                        || has_length
                        || (has_min && has_max && counted)
                    {
                        Cardinality::Finite
                    } else {
                        Cardinality::CountablyInfinite
                    },
                    numeric: base_facets.numeric,
                }
            }
            Some(Variety::List { item_type }) => {
                let item_finite =
                    self.fundamental_facets_of(*item_type).cardinality == Cardinality::Finite;
                let finite = has(FacetKind::Length)
                    || (has(FacetKind::MinLength) && has(FacetKind::MaxLength) && item_finite);
                FundamentalFacets {
                    ordered: Ordered::False,
                    bounded: false,
                    cardinality: if finite {
                        Cardinality::Finite
                    } else {
                        Cardinality::CountablyInfinite
                    },
                    numeric: false,
                }
            }
            Some(Variety::Union { member_types }) => {
                let members: Vec<FundamentalFacets> = member_types
                    .iter()
                    .map(|&m| self.fundamental_facets_of(m))
                    .collect();
                // A union is ordered like its members' shared primitive,
                // when its non-union members are all atomic with one
                // primitive between them.
                let basic: Vec<TypeId> = member_types
                    .iter()
                    .copied()
                    .filter(|&m| {
                        !matches!(
                            self.simple(m).ok().and_then(|s| s.variety.as_ref()),
                            Some(Variety::Union { .. })
                        )
                    })
                    .collect();
                let atomic: Vec<TypeId> = basic
                    .iter()
                    .copied()
                    .filter(|&m| self.primitive_type_of(m).is_some())
                    .collect();
                let mut primitives: Vec<TypeId> = Vec::new();
                for primitive in atomic.iter().filter_map(|&m| self.primitive_type_of(m)) {
                    if !primitives.contains(&primitive) {
                        primitives.push(primitive);
                    }
                }
                let common_primitive = match primitives.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                };

                let ordered = match common_primitive {
                    Some(primitive) if atomic.len() == basic.len() => {
                        self.fundamental_facets_of(primitive).ordered
                    }
                    _ if members.iter().all(|m| m.ordered == Ordered::False) => Ordered::False,
                    _ => Ordered::Partial,
                };
                FundamentalFacets {
                    ordered,
                    bounded: members.iter().all(|m| m.bounded) && common_primitive.is_some(),
                    cardinality: if members
                        .iter()
                        .all(|m| m.cardinality == Cardinality::Finite)
                    {
                        Cardinality::Finite
                    } else {
                        Cardinality::CountablyInfinite
                    },
                    numeric: members.iter().all(|m| m.numeric),
                }
            }
            None => FundamentalFacets::UNORDERED_INFINITE,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::FacetKind;

    #[test]
    fn primitives_are_their_own_primitive_type() {
        let registry = TypeRegistry::new();
        for name in [
            "string",
            "boolean",
            "decimal",
            "float",
            "double",
            "duration",
            "dateTime",
            "time",
            "date",
            "gYearMonth",
            "gYear",
            "gMonthDay",
            "gDay",
            "gMonth",
            "hexBinary",
            "base64Binary",
            "anyURI",
            "QName",
            "NOTATION",
        ] {
            let id = registry.builtin(name).unwrap();
            let simple = registry.simple(id).unwrap();
            assert!(simple.is_primitive(id), "{name} should be primitive");
            assert_eq!(
                registry.primitive_kind_of(id).map(|k| k.name()),
                Some(name)
            );
        }
    }

    #[test]
    fn base_chain_of_derived_builtin_reaches_any_atomic_type() {
        let registry = TypeRegistry::new();
        let mut current = registry.builtin("unsignedByte").unwrap();
        let mut hops = 0;
        while current != registry.any_atomic_type() {
            current = registry.simple(current).unwrap().base_type;
            hops += 1;
            assert!(hops < 20, "base chain must terminate");
        }
        assert_eq!(
            registry.primitive_type_of(registry.builtin("unsignedByte").unwrap()),
            Some(registry.builtin("decimal").unwrap())
        );
    }

    #[test]
    fn restriction_overlays_facets_and_inherits_fundamentals() {
        let mut registry = TypeRegistry::new();
        let integer = registry.builtin("integer").unwrap();
        let restricted = registry
            .restriction_of(
                integer,
                vec![Facet::MinInclusive {
                    value: "0".to_string(),
                    fixed: false,
                }],
            )
            .unwrap();
        let simple = registry.simple(restricted).unwrap();

        assert_eq!(
            simple.facets.get(FacetKind::MinInclusive),
            Some(&Facet::MinInclusive {
                value: "0".to_string(),
                fixed: false
            })
        );
        // fractionDigits comes down from xs:integer unchanged.
        assert_eq!(
            simple.facets.get(FacetKind::FractionDigits),
            Some(&Facet::FractionDigits {
                value: 0,
                fixed: true
            })
        );
        assert_eq!(simple.fundamental_facets.ordered, Ordered::Total);
        assert!(simple.fundamental_facets.numeric);
        // No upper bound facet, so the type is not bounded.
        assert!(!simple.fundamental_facets.bounded);
    }

    #[test]
    fn list_items_cannot_be_lists() {
        let mut registry = TypeRegistry::new();
        let token = registry.builtin("token").unwrap();
        let list = registry.list_of(token).unwrap();
        assert!(matches!(
            registry.list_of(list),
            Err(XsdError::ListItemIsList)
        ));

        let simple = registry.simple(list).unwrap();
        assert!(simple.is_list());
        assert_eq!(simple.base_type, registry.any_simple_type());
        assert_eq!(
            simple.facets.white_space(),
            Some(crate::facet::WhiteSpace::Collapse)
        );
    }

    #[test]
    fn string_enumerations_are_bounded_and_finite() {
        let mut registry = TypeRegistry::new();
        let colors = registry
            .simple_enumeration(vec!["red".to_string(), "green".to_string()])
            .unwrap();
        let simple = registry.simple(colors).unwrap();
        assert!(simple.fundamental_facets.bounded);
        assert_eq!(simple.fundamental_facets.cardinality, Cardinality::Finite);
    }

    #[test]
    fn union_fundamental_facets_follow_the_members() {
        let mut registry = TypeRegistry::new();
        let byte = registry.builtin("byte").unwrap();
        let short = registry.builtin("short").unwrap();
        let numeric_union = registry.union_of(vec![byte, short]);
        let facets = registry.simple(numeric_union).unwrap().fundamental_facets;
        // Both members are bounded decimal derivations.
        assert!(facets.bounded);
        assert!(facets.numeric);
        assert_eq!(facets.ordered, Ordered::Total);

        let string = registry.builtin("string").unwrap();
        let mixed_union = registry.union_of(vec![byte, string]);
        let facets = registry.simple(mixed_union).unwrap().fundamental_facets;
        assert!(!facets.bounded);
        assert!(!facets.numeric);
    }
}
