//! Bootstrap of the built-in type definitions (pt. 2, §3 and §4.1.6).
//!
//! Registration order is the order the standard defines them in: the
//! three special types, the nineteen primitives, then the ordinary
//! built-ins derived from them. That order is observable through
//! `anySimpleType` value parsing, which tries the non-special simple
//! types in registration order.

use crate::complex_type_def::{ComplexTypeDefinition, ContentType};
use crate::components::{DerivationMethod, TypeDefinition};
use crate::facet::{ExplicitTimezone, Facet, Facets, WhiteSpace};
use crate::fundamental_facet::{Cardinality, FundamentalFacets, Ordered};
use crate::model_group::{Compositor, ModelGroup};
use crate::particle::{MaxOccurs, Particle, Term};
use crate::registry::{SpecialTypes, TypeId, TypeRegistry};
use crate::simple_type_def::{SimpleTypeDefinition, Variety};
use crate::values::PrimitiveKind;
use crate::wildcard::{NamespaceConstraint, ProcessContents, Wildcard};
use crate::xstypes::{QName, XS_NAMESPACE};

pub(crate) fn register(registry: &mut TypeRegistry) {
    register_special_types(registry);
    let primitives = register_primitive_types(registry);
    register_ordinary_types(registry, primitives);
}

/// The primitives the ordinary built-ins restrict directly.
struct PrimitiveIds {
    string: TypeId,
    decimal: TypeId,
    duration: TypeId,
    date_time: TypeId,
}

/// `anyType`, `anySimpleType` and `anyAtomicType` (pt. 1, §3.4.7 and
/// pt. 2, §4.1.6). `anyType` is its own base and admits any content:
/// mixed, a lax wildcard particle, and a lax attribute wildcard.
fn register_special_types(registry: &mut TypeRegistry) {
    let any_type = registry.reserve(QName::xs("anyType"));
    let any_simple_type = registry.reserve(QName::xs("anySimpleType"));
    let any_atomic_type = registry.reserve(QName::xs("anyAtomicType"));
    registry.special = SpecialTypes {
        any_type,
        any_simple_type,
        any_atomic_type,
    };

    let lax_any_wildcard = Wildcard {
        namespace_constraint: NamespaceConstraint::any(),
        process_contents: ProcessContents::Lax,
    };

    registry.complete(
        any_type,
        TypeDefinition::Complex(ComplexTypeDefinition {
            name: Some("anyType".to_string()),
            target_namespace: Some(XS_NAMESPACE.to_string()),
            context: None,
            base_type: any_type,
            derivation_method: DerivationMethod::Restriction,
            content_type: ContentType::Mixed {
                particle: Particle {
                    min_occurs: 1,
                    max_occurs: MaxOccurs::Bounded(1),
                    term: Term::ModelGroup(Box::new(ModelGroup {
                        compositor: Compositor::Sequence,
                        particles: vec![Particle {
                            min_occurs: 0,
                            max_occurs: MaxOccurs::Unbounded,
                            term: Term::Wildcard(lax_any_wildcard.clone()),
                        }],
                    })),
                },
                open_content: None,
            },
            attribute_uses: Vec::new(),
            attribute_wildcard: Some(lax_any_wildcard),
            abstract_: false,
            prohibited_substitutions: Vec::new(),
            final_: Vec::new(),
            assertions: Vec::new(),
        }),
    );

    registry.complete(
        any_simple_type,
        TypeDefinition::Simple(SimpleTypeDefinition {
            name: Some("anySimpleType".to_string()),
            target_namespace: Some(XS_NAMESPACE.to_string()),
            context: None,
            base_type: any_type,
            final_: Vec::new(),
            // The one type with an absent variety.
            variety: None,
            facets: Facets::new(),
            fundamental_facets: FundamentalFacets::UNORDERED_INFINITE,
        }),
    );

    registry.complete(
        any_atomic_type,
        TypeDefinition::Simple(SimpleTypeDefinition {
            name: Some("anyAtomicType".to_string()),
            target_namespace: Some(XS_NAMESPACE.to_string()),
            context: None,
            base_type: any_simple_type,
            final_: Vec::new(),
            variety: Some(Variety::Atomic {
                primitive_type: any_atomic_type,
                primitive_kind: None,
            }),
            facets: Facets::new(),
            fundamental_facets: FundamentalFacets::UNORDERED_INFINITE,
        }),
    );
}

fn fundamental(
    ordered: Ordered,
    bounded: bool,
    cardinality: Cardinality,
    numeric: bool,
) -> FundamentalFacets {
    FundamentalFacets {
        ordered,
        bounded,
        cardinality,
        numeric,
    }
}

fn white_space(value: WhiteSpace) -> Facet {
    Facet::WhiteSpace {
        value,
        fixed: false,
    }
}

/// Every primitive except `xs:string` fixes `whiteSpace` to `collapse`.
fn collapse_fixed() -> Facet {
    Facet::WhiteSpace {
        value: WhiteSpace::Collapse,
        fixed: true,
    }
}

fn timezone_optional() -> Facet {
    Facet::ExplicitTimezone {
        value: ExplicitTimezone::Optional,
        fixed: false,
    }
}

fn pattern(source: &str) -> Facet {
    Facet::Pattern(vec![source.to_string()])
}

fn min_inclusive(value: &str) -> Facet {
    Facet::MinInclusive {
        value: value.to_string(),
        fixed: false,
    }
}

fn max_inclusive(value: &str) -> Facet {
    Facet::MaxInclusive {
        value: value.to_string(),
        fixed: false,
    }
}

fn min_length(value: u64) -> Facet {
    Facet::MinLength {
        value,
        fixed: false,
    }
}

/// Defines one of the nineteen primitives: an atomic type that is its
/// own `{primitive type definition}`, based on `anyAtomicType`.
fn primitive(
    registry: &mut TypeRegistry,
    kind: PrimitiveKind,
    fundamental_facets: FundamentalFacets,
    facets: Vec<Facet>,
) -> TypeId {
    let base_type = registry.any_atomic_type();
    let id = registry.reserve(QName::xs(kind.name()));
    registry.complete(
        id,
        TypeDefinition::Simple(SimpleTypeDefinition {
            name: Some(kind.name().to_string()),
            target_namespace: Some(XS_NAMESPACE.to_string()),
            context: None,
            base_type,
            final_: Vec::new(),
            variety: Some(Variety::Atomic {
                primitive_type: id,
                primitive_kind: Some(kind),
            }),
            facets: Facets::from(facets),
            fundamental_facets,
        }),
    );
    id
}

fn register_primitive_types(registry: &mut TypeRegistry) -> PrimitiveIds {
    use Cardinality::{CountablyInfinite, Finite};

    let string = primitive(
        registry,
        PrimitiveKind::String,
        fundamental(Ordered::False, false, CountablyInfinite, false),
        vec![white_space(WhiteSpace::Preserve)],
    );
    primitive(
        registry,
        PrimitiveKind::Boolean,
        fundamental(Ordered::False, false, Finite, false),
        vec![collapse_fixed()],
    );
    let decimal = primitive(
        registry,
        PrimitiveKind::Decimal,
        fundamental(Ordered::Total, false, CountablyInfinite, true),
        vec![collapse_fixed()],
    );
    for kind in [PrimitiveKind::Float, PrimitiveKind::Double] {
        primitive(
            registry,
            kind,
            fundamental(Ordered::Partial, false, Finite, true),
            vec![collapse_fixed()],
        );
    }
    let duration = primitive(
        registry,
        PrimitiveKind::Duration,
        fundamental(Ordered::Partial, false, CountablyInfinite, false),
        vec![collapse_fixed()],
    );
    let date_time = primitive(
        registry,
        PrimitiveKind::DateTime,
        fundamental(Ordered::Partial, false, CountablyInfinite, false),
        vec![collapse_fixed(), timezone_optional()],
    );
    for kind in [
        PrimitiveKind::Time,
        PrimitiveKind::Date,
        PrimitiveKind::GYearMonth,
        PrimitiveKind::GYear,
        PrimitiveKind::GMonthDay,
        PrimitiveKind::GDay,
        PrimitiveKind::GMonth,
    ] {
        primitive(
            registry,
            kind,
            fundamental(Ordered::Partial, false, CountablyInfinite, false),
            vec![collapse_fixed(), timezone_optional()],
        );
    }
    for kind in [
        PrimitiveKind::HexBinary,
        PrimitiveKind::Base64Binary,
        PrimitiveKind::AnyUri,
        PrimitiveKind::QName,
        PrimitiveKind::Notation,
    ] {
        primitive(
            registry,
            kind,
            fundamental(Ordered::False, false, CountablyInfinite, false),
            vec![collapse_fixed()],
        );
    }

    PrimitiveIds {
        string,
        decimal,
        duration,
        date_time,
    }
}

/// Defines a named built-in as a restriction of an already registered
/// base. The bases are the types registered just above each call, all
/// of them simple.
fn ordinary(
    registry: &mut TypeRegistry,
    name: &str,
    base: TypeId,
    facets: Vec<Facet>,
) -> TypeId {
    let mut definition = registry
        .derive_restriction(base, Facets::from(facets))
        .expect("built-in base types are simple");
    definition.name = Some(name.to_string());
    definition.target_namespace = Some(XS_NAMESPACE.to_string());
    registry.register(TypeDefinition::Simple(definition))
}

/// An anonymous list over a built-in item type, for the three list
/// built-ins to restrict.
fn list(registry: &mut TypeRegistry, item_type: TypeId) -> TypeId {
    let definition = registry
        .derive_list(item_type)
        .expect("built-in list item types are atomic");
    registry.register(TypeDefinition::Simple(definition))
}

fn register_ordinary_types(registry: &mut TypeRegistry, primitives: PrimitiveIds) {
    let PrimitiveIds {
        string,
        decimal,
        duration,
        date_time,
    } = primitives;

    let normalized_string = ordinary(
        registry,
        "normalizedString",
        string,
        vec![white_space(WhiteSpace::Replace)],
    );
    let token = ordinary(
        registry,
        "token",
        normalized_string,
        vec![white_space(WhiteSpace::Collapse)],
    );
    ordinary(
        registry,
        "language",
        token,
        vec![pattern("[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*")],
    );

    // The name-character patterns are the ASCII subsets of the XML
    // name productions, which is what this regex engine can express.
    let nmtoken = ordinary(registry, "NMTOKEN", token, vec![pattern("[\\-.0-9:A-Z_a-z]+")]);
    let nmtoken_list = list(registry, nmtoken);
    ordinary(registry, "NMTOKENS", nmtoken_list, vec![min_length(1)]);
    let name = ordinary(
        registry,
        "Name",
        token,
        vec![pattern("[:A-Z_a-z][\\-.0-9:A-Z_a-z]*")],
    );
    let ncname = ordinary(
        registry,
        "NCName",
        name,
        vec![pattern("[A-Z_a-z][\\-.0-9A-Z_a-z]*")],
    );
    ordinary(registry, "ID", ncname, Vec::new());
    let idref = ordinary(registry, "IDREF", ncname, Vec::new());
    let idref_list = list(registry, idref);
    ordinary(registry, "IDREFS", idref_list, vec![min_length(1)]);
    let entity = ordinary(registry, "ENTITY", ncname, Vec::new());
    let entity_list = list(registry, entity);
    ordinary(registry, "ENTITIES", entity_list, vec![min_length(1)]);

    let integer = ordinary(
        registry,
        "integer",
        decimal,
        vec![
            Facet::FractionDigits {
                value: 0,
                fixed: true,
            },
            pattern("[\\-+]?[0-9]+"),
        ],
    );
    let non_positive_integer = ordinary(
        registry,
        "nonPositiveInteger",
        integer,
        vec![max_inclusive("0")],
    );
    ordinary(
        registry,
        "negativeInteger",
        non_positive_integer,
        vec![max_inclusive("-1")],
    );
    let long = ordinary(
        registry,
        "long",
        integer,
        vec![
            max_inclusive("9223372036854775807"),
            min_inclusive("-9223372036854775808"),
        ],
    );
    let int = ordinary(
        registry,
        "int",
        long,
        vec![max_inclusive("2147483647"), min_inclusive("-2147483648")],
    );
    let short = ordinary(
        registry,
        "short",
        int,
        vec![max_inclusive("32767"), min_inclusive("-32768")],
    );
    ordinary(
        registry,
        "byte",
        short,
        vec![max_inclusive("127"), min_inclusive("-128")],
    );
    let non_negative_integer = ordinary(
        registry,
        "nonNegativeInteger",
        integer,
        vec![min_inclusive("0")],
    );
    let unsigned_long = ordinary(
        registry,
        "unsignedLong",
        non_negative_integer,
        vec![max_inclusive("18446744073709551615")],
    );
    let unsigned_int = ordinary(
        registry,
        "unsignedInt",
        unsigned_long,
        vec![max_inclusive("4294967295")],
    );
    let unsigned_short = ordinary(
        registry,
        "unsignedShort",
        unsigned_int,
        vec![max_inclusive("65535")],
    );
    ordinary(
        registry,
        "unsignedByte",
        unsigned_short,
        vec![max_inclusive("255")],
    );
    ordinary(
        registry,
        "positiveInteger",
        non_negative_integer,
        vec![min_inclusive("1")],
    );

    ordinary(
        registry,
        "yearMonthDuration",
        duration,
        vec![pattern("[^DT]*")],
    );
    ordinary(
        registry,
        "dayTimeDuration",
        duration,
        vec![pattern("[^YM]*(T.*)?")],
    );
    ordinary(
        registry,
        "dateTimeStamp",
        date_time,
        vec![Facet::ExplicitTimezone {
            value: ExplicitTimezone::Required,
            fixed: true,
        }],
    );
}

#[cfg(test)]
mod tests {
    use crate::registry::TypeRegistry;
    use crate::values::{validate_value, Value};

    fn context() -> roxmltree::Document<'static> {
        roxmltree::Document::parse("<x/>").unwrap()
    }

    #[test]
    fn numeric_builtins_enforce_their_bounds() {
        let registry = TypeRegistry::new();
        let doc = context();
        let node = doc.root_element();
        let unsigned_byte = registry.builtin("unsignedByte").unwrap();

        assert_eq!(
            validate_value(&registry, unsigned_byte, "42", node).unwrap(),
            Value::Integer(42)
        );
        let error = validate_value(&registry, unsigned_byte, "300", node).unwrap_err();
        assert!(error.to_string().contains("maxInclusive"));
        let error = validate_value(&registry, unsigned_byte, "-1", node).unwrap_err();
        assert!(error.to_string().contains("minInclusive"));
        assert!(validate_value(&registry, unsigned_byte, "4.5", node).is_err());
    }

    #[test]
    fn name_builtins_enforce_their_patterns() {
        let registry = TypeRegistry::new();
        let doc = context();
        let node = doc.root_element();
        let ncname = registry.builtin("NCName").unwrap();

        assert!(validate_value(&registry, ncname, "price", node).is_ok());
        assert!(validate_value(&registry, ncname, "9price", node).is_err());
        assert!(validate_value(&registry, ncname, "ns:price", node).is_err());

        let name = registry.builtin("Name").unwrap();
        assert!(validate_value(&registry, name, "ns:price", node).is_ok());
    }

    #[test]
    fn list_builtins_collapse_and_require_one_item() {
        let registry = TypeRegistry::new();
        let doc = context();
        let node = doc.root_element();
        let nmtokens = registry.builtin("NMTOKENS").unwrap();

        assert_eq!(
            validate_value(&registry, nmtokens, "  alpha \t beta ", node).unwrap(),
            Value::List(vec![
                Value::String("alpha".to_string()),
                Value::String("beta".to_string())
            ])
        );
        let error = validate_value(&registry, nmtokens, "   ", node).unwrap_err();
        assert!(error.to_string().contains("minLength"));
    }

    #[test]
    fn date_time_stamp_requires_a_timezone() {
        let registry = TypeRegistry::new();
        let doc = context();
        let node = doc.root_element();
        let stamp = registry.builtin("dateTimeStamp").unwrap();

        assert!(validate_value(&registry, stamp, "2024-06-01T10:00:00Z", node).is_ok());
        let error = validate_value(&registry, stamp, "2024-06-01T10:00:00", node).unwrap_err();
        assert!(error.to_string().contains("explicitTimezone"));
    }

    #[test]
    fn any_simple_type_accepts_arbitrary_lexical_forms() {
        let registry = TypeRegistry::new();
        let doc = context();
        let node = doc.root_element();
        let any_simple = registry.any_simple_type();

        // The member scan starts at xs:string, which accepts anything.
        assert_eq!(
            crate::values::parse_value(&registry, any_simple, "whatever", node).unwrap(),
            Value::String("whatever".to_string())
        );
    }
}
