//! Typed values and the lexical parsing/validation engine.
//!
//! Every schema attribute carrying a typed literal (`minOccurs`,
//! `default`, `fixed`, wildcard namespace lists, QName lists) runs
//! through this module: the lexical form is whitespace-normalized per
//! the most specific `whiteSpace` facet, parsed by variety, and checked
//! against the constraining facets of the governing simple type.

use crate::error::XsdError;
use crate::facet::{ExplicitTimezone, Facet, WhiteSpace};
use crate::registry::{TypeId, TypeRegistry};
use crate::simple_type_def::Variety;
use crate::xstypes::QName;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use roxmltree::Node;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static! {
    /// Compiled anchored patterns, shared process-wide. The built-in name
    /// types run their patterns on every `minOccurs` and QName-valued
    /// attribute, so compilations are cached.
    static ref COMPILED_PATTERNS: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

fn compiled_pattern(pattern: &str) -> Result<Regex, XsdError> {
    // Schema patterns match the whole lexical form.
    let anchored = format!("^(?:{pattern})$");
    let mut cache = COMPILED_PATTERNS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(regex) = cache.get(&anchored) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&anchored).map_err(|source| XsdError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    cache.insert(anchored, regex.clone());
    Ok(regex)
}

/// A parsed value in the value space of some simple type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    /// Exact integer, also used for decimal lexical forms without a
    /// fractional part that would lose precision as a float.
    Integer(i128),
    Decimal(f64),
    Binary(Vec<u8>),
    QName(QName),
    List(Vec<Value>),
}

impl Value {
    /// The length the length-family facets measure: characters for
    /// strings, octets for binary values, items for lists. Values of
    /// other kinds have no length and are not checked.
    fn length(&self) -> Option<u64> {
        match self {
            Value::String(s) => Some(s.chars().count() as u64),
            Value::Binary(b) => Some(b.len() as u64),
            Value::List(items) => Some(items.len() as u64),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(i) => Some(i as f64),
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

/// The built-in primitive datatypes (pt. 2, §3.3), each paired with its
/// lexical codec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Boolean,
    Decimal,
    Float,
    Double,
    Duration,
    DateTime,
    Time,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
    AnyUri,
    QName,
    Notation,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Duration => "duration",
            PrimitiveKind::DateTime => "dateTime",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Date => "date",
            PrimitiveKind::GYearMonth => "gYearMonth",
            PrimitiveKind::GYear => "gYear",
            PrimitiveKind::GMonthDay => "gMonthDay",
            PrimitiveKind::GDay => "gDay",
            PrimitiveKind::GMonth => "gMonth",
            PrimitiveKind::HexBinary => "hexBinary",
            PrimitiveKind::Base64Binary => "base64Binary",
            PrimitiveKind::AnyUri => "anyURI",
            PrimitiveKind::QName => "QName",
            PrimitiveKind::Notation => "NOTATION",
        }
    }

    /// The calendar primitives, relevant to the cardinality inheritance
    /// rule for bounded atomic types.
    pub fn is_calendar(self) -> bool {
        matches!(
            self,
            PrimitiveKind::DateTime
                | PrimitiveKind::Time
                | PrimitiveKind::Date
                | PrimitiveKind::GYearMonth
                | PrimitiveKind::GYear
                | PrimitiveKind::GMonthDay
                | PrimitiveKind::GDay
                | PrimitiveKind::GMonth
        )
    }

    /// Maps a whitespace-normalized lexical form into the value space.
    /// `context` supplies the in-scope namespace bindings for QName
    /// resolution.
    pub fn parse_value(self, lexical: &str, context: Node) -> Result<Value, XsdError> {
        let invalid = || XsdError::InvalidValue {
            value: lexical.to_string(),
            type_name: self.name().to_string(),
            constraint: format!("not a valid {} lexical form", self.name()),
        };

        match self {
            PrimitiveKind::String | PrimitiveKind::AnyUri => {
                Ok(Value::String(lexical.to_string()))
            }
            PrimitiveKind::Boolean => match lexical {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            PrimitiveKind::Decimal => {
                // Integral lexical forms keep exact precision; anything
                // with a fractional part or exponent falls back to a
                // float representation.
                if is_integral_lexical(lexical) {
                    lexical
                        .parse::<i128>()
                        .map(Value::Integer)
                        .map_err(|_| invalid())
                } else {
                    lexical
                        .parse::<f64>()
                        .map(Value::Decimal)
                        .map_err(|_| invalid())
                }
            }
            PrimitiveKind::Float | PrimitiveKind::Double => match lexical {
                "INF" => Ok(Value::Decimal(f64::INFINITY)),
                "-INF" => Ok(Value::Decimal(f64::NEG_INFINITY)),
                "NaN" => Ok(Value::Decimal(f64::NAN)),
                _ => {
                    if is_integral_lexical(lexical) {
                        lexical
                            .parse::<i128>()
                            .map(Value::Integer)
                            .map_err(|_| invalid())
                    } else {
                        lexical
                            .parse::<f64>()
                            .map(Value::Decimal)
                            .map_err(|_| invalid())
                    }
                }
            },
            PrimitiveKind::Duration
            | PrimitiveKind::DateTime
            | PrimitiveKind::Time
            | PrimitiveKind::Date
            | PrimitiveKind::GYearMonth
            | PrimitiveKind::GYear
            | PrimitiveKind::GMonthDay
            | PrimitiveKind::GDay
            | PrimitiveKind::GMonth => {
                if lexical.is_empty() {
                    Err(invalid())
                } else {
                    Ok(Value::String(lexical.to_string()))
                }
            }
            PrimitiveKind::HexBinary => decode_hex(lexical).ok_or_else(invalid).map(Value::Binary),
            PrimitiveKind::Base64Binary => {
                let compact: String = lexical.chars().filter(|c| *c != ' ').collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map(Value::Binary)
                    .map_err(|_| invalid())
            }
            PrimitiveKind::QName | PrimitiveKind::Notation => {
                QName::parse(lexical, context).map(Value::QName)
            }
        }
    }

    /// Maps a value back to a canonical lexical form.
    pub fn value_to_string(self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => {
                if d.is_infinite() {
                    if *d < 0.0 { "-INF".to_string() } else { "INF".to_string() }
                } else {
                    d.to_string()
                }
            }
            Value::Binary(bytes) => match self {
                PrimitiveKind::Base64Binary => {
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                }
                _ => bytes.iter().map(|b| format!("{b:02X}")).collect(),
            },
            Value::QName(name) => name.to_string(),
            Value::List(items) => items
                .iter()
                .map(|item| self.value_to_string(item))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn is_integral_lexical(lexical: &str) -> bool {
    let digits = lexical.strip_prefix(['+', '-']).unwrap_or(lexical);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn decode_hex(lexical: &str) -> Option<Vec<u8>> {
    if lexical.len() % 2 != 0 {
        return None;
    }
    (0..lexical.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(lexical.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Whitespace normalization (pt. 2, §4.3.6): `replace` turns tab, CR and
/// LF into spaces; `collapse` additionally squeezes space runs and trims.
pub fn normalize_whitespace(value: &str, mode: WhiteSpace) -> String {
    match mode {
        WhiteSpace::Preserve => value.to_string(),
        WhiteSpace::Replace => value.replace(['\t', '\r', '\n'], " "),
        WhiteSpace::Collapse => value
            .split([' ', '\t', '\r', '\n'])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// The most specific `whiteSpace` facet governing `type_id`, found by
/// walking the base-type chain. Absent a facet the lexical form is
/// treated as `replace`.
pub fn white_space_mode(registry: &TypeRegistry, type_id: TypeId) -> WhiteSpace {
    let mut current = type_id;
    loop {
        let Ok(simple) = registry.simple(current) else {
            return WhiteSpace::Replace;
        };
        if let Some(mode) = simple.facets.white_space() {
            return mode;
        }
        if simple.base_type == current {
            return WhiteSpace::Replace;
        }
        current = simple.base_type;
    }
}

/// Parses `lexical` into the value space of `type_id`, dispatching on the
/// type's variety. Facets other than `whiteSpace` are not checked here;
/// see [`validate_value`].
pub fn parse_value(
    registry: &TypeRegistry,
    type_id: TypeId,
    lexical: &str,
    context: Node,
) -> Result<Value, XsdError> {
    let normalized = normalize_whitespace(lexical, white_space_mode(registry, type_id));
    parse_normalized(registry, type_id, &normalized, context)
}

fn parse_normalized(
    registry: &TypeRegistry,
    type_id: TypeId,
    normalized: &str,
    context: Node,
) -> Result<Value, XsdError> {
    let simple = registry.simple(type_id)?;

    let Some(variety) = simple.variety.as_ref() else {
        // anySimpleType: accept the first ordinary simple type whose
        // parse and facet checks both succeed, in registration order.
        for candidate in registry.ordinary_simple_types() {
            if let Ok(value) = validate_value(registry, candidate, normalized, context) {
                return Ok(value);
            }
        }
        return Err(XsdError::NoMatchingMember {
            value: normalized.to_string(),
            type_name: "anySimpleType".to_string(),
        });
    };

    match variety {
        Variety::Atomic { .. } => {
            let kind = registry
                .primitive_kind_of(type_id)
                .ok_or_else(|| XsdError::InvalidValue {
                    value: normalized.to_string(),
                    type_name: registry.display_name(type_id),
                    constraint: "type has no value parser".to_string(),
                })?;
            kind.parse_value(normalized, context)
        }
        Variety::List { item_type } => {
            let item_type = *item_type;
            if normalized.is_empty() {
                return Ok(Value::List(Vec::new()));
            }
            normalized
                .split(' ')
                .map(|item| parse_normalized(registry, item_type, item, context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        Variety::Union { member_types } => {
            for member in member_types {
                if let Ok(value) = validate_value(registry, *member, normalized, context) {
                    return Ok(value);
                }
            }
            Err(XsdError::NoMatchingMember {
                value: normalized.to_string(),
                type_name: registry.display_name(type_id),
            })
        }
    }
}

/// Parses `lexical` and checks it against every constraining facet of
/// `type_id`, least specific first. Returns the parsed value.
pub fn validate_value(
    registry: &TypeRegistry,
    type_id: TypeId,
    lexical: &str,
    context: Node,
) -> Result<Value, XsdError> {
    let normalized = normalize_whitespace(lexical, white_space_mode(registry, type_id));
    let value = parse_normalized(registry, type_id, &normalized, context)?;
    check_facets(registry, type_id, &value, &normalized)?;
    Ok(value)
}

fn check_facets(
    registry: &TypeRegistry,
    type_id: TypeId,
    value: &Value,
    normalized: &str,
) -> Result<(), XsdError> {
    let simple = registry.simple(type_id)?;
    let violation = |constraint: String| XsdError::InvalidValue {
        value: normalized.to_string(),
        type_name: registry.display_name(type_id),
        constraint,
    };

    // The facet container is ordered most specific first; validation
    // reports the least specific violation first, as the base type's
    // constraints are logically checked before the refinement's.
    let facets: Vec<&Facet> = simple.facets.iter().collect();
    for facet in facets.into_iter().rev() {
        match facet {
            Facet::Length { value: expected, .. } => {
                if let Some(length) = value.length() {
                    if length != *expected {
                        return Err(violation(format!("length must be exactly {expected}")));
                    }
                }
            }
            Facet::MinLength { value: minimum, .. } => {
                if let Some(length) = value.length() {
                    if length < *minimum {
                        return Err(violation(format!("minLength {minimum} not met")));
                    }
                }
            }
            Facet::MaxLength { value: maximum, .. } => {
                if let Some(length) = value.length() {
                    if length > *maximum {
                        return Err(violation(format!("maxLength {maximum} exceeded")));
                    }
                }
            }
            Facet::Pattern(patterns) => {
                for pattern in patterns {
                    if !compiled_pattern(pattern)?.is_match(normalized) {
                        return Err(violation(format!("pattern {pattern:?} not matched")));
                    }
                }
            }
            Facet::Enumeration(options) => {
                if !options.iter().any(|option| option == normalized) {
                    return Err(violation(format!(
                        "enumeration requires one of: {}",
                        options.join(", ")
                    )));
                }
            }
            Facet::MaxInclusive { value: bound, .. } => {
                if compare_to_bound(registry, type_id, value, bound)
                    .is_some_and(|ord| ord == Ordering::Greater)
                {
                    return Err(violation(format!("maxInclusive {bound} exceeded")));
                }
            }
            Facet::MaxExclusive { value: bound, .. } => {
                if compare_to_bound(registry, type_id, value, bound)
                    .is_some_and(|ord| ord != Ordering::Less)
                {
                    return Err(violation(format!("maxExclusive {bound} not satisfied")));
                }
            }
            Facet::MinInclusive { value: bound, .. } => {
                if compare_to_bound(registry, type_id, value, bound)
                    .is_some_and(|ord| ord == Ordering::Less)
                {
                    return Err(violation(format!("minInclusive {bound} not met")));
                }
            }
            Facet::MinExclusive { value: bound, .. } => {
                if compare_to_bound(registry, type_id, value, bound)
                    .is_some_and(|ord| ord != Ordering::Greater)
                {
                    return Err(violation(format!("minExclusive {bound} not satisfied")));
                }
            }
            Facet::TotalDigits { value: maximum, .. } => {
                let digits = normalized.chars().filter(char::is_ascii_digit).count() as u64;
                if digits > *maximum {
                    return Err(violation(format!("totalDigits {maximum} exceeded")));
                }
            }
            Facet::FractionDigits { value: maximum, .. } => {
                let fraction = normalized
                    .rsplit_once('.')
                    .map(|(_, frac)| frac.chars().filter(char::is_ascii_digit).count() as u64)
                    .unwrap_or(0);
                if fraction > *maximum {
                    return Err(violation(format!("fractionDigits {maximum} exceeded")));
                }
            }
            Facet::ExplicitTimezone { value: mode, .. } => match mode {
                ExplicitTimezone::Required => {
                    if !has_timezone(normalized) {
                        return Err(violation("explicitTimezone is required".to_string()));
                    }
                }
                ExplicitTimezone::Prohibited => {
                    if has_timezone(normalized) {
                        return Err(violation("explicitTimezone is prohibited".to_string()));
                    }
                }
                ExplicitTimezone::Optional => {}
            },
            // whiteSpace is applied during normalization; assertions are
            // carried in the model but not evaluated.
            Facet::WhiteSpace { .. } | Facet::Assertions(_) => {}
        }
    }

    Ok(())
}

/// Compares a value to a bound facet's lexical form. Exact integer
/// comparison where both sides are integral, float comparison for other
/// numerics, lexical comparison otherwise (the calendar types order
/// correctly this way for like-formatted values).
fn compare_to_bound(
    registry: &TypeRegistry,
    type_id: TypeId,
    value: &Value,
    bound: &str,
) -> Option<Ordering> {
    let kind = registry.primitive_kind_of(type_id)?;
    match (value, kind) {
        (Value::Integer(i), _) if is_integral_lexical(bound) => {
            bound.parse::<i128>().ok().map(|b| i.cmp(&b))
        }
        (Value::String(s), _) => Some(s.as_str().cmp(bound)),
        _ => {
            let numeric = value.as_f64()?;
            let bound = bound.parse::<f64>().ok()?;
            numeric.partial_cmp(&bound)
        }
    }
}

fn has_timezone(lexical: &str) -> bool {
    if lexical.ends_with('Z') {
        return true;
    }
    let bytes = lexical.as_bytes();
    if bytes.len() < 6 {
        return false;
    }
    let tail = &bytes[bytes.len() - 6..];
    (tail[0] == b'+' || tail[0] == b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_squeezes_and_trims() {
        assert_eq!(
            normalize_whitespace("  a \t b\n c ", WhiteSpace::Collapse),
            "a b c"
        );
        assert_eq!(
            normalize_whitespace("a\tb", WhiteSpace::Replace),
            "a b"
        );
        assert_eq!(
            normalize_whitespace("a\tb", WhiteSpace::Preserve),
            "a\tb"
        );
    }

    #[test]
    fn decimal_keeps_large_integers_exact() {
        let doc = roxmltree::Document::parse("<x/>").unwrap();
        let node = doc.root_element();
        assert_eq!(
            PrimitiveKind::Decimal
                .parse_value("18446744073709551615", node)
                .unwrap(),
            Value::Integer(18446744073709551615i128)
        );
        assert_eq!(
            PrimitiveKind::Decimal.parse_value("1.5", node).unwrap(),
            Value::Decimal(1.5)
        );
    }

    #[test]
    fn hex_and_base64_binary_decode() {
        let doc = roxmltree::Document::parse("<x/>").unwrap();
        let node = doc.root_element();
        assert_eq!(
            PrimitiveKind::HexBinary.parse_value("0AFF", node).unwrap(),
            Value::Binary(vec![0x0a, 0xff])
        );
        assert_eq!(
            PrimitiveKind::Base64Binary
                .parse_value("AQID", node)
                .unwrap(),
            Value::Binary(vec![1, 2, 3])
        );
        assert!(PrimitiveKind::HexBinary.parse_value("0AF", node).is_err());
    }

    #[test]
    fn timezone_detection() {
        assert!(has_timezone("2024-01-01T00:00:00Z"));
        assert!(has_timezone("2024-01-01T00:00:00+05:30"));
        assert!(!has_timezone("2024-01-01T00:00:00"));
    }
}
