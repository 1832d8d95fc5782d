//! Mapping from schema documents to schema components (pt. 1, §3).
//!
//! A single document is mapped in one pass, in document order: a named
//! component can be referred to from any point after its declaration.
//! Named types additionally resolve from within their own definition,
//! through the registry slot reserved before the definition is parsed.

use roxmltree::Node;

use crate::attribute_decl::AttributeDeclaration;
use crate::attribute_use::AttributeUse;
use crate::complex_type_def::{
    ComplexTypeDefinition, ContentType, OpenContent, OpenContentMode,
};
use crate::components::{
    Annotation, AttributeGroupDefinition, ComponentContext, DerivationControl, DerivationMethod,
    DerivationSet, Form, ModelGroupDefinition, NotationDeclaration, Schema, Scope, ScopeParent,
    TypeDefinition, ValueConstraint, ValueConstraintVariety,
};
use crate::dom::{
    boolean_attribute, element_children, first_xs_child, is_xs_element, required_attribute,
    text_content, xs_children,
};
use crate::element_decl::{
    BlockedSubstitution, ElementDeclaration, TypeAlternative, TypeTable,
};
use crate::error::XsdError;
use crate::facet::{
    Assertion, ExplicitTimezone, Facet, Facets, WhiteSpace,
};
use crate::identity_constraint::{
    IdentityConstraintCategory, IdentityConstraintDefinition, XPathExpression,
};
use crate::model_group::{Compositor, ModelGroup};
use crate::particle::{MaxOccurs, Particle, Term};
use crate::registry::{TypeId, TypeRegistry};
use crate::simple_type_def::SimpleTypeDefinition;
use crate::values::{normalize_whitespace, validate_value, white_space_mode, Value};
use crate::wildcard::{DisallowedName, NamespaceConstraint, ProcessContents, Wildcard};
use crate::xstypes::{AnyURI, NCName, QName, Set, XS_NAMESPACE};

/// Parser for one schema document.
///
/// Owns the [`TypeRegistry`] (pre-loaded with the built-in types) and the
/// [`Schema`] under construction; both are handed back by
/// [`parse`](Parser::parse).
pub struct Parser {
    registry: TypeRegistry,
    schema: Schema,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            registry: TypeRegistry::new(),
            schema: Schema::default(),
        }
    }

    /// Maps the document rooted at `root` (an `<xs:schema>` element, or an
    /// element containing one) to its schema components.
    pub fn parse(mut self, root: Node) -> Result<(Schema, TypeRegistry), XsdError> {
        let schema_node = if is_xs_element(root, "schema") {
            root
        } else {
            first_xs_child(root, "schema").ok_or_else(|| XsdError::missing_child(root, "schema"))?
        };

        self.parse_schema_attributes(schema_node)?;

        for child in element_children(schema_node) {
            if child.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            match child.tag_name().name() {
                "simpleType" => {
                    let id = self.parse_global_simple_type(child)?;
                    self.schema.type_definitions.push(id);
                }
                "complexType" => {
                    let id = self.parse_global_complex_type(child)?;
                    self.schema.type_definitions.push(id);
                }
                "element" => {
                    let declaration = self.parse_element_declaration(child, Scope::Global)?;
                    self.schema.element_declarations.push(declaration);
                }
                "attribute" => {
                    let declaration = self.parse_global_attribute_declaration(child)?;
                    self.schema.attribute_declarations.push(declaration);
                }
                "group" => {
                    let definition = self.parse_model_group_definition(child)?;
                    self.schema.model_group_definitions.push(definition);
                }
                "attributeGroup" => {
                    let definition = self.parse_attribute_group_definition(child)?;
                    self.schema.attribute_group_definitions.push(definition);
                }
                "notation" => {
                    let declaration = self.parse_notation_declaration(child)?;
                    self.schema.notation_declarations.push(declaration);
                }
                "annotation" => {
                    self.schema.annotations.push(parse_annotation(child));
                }
                "key" | "keyref" | "unique" => {
                    let definition = self.parse_identity_constraint(child)?;
                    self.schema.identity_constraint_definitions.push(definition);
                }
                // Composition elements join multiple documents; a single
                // document maps on its own.
                "include" | "import" | "redefine" | "override" | "defaultOpenContent" => {}
                _ => {}
            }
        }

        Ok((self.schema, self.registry))
    }

    fn parse_schema_attributes(&mut self, schema_node: Node) -> Result<(), XsdError> {
        use DerivationControl::{Extension, List, Restriction, Substitution, Union};

        self.schema.target_namespace =
            schema_node.attribute("targetNamespace").map(str::to_string);
        self.schema.element_form_default = parse_form(schema_node, "elementFormDefault")?;
        self.schema.attribute_form_default = parse_form(schema_node, "attributeFormDefault")?;
        self.schema.block_default = match schema_node.attribute("blockDefault") {
            Some(value) => derivation_words(
                schema_node,
                "blockDefault",
                value,
                &[Extension, Restriction, Substitution],
            )?,
            None => Vec::new(),
        };
        self.schema.final_default = match schema_node.attribute("finalDefault") {
            Some(value) => derivation_words(
                schema_node,
                "finalDefault",
                value,
                &[Extension, Restriction, List, Union],
            )?,
            None => Vec::new(),
        };
        self.schema.default_attributes = schema_node
            .attribute("defaultAttributes")
            .map(|value| value.rsplit(':').next().unwrap_or(value).to_string());

        if let Some(default_open_content) = first_xs_child(schema_node, "defaultOpenContent") {
            let mode = match default_open_content.attribute("mode") {
                None | Some("interleave") => OpenContentMode::Interleave,
                Some("suffix") => OpenContentMode::Suffix,
                Some(other) => {
                    return Err(XsdError::InvalidAttributeValue {
                        element: "defaultOpenContent".to_string(),
                        attribute: "mode",
                        value: other.to_string(),
                    })
                }
            };
            let any = first_xs_child(default_open_content, "any")
                .ok_or_else(|| XsdError::missing_child(default_open_content, "any"))?;
            self.schema.default_open_content = Some(OpenContent {
                mode,
                wildcard: self.parse_wildcard(any)?,
            });
            self.schema.default_open_content_applies_to_empty =
                boolean_attribute(default_open_content, "appliesToEmpty", false)?;
        }

        Ok(())
    }

    fn resolve_type(&self, reference: &str, context: Node) -> Result<TypeId, XsdError> {
        let name = QName::parse(reference, context)?;
        self.registry.require(&name)
    }

    // Simple type definitions (pt. 2, §4.1)

    fn parse_global_simple_type(&mut self, node: Node) -> Result<TypeId, XsdError> {
        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = self.schema.target_namespace.clone();
        let id = self.registry.reserve(QName::with_optional_namespace(
            target_namespace.clone(),
            name.clone(),
        ));
        let definition = self.parse_simple_type(
            node,
            Some(name),
            target_namespace,
            Some(ComponentContext::TypeDefinition(id)),
        )?;
        self.registry.complete(id, TypeDefinition::Simple(definition));
        Ok(id)
    }

    /// Maps a `<simpleType>` element. `context` is recorded on the
    /// definition only when it is anonymous; either way it is passed on
    /// to nested anonymous types.
    fn parse_simple_type(
        &mut self,
        node: Node,
        name: Option<NCName>,
        target_namespace: Option<AnyURI>,
        context: Option<ComponentContext>,
    ) -> Result<SimpleTypeDefinition, XsdError> {
        use DerivationControl::{Extension, List, Restriction, Union};
        let final_ = self.derivation_set(node, "final", &[Extension, Restriction, List, Union])?;

        let mut definition = if let Some(restriction) = first_xs_child(node, "restriction") {
            let base = if let Some(reference) = restriction.attribute("base") {
                self.resolve_type(reference, restriction)?
            } else if let Some(inline) = first_xs_child(restriction, "simpleType") {
                self.parse_anonymous_simple_type(inline, context.clone())?
            } else {
                return Err(XsdError::missing_child(restriction, "simpleType"));
            };
            let facets = self.parse_facets(restriction)?;
            self.registry.derive_restriction(base, facets)?
        } else if let Some(list) = first_xs_child(node, "list") {
            let item_type = if let Some(reference) = list.attribute("itemType") {
                self.resolve_type(reference, list)?
            } else if let Some(inline) = first_xs_child(list, "simpleType") {
                self.parse_anonymous_simple_type(inline, context.clone())?
            } else {
                return Err(XsdError::missing_child(list, "simpleType"));
            };
            self.registry.derive_list(item_type)?
        } else if let Some(union) = first_xs_child(node, "union") {
            let mut member_types = Vec::new();
            if let Some(references) = union.attribute("memberTypes") {
                for reference in references.split_whitespace() {
                    member_types.push(self.resolve_type(reference, union)?);
                }
            }
            for inline in xs_children(union, "simpleType") {
                member_types.push(self.parse_anonymous_simple_type(inline, context.clone())?);
            }
            self.registry.derive_union(member_types)
        } else {
            return Err(XsdError::MissingSimpleTypeVariant);
        };

        definition.context = if name.is_some() { None } else { context };
        definition.name = name;
        definition.target_namespace = target_namespace;
        definition.final_ = final_;
        Ok(definition)
    }

    fn parse_anonymous_simple_type(
        &mut self,
        node: Node,
        context: Option<ComponentContext>,
    ) -> Result<TypeId, XsdError> {
        let definition = self.parse_simple_type(node, None, None, context)?;
        Ok(self.registry.register(TypeDefinition::Simple(definition)))
    }

    /// Collects the constraining facets of a restriction element.
    /// Repeated `<pattern>`, `<enumeration>` and `<assertion>` children
    /// group into one facet each; structural children (attributes,
    /// groups, open content) belong to the caller and are skipped.
    fn parse_facets(&self, node: Node) -> Result<Facets, XsdError> {
        const STRUCTURAL: &[&str] = &[
            "annotation",
            "simpleType",
            "attribute",
            "attributeGroup",
            "anyAttribute",
            "openContent",
            "assert",
            "group",
            "all",
            "choice",
            "sequence",
            "any",
        ];

        let mut facets = Facets::new();
        let mut patterns = Vec::new();
        let mut enumerations = Vec::new();
        let mut assertions = Vec::new();

        for child in element_children(node) {
            if child.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            let facet_name = child.tag_name().name();
            if STRUCTURAL.contains(&facet_name) {
                continue;
            }
            let fixed = boolean_attribute(child, "fixed", false)?;
            match facet_name {
                "pattern" => patterns.push(required_attribute(child, "value")?.to_string()),
                "enumeration" => {
                    enumerations.push(required_attribute(child, "value")?.to_string())
                }
                "assertion" => assertions.push(Assertion {
                    test: self.parse_xpath(child, "test")?,
                }),
                "length" => facets.push(Facet::Length {
                    value: count_value(child)?,
                    fixed,
                }),
                "minLength" => facets.push(Facet::MinLength {
                    value: count_value(child)?,
                    fixed,
                }),
                "maxLength" => facets.push(Facet::MaxLength {
                    value: count_value(child)?,
                    fixed,
                }),
                "totalDigits" => facets.push(Facet::TotalDigits {
                    value: count_value(child)?,
                    fixed,
                }),
                "fractionDigits" => facets.push(Facet::FractionDigits {
                    value: count_value(child)?,
                    fixed,
                }),
                "whiteSpace" => {
                    let value = match required_attribute(child, "value")? {
                        "preserve" => WhiteSpace::Preserve,
                        "replace" => WhiteSpace::Replace,
                        "collapse" => WhiteSpace::Collapse,
                        other => {
                            return Err(XsdError::InvalidAttributeValue {
                                element: "whiteSpace".to_string(),
                                attribute: "value",
                                value: other.to_string(),
                            })
                        }
                    };
                    facets.push(Facet::WhiteSpace { value, fixed });
                }
                "maxInclusive" => facets.push(Facet::MaxInclusive {
                    value: required_attribute(child, "value")?.to_string(),
                    fixed,
                }),
                "maxExclusive" => facets.push(Facet::MaxExclusive {
                    value: required_attribute(child, "value")?.to_string(),
                    fixed,
                }),
                "minInclusive" => facets.push(Facet::MinInclusive {
                    value: required_attribute(child, "value")?.to_string(),
                    fixed,
                }),
                "minExclusive" => facets.push(Facet::MinExclusive {
                    value: required_attribute(child, "value")?.to_string(),
                    fixed,
                }),
                "explicitTimezone" => {
                    let value = match required_attribute(child, "value")? {
                        "required" => ExplicitTimezone::Required,
                        "prohibited" => ExplicitTimezone::Prohibited,
                        "optional" => ExplicitTimezone::Optional,
                        other => {
                            return Err(XsdError::InvalidAttributeValue {
                                element: "explicitTimezone".to_string(),
                                attribute: "value",
                                value: other.to_string(),
                            })
                        }
                    };
                    facets.push(Facet::ExplicitTimezone { value, fixed });
                }
                other => return Err(XsdError::UnknownFacet(other.to_string())),
            }
        }

        if !patterns.is_empty() {
            facets.push(Facet::Pattern(patterns));
        }
        if !enumerations.is_empty() {
            facets.push(Facet::Enumeration(enumerations));
        }
        if !assertions.is_empty() {
            facets.push(Facet::Assertions(assertions));
        }
        Ok(facets)
    }

    // Complex type definitions (pt. 1, §3.4)

    fn parse_global_complex_type(&mut self, node: Node) -> Result<TypeId, XsdError> {
        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = self.schema.target_namespace.clone();
        let id = self.registry.reserve(QName::with_optional_namespace(
            target_namespace.clone(),
            name.clone(),
        ));
        let definition = self.parse_complex_type(node, Some(name), target_namespace, None, id)?;
        self.registry.complete(id, TypeDefinition::Complex(definition));
        Ok(id)
    }

    fn parse_anonymous_complex_type(
        &mut self,
        node: Node,
        context: Option<ComponentContext>,
    ) -> Result<TypeId, XsdError> {
        let id = self.registry.reserve_anonymous();
        let definition = self.parse_complex_type(node, None, None, context, id)?;
        self.registry.complete(id, TypeDefinition::Complex(definition));
        Ok(id)
    }

    fn parse_complex_type(
        &mut self,
        node: Node,
        name: Option<NCName>,
        target_namespace: Option<AnyURI>,
        context: Option<ComponentContext>,
        self_id: TypeId,
    ) -> Result<ComplexTypeDefinition, XsdError> {
        use DerivationControl::{Extension, Restriction};

        let own_context = if name.is_some() { None } else { context };
        let abstract_ = boolean_attribute(node, "abstract", false)?;
        let prohibited_substitutions =
            self.derivation_set(node, "block", &[Extension, Restriction])?;
        let final_ = self.derivation_set(node, "final", &[Extension, Restriction])?;
        let default_attributes_apply = boolean_attribute(node, "defaultAttributesApply", true)?;
        let parent = ScopeParent::TypeDefinition(self_id);

        if let Some(simple_content) = first_xs_child(node, "simpleContent") {
            let (derivation, method) = derivation_child(simple_content)?;
            let base = self.resolve_type(required_attribute(derivation, "base")?, derivation)?;
            let facets = self.parse_facets(derivation)?;
            let simple = self.simple_content_type(
                derivation,
                base,
                method,
                facets,
                Some(ComponentContext::TypeDefinition(self_id)),
            )?;
            let (attribute_uses, attribute_wildcard) = self.derived_attribute_uses(
                derivation,
                parent,
                base,
                method,
                default_attributes_apply,
            )?;
            let assertions = self.parse_assertions(derivation)?;
            return Ok(ComplexTypeDefinition {
                name,
                target_namespace,
                context: own_context,
                base_type: base,
                derivation_method: method,
                content_type: ContentType::Simple {
                    simple_type_definition: simple,
                },
                attribute_uses,
                attribute_wildcard,
                abstract_,
                prohibited_substitutions,
                final_,
                assertions,
            });
        }

        // Explicit <complexContent>, or the short form where the content
        // model sits directly on <complexType> and the type implicitly
        // restricts anyType.
        let (content_owner, base, method, effective_mixed) =
            match first_xs_child(node, "complexContent") {
                Some(complex_content) => {
                    let mixed = if complex_content.has_attribute("mixed") {
                        boolean_attribute(complex_content, "mixed", false)?
                    } else {
                        boolean_attribute(node, "mixed", false)?
                    };
                    let (derivation, method) = derivation_child(complex_content)?;
                    let base =
                        self.resolve_type(required_attribute(derivation, "base")?, derivation)?;
                    (derivation, base, method, mixed)
                }
                None => (
                    node,
                    self.registry.any_type(),
                    DerivationMethod::Restriction,
                    boolean_attribute(node, "mixed", false)?,
                ),
            };

        let explicit_content = self.explicit_content_particle(content_owner, parent.clone())?;
        let explicit_is_absent = explicit_content.is_none();
        let effective_content = match explicit_content {
            Some(particle) => Some(particle),
            None if effective_mixed => Some(empty_sequence_particle()),
            None => None,
        };

        let content = match method {
            DerivationMethod::Restriction => content_from(effective_content, effective_mixed),
            DerivationMethod::Extension => {
                let base_content = self.registry.complex(base)?.content_type.clone();
                extend_content(
                    base_content,
                    explicit_is_absent,
                    effective_content,
                    effective_mixed,
                )
            }
        };
        let content_type = self.merge_open_content(content_owner, content)?;

        let (attribute_uses, attribute_wildcard) = self.derived_attribute_uses(
            content_owner,
            parent,
            base,
            method,
            default_attributes_apply,
        )?;
        let assertions = self.parse_assertions(content_owner)?;

        Ok(ComplexTypeDefinition {
            name,
            target_namespace,
            context: own_context,
            base_type: base,
            derivation_method: method,
            content_type,
            attribute_uses,
            attribute_wildcard,
            abstract_,
            prohibited_substitutions,
            final_,
            assertions,
        })
    }

    /// The `{simple type definition}` of simple content (pt. 1,
    /// §3.4.2.2): the four derivation cases, with `anySimpleType` as the
    /// catch-all for malformed combinations.
    fn simple_content_type(
        &mut self,
        derivation: Node,
        base: TypeId,
        method: DerivationMethod,
        facets: Facets,
        context: Option<ComponentContext>,
    ) -> Result<TypeId, XsdError> {
        enum BaseKind {
            ComplexSimple(TypeId),
            ComplexMixedEmptiable,
            Simple,
            Other,
        }
        let kind = match self.registry.get_def(base) {
            TypeDefinition::Complex(complex) => match &complex.content_type {
                ContentType::Simple {
                    simple_type_definition,
                } => BaseKind::ComplexSimple(*simple_type_definition),
                ContentType::Mixed { particle, .. } if particle.is_emptiable() => {
                    BaseKind::ComplexMixedEmptiable
                }
                _ => BaseKind::Other,
            },
            TypeDefinition::Simple(_) => BaseKind::Simple,
            TypeDefinition::Unresolved(_) => BaseKind::Other,
        };

        let inline = first_xs_child(derivation, "simpleType");
        match (kind, method) {
            (BaseKind::ComplexSimple(simple), DerivationMethod::Restriction) => {
                let restricted = match inline {
                    Some(inline_type) => self.parse_anonymous_simple_type(inline_type, context)?,
                    None => simple,
                };
                self.registry.restriction_of(restricted, facets)
            }
            (BaseKind::ComplexMixedEmptiable, DerivationMethod::Restriction) => {
                let restricted = match inline {
                    Some(inline_type) => self.parse_anonymous_simple_type(inline_type, context)?,
                    None => self.registry.any_simple_type(),
                };
                self.registry.restriction_of(restricted, facets)
            }
            (BaseKind::ComplexSimple(simple), DerivationMethod::Extension) => Ok(simple),
            (BaseKind::Simple, DerivationMethod::Extension) => Ok(base),
            _ => Ok(self.registry.any_simple_type()),
        }
    }

    /// The explicit content of a complex type (pt. 1, §3.4.2.3.3): the
    /// particle of the content-model child, unless that child is
    /// vacuously empty.
    fn explicit_content_particle(
        &mut self,
        owner: Node,
        parent: ScopeParent,
    ) -> Result<Option<Particle>, XsdError> {
        for child in element_children(owner) {
            if child.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            if !matches!(
                child.tag_name().name(),
                "group" | "all" | "choice" | "sequence"
            ) {
                continue;
            }
            let particle = self.parse_particle(child, parent)?;
            let vacuous = particle.max_occurs == MaxOccurs::Bounded(0)
                || match &particle.term {
                    Term::ModelGroup(group) => match group.compositor {
                        Compositor::All | Compositor::Sequence => group.particles.is_empty(),
                        Compositor::Choice => {
                            particle.min_occurs == 0 && group.particles.is_empty()
                        }
                    },
                    _ => false,
                };
            return Ok(if vacuous { None } else { Some(particle) });
        }
        Ok(None)
    }

    /// Applies the open content in effect for a derivation (pt. 1,
    /// §3.4.2.3.3): an explicit `<openContent>`, else the schema-wide
    /// default, unioned with open content inherited through extension.
    /// Open content turns empty content into element-only content with
    /// an empty sequence.
    fn merge_open_content(
        &self,
        owner: Node,
        content: ContentType,
    ) -> Result<ContentType, XsdError> {
        let own = self.effective_open_content(owner, content.is_empty())?;
        let inherited = content.open_content().cloned();
        let merged = match (own, inherited) {
            (Some(own), Some(inherited)) => Some(OpenContent {
                mode: if inherited.mode == OpenContentMode::Suffix {
                    OpenContentMode::Suffix
                } else {
                    own.mode
                },
                wildcard: Wildcard {
                    namespace_constraint: own
                        .wildcard
                        .namespace_constraint
                        .union(&inherited.wildcard.namespace_constraint),
                    process_contents: own.wildcard.process_contents,
                },
            }),
            (Some(own), None) => Some(own),
            (None, inherited) => inherited,
        };

        Ok(match merged {
            None => content,
            Some(open_content) => match content {
                ContentType::Empty => ContentType::ElementOnly {
                    particle: empty_sequence_particle(),
                    open_content: Some(open_content),
                },
                ContentType::Simple { .. } => content,
                ContentType::Mixed { particle, .. } => ContentType::Mixed {
                    particle,
                    open_content: Some(open_content),
                },
                ContentType::ElementOnly { particle, .. } => ContentType::ElementOnly {
                    particle,
                    open_content: Some(open_content),
                },
            },
        })
    }

    fn effective_open_content(
        &self,
        owner: Node,
        content_is_empty: bool,
    ) -> Result<Option<OpenContent>, XsdError> {
        if let Some(open_content) = first_xs_child(owner, "openContent") {
            let mode = match open_content.attribute("mode") {
                None | Some("interleave") => OpenContentMode::Interleave,
                Some("suffix") => OpenContentMode::Suffix,
                // mode="none" also suppresses the schema default.
                Some("none") => return Ok(None),
                Some(other) => {
                    return Err(XsdError::InvalidAttributeValue {
                        element: "openContent".to_string(),
                        attribute: "mode",
                        value: other.to_string(),
                    })
                }
            };
            let any = first_xs_child(open_content, "any")
                .ok_or_else(|| XsdError::missing_child(open_content, "any"))?;
            return Ok(Some(OpenContent {
                mode,
                wildcard: self.parse_wildcard(any)?,
            }));
        }

        if let Some(default) = &self.schema.default_open_content {
            if !content_is_empty || self.schema.default_open_content_applies_to_empty {
                return Ok(Some(default.clone()));
            }
        }
        Ok(None)
    }

    /// The `{attribute uses}` and `{attribute wildcard}` of a complex
    /// type (pt. 1, §3.4.2.4): the derivation's own attributes and
    /// attribute groups, the schema's default attribute group, then the
    /// base type's uses. Under restriction a base use is shadowed by a
    /// same-named own use, prohibited or not; prohibited uses are then
    /// dropped from the result.
    fn derived_attribute_uses(
        &mut self,
        owner: Node,
        parent: ScopeParent,
        base: TypeId,
        method: DerivationMethod,
        default_attributes_apply: bool,
    ) -> Result<(Vec<AttributeUse>, Option<Wildcard>), XsdError> {
        let (mut uses, wildcards) = self.parse_attribute_uses(owner, parent)?;

        if default_attributes_apply {
            if let Some(group_name) = self.schema.default_attributes.clone() {
                let qname = QName::with_optional_namespace(
                    self.schema.target_namespace.clone(),
                    group_name,
                );
                let group = self
                    .schema
                    .find_attribute_group_definition(&qname)
                    .cloned()
                    .ok_or(XsdError::UnresolvedAttributeGroup(qname))?;
                uses.extend(group.attribute_uses);
            }
        }

        let own_wildcard = combine_wildcards(wildcards);
        let (base_uses, base_wildcard) = match self.registry.complex(base) {
            Ok(complex) => (
                complex.attribute_uses.clone(),
                complex.attribute_wildcard.clone(),
            ),
            Err(_) => (Vec::new(), None),
        };

        match method {
            DerivationMethod::Extension => uses.extend(base_uses),
            DerivationMethod::Restriction => {
                for base_use in base_uses {
                    let shadowed = uses
                        .iter()
                        .any(|own| own.expanded_name() == base_use.expanded_name());
                    if !shadowed {
                        uses.push(base_use);
                    }
                }
            }
        }
        uses.retain(|attribute_use| !attribute_use.prohibited);

        let attribute_wildcard = match method {
            DerivationMethod::Restriction => own_wildcard,
            DerivationMethod::Extension => match (own_wildcard, base_wildcard) {
                (Some(own), Some(base)) => Some(Wildcard {
                    namespace_constraint: own
                        .namespace_constraint
                        .union(&base.namespace_constraint),
                    process_contents: own.process_contents,
                }),
                (own, base) => own.or(base),
            },
        };

        Ok((uses, attribute_wildcard))
    }

    /// The attribute uses declared directly on `node`: `<attribute>`
    /// children plus the expansion of `<attributeGroup>` references.
    /// Also collects the wildcards contributed by `<anyAttribute>` and
    /// the referenced groups, local one first.
    fn parse_attribute_uses(
        &mut self,
        node: Node,
        parent: ScopeParent,
    ) -> Result<(Vec<AttributeUse>, Vec<Wildcard>), XsdError> {
        let mut uses = Vec::new();
        let mut wildcards = Vec::new();

        if let Some(any_attribute) = first_xs_child(node, "anyAttribute") {
            wildcards.push(self.parse_wildcard(any_attribute)?);
        }

        for child in element_children(node) {
            if is_xs_element(child, "attribute") {
                uses.push(self.parse_attribute_use(child, parent.clone())?);
            } else if is_xs_element(child, "attributeGroup") {
                let reference = required_attribute(child, "ref")?;
                let name = QName::parse(reference, child)?;
                let group = self
                    .schema
                    .find_attribute_group_definition(&name)
                    .cloned()
                    .ok_or(XsdError::UnresolvedAttributeGroup(name))?;
                uses.extend(group.attribute_uses);
                if let Some(wildcard) = group.attribute_wildcard {
                    wildcards.push(wildcard);
                }
            }
        }

        Ok((uses, wildcards))
    }

    fn parse_attribute_use(
        &mut self,
        node: Node,
        parent: ScopeParent,
    ) -> Result<AttributeUse, XsdError> {
        let use_attribute = node.attribute("use").unwrap_or("optional");
        let required = use_attribute == "required";
        let prohibited = use_attribute == "prohibited";
        let inheritable = boolean_attribute(node, "inheritable", false)?;

        let attribute_declaration = if let Some(reference) = node.attribute("ref") {
            let name = QName::parse(reference, node)?;
            self.schema
                .find_attribute_declaration(&name)
                .cloned()
                .ok_or(XsdError::UnresolvedAttribute(name))?
        } else {
            self.parse_local_attribute_declaration(node, parent)?
        };

        let value_constraint =
            self.parse_value_constraint(node, attribute_declaration.type_definition)?;
        Ok(AttributeUse {
            required,
            prohibited,
            attribute_declaration,
            value_constraint,
            inheritable,
        })
    }

    // Attribute declarations (pt. 1, §3.2)

    fn parse_global_attribute_declaration(
        &mut self,
        node: Node,
    ) -> Result<AttributeDeclaration, XsdError> {
        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = self.schema.target_namespace.clone();
        let qname = QName::with_optional_namespace(target_namespace.clone(), name.clone());
        let type_definition = self.attribute_type(node, &qname)?;
        let value_constraint = self.parse_value_constraint(node, type_definition)?;
        Ok(AttributeDeclaration {
            name,
            target_namespace,
            type_definition,
            scope: Scope::Global,
            value_constraint,
            inheritable: boolean_attribute(node, "inheritable", false)?,
        })
    }

    fn parse_local_attribute_declaration(
        &mut self,
        node: Node,
        parent: ScopeParent,
    ) -> Result<AttributeDeclaration, XsdError> {
        let name = required_attribute(node, "name")?.to_string();
        let target_namespace =
            self.local_target_namespace(node, self.schema.attribute_form_default)?;
        let qname = QName::with_optional_namespace(target_namespace.clone(), name.clone());
        let type_definition = self.attribute_type(node, &qname)?;
        Ok(AttributeDeclaration {
            name,
            target_namespace,
            type_definition,
            scope: Scope::Local(parent),
            // The constraint written on a local attribute belongs to the
            // use, parsed by the caller.
            value_constraint: None,
            inheritable: boolean_attribute(node, "inheritable", false)?,
        })
    }

    fn attribute_type(&mut self, node: Node, qname: &QName) -> Result<TypeId, XsdError> {
        if let Some(reference) = node.attribute("type") {
            return self.resolve_type(reference, node);
        }
        if let Some(inline) = first_xs_child(node, "simpleType") {
            return self.parse_anonymous_simple_type(
                inline,
                Some(ComponentContext::AttributeDeclaration(qname.clone())),
            );
        }
        Ok(self.registry.any_simple_type())
    }

    // Element declarations (pt. 1, §3.3)

    fn parse_element_declaration(
        &mut self,
        node: Node,
        scope: Scope,
    ) -> Result<ElementDeclaration, XsdError> {
        use DerivationControl::{Extension, Restriction};

        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = match &scope {
            Scope::Global => self.schema.target_namespace.clone(),
            Scope::Local(_) => {
                self.local_target_namespace(node, self.schema.element_form_default)?
            }
        };
        let qname = QName::with_optional_namespace(target_namespace.clone(), name.clone());

        let mut substitution_group_affiliations = Vec::new();
        if let Some(heads) = node.attribute("substitutionGroup") {
            for head in heads.split_whitespace() {
                substitution_group_affiliations.push(QName::parse(head, node)?);
            }
        }

        // {type definition}: the type attribute, an anonymous inline
        // type, the substitution-group head's type, or anyType.
        let type_definition = if let Some(reference) = node.attribute("type") {
            self.resolve_type(reference, node)?
        } else if let Some(inline) =
            self.parse_inline_type(node, ComponentContext::ElementDeclaration(qname.clone()))?
        {
            inline
        } else if let Some(head) = substitution_group_affiliations.first() {
            let head_type = self
                .schema
                .find_element_declaration(head)
                .map(|declaration| declaration.type_definition);
            head_type.ok_or_else(|| XsdError::UnresolvedElement(head.clone()))?
        } else {
            self.registry.any_type()
        };

        let type_table = self.parse_type_table(node, type_definition, &qname)?;
        let value_constraint = self.parse_value_constraint(node, type_definition)?;

        let mut identity_constraint_definitions = Vec::new();
        for child in element_children(node) {
            if child.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            if matches!(child.tag_name().name(), "unique" | "key" | "keyref") {
                let constraint = self.parse_identity_constraint(child)?;
                self.schema
                    .identity_constraint_definitions
                    .push(constraint.clone());
                identity_constraint_definitions.push(constraint);
            }
        }

        Ok(ElementDeclaration {
            name,
            target_namespace,
            type_definition,
            type_table,
            scope,
            value_constraint,
            nillable: boolean_attribute(node, "nillable", false)?,
            abstract_: boolean_attribute(node, "abstract", false)?,
            substitution_group_affiliations,
            substitution_group_exclusions: self.derivation_set(
                node,
                "final",
                &[Extension, Restriction],
            )?,
            disallowed_substitutions: self.blocked_substitutions(node)?,
            identity_constraint_definitions,
        })
    }

    fn parse_inline_type(
        &mut self,
        node: Node,
        context: ComponentContext,
    ) -> Result<Option<TypeId>, XsdError> {
        if let Some(simple) = first_xs_child(node, "simpleType") {
            return Ok(Some(
                self.parse_anonymous_simple_type(simple, Some(context))?,
            ));
        }
        if let Some(complex) = first_xs_child(node, "complexType") {
            return Ok(Some(
                self.parse_anonymous_complex_type(complex, Some(context))?,
            ));
        }
        Ok(None)
    }

    /// The `{type table}` built from `<alternative>` children (pt. 1,
    /// §3.3.2.2). The last test-less alternative is the default; absent
    /// one, the declared type stands in.
    fn parse_type_table(
        &mut self,
        node: Node,
        declared_type: TypeId,
        element_name: &QName,
    ) -> Result<Option<TypeTable>, XsdError> {
        let mut alternatives = Vec::new();
        let mut default_type = None;
        let mut saw_alternative = false;

        for alternative in xs_children(node, "alternative") {
            saw_alternative = true;
            let type_definition = if let Some(reference) = alternative.attribute("type") {
                self.resolve_type(reference, alternative)?
            } else if let Some(inline) = self.parse_inline_type(
                alternative,
                ComponentContext::ElementDeclaration(element_name.clone()),
            )? {
                inline
            } else {
                declared_type
            };
            if alternative.has_attribute("test") {
                alternatives.push(TypeAlternative {
                    test: Some(self.parse_xpath(alternative, "test")?),
                    type_definition,
                });
            } else {
                default_type = Some(TypeAlternative {
                    test: None,
                    type_definition,
                });
            }
        }

        if !saw_alternative {
            return Ok(None);
        }
        Ok(Some(TypeTable {
            alternatives,
            default_type: default_type.unwrap_or(TypeAlternative {
                test: None,
                type_definition: declared_type,
            }),
        }))
    }

    // Particles and model groups (pt. 1, §3.8 and §3.9)

    fn parse_particle(&mut self, node: Node, parent: ScopeParent) -> Result<Particle, XsdError> {
        let (min_occurs, max_occurs) = self.parse_occurs(node)?;
        let term = match node.tag_name().name() {
            "element" => {
                let declaration = if let Some(reference) = node.attribute("ref") {
                    let name = QName::parse(reference, node)?;
                    self.schema
                        .find_element_declaration(&name)
                        .cloned()
                        .ok_or(XsdError::UnresolvedElement(name))?
                } else {
                    self.parse_element_declaration(node, Scope::Local(parent))?
                };
                Term::ElementDeclaration(Box::new(declaration))
            }
            "group" => {
                let reference = required_attribute(node, "ref")?;
                let name = QName::parse(reference, node)?;
                let definition = self
                    .schema
                    .find_model_group_definition(&name)
                    .cloned()
                    .ok_or(XsdError::UnresolvedGroup(name))?;
                Term::ModelGroup(Box::new(definition.model_group))
            }
            "any" => Term::Wildcard(self.parse_wildcard(node)?),
            _ => Term::ModelGroup(Box::new(self.parse_model_group(node, parent)?)),
        };
        Ok(Particle {
            min_occurs,
            max_occurs,
            term,
        })
    }

    fn parse_model_group(
        &mut self,
        node: Node,
        parent: ScopeParent,
    ) -> Result<ModelGroup, XsdError> {
        let compositor = match node.tag_name().name() {
            "all" => Compositor::All,
            "choice" => Compositor::Choice,
            _ => Compositor::Sequence,
        };
        let mut particles = Vec::new();
        for child in element_children(node) {
            if child.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            if matches!(
                child.tag_name().name(),
                "element" | "group" | "all" | "choice" | "sequence" | "any"
            ) {
                particles.push(self.parse_particle(child, parent.clone())?);
            }
        }
        Ok(ModelGroup {
            compositor,
            particles,
        })
    }

    fn parse_model_group_definition(
        &mut self,
        node: Node,
    ) -> Result<ModelGroupDefinition, XsdError> {
        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = self.schema.target_namespace.clone();
        let qname = QName::with_optional_namespace(target_namespace.clone(), name.clone());

        for child in element_children(node) {
            if child.tag_name().namespace() != Some(XS_NAMESPACE) {
                continue;
            }
            if matches!(child.tag_name().name(), "all" | "choice" | "sequence") {
                let model_group = self
                    .parse_model_group(child, ScopeParent::ModelGroupDefinition(qname.clone()))?;
                return Ok(ModelGroupDefinition {
                    name,
                    target_namespace,
                    model_group,
                });
            }
        }
        Err(XsdError::missing_child(node, "sequence"))
    }

    fn parse_attribute_group_definition(
        &mut self,
        node: Node,
    ) -> Result<AttributeGroupDefinition, XsdError> {
        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = self.schema.target_namespace.clone();
        let qname = QName::with_optional_namespace(target_namespace.clone(), name.clone());
        let (attribute_uses, wildcards) =
            self.parse_attribute_uses(node, ScopeParent::AttributeGroupDefinition(qname))?;
        Ok(AttributeGroupDefinition {
            name,
            target_namespace,
            // Prohibited uses stay in the group; they take effect when
            // the group is used inside a restriction.
            attribute_uses,
            attribute_wildcard: combine_wildcards(wildcards),
        })
    }

    fn parse_notation_declaration(
        &mut self,
        node: Node,
    ) -> Result<NotationDeclaration, XsdError> {
        Ok(NotationDeclaration {
            name: required_attribute(node, "name")?.to_string(),
            target_namespace: self.schema.target_namespace.clone(),
            system_identifier: node.attribute("system").map(str::to_string),
            public_identifier: node.attribute("public").map(str::to_string),
        })
    }

    // Wildcards (pt. 1, §3.10)

    fn parse_wildcard(&self, node: Node) -> Result<Wildcard, XsdError> {
        let process_contents = match node.attribute("processContents") {
            None | Some("strict") => ProcessContents::Strict,
            Some("lax") => ProcessContents::Lax,
            Some("skip") => ProcessContents::Skip,
            Some(other) => {
                return Err(XsdError::InvalidAttributeValue {
                    element: node.tag_name().name().to_string(),
                    attribute: "processContents",
                    value: other.to_string(),
                })
            }
        };

        let mut namespace_constraint = match node.attribute("namespace") {
            Some("##any") => NamespaceConstraint::any(),
            Some("##other") => {
                let mut namespaces = vec![None];
                if let Some(target) = &self.schema.target_namespace {
                    namespaces.push(Some(target.clone()));
                }
                NamespaceConstraint::not(namespaces)
            }
            Some(list) => NamespaceConstraint::enumeration(self.namespace_list(list)),
            None => match node.attribute("notNamespace") {
                Some(list) => NamespaceConstraint::not(self.namespace_list(list)),
                None => NamespaceConstraint::any(),
            },
        };

        if let Some(disallowed) = node.attribute("notQName") {
            for word in disallowed.split_whitespace() {
                let entry = match word {
                    "##defined" => DisallowedName::Defined,
                    "##definedSibling" => DisallowedName::Sibling,
                    _ => DisallowedName::Name(QName::parse(word, node)?),
                };
                namespace_constraint.disallowed_names.push(entry);
            }
        }

        Ok(Wildcard {
            namespace_constraint,
            process_contents,
        })
    }

    fn namespace_list(&self, value: &str) -> Set<Option<AnyURI>> {
        value
            .split_whitespace()
            .map(|word| match word {
                "##targetNamespace" => self.schema.target_namespace.clone(),
                "##local" => None,
                uri => Some(uri.to_string()),
            })
            .collect()
    }

    // Identity constraints (pt. 1, §3.11)

    fn parse_identity_constraint(
        &mut self,
        node: Node,
    ) -> Result<IdentityConstraintDefinition, XsdError> {
        if let Some(reference) = node.attribute("ref") {
            let name = QName::parse(reference, node)?;
            let existing = self
                .schema
                .find_identity_constraint_definition(&name)
                .cloned();
            return existing.ok_or(XsdError::UnresolvedIdentityConstraint(name));
        }

        let name = required_attribute(node, "name")?.to_string();
        let target_namespace = self.schema.target_namespace.clone();
        let category = match node.tag_name().name() {
            "key" => IdentityConstraintCategory::Key,
            "unique" => IdentityConstraintCategory::Unique,
            _ => {
                let refer = required_attribute(node, "refer")?;
                let referenced_key = QName::parse(refer, node)?;
                if self
                    .schema
                    .find_identity_constraint_definition(&referenced_key)
                    .is_none()
                {
                    return Err(XsdError::UnresolvedIdentityConstraint(referenced_key));
                }
                IdentityConstraintCategory::KeyRef { referenced_key }
            }
        };

        let selector_node = first_xs_child(node, "selector")
            .ok_or_else(|| XsdError::missing_child(node, "selector"))?;
        let selector = self.parse_xpath(selector_node, "xpath")?;
        let mut fields = Vec::new();
        for field in xs_children(node, "field") {
            fields.push(self.parse_xpath(field, "xpath")?);
        }

        Ok(IdentityConstraintDefinition {
            name,
            target_namespace,
            category,
            selector,
            fields,
        })
    }

    /// Captures an XPath expression with the namespace context in scope
    /// where it was written.
    fn parse_xpath(&self, node: Node, attribute: &'static str) -> Result<XPathExpression, XsdError> {
        let expression = required_attribute(node, attribute)?.to_string();

        let declared_default = node.attribute("xpathDefaultNamespace").or_else(|| {
            crate::dom::enclosing_schema(node)
                .and_then(|schema| schema.attribute("xpathDefaultNamespace"))
        });
        let default_namespace = match declared_default {
            None | Some("##local") => None,
            Some("##defaultNamespace") => node.lookup_namespace_uri(None).map(str::to_string),
            Some("##targetNamespace") => self.schema.target_namespace.clone(),
            Some(uri) => Some(uri.to_string()),
        };

        let namespace_bindings = node
            .namespaces()
            .iter()
            .filter_map(|namespace| {
                namespace
                    .name()
                    .map(|prefix| (prefix.to_string(), namespace.uri().to_string()))
            })
            .collect();

        Ok(XPathExpression {
            expression,
            default_namespace,
            namespace_bindings,
        })
    }

    fn parse_assertions(&self, node: Node) -> Result<Vec<Assertion>, XsdError> {
        let mut assertions = Vec::new();
        for child in xs_children(node, "assert") {
            assertions.push(Assertion {
                test: self.parse_xpath(child, "test")?,
            });
        }
        Ok(assertions)
    }

    // Value constraints (pt. 1, §3.3.2.5)

    /// Parses a `default` or `fixed` attribute against the simple type
    /// that effectively governs character content: the type itself, the
    /// simple content of a complex type, or `xs:string`.
    fn parse_value_constraint(
        &self,
        node: Node,
        governing: TypeId,
    ) -> Result<Option<ValueConstraint>, XsdError> {
        let (variety, lexical) = if let Some(fixed) = node.attribute("fixed") {
            (ValueConstraintVariety::Fixed, fixed)
        } else if let Some(default) = node.attribute("default") {
            (ValueConstraintVariety::Default, default)
        } else {
            return Ok(None);
        };

        let simple = self.effective_value_type(governing)?;
        let value = validate_value(&self.registry, simple, lexical, node)?;
        let lexical_form = normalize_whitespace(lexical, white_space_mode(&self.registry, simple));
        Ok(Some(ValueConstraint {
            variety,
            value,
            lexical_form,
        }))
    }

    fn effective_value_type(&self, governing: TypeId) -> Result<TypeId, XsdError> {
        match self.registry.get_def(governing) {
            TypeDefinition::Simple(_) => Ok(governing),
            TypeDefinition::Complex(complex) => {
                match complex.content_type.simple_type_definition() {
                    Some(simple) => Ok(simple),
                    None => self.registry.builtin("string"),
                }
            }
            // A self-referential type still being parsed; character
            // content falls back to plain strings.
            TypeDefinition::Unresolved(_) => self.registry.builtin("string"),
        }
    }

    // Attribute-value helpers

    fn parse_occurs(&self, node: Node) -> Result<(u32, MaxOccurs), XsdError> {
        let min_occurs = match node.attribute("minOccurs") {
            None => 1,
            Some(value) => self.occurs_value(node, "minOccurs", value)?,
        };
        let max_occurs = match node.attribute("maxOccurs") {
            None => MaxOccurs::Bounded(1),
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(value) => MaxOccurs::Bounded(self.occurs_value(node, "maxOccurs", value)?),
        };
        if let MaxOccurs::Bounded(maximum) = max_occurs {
            if min_occurs > maximum {
                return Err(XsdError::InvalidAttributeValue {
                    element: node.tag_name().name().to_string(),
                    attribute: "minOccurs",
                    value: min_occurs.to_string(),
                });
            }
        }
        Ok((min_occurs, max_occurs))
    }

    /// Occurrence counts are themselves typed values, validated against
    /// the built-in `xs:nonNegativeInteger`.
    fn occurs_value(
        &self,
        node: Node,
        attribute: &'static str,
        value: &str,
    ) -> Result<u32, XsdError> {
        let non_negative_integer = self.registry.builtin("nonNegativeInteger")?;
        match validate_value(&self.registry, non_negative_integer, value, node)? {
            Value::Integer(count) if count <= u32::MAX as i128 => Ok(count as u32),
            _ => Err(XsdError::InvalidAttributeValue {
                element: node.tag_name().name().to_string(),
                attribute,
                value: value.to_string(),
            }),
        }
    }

    fn derivation_set(
        &self,
        node: Node,
        attribute: &'static str,
        options: &[DerivationControl],
    ) -> Result<DerivationSet, XsdError> {
        match node.attribute(attribute) {
            Some(value) => derivation_words(node, attribute, value, options),
            None => {
                let default = if attribute == "block" {
                    &self.schema.block_default
                } else {
                    &self.schema.final_default
                };
                Ok(default
                    .iter()
                    .copied()
                    .filter(|control| options.contains(control))
                    .collect())
            }
        }
    }

    fn blocked_substitutions(&self, node: Node) -> Result<Set<BlockedSubstitution>, XsdError> {
        use DerivationControl::{Extension, Restriction, Substitution};
        let controls = match node.attribute("block") {
            Some(value) => derivation_words(
                node,
                "block",
                value,
                &[Extension, Restriction, Substitution],
            )?,
            None => self.schema.block_default.clone(),
        };
        Ok(controls
            .iter()
            .filter_map(|control| match control {
                DerivationControl::Extension => Some(BlockedSubstitution::Extension),
                DerivationControl::Restriction => Some(BlockedSubstitution::Restriction),
                DerivationControl::Substitution => Some(BlockedSubstitution::Substitution),
                _ => None,
            })
            .collect())
    }

    fn local_target_namespace(
        &self,
        node: Node,
        form_default: Option<Form>,
    ) -> Result<Option<AnyURI>, XsdError> {
        if let Some(target) = node.attribute("targetNamespace") {
            return Ok(Some(target.to_string()));
        }
        let form = parse_form(node, "form")?.or(form_default);
        Ok(match form {
            Some(Form::Qualified) => self.schema.target_namespace.clone(),
            _ => None,
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_form(node: Node, attribute: &'static str) -> Result<Option<Form>, XsdError> {
    match node.attribute(attribute) {
        None => Ok(None),
        Some("qualified") => Ok(Some(Form::Qualified)),
        Some("unqualified") => Ok(Some(Form::Unqualified)),
        Some(other) => Err(XsdError::InvalidAttributeValue {
            element: node.tag_name().name().to_string(),
            attribute,
            value: other.to_string(),
        }),
    }
}

fn derivation_words(
    node: Node,
    attribute: &'static str,
    value: &str,
    options: &[DerivationControl],
) -> Result<DerivationSet, XsdError> {
    if value.trim() == "#all" {
        return Ok(options.to_vec());
    }
    let mut set = Vec::new();
    for word in value.split_whitespace() {
        let control = match word {
            "extension" => DerivationControl::Extension,
            "restriction" => DerivationControl::Restriction,
            "list" => DerivationControl::List,
            "union" => DerivationControl::Union,
            "substitution" => DerivationControl::Substitution,
            _ => {
                return Err(XsdError::InvalidAttributeValue {
                    element: node.tag_name().name().to_string(),
                    attribute,
                    value: word.to_string(),
                })
            }
        };
        if options.contains(&control) && !set.contains(&control) {
            set.push(control);
        }
    }
    Ok(set)
}

fn derivation_child<'a, 'input>(
    node: Node<'a, 'input>,
) -> Result<(Node<'a, 'input>, DerivationMethod), XsdError> {
    if let Some(restriction) = first_xs_child(node, "restriction") {
        return Ok((restriction, DerivationMethod::Restriction));
    }
    if let Some(extension) = first_xs_child(node, "extension") {
        return Ok((extension, DerivationMethod::Extension));
    }
    Err(XsdError::missing_child(node, "restriction"))
}

fn parse_annotation(node: Node) -> Annotation {
    let mut annotation = Annotation::default();
    for child in element_children(node) {
        if is_xs_element(child, "appinfo") {
            annotation.application_information.push(text_content(child));
        } else if is_xs_element(child, "documentation") {
            annotation.user_information.push(text_content(child));
        }
    }
    annotation
}

fn count_value(node: Node) -> Result<u64, XsdError> {
    let value = required_attribute(node, "value")?;
    value
        .parse::<u64>()
        .map_err(|_| XsdError::InvalidAttributeValue {
            element: node.tag_name().name().to_string(),
            attribute: "value",
            value: value.to_string(),
        })
}

fn empty_sequence_particle() -> Particle {
    Particle {
        min_occurs: 1,
        max_occurs: MaxOccurs::Bounded(1),
        term: Term::ModelGroup(Box::new(ModelGroup {
            compositor: Compositor::Sequence,
            particles: Vec::new(),
        })),
    }
}

fn content_from(particle: Option<Particle>, mixed: bool) -> ContentType {
    match particle {
        None => ContentType::Empty,
        Some(particle) if mixed => ContentType::Mixed {
            particle,
            open_content: None,
        },
        Some(particle) => ContentType::ElementOnly {
            particle,
            open_content: None,
        },
    }
}

/// Merges extension content with the base type's content (pt. 1,
/// §3.4.2.3.3). `all` groups merge flat; anything else nests base and
/// derived particles in a sequence.
fn extend_content(
    base_content: ContentType,
    explicit_is_absent: bool,
    effective: Option<Particle>,
    mixed: bool,
) -> ContentType {
    let (base_particle, base_open, base_mixed) = match base_content {
        ContentType::Empty | ContentType::Simple { .. } => return content_from(effective, mixed),
        ContentType::Mixed {
            particle,
            open_content,
        } => (particle, open_content, true),
        ContentType::ElementOnly {
            particle,
            open_content,
        } => (particle, open_content, false),
    };

    let Some(derived_particle) = effective else {
        return if base_mixed {
            ContentType::Mixed {
                particle: base_particle,
                open_content: base_open,
            }
        } else {
            ContentType::ElementOnly {
                particle: base_particle,
                open_content: base_open,
            }
        };
    };

    let base_all = matches!(
        &base_particle.term,
        Term::ModelGroup(group) if group.compositor == Compositor::All
    );
    let derived_all = matches!(
        &derived_particle.term,
        Term::ModelGroup(group) if group.compositor == Compositor::All
    );

    let particle = if base_all && explicit_is_absent {
        base_particle
    } else if base_all && derived_all {
        let mut particles = match &base_particle.term {
            Term::ModelGroup(group) => group.particles.clone(),
            _ => Vec::new(),
        };
        if let Term::ModelGroup(group) = &derived_particle.term {
            particles.extend(group.particles.iter().cloned());
        }
        Particle {
            min_occurs: derived_particle.min_occurs,
            max_occurs: MaxOccurs::Bounded(1),
            term: Term::ModelGroup(Box::new(ModelGroup {
                compositor: Compositor::All,
                particles,
            })),
        }
    } else {
        Particle {
            min_occurs: 1,
            max_occurs: MaxOccurs::Bounded(1),
            term: Term::ModelGroup(Box::new(ModelGroup {
                compositor: Compositor::Sequence,
                particles: vec![base_particle, derived_particle],
            })),
        }
    };

    if mixed {
        ContentType::Mixed {
            particle,
            open_content: base_open,
        }
    } else {
        ContentType::ElementOnly {
            particle,
            open_content: base_open,
        }
    }
}

fn combine_wildcards(wildcards: Vec<Wildcard>) -> Option<Wildcard> {
    let (first, rest) = wildcards.split_first()?;
    let namespace_constraint = rest.iter().fold(
        first.namespace_constraint.clone(),
        |accumulated, wildcard| accumulated.intersection(&wildcard.namespace_constraint),
    );
    Some(Wildcard {
        namespace_constraint,
        process_contents: first.process_contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::FacetKind;
    use crate::wildcard::NamespaceConstraintVariety;
    use pretty_assertions::assert_eq;

    fn parse_doc(source: &str) -> (Schema, TypeRegistry) {
        let document = roxmltree::Document::parse(source).unwrap();
        Parser::new().parse(document.root_element()).unwrap()
    }

    #[test]
    fn repeated_patterns_group_into_one_facet() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="code">
                    <xs:restriction base="xs:token">
                        <xs:pattern value="[A-Z]+"/>
                        <xs:pattern value=".{2,4}"/>
                        <xs:enumeration value="AB"/>
                        <xs:enumeration value="CDE"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:schema>"#,
        );
        let simple = registry.simple(schema.type_definitions[0]).unwrap();
        assert_eq!(
            simple.facets.get(FacetKind::Pattern),
            Some(&Facet::Pattern(vec![
                "[A-Z]+".to_string(),
                ".{2,4}".to_string()
            ]))
        );
        assert_eq!(
            simple.facets.get(FacetKind::Enumeration),
            Some(&Facet::Enumeration(vec![
                "AB".to_string(),
                "CDE".to_string()
            ]))
        );
    }

    #[test]
    fn other_wildcard_excludes_target_and_absent_namespaces() {
        let (schema, registry) = parse_doc(
            r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                           targetNamespace="urn:example">
                <xs:complexType name="envelope">
                    <xs:sequence>
                        <xs:any namespace="##other" processContents="lax"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>"###,
        );
        assert_eq!(
            registry.get(&QName::with_namespace("urn:example", "envelope")),
            Some(schema.type_definitions[0])
        );
        let envelope = registry.complex(schema.type_definitions[0]).unwrap();
        let particle = envelope.content_type.particle().unwrap();
        let Term::ModelGroup(group) = &particle.term else {
            panic!("expected a model group");
        };
        let Term::Wildcard(wildcard) = &group.particles[0].term else {
            panic!("expected a wildcard particle");
        };
        assert_eq!(
            wildcard.namespace_constraint.variety,
            NamespaceConstraintVariety::Not
        );
        assert!(wildcard.namespace_constraint.namespaces.contains(&None));
        assert!(wildcard
            .namespace_constraint
            .namespaces
            .contains(&Some("urn:example".to_string())));
        assert_eq!(wildcard.process_contents, ProcessContents::Lax);
    }

    fn context_node<'a>(document: &'a roxmltree::Document<'a>) -> Node<'a, 'a> {
        document.root_element()
    }

    #[test]
    fn restriction_of_integer_validates_its_range() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="percentage">
                    <xs:restriction base="xs:integer">
                        <xs:minInclusive value="0"/>
                        <xs:maxInclusive value="100"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:schema>"#,
        );
        let percentage = schema.type_definitions[0];
        let document = roxmltree::Document::parse("<x/>").unwrap();
        let node = context_node(&document);

        assert_eq!(
            validate_value(&registry, percentage, "50", node).unwrap(),
            Value::Integer(50)
        );
        let error = validate_value(&registry, percentage, "150", node).unwrap_err();
        assert!(error.to_string().contains("maxInclusive"));
        let error = validate_value(&registry, percentage, "-1", node).unwrap_err();
        assert!(error.to_string().contains("minInclusive"));
    }

    #[test]
    fn list_type_collapses_whitespace_and_splits_items() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="tokens">
                    <xs:list itemType="xs:token"/>
                </xs:simpleType>
            </xs:schema>"#,
        );
        let tokens = schema.type_definitions[0];
        let document = roxmltree::Document::parse("<x/>").unwrap();
        let node = context_node(&document);

        assert_eq!(
            validate_value(&registry, tokens, "  alpha \t beta ", node).unwrap(),
            Value::List(vec![
                Value::String("alpha".to_string()),
                Value::String("beta".to_string()),
            ])
        );
    }

    #[test]
    fn extension_merges_all_groups_into_one() {
        let (_, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="base">
                    <xs:all>
                        <xs:element name="a" type="xs:string"/>
                    </xs:all>
                </xs:complexType>
                <xs:complexType name="derived">
                    <xs:complexContent>
                        <xs:extension base="base">
                            <xs:all>
                                <xs:element name="b" type="xs:string"/>
                            </xs:all>
                        </xs:extension>
                    </xs:complexContent>
                </xs:complexType>
            </xs:schema>"#,
        );
        let derived = registry
            .get(&QName::with_optional_namespace(None::<String>, "derived"))
            .unwrap();
        let derived = registry.complex(derived).unwrap();

        let particle = derived.content_type.particle().unwrap();
        let Term::ModelGroup(group) = &particle.term else {
            panic!("expected a model group");
        };
        assert_eq!(group.compositor, Compositor::All);
        assert_eq!(group.particles.len(), 2);
        assert_eq!(particle.max_occurs, MaxOccurs::Bounded(1));
    }

    #[test]
    fn extension_nests_sequences_base_first() {
        let (_, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="base">
                    <xs:sequence>
                        <xs:element name="a" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
                <xs:complexType name="derived">
                    <xs:complexContent>
                        <xs:extension base="base">
                            <xs:sequence>
                                <xs:element name="b" type="xs:string"/>
                            </xs:sequence>
                        </xs:extension>
                    </xs:complexContent>
                </xs:complexType>
            </xs:schema>"#,
        );
        let derived = registry
            .get(&QName::with_optional_namespace(None::<String>, "derived"))
            .unwrap();
        let derived = registry.complex(derived).unwrap();

        let particle = derived.content_type.particle().unwrap();
        let Term::ModelGroup(outer) = &particle.term else {
            panic!("expected a model group");
        };
        assert_eq!(outer.compositor, Compositor::Sequence);
        assert_eq!(outer.particles.len(), 2);
        // Each nested particle is the sequence of one derivation step.
        for nested in &outer.particles {
            let Term::ModelGroup(group) = &nested.term else {
                panic!("expected nested model groups");
            };
            assert_eq!(group.compositor, Compositor::Sequence);
            assert_eq!(group.particles.len(), 1);
        }
    }

    #[test]
    fn restriction_shadows_and_strips_prohibited_attributes() {
        let (_, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="base">
                    <xs:attribute name="a" type="xs:string"/>
                    <xs:attribute name="b" type="xs:string"/>
                </xs:complexType>
                <xs:complexType name="derived">
                    <xs:complexContent>
                        <xs:restriction base="base">
                            <xs:attribute name="a" type="xs:token" use="required"/>
                            <xs:attribute name="b" use="prohibited"/>
                        </xs:restriction>
                    </xs:complexContent>
                </xs:complexType>
            </xs:schema>"#,
        );
        let derived = registry
            .get(&QName::with_optional_namespace(None::<String>, "derived"))
            .unwrap();
        let derived = registry.complex(derived).unwrap();

        assert_eq!(derived.attribute_uses.len(), 1);
        let use_a = &derived.attribute_uses[0];
        assert_eq!(use_a.attribute_declaration.name, "a");
        assert!(use_a.required);
        assert_eq!(
            use_a.attribute_declaration.type_definition,
            registry.builtin("token").unwrap()
        );
    }

    #[test]
    fn simple_content_extension_takes_the_base_type() {
        let (_, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="priced">
                    <xs:simpleContent>
                        <xs:extension base="xs:decimal">
                            <xs:attribute name="currency" type="xs:string"/>
                        </xs:extension>
                    </xs:simpleContent>
                </xs:complexType>
            </xs:schema>"#,
        );
        let priced = registry
            .get(&QName::with_optional_namespace(None::<String>, "priced"))
            .unwrap();
        let priced = registry.complex(priced).unwrap();

        assert_eq!(
            priced.content_type.simple_type_definition(),
            Some(registry.builtin("decimal").unwrap())
        );
        assert_eq!(priced.derivation_method, DerivationMethod::Extension);
        assert_eq!(priced.attribute_uses.len(), 1);
        assert_eq!(priced.attribute_uses[0].attribute_declaration.name, "currency");
    }

    #[test]
    fn simple_content_restriction_applies_facets_to_base_content() {
        let (_, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="priced">
                    <xs:simpleContent>
                        <xs:extension base="xs:decimal"/>
                    </xs:simpleContent>
                </xs:complexType>
                <xs:complexType name="cheap">
                    <xs:simpleContent>
                        <xs:restriction base="priced">
                            <xs:maxInclusive value="10"/>
                        </xs:restriction>
                    </xs:simpleContent>
                </xs:complexType>
            </xs:schema>"#,
        );
        let cheap = registry
            .get(&QName::with_optional_namespace(None::<String>, "cheap"))
            .unwrap();
        let cheap = registry.complex(cheap).unwrap();
        let content = cheap.content_type.simple_type_definition().unwrap();
        let content = registry.simple(content).unwrap();

        assert_eq!(
            content.facets.get(FacetKind::MaxInclusive),
            Some(&Facet::MaxInclusive {
                value: "10".to_string(),
                fixed: false,
            })
        );
        assert_eq!(content.base_type, registry.builtin("decimal").unwrap());
    }

    #[test]
    fn mixed_type_without_particles_gets_an_empty_sequence() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="note" mixed="true">
                    <xs:attribute name="lang" type="xs:string"/>
                </xs:complexType>
            </xs:schema>"#,
        );
        let note = registry.complex(schema.type_definitions[0]).unwrap();

        let ContentType::Mixed { particle, .. } = &note.content_type else {
            panic!("expected mixed content");
        };
        assert_eq!(particle.min_occurs, 1);
        assert_eq!(particle.max_occurs, MaxOccurs::Bounded(1));
        let Term::ModelGroup(group) = &particle.term else {
            panic!("expected a model group");
        };
        assert_eq!(group.compositor, Compositor::Sequence);
        assert!(group.particles.is_empty());
    }

    #[test]
    fn group_reference_expands_to_the_named_model_group() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:group name="body">
                    <xs:sequence>
                        <xs:element name="item" type="xs:string"/>
                    </xs:sequence>
                </xs:group>
                <xs:complexType name="holder">
                    <xs:group ref="body" maxOccurs="unbounded"/>
                </xs:complexType>
            </xs:schema>"#,
        );
        assert_eq!(schema.model_group_definitions.len(), 1);
        let holder = registry.complex(schema.type_definitions[0]).unwrap();

        let particle = holder.content_type.particle().unwrap();
        assert_eq!(particle.max_occurs, MaxOccurs::Unbounded);
        let Term::ModelGroup(group) = &particle.term else {
            panic!("expected a model group");
        };
        assert_eq!(group.compositor, Compositor::Sequence);
        assert_eq!(group.particles.len(), 1);
    }

    #[test]
    fn element_declarations_resolve_types_and_constraints() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="head" type="xs:string"/>
                <xs:element name="member" substitutionGroup="head"/>
                <xs:element name="count" type="xs:int" default="5"/>
            </xs:schema>"#,
        );
        let string = registry.builtin("string").unwrap();

        let head = schema
            .find_element_declaration(&QName::with_optional_namespace(None::<String>, "head"))
            .unwrap();
        assert_eq!(head.type_definition, string);

        // An element without a type takes its substitution-group head's.
        let member = schema
            .find_element_declaration(&QName::with_optional_namespace(None::<String>, "member"))
            .unwrap();
        assert_eq!(member.type_definition, string);
        assert_eq!(
            member.substitution_group_affiliations,
            vec![QName::with_optional_namespace(None::<String>, "head")]
        );

        let count = schema
            .find_element_declaration(&QName::with_optional_namespace(None::<String>, "count"))
            .unwrap();
        let constraint = count.value_constraint.as_ref().unwrap();
        assert_eq!(constraint.variety, ValueConstraintVariety::Default);
        assert_eq!(constraint.value, Value::Integer(5));
        assert_eq!(constraint.lexical_form, "5");
    }

    #[test]
    fn identity_constraints_are_collected_and_keyrefs_resolved() {
        let (schema, _) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="library">
                    <xs:key name="bookKey">
                        <xs:selector xpath="book"/>
                        <xs:field xpath="@isbn"/>
                    </xs:key>
                    <xs:keyref name="bookRef" refer="bookKey">
                        <xs:selector xpath="loan"/>
                        <xs:field xpath="@isbn"/>
                    </xs:keyref>
                </xs:element>
            </xs:schema>"#,
        );
        let library = &schema.element_declarations[0];
        assert_eq!(library.identity_constraint_definitions.len(), 2);
        assert_eq!(schema.identity_constraint_definitions.len(), 2);

        let key = &library.identity_constraint_definitions[0];
        assert_eq!(key.category, IdentityConstraintCategory::Key);
        assert_eq!(key.selector.expression, "book");
        assert_eq!(key.fields.len(), 1);
        assert_eq!(key.fields[0].expression, "@isbn");

        let keyref = &library.identity_constraint_definitions[1];
        assert_eq!(
            keyref.category,
            IdentityConstraintCategory::KeyRef {
                referenced_key: QName::with_optional_namespace(None::<String>, "bookKey"),
            }
        );
    }

    #[test]
    fn top_level_identity_constraints_join_the_schema() {
        let (schema, _) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:key name="bookKey">
                    <xs:selector xpath="book"/>
                    <xs:field xpath="@isbn"/>
                </xs:key>
                <xs:keyref name="bookRef" refer="bookKey">
                    <xs:selector xpath="loan"/>
                    <xs:field xpath="@isbn"/>
                </xs:keyref>
            </xs:schema>"#,
        );
        assert_eq!(schema.identity_constraint_definitions.len(), 2);
        assert_eq!(schema.identity_constraint_definitions[0].name, "bookKey");
        assert_eq!(
            schema.identity_constraint_definitions[1].category,
            IdentityConstraintCategory::KeyRef {
                referenced_key: QName::with_optional_namespace(None::<String>, "bookKey"),
            }
        );
    }

    #[test]
    fn unresolved_keyref_target_is_an_error() {
        let document = roxmltree::Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="library">
                    <xs:keyref name="bookRef" refer="missingKey">
                        <xs:selector xpath="loan"/>
                        <xs:field xpath="@isbn"/>
                    </xs:keyref>
                </xs:element>
            </xs:schema>"#,
        )
        .unwrap();
        let error = Parser::new().parse(document.root_element()).unwrap_err();
        assert!(matches!(
            error,
            XsdError::UnresolvedIdentityConstraint(name) if name.local_name == "missingKey"
        ));
    }

    #[test]
    fn open_content_attaches_to_element_only_content() {
        let (schema, registry) = parse_doc(
            r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="extensible">
                    <xs:openContent mode="suffix">
                        <xs:any namespace="##any" processContents="lax"/>
                    </xs:openContent>
                    <xs:sequence>
                        <xs:element name="x" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>"###,
        );
        let extensible = registry.complex(schema.type_definitions[0]).unwrap();

        let open_content = extensible.content_type.open_content().unwrap();
        assert_eq!(open_content.mode, OpenContentMode::Suffix);
        assert_eq!(
            open_content.wildcard.process_contents,
            ProcessContents::Lax
        );
    }

    #[test]
    fn qualified_local_elements_take_the_target_namespace() {
        let (schema, registry) = parse_doc(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                          targetNamespace="urn:example"
                          elementFormDefault="qualified">
                <xs:complexType name="holder">
                    <xs:sequence>
                        <xs:element name="inner" type="xs:string"/>
                        <xs:element name="bare" form="unqualified" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>"#,
        );
        let holder = registry.complex(schema.type_definitions[0]).unwrap();
        let particle = holder.content_type.particle().unwrap();
        let Term::ModelGroup(group) = &particle.term else {
            panic!("expected a model group");
        };

        let Term::ElementDeclaration(inner) = &group.particles[0].term else {
            panic!("expected an element particle");
        };
        assert_eq!(inner.target_namespace.as_deref(), Some("urn:example"));
        assert_eq!(inner.scope, Scope::Local(ScopeParent::TypeDefinition(schema.type_definitions[0])));

        let Term::ElementDeclaration(bare) = &group.particles[1].term else {
            panic!("expected an element particle");
        };
        assert_eq!(bare.target_namespace, None);
    }

    #[test]
    fn min_occurs_above_max_occurs_is_rejected() {
        let document = roxmltree::Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="bad">
                    <xs:sequence>
                        <xs:element name="x" type="xs:string" minOccurs="3" maxOccurs="2"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>"#,
        )
        .unwrap();
        let error = Parser::new().parse(document.root_element()).unwrap_err();
        assert!(matches!(
            error,
            XsdError::InvalidAttributeValue { attribute: "minOccurs", .. }
        ));
    }

    #[test]
    fn all_keyword_expands_to_every_option() {
        let document = roxmltree::Document::parse(r##"<x block="#all"/>"##).unwrap();
        let node = document.root_element();
        let set = derivation_words(
            node,
            "block",
            "#all",
            &[DerivationControl::Extension, DerivationControl::Restriction],
        )
        .unwrap();
        assert_eq!(
            set,
            vec![DerivationControl::Extension, DerivationControl::Restriction]
        );
    }
}
