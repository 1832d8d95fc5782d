use crate::error::XsdError;
use std::fmt;

/// The XML Schema namespace, `xs:` throughout this crate.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// The XML Schema instance namespace (`xsi:`), home of `xsi:type` and friends.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub type NCName = String;
pub type AnyURI = String;

/// An expanded name: optional namespace name plus local name
/// (Namespaces in XML 1.0, §2.1)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace_name: Option<AnyURI>,
    pub local_name: NCName,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace_name) = self.namespace_name.as_ref() {
            write!(f, "{{{}}}{}", namespace_name, self.local_name)
        } else {
            write!(f, "{}", self.local_name)
        }
    }
}

impl QName {
    pub fn with_namespace(
        namespace_name: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::with_optional_namespace(Some(namespace_name), local_name)
    }

    pub fn with_optional_namespace(
        namespace_name: Option<impl Into<String>>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_name: namespace_name.map(Into::into),
            local_name: local_name.into(),
        }
    }

    pub fn xs(local_name: impl Into<String>) -> Self {
        Self::with_namespace(XS_NAMESPACE, local_name)
    }

    /// Resolves a prefixed name against the in-scope namespace bindings of `context`.
    pub fn qualified(
        prefix: impl AsRef<str>,
        local_name: impl Into<String>,
        context: roxmltree::Node,
    ) -> Result<Self, XsdError> {
        let prefix = prefix.as_ref();
        let namespace_name = if prefix == "xml" {
            // The prefix xml is by definition bound to the namespace name
            // http://www.w3.org/XML/1998/namespace.
            // (Namespaces in XML 1.0, §3)
            "http://www.w3.org/XML/1998/namespace"
        } else {
            context
                .lookup_namespace_uri(Some(prefix))
                .ok_or_else(|| XsdError::NamePrefixNotResolved(prefix.into()))?
        };
        Ok(Self::with_namespace(namespace_name, local_name))
    }

    /// An unprefixed name takes the default namespace in scope at `context`,
    /// or no namespace when no default declaration is in scope.
    /// (Namespaces in XML 1.0, §6.2)
    pub fn unqualified(local_name: impl Into<String>, context: roxmltree::Node) -> Self {
        let namespace_name = context.lookup_namespace_uri(None);
        QName::with_optional_namespace(namespace_name, local_name)
    }

    pub fn parse(source: &str, context: roxmltree::Node) -> Result<Self, XsdError> {
        if let Some((prefix, local)) = source.rsplit_once(':') {
            Self::qualified(prefix, local, context)
        } else {
            Ok(Self::unqualified(source, context))
        }
    }
}

pub type Sequence<T> = Vec<T>;
pub type Set<T> = Vec<T>;
