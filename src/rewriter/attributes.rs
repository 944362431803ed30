//! Attribute stripping rules
//!
//! Attributes are matched by the namespace URI their prefix resolves to and
//! their local name, never by the prefix text itself.

use super::namespaces::Resolved;

/// Which namespace an attribute must belong to for a rule to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceMatch {
    /// Any namespace, including unprefixed attributes (which have none)
    Any,
    /// Exactly this namespace URI
    Exact(String),
}

/// Which elements a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeScope {
    /// Only the root `model` element
    Root,
    /// Every element of the document
    Anywhere,
}

/// One vendor attribute removed by the rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedAttribute {
    namespace: NamespaceMatch,
    local_name: String,
    scope: AttributeScope,
}

impl StrippedAttribute {
    /// Create a rule from its parts
    pub fn new(namespace: NamespaceMatch, local_name: impl Into<String>, scope: AttributeScope) -> Self {
        Self {
            namespace,
            local_name: local_name.into(),
            scope,
        }
    }

    /// Strip `local_name` bound to `namespace` on every element
    pub fn in_namespace(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self::new(
            NamespaceMatch::Exact(namespace.into()),
            local_name,
            AttributeScope::Anywhere,
        )
    }

    /// Strip `local_name` in any namespace on every element
    pub fn any_namespace(local_name: impl Into<String>) -> Self {
        Self::new(NamespaceMatch::Any, local_name, AttributeScope::Anywhere)
    }

    /// Restrict this rule to the root element
    pub fn on_root(mut self) -> Self {
        self.scope = AttributeScope::Root;
        self
    }

    /// Namespace requirement
    pub fn namespace(&self) -> &NamespaceMatch {
        &self.namespace
    }

    /// Local attribute name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Element scope
    pub fn scope(&self) -> AttributeScope {
        self.scope
    }

    pub(crate) fn matches(&self, namespace: Resolved<'_>, local_name: &[u8], is_root: bool) -> bool {
        if self.scope == AttributeScope::Root && !is_root {
            return false;
        }
        if self.local_name.as_bytes() != local_name {
            return false;
        }
        match &self.namespace {
            NamespaceMatch::Any => true,
            NamespaceMatch::Exact(uri) => namespace == Resolved::Uri(uri.as_bytes()),
        }
    }
}
