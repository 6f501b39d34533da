use std::fmt;

/// Namespace name used when neither a flag nor the kubeconfig context names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Literal accepted by some commands (`-n all`) as a synonym for `--all-namespaces`.
const ALL_SENTINEL: &str = "all";

/// Resolved namespace scope for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveNamespace {
    /// Every namespace in the cluster.
    All,
    Named(String),
}

impl EffectiveNamespace {
    /// Value handed to the API layer: an empty string means every namespace.
    pub fn as_str(&self) -> &str {
        match self {
            EffectiveNamespace::All => "",
            EffectiveNamespace::Named(ns) => ns,
        }
    }
}

impl fmt::Display for EffectiveNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveNamespace::All => f.write_str("<all namespaces>"),
            EffectiveNamespace::Named(ns) => f.write_str(ns),
        }
    }
}

/// Source of the namespace configured on the active kubeconfig context.
pub trait ContextNamespace {
    /// Returns `None` when there is no config, no active context or no namespace on it.
    fn context_namespace(&self) -> Option<String>;
}

/// Lookup that never finds a context namespace.
#[cfg(test)]
pub struct NoContext;

#[cfg(test)]
impl ContextNamespace for NoContext {
    fn context_namespace(&self) -> Option<String> {
        None
    }
}

/// Flag values a command feeds into namespace resolution.
#[derive(Debug, Clone, Default)]
pub struct NamespaceQuery<'a> {
    pub namespace_flag: &'a str,
    pub all_namespaces: bool,
    pub default_namespace: &'a str,
    pub allow_all_sentinel: bool,
}

impl<'a> NamespaceQuery<'a> {
    pub fn new(namespace_flag: &'a str, all_namespaces: bool) -> Self {
        Self {
            namespace_flag,
            all_namespaces,
            default_namespace: DEFAULT_NAMESPACE,
            allow_all_sentinel: false,
        }
    }

    pub fn allow_all_sentinel(mut self) -> Self {
        self.allow_all_sentinel = true;
        self
    }
}

/// Compute the namespace a query targets.
///
/// Precedence: `--all-namespaces`, then an explicit `--namespace` (where `all`
/// maps to every namespace if the command allows it), then the namespace of the
/// active kubeconfig context, then `query.default_namespace`, then `"default"`.
/// Never fails: missing configuration degrades to the defaults.
pub fn resolve(query: &NamespaceQuery<'_>, context: &impl ContextNamespace) -> EffectiveNamespace {
    if query.all_namespaces {
        return EffectiveNamespace::All;
    }

    if !query.namespace_flag.is_empty() {
        if query.allow_all_sentinel && query.namespace_flag.eq_ignore_ascii_case(ALL_SENTINEL) {
            return EffectiveNamespace::All;
        }
        return EffectiveNamespace::Named(query.namespace_flag.to_string());
    }

    if let Some(ns) = context.context_namespace().filter(|ns| !ns.is_empty()) {
        return EffectiveNamespace::Named(ns);
    }

    if query.default_namespace.is_empty() {
        EffectiveNamespace::Named(DEFAULT_NAMESPACE.to_string())
    } else {
        EffectiveNamespace::Named(query.default_namespace.to_string())
    }
}
