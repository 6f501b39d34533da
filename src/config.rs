use anyhow::Context as _;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::namespace::ContextNamespace;

/// Settings shared by every command of one invocation.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub verbose: bool,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            verbose: cli.verbose,
            kubeconfig: cli.kubeconfig.clone(),
            context: cli.context.clone(),
        }
    }

    fn read_kubeconfig(&self) -> Result<Kubeconfig, kube::config::KubeconfigError> {
        match &self.kubeconfig {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        }
    }

    /// Lookup of the namespace configured on the selected (or current) context.
    pub fn context_namespace(&self) -> KubeconfigContext {
        let kubeconfig = match self.read_kubeconfig() {
            Ok(kubeconfig) => Some(kubeconfig),
            Err(e) => {
                debug!("No usable kubeconfig for namespace lookup: {}", e);
                None
            }
        };
        KubeconfigContext {
            kubeconfig,
            context: self.context.clone(),
        }
    }

    pub async fn client(&self) -> anyhow::Result<Client> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let config = if self.kubeconfig.is_none() && self.context.is_none() {
            Config::infer().await?
        } else {
            let kubeconfig = self.read_kubeconfig().context("Failed to read kubeconfig")?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .with_context(|| match &self.context {
                    Some(ctx) => format!("Context '{}' not found in kubeconfig", ctx),
                    None => "Failed to load kubeconfig".to_string(),
                })?
        };

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        info!(
            "Using context: {}",
            self.context.as_deref().unwrap_or("<current>")
        );
        Ok(client)
    }
}

/// Namespace lookup backed by a parsed kubeconfig.
pub struct KubeconfigContext {
    kubeconfig: Option<Kubeconfig>,
    context: Option<String>,
}

impl ContextNamespace for KubeconfigContext {
    fn context_namespace(&self) -> Option<String> {
        let kubeconfig = self.kubeconfig.as_ref()?;
        let name = self
            .context
            .as_deref()
            .or(kubeconfig.current_context.as_deref())?;
        kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.context.as_ref())
            .and_then(|c| c.namespace.clone())
            .filter(|ns| !ns.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{NamespaceQuery, resolve};
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- cluster:
    server: https://localhost:8080
  name: test-cluster
contexts:
- context:
    cluster: test-cluster
    user: test-user
    namespace: context-namespace
  name: test-context
- context:
    cluster: test-cluster
    user: test-user
  name: bare-context
current-context: test-context
preferences: {}
users:
- name: test-user
"#;

    fn write_kubeconfig() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    fn run_config(path: PathBuf, context: Option<&str>) -> RunConfig {
        RunConfig {
            verbose: false,
            kubeconfig: Some(path),
            context: context.map(str::to_string),
        }
    }

    #[test]
    fn test_current_context_namespace() {
        let file = write_kubeconfig();
        let lookup = run_config(file.path().to_path_buf(), None).context_namespace();
        assert_eq!(
            lookup.context_namespace(),
            Some("context-namespace".to_string())
        );
    }

    #[test]
    fn test_selected_context_without_namespace() {
        let file = write_kubeconfig();
        let lookup =
            run_config(file.path().to_path_buf(), Some("bare-context")).context_namespace();
        assert_eq!(lookup.context_namespace(), None);

        let query = NamespaceQuery {
            default_namespace: "fallback",
            ..NamespaceQuery::new("", false)
        };
        assert_eq!(resolve(&query, &lookup).as_str(), "fallback");
    }

    #[test]
    fn test_unknown_context() {
        let file = write_kubeconfig();
        let lookup = run_config(file.path().to_path_buf(), Some("nope")).context_namespace();
        assert_eq!(lookup.context_namespace(), None);
    }

    #[test]
    fn test_missing_kubeconfig_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = run_config(dir.path().join("missing"), None).context_namespace();
        assert_eq!(lookup.context_namespace(), None);

        let query = NamespaceQuery::new("", false);
        assert_eq!(resolve(&query, &lookup).as_str(), "default");
    }

    #[test]
    fn test_resolver_prefers_context_over_default() {
        let file = write_kubeconfig();
        let lookup = run_config(file.path().to_path_buf(), None).context_namespace();
        let query = NamespaceQuery {
            default_namespace: "custom-default",
            ..NamespaceQuery::new("", false)
        };
        assert_eq!(resolve(&query, &lookup).as_str(), "context-namespace");
        let query = NamespaceQuery::new("explicit", false);
        assert_eq!(resolve(&query, &lookup).as_str(), "explicit");
    }

    #[test]
    fn test_empty_lookup() {
        let lookup = KubeconfigContext {
            kubeconfig: None,
            context: Some("test-context".to_string()),
        };
        assert_eq!(lookup.context_namespace(), None);
    }
}
