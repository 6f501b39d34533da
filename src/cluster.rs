use chrono::{DateTime, Utc};
use futures::io::AsyncRead;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams, LogParams};
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::pin::Pin;
use tracing::debug;

use crate::namespace::EffectiveNamespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pods,
    Services,
    DaemonSets,
    Jobs,
    CronJobs,
    Namespaces,
    ServiceAccounts,
    Deployments,
    Ingresses,
    Events,
    Nodes,
}

impl ResourceKind {
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Pods => "pods",
            ResourceKind::Services => "services",
            ResourceKind::DaemonSets => "daemonsets",
            ResourceKind::Jobs => "jobs",
            ResourceKind::CronJobs => "cronjobs",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::ServiceAccounts => "serviceaccounts",
            ResourceKind::Deployments => "deployments",
            ResourceKind::Ingresses => "ingresses",
            ResourceKind::Events => "events",
            ResourceKind::Nodes => "nodes",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            ResourceKind::Pods => "pod",
            ResourceKind::Services => "service",
            ResourceKind::DaemonSets => "daemonset",
            ResourceKind::Jobs => "job",
            ResourceKind::CronJobs => "cronjob",
            ResourceKind::Namespaces => "namespace",
            ResourceKind::ServiceAccounts => "serviceaccount",
            ResourceKind::Deployments => "deployment",
            ResourceKind::Ingresses => "ingress",
            ResourceKind::Events => "event",
            ResourceKind::Nodes => "node",
        }
    }

    pub fn is_namespaced(self) -> bool {
        !matches!(self, ResourceKind::Namespaces | ResourceKind::Nodes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{} \"{}\" not found{}", .kind.singular(), .name, namespace_suffix(.namespace))]
    NotFound {
        kind: ResourceKind,
        name: String,
        namespace: Option<String>,
    },
    #[error("error {action}: {source}")]
    Api {
        action: String,
        #[source]
        source: kube::Error,
    },
}

fn namespace_suffix(namespace: &Option<String>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!(" in namespace \"{}\"", ns),
        _ => String::new(),
    }
}

impl QueryError {
    /// Map a failed `get`; HTTP 404 becomes [`QueryError::NotFound`].
    ///
    /// The namespace is dropped from the message for cluster-scoped kinds.
    pub fn from_get(err: kube::Error, kind: ResourceKind, name: &str, namespace: &str) -> Self {
        if let kube::Error::Api(resp) = &err
            && resp.code == 404
        {
            return QueryError::NotFound {
                kind,
                name: name.to_string(),
                namespace: kind.is_namespaced().then(|| namespace.to_string()),
            };
        }
        QueryError::Api {
            action: format!("getting {} \"{}\"", kind.singular(), name),
            source: err,
        }
    }

    pub fn from_list(err: kube::Error, kind: ResourceKind) -> Self {
        QueryError::Api {
            action: format!("listing {}", kind.plural()),
            source: err,
        }
    }
}

/// Per-kind capability: how to reach the kind's API and how to show one object as a table row.
pub trait ResourceView: Clone + Debug + DeserializeOwned + Serialize {
    const KIND: ResourceKind;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self>;

    fn headers(wide: bool) -> Vec<&'static str>;

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String>;
}

/// Api for a namespaced kind, spanning the cluster when the scope is every namespace.
pub fn namespaced_api<K>(client: Client, namespace: &EffectiveNamespace) -> Api<K>
where
    K: kube::Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        EffectiveNamespace::All => Api::all(client),
        EffectiveNamespace::Named(ns) => Api::namespaced(client, ns),
    }
}

/// Either one named object or a (possibly label-filtered) listing.
#[derive(Debug, Clone)]
pub struct ResourceQuery<'a> {
    pub name: Option<&'a str>,
    pub namespace: EffectiveNamespace,
    pub selector: Option<&'a str>,
}

impl<'a> ResourceQuery<'a> {
    pub fn list(namespace: EffectiveNamespace) -> Self {
        Self {
            name: None,
            namespace,
            selector: None,
        }
    }
}

pub async fn fetch<K: ResourceView>(
    client: &Client,
    query: &ResourceQuery<'_>,
) -> Result<Vec<K>, QueryError> {
    let api = K::api(client.clone(), &query.namespace);

    match query.name {
        Some(name) => {
            debug!(
                "Getting {} {} in namespace {}",
                K::KIND.singular(),
                name,
                query.namespace
            );
            api.get(name)
                .await
                .map(|obj| vec![obj])
                .map_err(|e| QueryError::from_get(e, K::KIND, name, query.namespace.as_str()))
        }
        None => {
            let mut params = ListParams::default();
            if let Some(selector) = query.selector.filter(|s| !s.is_empty()) {
                params = params.labels(selector);
            }
            debug!(
                "Listing {} in namespace {} with selector {:?}",
                K::KIND.plural(),
                query.namespace,
                query.selector
            );
            let list = api
                .list(&params)
                .await
                .map_err(|e| QueryError::from_list(e, K::KIND))?;
            Ok(list.items)
        }
    }
}

/// Current CPU/memory usage of a node as reported by metrics-server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUsage {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

/// Node usage keyed by node name, from the `metrics.k8s.io` API.
pub async fn node_usage(client: &Client) -> Result<HashMap<String, NodeUsage>, QueryError> {
    let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "NodeMetrics");
    let resource = ApiResource::from_gvk_with_plural(&gvk, "nodes");
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &resource);
    let list = api
        .list(&ListParams::default())
        .await
        .map_err(|e| QueryError::from_list(e, ResourceKind::Nodes))?;

    Ok(list
        .items
        .into_iter()
        .map(|metrics| {
            let usage = &metrics.data["usage"];
            let node = NodeUsage {
                cpu: usage["cpu"].as_str().map(str::to_string),
                memory: usage["memory"].as_str().map(str::to_string),
            };
            (metrics.name_any(), node)
        })
        .collect())
}

/// Cluster calls needed to find a log source's pods and read their logs.
///
/// Bound to a single namespace for its whole lifetime.
pub trait LogBackend {
    type Stream<'a>: AsyncRead + Unpin
    where
        Self: 'a;

    fn namespace(&self) -> &str;

    async fn deployment_selector(&self, name: &str) -> Result<LabelSelector, QueryError>;

    async fn service_selector(&self, name: &str) -> Result<BTreeMap<String, String>, QueryError>;

    /// Names of the pods matching `selector`, in listing order.
    async fn pods_matching(&self, selector: &str) -> Result<Vec<String>, QueryError>;

    async fn open_logs<'a>(
        &'a self,
        pod: &'a str,
        params: &'a LogParams,
    ) -> Result<Self::Stream<'a>, QueryError>;
}

pub struct KubeBackend {
    namespace: String,
    pods: Api<Pod>,
    deployments: Api<Deployment>,
    services: Api<Service>,
}

impl KubeBackend {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            pods: Api::namespaced(client.clone(), namespace),
            deployments: Api::namespaced(client.clone(), namespace),
            services: Api::namespaced(client, namespace),
        }
    }
}

impl LogBackend for KubeBackend {
    type Stream<'a>
        = Pin<Box<dyn AsyncRead + 'a>>
    where
        Self: 'a;

    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn deployment_selector(&self, name: &str) -> Result<LabelSelector, QueryError> {
        let deployment = self.deployments.get(name).await.map_err(|e| {
            QueryError::from_get(e, ResourceKind::Deployments, name, &self.namespace)
        })?;
        Ok(deployment.spec.map(|s| s.selector).unwrap_or_default())
    }

    async fn service_selector(&self, name: &str) -> Result<BTreeMap<String, String>, QueryError> {
        let service = self.services.get(name).await.map_err(|e| {
            QueryError::from_get(e, ResourceKind::Services, name, &self.namespace)
        })?;
        Ok(service.spec.and_then(|s| s.selector).unwrap_or_default())
    }

    async fn pods_matching(&self, selector: &str) -> Result<Vec<String>, QueryError> {
        let list = self
            .pods
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| QueryError::from_list(e, ResourceKind::Pods))?;
        Ok(list.items.iter().map(|pod| pod.name_any()).collect())
    }

    async fn open_logs<'a>(
        &'a self,
        pod: &'a str,
        params: &'a LogParams,
    ) -> Result<Self::Stream<'a>, QueryError> {
        let stream = self
            .pods
            .log_stream(pod, params)
            .await
            .map_err(|e| QueryError::from_get(e, ResourceKind::Pods, pod, &self.namespace))?;
        Ok(Box::pin(stream))
    }
}
