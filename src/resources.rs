//! Table rows for every resource kind the CLI can show.

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    Container, Event, Namespace, Node, Pod, PodSpec, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::{Api, Client, ResourceExt};

use crate::cluster::{NodeUsage, ResourceKind, ResourceView, namespaced_api};
use crate::namespace::EffectiveNamespace;
use crate::quantity::usage_percent;
use crate::selector::{labels_to_selector, selector_to_string};
use crate::utils::{NONE, format_age, format_duration, join_or_none, to_datetime};

fn namespace_of<K: ResourceExt>(obj: &K) -> String {
    obj.namespace().unwrap_or_default()
}

fn containers_and_images(spec: Option<&PodSpec>) -> (String, String) {
    let containers: &[Container] = spec.map(|s| s.containers.as_slice()).unwrap_or_default();
    (
        join_or_none(containers.iter().map(|c| c.name.as_str()), ","),
        join_or_none(
            containers.iter().map(|c| c.image.as_deref().unwrap_or("")),
            ",",
        ),
    )
}

impl ResourceView for Pod {
    const KIND: ResourceKind = ResourceKind::Pods;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec![
            "NAMESPACE", "NAME", "READY", "STATUS", "RESTARTS", "AGE", "IP", "NODE",
        ];
        if wide {
            headers.extend(["NOMINATED NODE", "READINESS GATES"]);
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let spec = self.spec.as_ref();
        let status = self.status.as_ref();
        let statuses = status
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();

        let total = spec.map(|s| s.containers.len()).unwrap_or(0);
        let ready = statuses.iter().filter(|cs| cs.ready).count();
        let restarts: i32 = statuses.iter().map(|cs| cs.restart_count).sum();

        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            format!("{}/{}", ready, total),
            status
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            restarts.to_string(),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
            status
                .and_then(|s| s.pod_ip.clone())
                .unwrap_or_else(|| NONE.to_string()),
            spec.and_then(|s| s.node_name.clone())
                .unwrap_or_else(|| NONE.to_string()),
        ];
        if wide {
            row.push(
                status
                    .and_then(|s| s.nominated_node_name.clone())
                    .unwrap_or_else(|| NONE.to_string()),
            );
            let gates = spec
                .and_then(|s| s.readiness_gates.as_deref())
                .unwrap_or_default();
            row.push(join_or_none(
                gates.iter().map(|g| g.condition_type.as_str()),
                ",",
            ));
        }
        row
    }
}

fn service_external_ip(service: &Service) -> String {
    let spec = service.spec.as_ref();
    if spec.and_then(|s| s.type_.as_deref()) == Some("LoadBalancer") {
        let ingress = service
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_deref())
            .unwrap_or_default();
        let addresses: Vec<&str> = ingress
            .iter()
            .flat_map(|i| [i.ip.as_deref(), i.hostname.as_deref()])
            .flatten()
            .filter(|a| !a.is_empty())
            .collect();
        return if addresses.is_empty() {
            "<pending>".to_string()
        } else {
            addresses.join(",")
        };
    }
    join_or_none(
        spec.and_then(|s| s.external_ips.as_deref())
            .unwrap_or_default(),
        ",",
    )
}

impl ResourceView for Service {
    const KIND: ResourceKind = ResourceKind::Services;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec![
            "NAMESPACE",
            "NAME",
            "TYPE",
            "CLUSTER-IP",
            "EXTERNAL-IP",
            "PORT(S)",
            "AGE",
        ];
        if wide {
            headers.push("SELECTOR");
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let spec = self.spec.as_ref();
        let ports = spec
            .and_then(|s| s.ports.as_deref())
            .unwrap_or_default()
            .iter()
            .map(|p| {
                let protocol = p.protocol.as_deref().unwrap_or("TCP");
                match p.node_port {
                    Some(node_port) if node_port > 0 => {
                        format!("{}:{}/{}", p.port, node_port, protocol)
                    }
                    _ => format!("{}/{}", p.port, protocol),
                }
            });

        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            spec.and_then(|s| s.type_.clone())
                .unwrap_or_else(|| "ClusterIP".to_string()),
            spec.and_then(|s| s.cluster_ip.clone())
                .filter(|ip| !ip.is_empty())
                .unwrap_or_else(|| NONE.to_string()),
            service_external_ip(self),
            join_or_none(ports, ","),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            let selector = spec
                .and_then(|s| s.selector.as_ref())
                .map(labels_to_selector)
                .unwrap_or_default();
            row.push(join_or_none([selector], ","));
        }
        row
    }
}

impl ResourceView for DaemonSet {
    const KIND: ResourceKind = ResourceKind::DaemonSets;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec![
            "NAMESPACE",
            "NAME",
            "DESIRED",
            "CURRENT",
            "READY",
            "UP-TO-DATE",
            "AVAILABLE",
            "NODE SELECTOR",
            "AGE",
        ];
        if wide {
            headers.extend(["CONTAINERS", "IMAGES"]);
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let status = self.status.clone().unwrap_or_default();
        let pod_spec = self.spec.as_ref().and_then(|s| s.template.spec.as_ref());
        let node_selector = pod_spec
            .and_then(|s| s.node_selector.as_ref())
            .map(labels_to_selector)
            .unwrap_or_default();

        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            status.desired_number_scheduled.to_string(),
            status.current_number_scheduled.to_string(),
            status.number_ready.to_string(),
            status.updated_number_scheduled.unwrap_or(0).to_string(),
            status.number_available.unwrap_or(0).to_string(),
            join_or_none([node_selector], ","),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            let (containers, images) = containers_and_images(pod_spec);
            row.extend([containers, images]);
        }
        row
    }
}

fn job_duration(job: &Job, now: DateTime<Utc>) -> String {
    let status = job.status.as_ref();
    let start = status
        .and_then(|s| s.start_time.as_ref())
        .and_then(to_datetime);
    let completion = status
        .and_then(|s| s.completion_time.as_ref())
        .and_then(to_datetime);

    match (start, completion) {
        (Some(start), Some(end)) => format_duration(end.signed_duration_since(start)),
        (Some(start), None) => {
            let elapsed = format_duration(now.signed_duration_since(start));
            if status.and_then(|s| s.active).unwrap_or(0) > 0 {
                format!("{} (running)", elapsed)
            } else {
                elapsed
            }
        }
        _ => NONE.to_string(),
    }
}

impl ResourceView for Job {
    const KIND: ResourceKind = ResourceKind::Jobs;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec!["NAMESPACE", "NAME", "COMPLETIONS", "DURATION", "AGE"];
        if wide {
            headers.extend(["CONDITIONS", "SELECTOR"]);
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let spec = self.spec.as_ref();
        let status = self.status.as_ref();
        let completions = match spec.and_then(|s| s.completions) {
            Some(wanted) => format!(
                "{}/{}",
                status.and_then(|s| s.succeeded).unwrap_or(0),
                wanted
            ),
            None => "N/A".to_string(),
        };

        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            completions,
            job_duration(self, now),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            let conditions = status
                .and_then(|s| s.conditions.as_deref())
                .unwrap_or_default()
                .iter()
                .filter(|c| c.status == "True")
                .map(|c| c.type_.as_str());
            row.push(join_or_none(conditions, ","));
            row.push(
                spec.and_then(|s| s.selector.as_ref())
                    .and_then(selector_to_string)
                    .unwrap_or_else(|| NONE.to_string()),
            );
        }
        row
    }
}

impl ResourceView for CronJob {
    const KIND: ResourceKind = ResourceKind::CronJobs;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec![
            "NAMESPACE",
            "NAME",
            "SCHEDULE",
            "SUSPEND",
            "ACTIVE",
            "LAST SCHEDULE",
            "AGE",
        ];
        if wide {
            headers.push("LAST SUCCESSFUL TIME");
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let spec = self.spec.as_ref();
        let status = self.status.as_ref();
        let suspended = spec.and_then(|s| s.suspend).unwrap_or(false);
        let active = status
            .and_then(|s| s.active.as_ref())
            .map(Vec::len)
            .unwrap_or(0);
        let last_schedule = status
            .and_then(|s| s.last_schedule_time.as_ref())
            .and_then(to_datetime)
            .map(|t| format!("{} ago", format_duration(now.signed_duration_since(t))))
            .unwrap_or_else(|| NONE.to_string());

        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            spec.map(|s| s.schedule.clone()).unwrap_or_default(),
            if suspended { "True" } else { "False" }.to_string(),
            active.to_string(),
            last_schedule,
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            row.push(
                status
                    .and_then(|s| s.last_successful_time.as_ref())
                    .and_then(to_datetime)
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_else(|| NONE.to_string()),
            );
        }
        row
    }
}

impl ResourceView for Namespace {
    const KIND: ResourceKind = ResourceKind::Namespaces;

    fn api(client: Client, _namespace: &EffectiveNamespace) -> Api<Self> {
        Api::all(client)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec!["NAME", "STATUS", "AGE"];
        if wide {
            headers.push("LABELS");
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let mut row = vec![
            self.name_any(),
            self.status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            row.push(join_or_none([labels_to_selector(self.labels())], ","));
        }
        row
    }
}

impl ResourceView for ServiceAccount {
    const KIND: ResourceKind = ResourceKind::ServiceAccounts;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec!["NAMESPACE", "NAME", "SECRETS", "AGE"];
        if wide {
            headers.push("AUTOMOUNT");
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let secrets = self.secrets.as_ref().map(Vec::len).unwrap_or(0);
        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            secrets.to_string(),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            row.push(
                self.automount_service_account_token
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "<nil>".to_string()),
            );
        }
        row
    }
}

impl ResourceView for Deployment {
    const KIND: ResourceKind = ResourceKind::Deployments;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(wide: bool) -> Vec<&'static str> {
        let mut headers = vec!["NAMESPACE", "NAME", "READY", "UP-TO-DATE", "AVAILABLE", "AGE"];
        if wide {
            headers.extend(["CONTAINERS", "IMAGES", "SELECTOR"]);
        }
        headers
    }

    fn row(&self, wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let status = self.status.clone().unwrap_or_default();
        let replicas = status.replicas.unwrap_or(0);
        let unavailable = status.unavailable_replicas.unwrap_or(0);

        let mut row = vec![
            namespace_of(self),
            self.name_any(),
            format!("{}/{}", replicas - unavailable, replicas),
            status.updated_replicas.unwrap_or(0).to_string(),
            status.available_replicas.unwrap_or(0).to_string(),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ];
        if wide {
            let spec = self.spec.as_ref();
            let (containers, images) =
                containers_and_images(spec.and_then(|s| s.template.spec.as_ref()));
            row.extend([containers, images]);
            row.push(
                spec.and_then(|s| selector_to_string(&s.selector))
                    .unwrap_or_else(|| NONE.to_string()),
            );
        }
        row
    }
}

impl ResourceView for Ingress {
    const KIND: ResourceKind = ResourceKind::Ingresses;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(_wide: bool) -> Vec<&'static str> {
        vec!["NAMESPACE", "NAME", "CLASS", "HOSTS", "ADDRESS", "PORTS", "AGE"]
    }

    fn row(&self, _wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let spec = self.spec.as_ref();
        let hosts: Vec<&str> = spec
            .and_then(|s| s.rules.as_deref())
            .unwrap_or_default()
            .iter()
            .filter_map(|r| r.host.as_deref())
            .filter(|h| !h.is_empty())
            .collect();
        let addresses: Vec<&str> = self
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_deref())
            .unwrap_or_default()
            .iter()
            .filter_map(|i| {
                i.ip.as_deref()
                    .filter(|ip| !ip.is_empty())
                    .or(i.hostname.as_deref())
            })
            .filter(|a| !a.is_empty())
            .collect();
        let has_tls = spec
            .and_then(|s| s.tls.as_deref())
            .unwrap_or_default()
            .iter()
            .any(|tls| tls.hosts.as_ref().is_some_and(|h| !h.is_empty()));

        vec![
            namespace_of(self),
            self.name_any(),
            spec.and_then(|s| s.ingress_class_name.clone())
                .unwrap_or_else(|| NONE.to_string()),
            if hosts.is_empty() {
                "*".to_string()
            } else {
                hosts.join(",")
            },
            if addresses.is_empty() {
                "<pending>".to_string()
            } else {
                addresses.join(", ")
            },
            if has_tls { "80, 443" } else { "80" }.to_string(),
            format_age(self.metadata.creation_timestamp.as_ref(), now),
        ]
    }
}

impl ResourceView for Event {
    const KIND: ResourceKind = ResourceKind::Events;

    fn api(client: Client, namespace: &EffectiveNamespace) -> Api<Self> {
        namespaced_api(client, namespace)
    }

    fn headers(_wide: bool) -> Vec<&'static str> {
        vec!["LAST SEEN", "TYPE", "REASON", "OBJECT", "MESSAGE", "NAMESPACE"]
    }

    fn row(&self, _wide: bool, now: DateTime<Utc>) -> Vec<String> {
        let last_seen = self
            .last_timestamp
            .as_ref()
            .and_then(to_datetime)
            .map(|t| format!("{} ago", format_duration(now.signed_duration_since(t))))
            .unwrap_or_else(|| "Unknown".to_string());
        let object = format!(
            "{}/{}",
            self.involved_object.kind.as_deref().unwrap_or_default(),
            self.involved_object.name.as_deref().unwrap_or_default()
        );
        vec![
            last_seen,
            self.type_.clone().unwrap_or_default(),
            self.reason.clone().unwrap_or_default(),
            object,
            self.message.clone().unwrap_or_default(),
            namespace_of(self),
        ]
    }
}

/// Case-insensitive match on the event type; an empty filter matches everything.
pub fn event_type_matches(event: &Event, wanted: &str) -> bool {
    wanted.is_empty()
        || event
            .type_
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
}

pub const NODE_HEADERS: [&str; 9] = [
    "NAME",
    "STATUS",
    "ROLES",
    "VERSION",
    "CPU_ALLOC",
    "CPU_USAGE",
    "MEM_ALLOC",
    "MEM_USAGE",
    "AGE",
];

fn node_status(node: &Node) -> &'static str {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default()
        .iter()
        .find(|c| c.type_ == "Ready");
    match ready {
        Some(c) if c.status == "True" => "Ready",
        Some(_) => "NotReady",
        None => "Unknown",
    }
}

fn node_roles(node: &Node) -> String {
    let mut roles: Vec<&str> = Vec::new();
    for (key, value) in node.labels() {
        let role = match key.strip_prefix("node-role.kubernetes.io/") {
            Some(role) => role,
            None if key == "kubernetes.io/role" => value.as_str(),
            None => continue,
        };
        if !role.is_empty() && !roles.contains(&role) {
            roles.push(role);
        }
    }
    join_or_none(roles, ",")
}

/// One row of the nodes table; usage cells are `N/A` without metrics.
pub fn node_row(node: &Node, usage: Option<&NodeUsage>, now: DateTime<Utc>) -> Vec<String> {
    let status = node.status.as_ref();
    let allocatable = status.and_then(|s| s.allocatable.as_ref());
    let cpu_alloc = allocatable.and_then(|a| a.get("cpu"));
    let mem_alloc = allocatable.and_then(|a| a.get("memory"));

    let percent = |used: Option<&String>, alloc: Option<&Quantity>| {
        used.zip(alloc)
            .and_then(|(used, alloc)| usage_percent(used, alloc))
            .unwrap_or_else(|| "N/A".to_string())
    };

    vec![
        node.name_any(),
        node_status(node).to_string(),
        node_roles(node),
        status
            .and_then(|s| s.node_info.as_ref())
            .map(|i| i.kubelet_version.clone())
            .unwrap_or_default(),
        cpu_alloc.map(|q| q.0.clone()).unwrap_or_default(),
        percent(usage.and_then(|u| u.cpu.as_ref()), cpu_alloc),
        mem_alloc.map(|q| q.0.clone()).unwrap_or_default(),
        percent(usage.and_then(|u| u.memory.as_ref()), mem_alloc),
        format_age(node.metadata.creation_timestamp.as_ref(), now),
    ]
}

/// Plain node listing; `monitor nodes` fills in usage through [`node_row`] itself.
impl ResourceView for Node {
    const KIND: ResourceKind = ResourceKind::Nodes;

    fn api(client: Client, _namespace: &EffectiveNamespace) -> Api<Self> {
        Api::all(client)
    }

    fn headers(_wide: bool) -> Vec<&'static str> {
        NODE_HEADERS.to_vec()
    }

    fn row(&self, _wide: bool, now: DateTime<Utc>) -> Vec<String> {
        node_row(self, None, now)
    }
}
