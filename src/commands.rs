use chrono::Utc;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Event, Namespace, Node, Pod, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Client, ResourceExt};
use std::io::{IsTerminal, Write};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cli::{EventsArgs, GetArgs, GetCommand, LogsArgs, MonitorCommand, ScopeArgs};
use crate::cluster::{KubeBackend, ResourceQuery, ResourceView, fetch, node_usage};
use crate::config::RunConfig;
use crate::logs::{self, LogOptions, LogSource};
use crate::namespace::{ContextNamespace, EffectiveNamespace, NamespaceQuery, resolve};
use crate::output::{OutputFormat, render_collection};
use crate::resources::{NODE_HEADERS, event_type_matches, node_row};
use crate::table::print_table;

/// Run one `monitor` subcommand against the cluster selected by `config`.
pub async fn run<W: Write>(
    config: &RunConfig,
    command: MonitorCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    // Flag conflicts are reported before connecting.
    if let MonitorCommand::Logs(args) = &command {
        LogSource::from_args(args)?;
    }

    let client = config.client().await?;
    match command {
        MonitorCommand::Get { resource } => get(&client, config, resource, out).await,
        MonitorCommand::Status(scope) => status(&client, config, &scope, out).await,
        MonitorCommand::Nodes => nodes(&client, out).await,
        MonitorCommand::Events(args) => events(&client, config, &args, out).await,
        MonitorCommand::Logs(args) => logs(&client, config, &args, out).await,
    }
}

/// A named get ignores `--all-namespaces`; a listing honours it.
fn get_namespace(args: &GetArgs, context: &impl ContextNamespace) -> EffectiveNamespace {
    let flag = args.scope.namespace.as_deref().unwrap_or_default();
    let all = args.name.is_none() && args.scope.all_namespaces;
    resolve(&NamespaceQuery::new(flag, all), context)
}

pub async fn get<W: Write>(
    client: &Client,
    run: &RunConfig,
    command: GetCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        GetCommand::Pods(args) => get_kind::<Pod, W>(client, run, &args, out).await,
        GetCommand::Services(args) => get_kind::<Service, W>(client, run, &args, out).await,
        GetCommand::Daemonsets(args) => get_kind::<DaemonSet, W>(client, run, &args, out).await,
        GetCommand::Jobs(args) => get_kind::<Job, W>(client, run, &args, out).await,
        GetCommand::Cronjobs(args) => get_kind::<CronJob, W>(client, run, &args, out).await,
        GetCommand::Serviceaccounts(args) => {
            get_kind::<ServiceAccount, W>(client, run, &args, out).await
        }
        GetCommand::Namespaces(args) => {
            get_kind::<Namespace, W>(client, run, &args.into(), out).await
        }
    }
}

async fn get_kind<K: ResourceView, W: Write>(
    client: &Client,
    run: &RunConfig,
    args: &GetArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let namespace = get_namespace(args, &run.context_namespace());
    let query = ResourceQuery {
        name: args.name.as_deref(),
        namespace,
        selector: args.selector.as_deref(),
    };
    let items = fetch::<K>(client, &query).await?;
    debug!("Fetched {} {}", items.len(), K::KIND.plural());
    render_collection(&items, args.output, Utc::now(), out)
}

pub async fn status<W: Write>(
    client: &Client,
    run: &RunConfig,
    scope: &ScopeArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let context = run.context_namespace();
    let flag = scope.namespace.as_deref().unwrap_or_default();
    let namespace = resolve(&NamespaceQuery::new(flag, scope.all_namespaces), &context);

    info!("Fetching resource status in {}", namespace);
    if flag.is_empty() && !scope.all_namespaces && context.context_namespace().is_none() {
        writeln!(
            out,
            "No namespace specified. Using '{}' namespace. Use -n <namespace> or --all-namespaces.",
            namespace
        )?;
    }

    let mut failed = Vec::new();
    if !status_section::<Pod, W>(client, &namespace, "Pods", out).await? {
        failed.push("pods");
    }
    if !status_section::<Deployment, W>(client, &namespace, "Deployments", out).await? {
        failed.push("deployments");
    }
    if !status_section::<Service, W>(client, &namespace, "Services", out).await? {
        failed.push("services");
    }
    if !status_section::<Ingress, W>(client, &namespace, "Ingresses", out).await? {
        failed.push("ingresses");
    }

    if !failed.is_empty() {
        anyhow::bail!("could not list {}", failed.join(", "));
    }
    Ok(())
}

/// Print one section; a failed listing is reported and yields `false`.
async fn status_section<K: ResourceView, W: Write>(
    client: &Client,
    namespace: &EffectiveNamespace,
    title: &str,
    out: &mut W,
) -> anyhow::Result<bool> {
    writeln!(out)?;
    writeln!(out, "--- {} ---", title)?;
    match fetch::<K>(client, &ResourceQuery::list(namespace.clone())).await {
        Ok(items) => {
            render_collection(&items, OutputFormat::Table, Utc::now(), out)?;
            Ok(true)
        }
        Err(e) => {
            error!("{}", e);
            Ok(false)
        }
    }
}

pub async fn nodes<W: Write>(client: &Client, out: &mut W) -> anyhow::Result<()> {
    info!("Retrieving node information");
    let nodes = fetch::<Node>(client, &ResourceQuery::list(EffectiveNamespace::All)).await?;

    writeln!(out)?;
    writeln!(out, "--- Nodes ---")?;
    if nodes.is_empty() {
        writeln!(out, "No nodes found.")?;
        return Ok(());
    }

    let usage = match node_usage(client).await {
        Ok(usage) => usage,
        Err(e) => {
            warn!("Node metrics unavailable (is metrics-server installed?): {}", e);
            Default::default()
        }
    };

    let now = Utc::now();
    let rows: Vec<Vec<String>> = nodes
        .iter()
        .map(|node| node_row(node, usage.get(&node.name_any()), now))
        .collect();
    print_table(out, &NODE_HEADERS, &rows)?;
    Ok(())
}

/// Tells the user which scope an unqualified `events` call ended up with.
fn events_scope_notice(
    flag: &str,
    namespace: &EffectiveNamespace,
    context: &impl ContextNamespace,
) -> Option<String> {
    match namespace {
        EffectiveNamespace::All => Some("Retrieving events from all namespaces.".to_string()),
        EffectiveNamespace::Named(ns) if flag.is_empty() && context.context_namespace().is_none() => {
            Some(format!(
                "No namespace specified for events. Using namespace '{}'. Use -n <namespace> or -n all.",
                ns
            ))
        }
        EffectiveNamespace::Named(_) => None,
    }
}

pub async fn events<W: Write>(
    client: &Client,
    run: &RunConfig,
    args: &EventsArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let flag = args.namespace.as_deref().unwrap_or_default();
    let context = run.context_namespace();
    let namespace = resolve(&NamespaceQuery::new(flag, false).allow_all_sentinel(), &context);
    let wanted = args.event_type.as_deref().unwrap_or_default();

    info!("Fetching events in {}", namespace);
    if let Some(notice) = events_scope_notice(flag, &namespace, &context) {
        writeln!(out, "{}", notice)?;
    }

    let events = fetch::<Event>(client, &ResourceQuery::list(namespace)).await?;
    debug!("Fetched {} raw events", events.len());

    writeln!(out)?;
    writeln!(out, "--- Events ---")?;
    let matching: Vec<Event> = events
        .into_iter()
        .filter(|e| event_type_matches(e, wanted))
        .collect();
    if matching.is_empty() && !wanted.is_empty() {
        writeln!(out, "No events of type '{}' found.", wanted)?;
        return Ok(());
    }
    render_collection(&matching, OutputFormat::Table, Utc::now(), out)
}

pub async fn logs<W: Write>(
    client: &Client,
    run: &RunConfig,
    args: &LogsArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let source = LogSource::from_args(args)?;
    let flag = args.namespace.as_deref().unwrap_or_default();
    let namespace = resolve(&NamespaceQuery::new(flag, false), &run.context_namespace());
    let backend = KubeBackend::new(client.clone(), namespace.as_str());
    let options = LogOptions::from_args(args, std::io::stdout().is_terminal());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, stopping log streams");
            on_interrupt.cancel();
        }
    });

    logs::run(&backend, &source, &options, out, &cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NoContext;

    struct FixedContext(&'static str);

    impl ContextNamespace for FixedContext {
        fn context_namespace(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn args(name: Option<&str>, namespace: Option<&str>, all: bool) -> GetArgs {
        GetArgs {
            name: name.map(str::to_string),
            scope: ScopeArgs {
                namespace: namespace.map(str::to_string),
                all_namespaces: all,
            },
            selector: None,
            output: OutputFormat::Table,
        }
    }

    #[test]
    fn test_listing_honours_all_namespaces() {
        let ns = get_namespace(&args(None, Some("prod"), true), &NoContext);
        assert_eq!(ns, EffectiveNamespace::All);
    }

    #[test]
    fn test_named_get_ignores_all_namespaces() {
        let ns = get_namespace(&args(Some("web-1"), None, true), &FixedContext("team-a"));
        assert_eq!(ns, EffectiveNamespace::Named("team-a".to_string()));

        let ns = get_namespace(&args(Some("web-1"), Some("prod"), true), &NoContext);
        assert_eq!(ns, EffectiveNamespace::Named("prod".to_string()));
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let ns = get_namespace(&args(None, None, false), &NoContext);
        assert_eq!(ns, EffectiveNamespace::Named("default".to_string()));
    }

    #[test]
    fn test_events_notice_for_default_namespace() {
        let ns = EffectiveNamespace::Named("default".to_string());
        assert_eq!(
            events_scope_notice("", &ns, &NoContext).as_deref(),
            Some("No namespace specified for events. Using namespace 'default'. Use -n <namespace> or -n all.")
        );
        // An explicit flag or a context namespace needs no notice.
        assert_eq!(events_scope_notice("default", &ns, &NoContext), None);
        let ns = EffectiveNamespace::Named("team-a".to_string());
        assert_eq!(events_scope_notice("", &ns, &FixedContext("team-a")), None);
    }

    #[test]
    fn test_events_notice_for_all_namespaces() {
        let ns = resolve(&NamespaceQuery::new("ALL", false).allow_all_sentinel(), &NoContext);
        assert_eq!(
            events_scope_notice("ALL", &ns, &NoContext).as_deref(),
            Some("Retrieving events from all namespaces.")
        );
    }

    #[test]
    fn test_get_does_not_treat_all_as_sentinel() {
        let ns = get_namespace(&args(None, Some("all"), false), &NoContext);
        assert_eq!(ns, EffectiveNamespace::Named("all".to_string()));
    }
}
