use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "eks-review")]
#[command(version, about = "Review the state of Kubernetes (EKS) clusters")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cluster monitoring tools
    Monitor {
        #[command(subcommand)]
        command: MonitorCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum MonitorCommand {
    /// Display one or many resources
    Get {
        #[command(subcommand)]
        resource: GetCommand,
    },
    /// Quick summary of pods, deployments, services and ingresses
    Status(ScopeArgs),
    /// Node status, roles and resource usage
    Nodes,
    /// Recent cluster events
    Events(EventsArgs),
    /// Print the logs of a pod, or of every pod behind a deployment or service
    Logs(LogsArgs),
}

#[derive(Subcommand, Debug)]
pub enum GetCommand {
    /// List one or more pods
    #[command(visible_alias = "po")]
    Pods(GetArgs),
    /// List one or more services
    #[command(visible_alias = "svc")]
    Services(GetArgs),
    /// List one or more daemonsets
    #[command(visible_alias = "ds")]
    Daemonsets(GetArgs),
    /// List one or more jobs
    #[command(visible_alias = "job")]
    Jobs(GetArgs),
    /// List one or more cronjobs
    #[command(visible_alias = "cj")]
    Cronjobs(GetArgs),
    /// List one or more namespaces
    #[command(visible_alias = "ns")]
    Namespaces(ClusterGetArgs),
    /// List one or more service accounts
    #[command(visible_alias = "sa")]
    Serviceaccounts(GetArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Namespace scope for this request
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// List the requested objects across all namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Only show the resource with this name
    pub name: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Label selector to filter on, e.g. app=web,env=prod
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ClusterGetArgs {
    /// Only show the resource with this name
    pub name: Option<String>,

    /// Label selector to filter on
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

impl From<ClusterGetArgs> for GetArgs {
    fn from(args: ClusterGetArgs) -> Self {
        GetArgs {
            name: args.name,
            scope: ScopeArgs::default(),
            selector: args.selector,
            output: args.output,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EventsArgs {
    /// Namespace scope for this request; `all` lists every namespace
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// Only show events of this type (Warning, Normal), case-insensitive
    #[arg(short = 'T', long = "type")]
    pub event_type: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Pod to print logs from
    #[arg(long)]
    pub pod: Option<String>,

    /// Deployment whose pods to print logs from
    #[arg(long)]
    pub deployment: Option<String>,

    /// Service whose selected pods to print logs from
    #[arg(long)]
    pub service: Option<String>,

    /// Namespace scope for this request
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// Container name (if multi-container pod)
    #[arg(short = 'c', long)]
    pub container: Option<String>,

    /// Stream new log lines as they arrive
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Print the logs of the previous container instance
    #[arg(short = 'p', long)]
    pub previous: bool,

    /// Only print lines containing this text
    #[arg(long)]
    pub grep: Option<String>,

    /// Number of lines from the end of the logs to show
    #[arg(long)]
    pub tail: Option<i64>,
}
