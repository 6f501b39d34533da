use kube::api::LogParams;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cli::LogsArgs;
use crate::cluster::{LogBackend, QueryError};
use crate::scanner::LineScanner;
use crate::selector::{labels_to_selector, selector_to_string};
use crate::utils::log_header;

#[derive(Debug, thiserror::Error)]
pub enum LogsError {
    #[error("{0}")]
    Usage(String),
    #[error("{kind} '{name}' has no selector, no pods can be associated with it")]
    NoSelector { kind: &'static str, name: String },
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Exactly one of the three ways to name the pods whose logs are wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Pod(String),
    Deployment(String),
    Service(String),
}

impl LogSource {
    /// Empty values count as not given.
    pub fn from_flags(
        pod: Option<&str>,
        deployment: Option<&str>,
        service: Option<&str>,
    ) -> Result<Self, LogsError> {
        let given = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        let mut sources: Vec<LogSource> = [
            given(pod).map(LogSource::Pod),
            given(deployment).map(LogSource::Deployment),
            given(service).map(LogSource::Service),
        ]
        .into_iter()
        .flatten()
        .collect();

        match sources.len() {
            0 => Err(LogsError::Usage(
                "one of --pod, --deployment or --service must be specified".to_string(),
            )),
            1 => Ok(sources.remove(0)),
            _ => Err(LogsError::Usage(
                "only one of --pod, --deployment or --service may be specified".to_string(),
            )),
        }
    }

    pub fn from_args(args: &LogsArgs) -> Result<Self, LogsError> {
        Self::from_flags(
            args.pod.as_deref(),
            args.deployment.as_deref(),
            args.service.as_deref(),
        )
    }

    fn describe(&self) -> String {
        match self {
            LogSource::Pod(name) => format!("pod '{}'", name),
            LogSource::Deployment(name) => format!("deployment '{}'", name),
            LogSource::Service(name) => format!("service '{}'", name),
        }
    }
}

/// Pod names whose logs the source refers to, in listing order.
pub async fn resolve_targets<B: LogBackend>(
    backend: &B,
    source: &LogSource,
) -> Result<Vec<String>, LogsError> {
    match source {
        LogSource::Pod(name) => Ok(vec![name.clone()]),
        LogSource::Deployment(name) => {
            let selector = backend.deployment_selector(name).await?;
            let Some(selector) = selector_to_string(&selector) else {
                return Err(LogsError::NoSelector {
                    kind: "deployment",
                    name: name.clone(),
                });
            };
            debug!("Deployment {} selects pods with {}", name, selector);
            Ok(backend.pods_matching(&selector).await?)
        }
        LogSource::Service(name) => {
            let labels = backend.service_selector(name).await?;
            if labels.is_empty() {
                return Err(LogsError::NoSelector {
                    kind: "service",
                    name: name.clone(),
                });
            }
            let selector = labels_to_selector(&labels);
            debug!("Service {} selects pods with {}", name, selector);
            Ok(backend.pods_matching(&selector).await?)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub container: Option<String>,
    pub follow: bool,
    pub previous: bool,
    pub tail: Option<i64>,
    pub grep: Option<String>,
    pub color: bool,
}

impl LogOptions {
    pub fn from_args(args: &LogsArgs, color: bool) -> Self {
        Self {
            container: args.container.clone().filter(|c| !c.is_empty()),
            follow: args.follow,
            previous: args.previous,
            tail: args.tail,
            grep: args.grep.clone(),
            color,
        }
    }

    /// Request parameters; a non-positive tail means "all lines".
    pub fn log_params(&self) -> LogParams {
        LogParams {
            container: self.container.clone(),
            follow: self.follow,
            previous: self.previous,
            tail_lines: self.tail.filter(|n| *n > 0),
            ..Default::default()
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        match self.grep.as_deref() {
            Some(pattern) if !pattern.is_empty() => line.contains(pattern),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureStage {
    Open,
    Read,
}

impl FailureStage {
    fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Open => "open",
            FailureStage::Read => "read",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetFailure {
    pub pod: String,
    pub stage: FailureStage,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    pub targets_done: usize,
    pub lines_written: u64,
    pub failures: Vec<TargetFailure>,
    pub cancelled: bool,
}

/// Stream each target's logs in turn, one header per target.
///
/// A target that cannot be opened or breaks mid-stream is recorded in the
/// report and the next target is processed. Only errors writing to `out`
/// abort the whole run.
pub async fn aggregate<B: LogBackend, W: Write>(
    backend: &B,
    targets: &[String],
    options: &LogOptions,
    out: &mut W,
    cancel: &CancellationToken,
) -> std::io::Result<AggregateReport> {
    let params = options.log_params();
    let mut report = AggregateReport::default();

    for pod in targets {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        writeln!(out)?;
        writeln!(out, "{}", log_header(pod, backend.namespace(), options.color))?;

        let opened = tokio::select! {
            _ = cancel.cancelled() => {
                report.cancelled = true;
                break;
            }
            opened = backend.open_logs(pod, &params) => opened,
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to open log stream for pod {}: {}", pod, e);
                report.failures.push(TargetFailure {
                    pod: pod.clone(),
                    stage: FailureStage::Open,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let mut scanner = LineScanner::new(stream);
        loop {
            let more = tokio::select! {
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                more = scanner.advance() => more,
            };
            if !more {
                break;
            }
            if let Some(line) = scanner.current_line()
                && options.matches(&line)
            {
                writeln!(out, "{}", line)?;
                report.lines_written += 1;
            }
        }
        out.flush()?;
        debug!(
            "Pod {}: {} line(s) read, scanner {:?}",
            pod,
            scanner.lines_produced(),
            scanner.state()
        );
        if options.follow && scanner.end_of_stream() {
            info!("Log stream for pod {} was closed by the server", pod);
        }

        if let Some(e) = scanner.last_error() {
            error!("Error reading logs from pod {}: {}", pod, e);
            report.failures.push(TargetFailure {
                pod: pod.clone(),
                stage: FailureStage::Read,
                error: e.to_string(),
            });
        }
        report.targets_done += 1;
        if report.cancelled {
            break;
        }
    }

    Ok(report)
}

/// The logs command body: resolve, then aggregate.
pub async fn run<B: LogBackend, W: Write>(
    backend: &B,
    source: &LogSource,
    options: &LogOptions,
    out: &mut W,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let resolved = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Interrupted while resolving {}", source.describe());
            return Ok(());
        }
        resolved = resolve_targets(backend, source) => resolved,
    };
    let targets = match resolved {
        Ok(targets) => targets,
        Err(e @ LogsError::NoSelector { .. }) => {
            writeln!(out, "{}", e)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if targets.is_empty() {
        writeln!(
            out,
            "No pods found for {} in namespace '{}'.",
            source.describe(),
            backend.namespace()
        )?;
        return Ok(());
    }
    info!("Streaming logs from {} pod(s)", targets.len());

    let report = aggregate(backend, &targets, options, out, cancel).await?;
    debug!(
        "Wrote {} line(s) from {} target(s)",
        report.lines_written, report.targets_done
    );

    if !report.failures.is_empty() {
        let failed: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("{} ({} failed: {})", f.pod, f.stage.as_str(), f.error))
            .collect();
        anyhow::bail!(
            "failed to stream logs for {} of {} pod(s): {}",
            failed.len(),
            targets.len(),
            failed.join(", ")
        );
    }
    Ok(())
}
