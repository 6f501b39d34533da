#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command, GetArgs, GetCommand, MonitorCommand};
    use crate::logs::LogSource;
    use crate::output::OutputFormat;
    use clap::Parser;

    fn monitor(args: &[&str]) -> MonitorCommand {
        let mut argv = vec!["eks-review", "monitor"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Monitor { command } = cli.command;
        command
    }

    fn get_args(args: &[&str]) -> GetArgs {
        let mut argv = vec!["get"];
        argv.extend_from_slice(args);
        match monitor(&argv) {
            MonitorCommand::Get { resource } => match resource {
                GetCommand::Pods(args)
                | GetCommand::Services(args)
                | GetCommand::Daemonsets(args)
                | GetCommand::Jobs(args)
                | GetCommand::Cronjobs(args)
                | GetCommand::Serviceaccounts(args) => args,
                GetCommand::Namespaces(args) => args.into(),
            },
            other => panic!("expected get, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parsing_get_pods() {
        let args = get_args(&["pods", "-n", "prod", "-l", "app=web"]);
        assert_eq!(args.name, None);
        assert_eq!(args.scope.namespace.as_deref(), Some("prod"));
        assert_eq!(args.selector.as_deref(), Some("app=web"));
        assert_eq!(args.output, OutputFormat::Table);
    }

    #[test]
    fn test_cli_parsing_get_aliases() {
        for alias in ["po", "svc", "ds", "job", "cj", "ns", "sa"] {
            let cli = Cli::try_parse_from(["eks-review", "monitor", "get", alias]);
            assert!(cli.is_ok(), "alias {} should parse", alias);
        }
        let command = monitor(&["get", "svc", "web"]);
        assert!(matches!(
            command,
            MonitorCommand::Get {
                resource: GetCommand::Services(GetArgs { name: Some(ref n), .. })
            } if n == "web"
        ));
    }

    #[test]
    fn test_cli_parsing_output_format() {
        assert_eq!(get_args(&["pods", "-o", "wide"]).output, OutputFormat::Wide);
        assert_eq!(get_args(&["jobs", "--output", "JSON"]).output, OutputFormat::Json);
        assert_eq!(get_args(&["cj", "-o", "yaml"]).output, OutputFormat::Yaml);
        assert!(Cli::try_parse_from(["eks-review", "monitor", "get", "pods", "-o", "xml"]).is_err());
    }

    #[test]
    fn test_cli_parsing_all_namespaces() {
        let args = get_args(&["ds", "-A"]);
        assert!(args.scope.all_namespaces);
        let args = get_args(&["pods", "--all-namespaces"]);
        assert!(args.scope.all_namespaces);
    }

    #[test]
    fn test_cli_namespaces_have_no_namespace_flag() {
        assert!(Cli::try_parse_from(["eks-review", "monitor", "get", "ns", "-n", "x"]).is_err());
        let args = get_args(&["namespaces", "kube-system"]);
        assert_eq!(args.name.as_deref(), Some("kube-system"));
        assert!(args.scope.namespace.is_none());
    }

    #[test]
    fn test_cli_parsing_status() {
        match monitor(&["status", "-A"]) {
            MonitorCommand::Status(scope) => assert!(scope.all_namespaces),
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parsing_events() {
        match monitor(&["events", "-n", "all", "-T", "warning"]) {
            MonitorCommand::Events(args) => {
                assert_eq!(args.namespace.as_deref(), Some("all"));
                assert_eq!(args.event_type.as_deref(), Some("warning"));
            }
            other => panic!("expected events, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parsing_logs() {
        let command = monitor(&[
            "logs",
            "--deployment",
            "web",
            "-n",
            "prod",
            "-c",
            "app",
            "-f",
            "--grep",
            "ERROR",
            "--tail",
            "100",
        ]);
        let MonitorCommand::Logs(args) = command else {
            panic!("expected logs");
        };
        assert_eq!(args.deployment.as_deref(), Some("web"));
        assert_eq!(args.namespace.as_deref(), Some("prod"));
        assert_eq!(args.container.as_deref(), Some("app"));
        assert!(args.follow);
        assert!(!args.previous);
        assert_eq!(args.grep.as_deref(), Some("ERROR"));
        assert_eq!(args.tail, Some(100));
        assert_eq!(
            LogSource::from_args(&args).unwrap(),
            LogSource::Deployment("web".to_string())
        );
    }

    #[test]
    fn test_cli_logs_conflicting_sources_parse_but_are_rejected() {
        let MonitorCommand::Logs(args) = monitor(&["logs", "--pod", "a", "--service", "b"]) else {
            panic!("expected logs");
        };
        assert!(LogSource::from_args(&args).is_err());
    }

    #[test]
    fn test_cli_parsing_global_flags() {
        let cli = Cli::try_parse_from([
            "eks-review",
            "monitor",
            "nodes",
            "-v",
            "--context",
            "staging",
            "--kubeconfig",
            "/tmp/kubeconfig",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.context.as_deref(), Some("staging"));
        assert_eq!(
            cli.kubeconfig.as_deref(),
            Some(std::path::Path::new("/tmp/kubeconfig"))
        );
    }

    #[test]
    fn test_cli_requires_a_command() {
        assert!(Cli::try_parse_from(["eks-review"]).is_err());
        assert!(Cli::try_parse_from(["eks-review", "monitor"]).is_err());
        assert!(Cli::try_parse_from(["eks-review", "monitor", "diagnose"]).is_err());
    }
}
