//! Unit tests for argument parsing and output formatting.
//! No network or filesystem access.

#![allow(clippy::panic)]

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use crate::{
    cli::{
        Cli, Commands,
        commands::local::load_options,
        formatting::{format_change_value, format_status},
    },
    remote::HeartbeatStatus,
    value::ConfigValue,
};

#[test]
fn global_flags_work_after_subcommand() {
    let cli = Cli::try_parse_from([
        "conflab",
        "dump",
        "--env",
        "staging",
        "--config-dir",
        "/srv/app/config",
    ])
    .unwrap();

    assert_eq!(cli.global.env.as_deref(), Some("staging"));
    assert_eq!(cli.global.config_dir, Some(PathBuf::from("/srv/app/config")));
    assert!(matches!(cli.command, Commands::Dump { path: None, .. }));
}

#[test]
fn trailing_arguments_feed_argv_layer() {
    let cli = Cli::try_parse_from(["conflab", "dump", "--", "--server.port=9000", "--debug"])
        .unwrap();

    let Commands::Dump { args, .. } = cli.command else {
        panic!("expected dump command");
    };
    assert_eq!(args, vec!["--server.port=9000", "--debug"]);

    let options = load_options(&cli.global, args);
    assert_eq!(
        options.argv,
        Some(vec!["--server.port=9000".to_string(), "--debug".to_string()])
    );
    assert!(options.overrides.is_none());
}

#[test]
fn etcd_flag_becomes_remote_override() {
    let cli = Cli::try_parse_from(["conflab", "--etcd", "10.0.0.5:4001", "dump"]).unwrap();

    let options = load_options(&cli.global, Vec::new());

    assert_eq!(
        options.overrides.map(serde_json::Value::from),
        Some(json!({"etcd": {"hosts": ["10.0.0.5:4001"]}}))
    );
}

#[test]
fn admin_commands_take_positionals() {
    let cli =
        Cli::try_parse_from(["conflab", "set", "billing", "live", "db.host", "db1"]).unwrap();

    match cli.command {
        Commands::Set {
            service,
            environment,
            key,
            value,
        } => {
            assert_eq!(
                (service.as_str(), environment.as_str(), key.as_str(), value.as_str()),
                ("billing", "live", "db.host", "db1")
            );
        }
        other => panic!("unexpected command {other:?}"),
    }

    assert!(Cli::try_parse_from(["conflab", "show", "billing"]).is_err());
}

#[test]
fn change_values_are_summarised() {
    let list = ConfigValue::from(json!([1, 2, 3]));
    let map = ConfigValue::from(json!({"a": 1}));

    assert_eq!(format_change_value(Some(&ConfigValue::from(5i64))), "5");
    assert_eq!(format_change_value(Some(&list)), "[3]");
    assert_eq!(format_change_value(Some(&map)), "{1}");
    assert_eq!(format_change_value(None), "<removed>");
}

#[test]
fn heartbeat_status_is_labelled() {
    assert!(format_status(HeartbeatStatus::Ok).contains("ok"));
    assert!(format_status(HeartbeatStatus::Offline).contains("offline"));
}
