use futures::StreamExt;
use serde_json::json;

use crate::{
    Conflab, LoadOptions,
    cli::{
        CommandResult, GlobalArgs,
        formatting::{format_change_value, format_description, format_json},
    },
    value::ConfigValue,
};

/// Builds load options from the global flags.
///
/// `--etcd` becomes an `etcd` override so the remote layer is joined even
/// when the files do not configure it.
pub fn load_options(global: &GlobalArgs, args: Vec<String>) -> LoadOptions {
    let overrides = global
        .etcd
        .as_ref()
        .map(|host| ConfigValue::from(json!({ "etcd": { "hosts": [host] } })));

    LoadOptions {
        config_path: global.config_dir.clone(),
        library_path: global.library_dir.clone(),
        env: global.env.clone(),
        service_name: global.service.clone(),
        remote_prefix: global.prefix.clone(),
        argv: Some(args),
        overrides,
        ..LoadOptions::default()
    }
}

pub async fn dump(global: &GlobalArgs, path: Option<&str>, args: Vec<String>) -> CommandResult {
    let conflab = Conflab::new();
    let live = conflab.load(load_options(global, args)).await?;
    live.stop();

    let value = match path {
        Some(path) => live.get_by_path(path)?,
        None => live.current().as_ref().clone(),
    };

    Ok(format_json(&value)?)
}

pub async fn watch(global: &GlobalArgs, pattern: &str, args: Vec<String>) -> CommandResult {
    let conflab = Conflab::new();
    let live = conflab.load(load_options(global, args)).await?;

    println!("{}", format_json(live.current().as_ref())?);
    println!(
        "{}",
        format_description(&format!("Watching '{pattern}', press Ctrl+C to stop"))
    );

    let mut changes = Box::pin(live.subscribe_to_path(pattern));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = changes.next() => match change {
                Some(change) => println!(
                    "{} {} -> {}",
                    change.path,
                    format_change_value(change.old_value.as_ref()),
                    format_change_value(change.new_value.as_ref()),
                ),
                None => break,
            },
        }
    }

    live.stop();
    Ok("Watch ended".to_string())
}
