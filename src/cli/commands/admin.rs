use std::fmt::Write;

use crate::{
    cli::{
        CommandResult, GlobalArgs,
        formatting::{format_header, format_json, format_status},
    },
    remote::{AdminApi, EtcdConnector, RemoteConnector, RemoteError, RemoteSettings},
};

fn admin_api(global: &GlobalArgs) -> Result<AdminApi, RemoteError> {
    let settings = global
        .etcd
        .as_ref()
        .map(|host| RemoteSettings::from_hosts([host]))
        .unwrap_or_default();

    let api = AdminApi::new(EtcdConnector.connect(&settings)?);

    Ok(match &global.prefix {
        Some(prefix) => api.with_prefix(prefix),
        None => api,
    })
}

pub async fn services(global: &GlobalArgs) -> CommandResult {
    let services = admin_api(global)?.services().await?;
    Ok(services.join("\n"))
}

pub async fn environments(global: &GlobalArgs, service: &str) -> CommandResult {
    let result = admin_api(global)?.service_environments(service).await?;

    let mut output = format_header(&result.service);
    for environment in &result.environments {
        let status = result
            .heartbeats
            .get(environment)
            .map(|status| format_status(*status))
            .unwrap_or_default();
        let _ = write!(output, "\n  {environment} {status}");
    }

    Ok(output)
}

pub async fn files(global: &GlobalArgs, service: &str, environment: &str) -> CommandResult {
    let result = admin_api(global)?
        .environment_files(service, environment)
        .await?;

    Ok(result.files.join("\n"))
}

pub async fn show(
    global: &GlobalArgs,
    service: &str,
    environment: &str,
    file: &str,
) -> CommandResult {
    let result = admin_api(global)?
        .file_config(service, environment, file)
        .await?;

    Ok(format_json(&result.config)?)
}

pub async fn set(
    global: &GlobalArgs,
    service: &str,
    environment: &str,
    key: &str,
    value: &str,
) -> CommandResult {
    admin_api(global)?
        .update_key(service, environment, key, value)
        .await?;

    Ok(format!("Set {key} = {value}"))
}

pub async fn delete(
    global: &GlobalArgs,
    service: &str,
    environment: &str,
    key: &str,
) -> CommandResult {
    admin_api(global)?
        .delete_key(service, environment, key)
        .await?;

    Ok(format!("Deleted {key}"))
}
