use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{RemoteAction, RemoteError, RemoteEvent, RemoteNode, RemoteStore, RemoteWatch};

const KEYS_PATH: &str = "/v2/keys";
const INDEX_HEADER: &str = "X-Etcd-Index";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const KEY_NOT_FOUND: u64 = 100;
const EVENT_INDEX_CLEARED: u64 = 401;

/// Client for the etcd v2 HTTP keys API.
///
/// Endpoints are tried in order; a transport failure moves on to the next
/// one. Watches use long polling without a request timeout.
#[derive(Debug, Clone)]
pub struct EtcdClient {
    endpoints: Vec<String>,
    client: Client,
    watch_client: Client,
}

#[derive(Debug, Deserialize)]
struct EtcdResponse<N> {
    action: String,
    node: N,
}

#[derive(Debug, Deserialize)]
struct WatchNode {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "modifiedIndex")]
    modified_index: u64,
}

#[derive(Debug, Deserialize)]
struct EtcdErrorBody {
    #[serde(rename = "errorCode")]
    error_code: u64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: Option<String>,
}

impl EtcdClient {
    /// Creates a client for `endpoints`, e.g. `http://127.0.0.1:4001`.
    ///
    /// # Errors
    /// * `RemoteError::Transport` - If no endpoint is given or the HTTP client cannot be built
    pub fn new<I, S>(endpoints: I) -> Result<Self, RemoteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<String> = endpoints
            .into_iter()
            .map(|e| e.into().trim_end_matches('/').to_string())
            .collect();

        if endpoints.is_empty() {
            return Err(RemoteError::Transport("no etcd endpoints configured".into()));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let watch_client = Client::builder()
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            endpoints,
            client,
            watch_client,
        })
    }

    /// Configured endpoints in the order they are tried.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn send<F>(&self, client: &Client, build: F) -> Result<Response, RemoteError>
    where
        F: Fn(&Client, String) -> RequestBuilder,
    {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            match build(client, endpoint.clone()).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "etcd endpoint unreachable");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(RemoteError::Transport(
            last_error.unwrap_or_else(|| "no etcd endpoints configured".into()),
        ))
    }

    async fn wait_once(&self, key: &str, wait_index: u64) -> Result<Response, RemoteError> {
        let wait_index = wait_index.to_string();

        self.send(&self.watch_client, |client, endpoint| {
            client.get(keys_url(&endpoint, key)).query(&[
                ("wait", "true"),
                ("recursive", "true"),
                ("waitIndex", wait_index.as_str()),
            ])
        })
        .await
    }

    async fn current_index(&self, key: &str) -> Result<u64, RemoteError> {
        let response = self
            .send(&self.client, |client, endpoint| {
                client.get(keys_url(&endpoint, key))
            })
            .await?;

        etcd_index(&response)
            .ok_or_else(|| RemoteError::Decode(format!("missing {INDEX_HEADER} header")))
    }
}

#[async_trait]
impl RemoteStore for EtcdClient {
    async fn set(&self, key: &str, value: &str) -> Result<(), RemoteError> {
        let response = self
            .send(&self.client, |client, endpoint| {
                client
                    .put(keys_url(&endpoint, key))
                    .form(&[("value", value)])
            })
            .await?;

        decode::<EtcdResponse<RemoteNode>>(response).await.map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<RemoteNode, RemoteError> {
        let response = self
            .send(&self.client, |client, endpoint| {
                client
                    .get(keys_url(&endpoint, key))
                    .query(&[("recursive", "true")])
            })
            .await?;

        decode::<EtcdResponse<RemoteNode>>(response)
            .await
            .map(|body| body.node)
    }

    async fn delete(&self, key: &str, recursive: bool) -> Result<(), RemoteError> {
        let recursive = if recursive { "true" } else { "false" };
        let response = self
            .send(&self.client, |client, endpoint| {
                client
                    .delete(keys_url(&endpoint, key))
                    .query(&[("recursive", recursive)])
            })
            .await?;

        decode::<EtcdResponse<RemoteNode>>(response).await.map(|_| ())
    }

    async fn watch(&self, key: &str) -> Result<RemoteWatch, RemoteError> {
        let start = self.current_index(key).await? + 1;
        let client = self.clone();
        let key = key.to_string();

        let stream = async_stream::try_stream! {
            let mut wait_index = start;

            loop {
                let response = client.wait_once(&key, wait_index).await?;
                let header_index = etcd_index(&response);

                match decode::<EtcdResponse<WatchNode>>(response).await {
                    Ok(body) => {
                        wait_index = body.node.modified_index + 1;

                        let Some(action) = RemoteAction::from_etcd(&body.action) else {
                            debug!(action = %body.action, "Ignoring etcd action");
                            continue;
                        };

                        yield RemoteEvent {
                            action,
                            key: body.node.key,
                            value: body.node.value,
                        };
                    }
                    Err(RemoteError::Status { code: EVENT_INDEX_CLEARED, message }) => {
                        warn!(%message, "etcd watch index cleared, resuming from current index");
                        wait_index = match header_index {
                            Some(index) => index + 1,
                            None => client.current_index(&key).await? + 1,
                        };
                    }
                    Err(e) => Err::<(), _>(e)?,
                }
            }
        };

        Ok(stream.boxed())
    }
}

fn keys_url(endpoint: &str, key: &str) -> String {
    format!("{endpoint}{KEYS_PATH}/{}", key.trim_start_matches('/'))
}

fn etcd_index(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(INDEX_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()));
    }

    match serde_json::from_slice::<EtcdErrorBody>(&body) {
        Ok(error) if error.error_code == KEY_NOT_FOUND => Err(RemoteError::NotFound(
            error.cause.unwrap_or(error.message),
        )),
        Ok(error) => Err(RemoteError::Status {
            code: error.error_code,
            message: error.message,
        }),
        Err(_) => Err(RemoteError::Status {
            code: u64::from(status.as_u16()),
            message: String::from_utf8_lossy(&body).into_owned(),
        }),
    }
}
