// campaign-maintenance/src/remote/trigger.rs
use reqwest::Method;

use super::{RemoteClient, RemoteFailure, StepResult, is_explicit_failure};

/// Invokes the `fetch-google-ads` function with an empty body and returns
/// the raw response text on any 2xx.
pub async fn trigger_sync(client: &RemoteClient) -> StepResult<String> {
    let url = client.sync_url().clone();
    tracing::debug!(%url, "invoking sync function");

    let response = client
        .request(Method::POST, url)
        .send()
        .await
        .map_err(|e| RemoteFailure::transport(&e))?;

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "sync function responded");

    if status.is_success() {
        response.text().await.map_err(|e| RemoteFailure::transport(&e))
    } else if is_explicit_failure(status) {
        Err(RemoteFailure::rejected(response).await)
    } else {
        Err(RemoteFailure::UnexpectedStatus { status })
    }
}
