// campaign-maintenance/src/remote/cleanup.rs
use reqwest::{Method, StatusCode};
use url::Url;

use super::{RemoteClient, RemoteFailure, StepResult, is_explicit_failure};

/// PostgREST filter selecting the synthetic campaigns.
pub const DUMMY_FILTER_COLUMN: &str = "external_id";
pub const DUMMY_FILTER_VALUE: &str = "like.dummy_*";

fn delete_url(client: &RemoteClient) -> Url {
    let mut url = client.campaigns_url().clone();
    url.query_pairs_mut()
        .append_pair(DUMMY_FILTER_COLUMN, DUMMY_FILTER_VALUE);
    url
}

/// Deletes every campaign whose `external_id` starts with `dummy_`.
///
/// Only 200 and 204 count as success. Other statuses below 400 come back as
/// [`RemoteFailure::UnexpectedStatus`], 4xx/5xx as [`RemoteFailure::Rejected`]
/// with the response body.
pub async fn delete_dummy_records(client: &RemoteClient) -> StepResult<StatusCode> {
    let url = delete_url(client);
    tracing::debug!(%url, "deleting dummy campaigns");

    let response = client
        .request(Method::DELETE, url)
        .send()
        .await
        .map_err(|e| RemoteFailure::transport(&e))?;

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "delete responded");

    match status {
        StatusCode::OK | StatusCode::NO_CONTENT => Ok(status),
        s if is_explicit_failure(s) => Err(RemoteFailure::rejected(response).await),
        s => Err(RemoteFailure::UnexpectedStatus { status: s }),
    }
}
