// campaign-maintenance/src/remote/inspect.rs
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

use super::{RemoteClient, RemoteFailure};

pub const GOOGLE_ADS_PLATFORM: &str = "Google Ads";
pub const INSPECT_LIMIT: usize = 10;

/// The subset of a `campaigns` row the inspect report prints. Everything else
/// in the row is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CampaignRow {
    pub name: Option<String>,
    pub spend: Option<Value>,
    pub raw_data: Option<RawData>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawData {
    pub metrics: Option<Metrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub cost_micros: Option<Value>,
}

impl CampaignRow {
    pub fn cost_micros(&self) -> Option<&Value> {
        self.raw_data
            .as_ref()
            .and_then(|raw| raw.metrics.as_ref())
            .and_then(|metrics| metrics.cost_micros.as_ref())
    }
}

/// Inspect can also fail on a body that is not the expected JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectFailure {
    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    #[error("could not decode response: {message}")]
    Decode { message: String },
}

/// Spaces go out as `%20`. Form encoding would send `+`, and a literal `+`
/// is already escaped as `%2B` so the swap is lossless.
fn inspect_url(client: &RemoteClient) -> Url {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("platform", &format!("eq.{}", GOOGLE_ADS_PLATFORM))
        .append_pair("select", "*")
        .append_pair("limit", &INSPECT_LIMIT.to_string())
        .append_pair("order", "impressions.desc")
        .finish()
        .replace('+', "%20");
    let mut url = client.campaigns_url().clone();
    url.set_query(Some(&query));
    url
}

/// Fetches the Google Ads campaigns with the most impressions so an operator
/// can check what the last sync stored.
pub async fn fetch_google_ads_campaigns(
    client: &RemoteClient,
) -> Result<Vec<CampaignRow>, InspectFailure> {
    let url = inspect_url(client);
    tracing::debug!(%url, "fetching google ads campaigns");

    let response = client
        .request(Method::GET, url)
        .send()
        .await
        .map_err(|e| RemoteFailure::transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RemoteFailure::rejected(response).await.into());
    }

    let body = response
        .text()
        .await
        .map_err(|e| RemoteFailure::transport(&e))?;
    serde_json::from_str(&body).map_err(|e| InspectFailure::Decode {
        message: e.to_string(),
    })
}
