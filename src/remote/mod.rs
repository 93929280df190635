// campaign-maintenance/src/remote/mod.rs
pub(crate) mod cleanup;
pub(crate) mod inspect;
pub(crate) mod trigger;

use std::error::Error as _;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::{AuthContext, HttpOptions};
use crate::errors::{AppError, Result};

pub const CAMPAIGNS_PATH: &str = "rest/v1/campaigns";
pub const SYNC_FUNCTION_PATH: &str = "functions/v1/fetch-google-ads";

/// Placeholder used when an error response body cannot be read.
const BODY_UNAVAILABLE: &str = "<response body unavailable>";

/// Non-fatal outcome of a single remote step. The runner reports these and
/// carries on with the next step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    #[error("server rejected the request with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("unexpected status {status}")]
    UnexpectedStatus { status: StatusCode },

    #[error("transport error: {message}")]
    Transport { message: String },
}

impl RemoteFailure {
    /// Converts an explicit 4xx/5xx response, keeping its body for diagnostics.
    pub(crate) async fn rejected(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| BODY_UNAVAILABLE.to_string());
        RemoteFailure::Rejected { status, body }
    }

    pub(crate) fn transport(error: &reqwest::Error) -> Self {
        RemoteFailure::Transport {
            message: describe_transport_error(error),
        }
    }
}

/// Flattens the error source chain so that e.g. "connection refused" shows up
/// next to reqwest's own summary.
fn describe_transport_error(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

pub type StepResult<T> = std::result::Result<T, RemoteFailure>;

/// True for the 4xx and 5xx range.
pub(crate) fn is_explicit_failure(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// Builds the HTTP client shared by all steps of a run.
///
/// Redirects are not followed: a 3xx is the step's own outcome and must be
/// reported as such.
pub fn build_http_client(options: &HttpOptions) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(options.timeout)
        .redirect(reqwest::redirect::Policy::none());
    if !options.use_system_proxy {
        builder = builder.no_proxy();
    }
    Ok(builder.build()?)
}

/// Everything the remote steps need: the HTTP client, the resolved endpoint
/// URLs and the header set, all fixed for the life of the run.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    headers: HeaderMap,
    campaigns_url: Url,
    sync_url: Url,
}

impl RemoteClient {
    pub fn new(http: reqwest::Client, auth: &AuthContext) -> Result<Self> {
        let headers = auth_headers(auth.secret())?;
        let campaigns_url = endpoint(auth.base_url(), CAMPAIGNS_PATH)?;
        let sync_url = endpoint(auth.base_url(), SYNC_FUNCTION_PATH)?;

        tracing::debug!(
            campaigns = %campaigns_url,
            sync = %sync_url,
            "resolved remote endpoints"
        );

        Ok(RemoteClient {
            http,
            headers,
            campaigns_url,
            sync_url,
        })
    }

    pub(crate) fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http.request(method, url).headers(self.headers.clone())
    }

    pub(crate) fn campaigns_url(&self) -> &Url {
        &self.campaigns_url
    }

    pub(crate) fn sync_url(&self) -> &Url {
        &self.sync_url
    }
}

fn auth_headers(secret: &str) -> Result<HeaderMap> {
    let mut api_key = HeaderValue::from_str(secret)?;
    api_key.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", secret))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", api_key);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Joins `path` onto the base URL, keeping any path prefix the base carries.
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|source| AppError::InvalidEndpoint {
        url: joined.clone(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{RawQuery, State};
    use axum::http::header::LOCATION;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};

    use crate::config::{AuthContext, HttpOptions, Settings, resolve_auth};

    use super::{RemoteClient, build_http_client};

    pub const TEST_SECRET: &str = "service-role-test-key";

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub path: String,
        pub query: Option<String>,
        pub headers: HeaderMap,
        pub body: String,
    }

    /// Canned reply for one endpoint of the mock backend.
    #[derive(Debug, Clone, Copy)]
    pub struct Reply {
        pub status: StatusCode,
        pub body: &'static str,
        pub location: Option<&'static str>,
    }

    impl Reply {
        pub fn new(status: u16, body: &'static str) -> Self {
            Reply {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
                location: None,
            }
        }

        /// A 3xx pointing at [`REDIRECT_TARGET`], which answers 200 to any
        /// method.
        pub fn redirect(status: u16) -> Self {
            Reply {
                location: Some(REDIRECT_TARGET),
                ..Reply::new(status, "")
            }
        }

        fn to_response(self) -> Response {
            match self.location {
                Some(location) => (self.status, [(LOCATION, location)], self.body).into_response(),
                None => (self.status, self.body).into_response(),
            }
        }
    }

    pub const REDIRECT_TARGET: &str = "/elsewhere";

    #[derive(Clone)]
    struct MockState {
        recorded: Arc<Mutex<Vec<RecordedRequest>>>,
        campaigns: Reply,
        sync: Reply,
    }

    /// Local stand-in for the backend, listening on an ephemeral port.
    pub struct MockBackend {
        pub base_url: String,
        recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl MockBackend {
        pub async fn start(campaigns: Reply, sync: Reply) -> anyhow::Result<Self> {
            let recorded = Arc::new(Mutex::new(Vec::new()));
            let state = MockState {
                recorded: recorded.clone(),
                campaigns,
                sync,
            };
            let app = Router::new().fallback(handle).with_state(state);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
            let addr = listener.local_addr()?;
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });

            Ok(MockBackend {
                base_url: format!("http://{}", addr),
                recorded,
            })
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.recorded.lock().map(|r| r.clone()).unwrap_or_default()
        }

        pub fn client(&self) -> anyhow::Result<RemoteClient> {
            client_for(&self.base_url)
        }
    }

    pub fn auth_for(base_url: &str) -> anyhow::Result<AuthContext> {
        let settings = Settings::parse(&format!(
            "SUPABASE_SERVICE_ROLE_KEY={}\nSUPABASE_URL={}\n",
            TEST_SECRET, base_url
        ));
        Ok(resolve_auth(&settings)?)
    }

    pub fn client_for(base_url: &str) -> anyhow::Result<RemoteClient> {
        Ok(RemoteClient::new(test_http_client()?, &auth_for(base_url)?)?)
    }

    async fn handle(
        State(state): State<MockState>,
        method: Method,
        uri: Uri,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        body: String,
    ) -> Response {
        let path = uri.path().to_string();
        if let Ok(mut recorded) = state.recorded.lock() {
            recorded.push(RecordedRequest {
                method,
                path: path.clone(),
                query,
                headers,
                body,
            });
        }

        let reply = match path.as_str() {
            "/rest/v1/campaigns" => state.campaigns,
            "/functions/v1/fetch-google-ads" => state.sync,
            REDIRECT_TARGET => Reply::new(200, "[]"),
            _ => Reply::new(404, "no such route"),
        };
        reply.to_response()
    }

    pub fn test_http_client() -> anyhow::Result<reqwest::Client> {
        let options = HttpOptions {
            use_system_proxy: false,
            ..HttpOptions::default()
        };
        Ok(build_http_client(&options)?)
    }

    /// Base URL of a port that was bound and released, so connecting to it
    /// is refused.
    pub async fn unreachable_base_url() -> anyhow::Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        Ok(format!("http://{}", addr))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{MockBackend, Reply, TEST_SECRET};
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path_prefix() -> anyhow::Result<()> {
        let base = Url::parse("http://localhost:54321/project/")?;
        let url = endpoint(&base, CAMPAIGNS_PATH)?;
        assert_eq!(url.as_str(), "http://localhost:54321/project/rest/v1/campaigns");

        let bare = Url::parse("https://auqnzxrysuzypquebtpy.supabase.co")?;
        let url = endpoint(&bare, SYNC_FUNCTION_PATH)?;
        assert_eq!(
            url.as_str(),
            "https://auqnzxrysuzypquebtpy.supabase.co/functions/v1/fetch-google-ads"
        );
        Ok(())
    }

    #[test]
    fn test_auth_headers_are_marked_sensitive() -> anyhow::Result<()> {
        let headers = auth_headers("abc")?;

        assert_eq!(headers.get("apikey").map(|v| v.is_sensitive()), Some(true));
        assert_eq!(headers.get(AUTHORIZATION).map(|v| v.is_sensitive()), Some(true));
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        Ok(())
    }

    #[test]
    fn test_secret_with_newline_is_rejected() {
        let result = auth_headers("bad\nsecret");
        assert!(matches!(result, Err(AppError::InvalidCredential(_))));
    }

    #[test]
    fn test_is_explicit_failure() {
        assert!(is_explicit_failure(StatusCode::NOT_FOUND));
        assert!(is_explicit_failure(StatusCode::BAD_GATEWAY));
        assert!(!is_explicit_failure(StatusCode::OK));
        assert!(!is_explicit_failure(StatusCode::FOUND));
    }

    #[tokio::test]
    async fn test_every_request_carries_the_shared_headers() -> anyhow::Result<()> {
        let backend = MockBackend::start(Reply::new(204, ""), Reply::new(200, "ok")).await?;
        let client = backend.client()?;

        client
            .request(reqwest::Method::GET, client.campaigns_url().clone())
            .send()
            .await?;
        client
            .request(reqwest::Method::POST, client.sync_url().clone())
            .send()
            .await?;

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            let header = |name: &str| {
                request
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            assert_eq!(header("apikey").as_deref(), Some(TEST_SECRET));
            assert_eq!(
                header("authorization"),
                Some(format!("Bearer {}", TEST_SECRET))
            );
            assert_eq!(header("content-type").as_deref(), Some("application/json"));
        }
        Ok(())
    }
}
