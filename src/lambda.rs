use crate::config::Config;
use crate::error::{self, Result};
use log::debug;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fmt;
use std::time::Duration;
use url::Url;

/// The production instance API.
pub(crate) const DEFAULT_API_URL: &str = "https://cloud.lambdalabs.com/api/v1";

/// The launch call gets a generous timeout because the API can take a while to acknowledge a
/// provisioning request. Status checks are cheap and get a short one.
const LAUNCH_TIMEOUT_SECONDS: u64 = 120;
const STATUS_TIMEOUT_SECONDS: u64 = 10;

/// The provider-reported lifecycle status of an instance. Only `booting` is transient; anything
/// unrecognized is carried through as `Other` and treated as terminal.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum InstanceStatus {
    Booting,
    Active,
    Unhealthy,
    Other(String),
}

impl From<&str> for InstanceStatus {
    fn from(status: &str) -> Self {
        match status {
            "booting" => Self::Booting,
            "active" => Self::Active,
            "unhealthy" => Self::Unhealthy,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Booting => write!(f, "booting"),
            Self::Active => write!(f, "active"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Other(status) => write!(f, "{}", status),
        }
    }
}

/// The JSON body of the launch call.
#[derive(Debug, Serialize)]
pub(crate) struct LaunchRequest {
    pub(crate) instance_type_name: String,
    pub(crate) region_name: String,
    pub(crate) ssh_key_names: Vec<String>,
    pub(crate) file_system_names: Vec<String>,
    pub(crate) name: String,
}

impl LaunchRequest {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            instance_type_name: config.instance_type_name.clone(),
            region_name: config.region_name.clone(),
            ssh_key_names: config.ssh_key_names.clone(),
            file_system_names: config.file_system_names.clone(),
            name: config.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    data: LaunchData,
}

#[derive(Debug, Deserialize)]
struct LaunchData {
    instance_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    data: StatusData,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: String,
}

/// Error payloads may be partial; missing fields get generic fallbacks when rendered.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
    suggestion: Option<String>,
}

/// What the rest of the program needs from the instance API, narrow enough to substitute with a
/// test double.
pub(crate) trait InstanceApi {
    /// Requests new instances and returns their ids.
    fn launch(&self, request: &LaunchRequest) -> Result<Vec<String>>;

    /// Fetches the current status of the given instance.
    fn instance_status(&self, instance_id: &str) -> Result<InstanceStatus>;
}

/// `InstanceApi` over the Lambda Cloud REST API.
pub(crate) struct LambdaClient {
    base_url: Url,
    token: String,
    client: Client,
}

impl LambdaClient {
    pub(crate) fn new(base_url: Url, token: &str) -> Result<Self> {
        let client = Client::builder().build().context(error::HttpClientSnafu)?;
        Ok(Self {
            base_url,
            token: token.to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&url).context(error::UrlParseSnafu { url: url.as_str() })
    }
}

impl InstanceApi for LambdaClient {
    fn launch(&self, request: &LaunchRequest) -> Result<Vec<String>> {
        let url = self.endpoint("instance-operations/launch")?;
        debug!("POST {}", url.as_str());
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(LAUNCH_TIMEOUT_SECONDS))
            .json(request)
            .send()
            .context(error::HttpSendSnafu { url: url.clone() })?;
        let body = successful_body(url.clone(), response)?;
        let launch: LaunchResponse =
            serde_json::from_str(&body).context(error::ResponseParseSnafu { url })?;
        Ok(launch.data.instance_ids)
    }

    fn instance_status(&self, instance_id: &str) -> Result<InstanceStatus> {
        let url = self.endpoint(&format!("instances/{}", instance_id))?;
        debug!("GET {}", url.as_str());
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(STATUS_TIMEOUT_SECONDS))
            .send()
            .context(error::HttpSendSnafu { url: url.clone() })?;
        let body = successful_body(url.clone(), response)?;
        let status: StatusResponse =
            serde_json::from_str(&body).context(error::ResponseParseSnafu { url })?;
        Ok(InstanceStatus::from(status.data.status.as_str()))
    }
}

/// Returns the response body, converting any non-2xx status into an `Api` error built from the
/// provider's error payload.
fn successful_body(url: Url, response: Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .context(error::HttpResponseSnafu { url: url.clone() })?;
    if !status.is_success() {
        let api_error = serde_json::from_str::<ErrorResponse>(&body)
            .map(|response| response.error)
            .unwrap_or_default();
        return error::ApiSnafu {
            url,
            status,
            code: api_error
                .code
                .unwrap_or_else(|| "global/unknown".to_string()),
            message: api_error
                .message
                .unwrap_or_else(|| "An unknown error occurred".to_string()),
            suggestion: api_error
                .suggestion
                .unwrap_or_else(|| "No suggestion available".to_string()),
        }
        .fail();
    }
    Ok(body)
}
