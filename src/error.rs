//! Provides the list of errors for `launchdog`.

use reqwest::StatusCode;
use snafu::Snafu;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum Error {
    #[snafu(display(
        "Instance API request to {} failed with {}: {} - {} (suggestion: {})",
        url.as_str(),
        status,
        code,
        message,
        suggestion
    ))]
    Api {
        url: Url,
        status: StatusCode,
        code: String,
        message: String,
        suggestion: String,
    },

    #[snafu(display("Instance '{}' was still booting after {} seconds", instance_id, seconds))]
    BootTimeout { instance_id: String, seconds: u64 },

    #[snafu(display("Environment variable '{}' is missing or empty", var))]
    Environment { var: String },

    #[snafu(display("Error building HTTP client: {}", source))]
    HttpClient { source: reqwest::Error },

    #[snafu(display("Error receiving HTTP response from {}: {}", url.as_str(), source))]
    HttpResponse { url: Url, source: reqwest::Error },

    #[snafu(display("Error sending HTTP request to {}: {}", url.as_str(), source))]
    HttpSend { url: Url, source: reqwest::Error },

    #[snafu(display("Launch response contained no instance ids"))]
    NoInstances,

    #[snafu(display("Failed to write pipeline output to {}: {}", path.display(), source))]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse BOOT_TIMEOUT '{}' as seconds: {}", input, source))]
    ParseBootTimeout {
        input: String,
        source: std::num::ParseIntError,
    },

    #[snafu(display("Failed to parse response from {}: {}", url.as_str(), source))]
    ResponseParse {
        url: Url,
        source: serde_json::Error,
    },

    #[snafu(display("Instance '{}' finished booting but is unhealthy", instance_id))]
    Unhealthy { instance_id: String },

    #[snafu(display("Unable to parse URL {}: {}", url, source))]
    UrlParse {
        url: String,
        source: url::ParseError,
    },
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
