use log::LevelFilter;
use structopt::StructOpt;
use url::Url;

/// Command line arguments for the launchdog program.
#[derive(StructOpt)]
pub(crate) struct Arguments {
    /// Logging verbosity [trace|debug|info|warn|error]
    #[structopt(short = "l", long = "log-level", default_value = "info")]
    pub(crate) log_level: LevelFilter,
    /// Base URL of the instance API [default: https://cloud.lambdalabs.com/api/v1]
    #[structopt(short = "u", long = "api-url")]
    pub(crate) api_url: Option<Url>,
}
