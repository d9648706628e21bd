#![deny(unused_imports)]

/*!
# Introduction

Launchdog launches a Lambda Cloud compute instance and hands the new instance's id to the rest of
the pipeline it runs in. It is meant to run as a step in an automated job (e.g. a GitHub Actions
workflow) that needs a freshly provisioned machine before proceeding: launch, record the id, and
optionally stick around until the instance has finished booting.

The flow is strictly sequential: read configuration from the environment, send one launch request,
append the resulting instance id to the pipeline output file, and (only when opted in) poll the
instance's status every few seconds until it leaves `booting`.

# Configuration

Configuration comes from the environment of the surrounding job:

* `LAMBDA_TOKEN`: bearer credential for all instance API calls. Required.
* `INSTANCE_TYPE_NAME`: requested instance type, lower-cased before sending. Required.
* `REGION_NAME`: requested region, lower-cased before sending. Required.
* `SSH_KEY_NAMES`: comma-separated list of SSH key names to install. Required.
* `FILE_SYSTEM_NAMES`: comma-separated list of filesystem names to attach. Optional.
* `NAME`: display name for the new instance. Optional.
* `WAIT_FOR_BOOT`: set to exactly `true` to block until the instance has booted. Optional.
* `BOOT_TIMEOUT`: seconds before waiting for boot gives up, default 300. Optional.
* `GITHUB_OUTPUT`: path of the file that receives an appended `instance_id=<id>` line.

A launch failure, a boot that doesn't finish in time, or an instance that comes up unhealthy all
exit non-zero with a diagnostic on stderr. The instance is never torn down; cleaning up is the
job of a later pipeline step.
*/

mod args;
mod config;
mod error;
mod lambda;
#[cfg(test)]
mod main_test;
mod output;
mod wait;

use crate::args::Arguments;
use crate::config::Config;
use crate::error::Result;
use crate::lambda::{InstanceApi, LambdaClient, LaunchRequest, DEFAULT_API_URL};
use crate::wait::{BootWaiter, Clock, WallClock};
use log::info;
use simplelog::{Config as LogConfig, SimpleLogger};
use snafu::{OptionExt, ResultExt};
use std::process;
use structopt::StructOpt;
use url::Url;

fn main() -> ! {
    let args = Arguments::from_args();
    SimpleLogger::init(args.log_level, LogConfig::default()).expect("unable to configure logger");
    process::exit(match main_inner(args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", err);
            1
        }
    })
}

fn main_inner(args: Arguments) -> Result<()> {
    let config = Config::from_env()?;
    let base_url = match args.api_url {
        Some(url) => url,
        None => Url::parse(DEFAULT_API_URL).context(error::UrlParseSnafu {
            url: DEFAULT_API_URL,
        })?,
    };
    let client = LambdaClient::new(base_url, &config.token)?;
    run(&config, &client, &WallClock)
}

/// The sequential flow of a single run. Takes the API and clock as trait objects so tests can
/// drive it without real instances or real waits.
pub(crate) fn run(config: &Config, api: &dyn InstanceApi, clock: &dyn Clock) -> Result<()> {
    let request = LaunchRequest::from_config(config);
    let instance_ids = api.launch(&request)?;
    // The API can return several ids; the first one is the instance this run is responsible for.
    let instance_id = instance_ids.first().context(error::NoInstancesSnafu)?;
    info!("Launched instance {}", instance_id);

    let output_path = config
        .github_output
        .as_ref()
        .context(error::EnvironmentSnafu {
            var: "GITHUB_OUTPUT",
        })?;
    output::append_instance_id(output_path, instance_id)?;

    if config.wait_for_boot {
        let waiter = BootWaiter::new(api, clock, config.boot_timeout);
        let booted_in = waiter.wait(instance_id)?;
        info!(
            "Instance {} finished booting in {} seconds",
            instance_id,
            booted_in.as_secs()
        );
    }
    Ok(())
}
