use crate::error::{self, Result};
use snafu::{ensure, OptionExt, ResultExt};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Boot waiting gives up after this long unless `BOOT_TIMEOUT` says otherwise.
const DEFAULT_BOOT_TIMEOUT_SECONDS: u64 = 300;

/// Everything a single run needs, read from the environment once at startup.
#[derive(Debug)]
pub(crate) struct Config {
    /// Bearer credential for all instance API calls.
    pub(crate) token: String,
    pub(crate) instance_type_name: String,
    pub(crate) region_name: String,
    pub(crate) ssh_key_names: Vec<String>,
    pub(crate) file_system_names: Vec<String>,
    /// Display name for the new instance, possibly empty.
    pub(crate) name: String,
    /// Whether to block until the instance has finished booting.
    pub(crate) wait_for_boot: bool,
    pub(crate) boot_timeout: Duration,
    /// Path of the pipeline output file. Only required once there is an id to write.
    pub(crate) github_output: Option<PathBuf>,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// `from_env` with the environment behind a lookup function, so tests can supply their own
    /// values without touching process state.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = require(&lookup, "LAMBDA_TOKEN")?;
        let instance_type_name = require(&lookup, "INSTANCE_TYPE_NAME")?.to_lowercase();
        let region_name = require(&lookup, "REGION_NAME")?.to_lowercase();

        let ssh_key_names = split_list(&require(&lookup, "SSH_KEY_NAMES")?);
        ensure!(
            !ssh_key_names.is_empty(),
            error::EnvironmentSnafu {
                var: "SSH_KEY_NAMES",
            }
        );

        let file_system_names = lookup("FILE_SYSTEM_NAMES")
            .map(|value| split_list(&value))
            .unwrap_or_default();
        let name = lookup("NAME").unwrap_or_default();

        // Opt-in flag; only the exact string "true" enables waiting.
        let wait_for_boot = lookup("WAIT_FOR_BOOT").map_or(false, |value| value == "true");
        let boot_timeout = match lookup("BOOT_TIMEOUT") {
            Some(value) if !value.is_empty() => {
                let seconds = value.parse().context(error::ParseBootTimeoutSnafu {
                    input: value.as_str(),
                })?;
                Duration::from_secs(seconds)
            }
            _ => Duration::from_secs(DEFAULT_BOOT_TIMEOUT_SECONDS),
        };

        let github_output = lookup("GITHUB_OUTPUT").map(PathBuf::from);

        Ok(Self {
            token,
            instance_type_name,
            region_name,
            ssh_key_names,
            file_system_names,
            name,
            wait_for_boot,
            boot_timeout,
            github_output,
        })
    }
}

/// Looks up `var`, treating an unset or empty value as missing.
fn require<F>(lookup: &F, var: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|value| !value.is_empty())
        .context(error::EnvironmentSnafu { var })
}

/// Splits a comma-delimited value into its entries, in order, dropping empty ones.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}
