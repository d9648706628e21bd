use crate::error::{self, Result};
use snafu::ResultExt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends `instance_id=<id>` to the pipeline output file so later steps of the surrounding job
/// can pick the id up.
pub(crate) fn append_instance_id<P: AsRef<Path>>(path: P, instance_id: &str) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(error::OutputWriteSnafu { path })?;
    writeln!(file, "instance_id={}", instance_id).context(error::OutputWriteSnafu { path })?;
    Ok(())
}
