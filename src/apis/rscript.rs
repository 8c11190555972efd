use std::fs;
use std::process::Command;

use tracing::{debug, instrument};

use crate::app::ports::ScriptRuntime;
use crate::error::FetchError;
use crate::table::Table;

/// Environment variable holding the path the script must write its CSV to.
pub const OUTPUT_PATH_VAR: &str = "IPEA_ETL_OUTPUT";

/// Runs scripts through the R command line front end. The script writes
/// its result as CSV with a header row to the file named by
/// [`OUTPUT_PATH_VAR`]; stdout is only logged.
#[derive(Debug, Clone)]
pub struct RscriptRuntime {
    program: String,
    args: Vec<String>,
}

impl Default for RscriptRuntime {
    fn default() -> Self {
        Self::with_command("Rscript", ["-e"])
    }
}

impl RscriptRuntime {
    /// `args` go before the script text.
    pub fn with_command<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ScriptRuntime for RscriptRuntime {
    #[instrument(skip(self, script), fields(program = %self.program))]
    fn run_table(&self, script: &str) -> Result<Table, FetchError> {
        let output_file = tempfile::Builder::new()
            .prefix("ipea_etl_")
            .suffix(".csv")
            .tempfile()?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(script)
            .env(OUTPUT_PATH_VAR, output_file.path())
            .output()?;

        if !output.status.success() {
            return Err(FetchError::Script {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(stdout_bytes = output.stdout.len(), "Script finished");

        let csv = fs::read(output_file.path())?;
        if csv.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::Script {
                status: output.status.to_string(),
                stderr: format!("script wrote nothing to ${}", OUTPUT_PATH_VAR),
            });
        }
        Ok(Table::read_csv(csv.as_slice())?)
    }
}
