//! `mdpdf init` command implementation.

use clap::Args;
use mdpdf_config::write_init;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the init command.
#[derive(Args)]
pub(crate) struct InitArgs {
    /// Overwrite an existing mdpdf.toml.
    #[arg(long)]
    force: bool,
}

impl InitArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let dir = std::env::current_dir()?;
        let path = write_init(&dir, self.force)?;
        output.success(&format!("Created {}", path.display()));
        Ok(())
    }
}
