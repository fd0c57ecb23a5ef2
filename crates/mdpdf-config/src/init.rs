//! Starter configuration file.

use std::path::{Path, PathBuf};

use crate::{CONFIG_FILENAMES, ConfigError};

/// Contents written by `mdpdf init`.
pub const INIT_TEMPLATE: &str = r##"# mdpdf configuration
#
# Values shown are the defaults. Command-line flags override this file.
# String values of diagrams.command, diagrams.browser_executable and
# style.css_file may reference environment variables: ${VAR} or ${VAR:-default}.

# Keep per-document working directories after conversion.
keep_temp = false

[pdf]
format = "A4"
print_background = true
landscape = false
scale = 1.0
display_header_footer = false
prefer_css_page_size = false
# width = "210mm"
# height = "297mm"
# header_template = "<div style='font-size: 9px'>My document</div>"
# footer_template = "<div style='font-size: 9px'>Footer</div>"

[pdf.margin]
top = "20mm"
right = "20mm"
bottom = "20mm"
left = "20mm"

[diagrams]
theme = "default"            # default, forest, dark, neutral, base
background_color = "white"
width = 800
height = 600
output_format = "png"        # png or svg
command = "mmdc"
# args = ["-y", "@mermaid-js/mermaid-cli"]   # with command = "npx"
# browser_executable = "${CHROME_PATH}"
sandbox = true
timeout_secs = 60

[style]
highlight_theme = "github"   # github or monokai
# css_file = "print.css"
# css = "body { font-family: serif; }"
# body_class = "report"

[batch]
concurrency = 3
continue_on_error = false

[watch]
debounce_ms = 500
"##;

/// Write [`INIT_TEMPLATE`] to `mdpdf.toml` in `dir`.
///
/// # Errors
///
/// Returns `ConfigError::AlreadyExists` if the file exists and `force` is
/// false, or `ConfigError::Io` if it cannot be written.
pub fn write_init(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = dir.join(CONFIG_FILENAMES[0]);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }
    std::fs::write(&path, INIT_TEMPLATE)?;
    tracing::info!(path = %path.display(), "Wrote configuration file");
    Ok(path)
}
