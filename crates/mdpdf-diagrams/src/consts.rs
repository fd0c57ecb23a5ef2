//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default rendering engine executable (Mermaid CLI).
pub const DEFAULT_COMMAND: &str = "mmdc";

/// Default Mermaid theme.
pub const DEFAULT_THEME: &str = "default";

/// Default diagram background color.
pub const DEFAULT_BACKGROUND: &str = "white";

/// Default diagram width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;

/// Default diagram height in pixels.
pub const DEFAULT_HEIGHT: u32 = 600;

/// Default wall-clock limit for one render (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of trailing stderr bytes kept in failure details.
pub const STDERR_TAIL_BYTES: usize = 2048;
