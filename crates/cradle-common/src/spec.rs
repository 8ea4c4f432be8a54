//! Process specification supplied by the caller at container creation.

use serde::{Deserialize, Serialize};

/// Description of the process a container will run.
///
/// The container aggregate stores its own clone of the caller's value at
/// creation time, so later mutation on either side is invisible to the
/// other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Command and arguments to execute.
    pub args: Vec<String>,
    /// Environment variables in `KEY=value` form.
    pub env: Vec<String>,
    /// Working directory inside the container.
    pub cwd: String,
    /// Whether the process is attached to a terminal.
    pub terminal: bool,
    /// Hostname visible inside the container.
    pub hostname: Option<String>,
}
