//! Errors raised by version-control tool invocations.

/// A version-control call that did not produce a usable answer.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool ran and exited unsuccessfully.
    #[error("`{command}` failed with exit code {}: {stderr}", display_code(.exit_code))]
    Tool {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The call did not finish within its deadline.
    #[error("`{command}` timed out after {limit_ms}ms")]
    Timeout { command: String, limit_ms: u64 },

    /// The tool could not be started at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool succeeded but its output was unusable.
    #[error("`{command}` returned unusable output: {detail}")]
    Malformed { command: String, detail: String },
}

impl ToolError {
    pub fn command(&self) -> &str {
        match self {
            ToolError::Tool { command, .. }
            | ToolError::Timeout { command, .. }
            | ToolError::Spawn { command, .. }
            | ToolError::Malformed { command, .. } => command,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Tool { .. } => "tool",
            ToolError::Timeout { .. } => "timeout",
            ToolError::Spawn { .. } => "spawn",
            ToolError::Malformed { .. } => "malformed",
        }
    }

    /// Whether a retry could plausibly succeed (network hiccups, stalls).
    pub fn is_transient(&self) -> bool {
        matches!(self, ToolError::Tool { .. } | ToolError::Timeout { .. })
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none (terminated by signal)".to_string())
}

/// Result type for version-control calls.
pub type ToolResult<T> = std::result::Result<T, ToolError>;
