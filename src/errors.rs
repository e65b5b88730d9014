use std::fmt;

/// Every failure the analysis can produce. All variants are terminal for the
/// current invocation and end up as a `{status: "failed"}` document.
#[derive(Debug)]
pub enum AnalysisError {
    FileNotFound(String),
    Parse(String),
    Schema(String),
    Unexpected(anyhow::Error),
}

impl AnalysisError {
    pub fn error_message(&self) -> String {
        match self {
            AnalysisError::FileNotFound(path) => {
                format!("Trace file not found: {}", path)
            }
            AnalysisError::Parse(e) => {
                format!("Could not parse the trace file, please check the format: {}", e)
            }
            AnalysisError::Schema(e) => format!("Unable to resolve a column layout: {}", e),
            AnalysisError::Unexpected(e) => {
                format!("An unexpected error occurred during analysis: {}", e)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error_message())
    }
}

impl std::error::Error for AnalysisError {}

impl From<anyhow::Error> for AnalysisError {
    fn from(error: anyhow::Error) -> Self {
        AnalysisError::Unexpected(error)
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(error: csv::Error) -> Self {
        AnalysisError::Parse(error.to_string())
    }
}
