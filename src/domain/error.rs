//! Domain error types.

/// A parse error with position information for formula parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for chartlab.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error(transparent)]
    FormulaParse(#[from] ParseError),

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("unknown strategy '{name}'")]
    UnknownStrategy { name: String },

    #[error("unknown preset '{name}'")]
    UnknownPreset { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    pub(crate) fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<&AnalyticsError> for std::process::ExitCode {
    fn from(err: &AnalyticsError) -> Self {
        let code: u8 = match err {
            AnalyticsError::Io(_) => 1,
            AnalyticsError::ConfigParse { .. }
            | AnalyticsError::ConfigMissing { .. }
            | AnalyticsError::ConfigInvalid { .. }
            | AnalyticsError::UnknownPreset { .. }
            | AnalyticsError::UnknownStrategy { .. } => 2,
            AnalyticsError::Data { .. } | AnalyticsError::InvalidSeries { .. } => 3,
            AnalyticsError::FormulaParse(_) => 4,
            AnalyticsError::InvalidParameter { .. } | AnalyticsError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
