//! Error types for query compilation.

use thiserror::Error;

/// Main error type for pre-compilation, compilation and translation.
///
/// Layer-fatal variants carry the path of the offending provider or DOM node
/// (for example `Apply/right/Filter`) so that a failing query is diagnosable.
#[derive(Error, Debug)]
pub enum Error {
    /// Apply node could not be rewritten into a join (strict correction only)
    #[error("Apply correction fault at {path}: {reason}")]
    CorrectionFault { path: String, reason: String },

    /// Provider tree is structurally invalid (e.g. out-of-scope column)
    #[error("Translation defect at {path}: {message}")]
    TranslationDefect { path: String, message: String },

    /// No compiler in the chain accepted the node
    #[error("No compiler accepts {kind} at {path}")]
    NoCompiler { path: String, kind: String },

    /// Construct not available in the target dialect or any of its predecessors
    #[error("{dialect} does not support {feature} (at {path})")]
    CapabilityGap {
        dialect: String,
        feature: String,
        path: String,
    },

    /// Provider could not be constructed
    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    /// A named pre-compilation pass failed
    #[error("Pre-compiler pass {pass} failed: {source}")]
    Pass {
        pass: String,
        #[source]
        source: Box<Error>,
    },

    /// Reference interpreter failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Unknown dialect name or version
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// Literal text could not be parsed back into a value
    #[error("Cannot parse {kind} literal {text:?}")]
    LiteralParse { kind: String, text: String },

    /// Emitted SQL was rejected by the syntax checker
    #[error("SQL syntax check failed: {0}")]
    Syntax(String),

    /// Configuration error (invalid TOML, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn correction_fault(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorrectionFault {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn defect(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TranslationDefect {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn gap(
        dialect: impl Into<String>,
        feature: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Error::CapabilityGap {
            dialect: dialect.into(),
            feature: feature.into(),
            path: path.into(),
        }
    }

    /// True for errors that abort only the current compilation and that a
    /// caller may report without retrying.
    pub fn is_fatal_for_query(&self) -> bool {
        matches!(
            self,
            Error::CorrectionFault { .. }
                | Error::TranslationDefect { .. }
                | Error::NoCompiler { .. }
                | Error::CapabilityGap { .. }
                | Error::Pass { .. }
        )
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for compilation operations.
pub type Result<T> = std::result::Result<T, Error>;
