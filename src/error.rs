use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuccessionError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid name: '{0}'")]
    InvalidName(String),
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("Class '{0}' is already declared")]
    DuplicateClass(String),
    #[error("Declaration of '{0}' was prepared against an older state of the hierarchy")]
    StaleDeclaration(String),
    #[error("Class '{class}' lists parent '{parent}' more than once")]
    DuplicateParent { class: String, parent: String },
    #[error("Class '{class}' would be its own ancestor through '{via}'")]
    Cycle { class: String, via: String },
    #[error("Inconsistent hierarchy for '{class}': no precedence order satisfies all parents (blocked heads: {})", .blocked.join(", "))]
    InconsistentHierarchy { class: String, blocked: Vec<String> },
    #[error("Capability '{capability}' is already registered on '{class}'")]
    DuplicateCapability { class: String, capability: String },
    #[error("No implementation of '{0}' in the precedence sequence")]
    NoImplementation(String),
    #[error("Chain for '{capability}' ran past '{from}' without being absorbed by a terminal class")]
    UnterminatedChain { capability: String, from: String },
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, SuccessionError>;

// Helper conversions
impl From<config::ConfigError> for SuccessionError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl<T> From<std::sync::PoisonError<T>> for SuccessionError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
