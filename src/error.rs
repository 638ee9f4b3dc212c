use thiserror::Error;

/// Syntactic problems with a code string. Never retried.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("Too few parts in code")]
    TooFewParts,

    #[error("Too many parts in code")]
    TooManyParts,

    #[error("Invalid kind tag")]
    InvalidKindTag,

    #[error("Invalid hash encoding")]
    InvalidHash,

    #[error("Label and username segments must not be empty")]
    EmptySegment,

    #[error("Label must not be an integer")]
    LabelIsInteger,

    #[error("Currency must be an integer")]
    InvalidCurrency,

    #[error("Limit must be an integer")]
    InvalidLimit,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed code: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A user-id bound code was checked without the identity it is bound to.
    /// This is a caller bug, not a property of the code.
    #[error("Identity argument is required for user-id bound codes")]
    MissingIdentity,

    /// A fixed hash length of zero would accept any embedded hash.
    #[error("Required hash length must be at least one byte")]
    ZeroRequiredLength,

    #[error("Counter store error: {0}")]
    Store(String),

    #[error("Identity lookup error: {0}")]
    Lookup(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by the caller rather than by the code or the
    /// external collaborators.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::MissingIdentity | Error::ZeroRequiredLength)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error messages shared between modules and tests.
pub mod msg {
    pub const LABEL_IS_INTEGER: &str = "label must not be an integer";
    pub const LABEL_EMPTY: &str = "label must not be empty";
    pub const LABEL_HAS_SEPARATOR: &str = "label must not contain '-'";
    pub const USERNAME_EMPTY: &str = "username must not be empty";
    pub const USERNAME_HAS_SEPARATOR: &str = "username must not contain '-'";
    pub const CURRENCY_NOT_POSITIVE: &str = "currency must be a positive integer";
    pub const LIMIT_NOT_POSITIVE: &str = "limit must be a positive integer";
    pub const BYTES_ODD_LENGTH: &str = "bytes must contain an even number of values";
    pub const BYTES_NOT_ASCENDING: &str = "bytes ceilings must be strictly ascending";
    pub const BYTES_OUT_OF_RANGE: &str = "bytes counts must be between 1 and 32";
}
