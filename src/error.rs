use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed varint, truncated buffer, count mismatch or unparsable type string.
    Framing(String),
    /// The column's declared type is not the one the caller asked for.
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
    /// Access past the declared row count or past the end of the buffer.
    Bounds(String),
    /// Value does not fit the declared precision, scale or capacity.
    NumericRange(String),
    Unsupported(String),
    Other(String),
}

impl Error {
    pub(crate) fn framing(msg: impl Into<String>) -> Self {
        Error::Framing(msg.into())
    }

    pub(crate) fn bounds(msg: impl Into<String>) -> Self {
        Error::Bounds(msg.into())
    }

    pub(crate) fn numeric_range(msg: impl Into<String>) -> Self {
        Error::NumericRange(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Prefixes the message with where the failure happened.
    pub(crate) fn context(self, at: impl fmt::Display) -> Self {
        match self {
            Error::Framing(msg) => Error::Framing(format!("{at}: {msg}")),
            Error::Bounds(msg) => Error::Bounds(format!("{at}: {msg}")),
            Error::NumericRange(msg) => Error::NumericRange(format!("{at}: {msg}")),
            Error::Unsupported(msg) => Error::Unsupported(format!("{at}: {msg}")),
            Error::Other(msg) => Error::Other(format!("{at}: {msg}")),
            mismatch @ Error::TypeMismatch { .. } => mismatch,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Framing(msg) => write!(f, "framing error: {msg}"),
            Error::TypeMismatch {
                column,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch in column `{column}`: expected {expected}, found {actual}"
            ),
            Error::Bounds(msg) => write!(f, "out of bounds: {msg}"),
            Error::NumericRange(msg) => write!(f, "numeric range error: {msg}"),
            Error::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
