use std::num::TryFromIntError;

use snafu::{Backtrace, Snafu};

#[allow(unused_imports)]
pub use crate::{bail, ensure, ensure_eq, format_err, unimplemented_err, unsupported_err};

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error types
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// Structural misuse of an API: merging mismatched packets,
    /// protecting a key that carries no secret material, and so on.
    #[snafu(display("bad parameters: {message}"))]
    BadParameters {
        message: String,
        backtrace: Option<Backtrace>,
    },
    /// Malformed bytes on the wire.
    #[snafu(display("bad format: {message}"))]
    BadFormat {
        message: String,
        backtrace: Option<Backtrace>,
    },
    /// An operation was attempted in a state that cannot support it.
    #[snafu(display("bad state: {message}"))]
    BadState {
        message: String,
        backtrace: Option<Backtrace>,
    },
    /// Wrong password, corrupted secret data or failed integrity check.
    #[snafu(display("decryption failed"))]
    DecryptFailed { backtrace: Option<Backtrace> },
    #[snafu(display("invalid armor wrappers"))]
    InvalidArmorWrappers,
    #[snafu(display("invalid crc24 checksum"))]
    InvalidChecksum,
    #[snafu(transparent)]
    Base64Decode {
        source: base64::DecodeError,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("IO error: {}", source), context(false))]
    IO {
        source: std::io::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("rng failure"))]
    Rng { backtrace: Option<Backtrace> },
    #[snafu(transparent)]
    RsaError {
        source: rsa::errors::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("signature error: {}", source), context(false))]
    SignatureError { source: signature::Error },
    #[snafu(display("Not yet implemented: {message}"))]
    Unimplemented { message: String },
    /// Packet versions and parameters we don't support, but can safely reject.
    #[snafu(display("Unsupported: {message}"))]
    Unsupported {
        message: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("{message}"))]
    Message {
        message: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    Utf8Error {
        source: std::str::Utf8Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    TryFromInt {
        source: TryFromIntError,
        backtrace: Option<Backtrace>,
    },
}

impl Error {
    pub(crate) fn bad_parameters(message: impl Into<String>) -> Self {
        BadParametersSnafu {
            message: message.into(),
        }
        .build()
    }

    pub(crate) fn bad_format(message: impl Into<String>) -> Self {
        BadFormatSnafu {
            message: message.into(),
        }
        .build()
    }

    pub(crate) fn bad_state(message: impl Into<String>) -> Self {
        BadStateSnafu {
            message: message.into(),
        }
        .build()
    }

    pub(crate) fn decrypt_failed() -> Self {
        DecryptFailedSnafu.build()
    }

    pub(crate) fn rng() -> Self {
        RngSnafu.build()
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Message {
            message: err,
            backtrace: Some(snafu::GenerateImplicitData::generate()),
        }
    }
}

impl From<cipher::InvalidLength> for Error {
    fn from(_: cipher::InvalidLength) -> Error {
        Error::bad_parameters("invalid cipher key or iv length")
    }
}

#[macro_export]
macro_rules! unimplemented_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unimplemented { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unimplemented { message: format!($fmt, $($arg)+)})
    };
}

#[macro_export]
macro_rules! unsupported_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unsupported {
            message: $e.to_string(),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unsupported {
            message: format!($fmt, $($arg)+),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        })
    };
}

#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Message {
            message: $e.to_string(),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Message {
            message: format!($fmt, $($arg)+),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        })
    };
}

#[macro_export]
macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Message {
            message: $e.to_string(),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Message {
            message: format!($fmt, $($arg)+),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        }
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr,) => ({
        ensure_eq!($left, $right)
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, left_val, right_val,
                           format_args!($($arg)+))
                }
            }
        }
    });
}
