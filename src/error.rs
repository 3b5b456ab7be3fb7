use std::{error, fmt, result};

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(MalformedKey, msg: "no separator in {:?}", qualifier);
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(IOError, std::fs::read(file));
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(InvalidFormat, toml::from_str(&text), "file:{:?}", file);
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err($crate::Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that are returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location, and a message describing the failure.
pub enum Error {
    /// Protocol misuse or broken invariant, like calling `advance()`
    /// on a cursor that has no top entry.
    Fatal(String, String),
    /// Truncated or structurally inconsistent frequency encoding.
    MalformedEncoding(String, String),
    /// Qualifier lacks the structure required by the operation.
    MalformedKey(String, String),
    /// Visibility labels could not be combined.
    VisibilityCombine(String, String),
    /// Required option missing or malformed, detected at construction.
    InvalidConfig(String, String),
    /// Operation needs at least one entry in DateFrequencyMap.
    EmptyMap(String, String),
    FailConvert(String, String),
    InvalidFormat(String, String),
    InvalidFile(String, String),
    IOError(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            MalformedEncoding(p, msg) => write!(f, "{} MalformedEncoding: {}", p, msg),
            MalformedKey(p, msg) => write!(f, "{} MalformedKey: {}", p, msg),
            VisibilityCombine(p, msg) => write!(f, "{} VisibilityCombine: {}", p, msg),
            InvalidConfig(p, msg) => write!(f, "{} InvalidConfig: {}", p, msg),
            EmptyMap(p, msg) => write!(f, "{} EmptyMap: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} FailConvert: {}", p, msg),
            InvalidFormat(p, msg) => write!(f, "{} InvalidFormat: {}", p, msg),
            InvalidFile(p, msg) => write!(f, "{} InvalidFile: {}", p, msg),
            IOError(p, msg) => write!(f, "{} IOError: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}
