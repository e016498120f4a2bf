//! Crate-specific error and result types, plus common conversions.

use ::std::{
    fmt::{self, Display},
    io,
};

/// Result type returned by functions that call into the raw input API.
pub type Result<T> = ::std::result::Result<T, Error>;

/// The class of failure an [`Error`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::strum::Display)]
pub enum ErrorKind {
    /// An operating system call failed and the caller has not classified the
    /// failure further.
    Os,
    /// Registering as a raw input consumer, or for device notifications,
    /// failed. Fatal to pipeline construction.
    Registration,
    /// Releasing a registration failed during teardown.
    Unregistration,
    /// The system device list could not be queried. The device registry keeps
    /// its last good snapshot.
    Enumeration,
    /// A query about a single device (path, metadata) failed.
    DeviceQuery,
    /// A pending raw input record could not be fetched.
    Decode,
}

/// Error type for functions that call into the raw input API. The error
/// attempts to pro-actively capture as much context as possible (error codes,
/// system error message strings, etc).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    /// Which part of the pipeline failed.
    kind: ErrorKind,

    /// The raw operating system error code, or zero if none was available.
    code: i32,

    /// The system error message gathered at the point of the error.
    message: String,

    /// The name of the operating system function which failed.
    function: Option<&'static str>,

    /// An optional context information which describes what was happening
    /// at the time error.
    context: Option<String>,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            kind,
            code,
            message,
            function,
            context,
        } = &self;

        if let Some(context) = context {
            write!(f, "{context}\nCaused by:\n    {message} [{kind}, code {code:#x}]")?;
        } else {
            write!(f, "{message} [{kind}, code {code:#x}]")?;
        }

        if let Some(function) = function {
            write!(f, " ({function})")?;
        }

        Ok(())
    }
}

impl ::std::error::Error for Error {}

impl Error {
    /// Constructs an error from an explicit code and message.
    pub fn new(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            function: None,
            context: None,
        }
    }

    /// Captures the calling thread's last operating system error.
    pub fn last_os_error(kind: ErrorKind) -> Self {
        let err = io::Error::last_os_error();
        Self::new(kind, err.raw_os_error().unwrap_or_default(), err.to_string())
    }

    /// The class of failure.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the underlying operating system error code, if any.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The name of the operating system function which failed, if recorded.
    pub fn function_name(&self) -> Option<&'static str> {
        self.function
    }
}

#[cfg(windows)]
impl From<::windows::core::Error> for Error {
    fn from(err: ::windows::core::Error) -> Self {
        Self::new(ErrorKind::Os, err.code().0, err.message().to_string_lossy())
    }
}

/// A crate-private trait which allows context information to be attached to
/// fallible types.
///
/// This is useful to attach high level context information and track which
/// particular OS function failed, something that might not be obvious when
/// relying on the inner error code alone.
pub(crate) trait Context<T> {
    /// Attach the name of the function which failed to the error as additional
    /// context.
    fn function(self, function: &'static str) -> Result<T>
    where
        Self: Sized;

    /// Attach a context message to a fallible type and return crate error.
    fn context(self, ctx: impl AsRef<str>) -> Result<T>
    where
        Self: Sized;

    /// Re-classify the failure.
    fn kind(self, kind: ErrorKind) -> Result<T>
    where
        Self: Sized;
}

impl<T> Context<T> for Result<T> {
    fn function(mut self, f: &'static str) -> Result<T> {
        if let Err(err) = &mut self {
            err.function = Some(f);
        }
        self
    }

    fn context(mut self, ctx: impl AsRef<str>) -> Result<T> {
        if let Err(err) = &mut self {
            err.context = Some(ctx.as_ref().to_owned());
        }
        self
    }

    fn kind(mut self, kind: ErrorKind) -> Result<T> {
        if let Err(err) = &mut self {
            err.kind = kind;
        }
        self
    }
}

impl<T> Context<T> for Option<T> {
    fn function(self, function: &'static str) -> Result<T> {
        self.ok_or_else(|| Error {
            function: Some(function),
            ..Error::last_os_error(ErrorKind::Os)
        })
    }

    fn context(self, ctx: impl AsRef<str>) -> Result<T> {
        self.ok_or_else(|| Error {
            context: Some(ctx.as_ref().to_owned()),
            ..Error::last_os_error(ErrorKind::Os)
        })
    }

    fn kind(self, kind: ErrorKind) -> Result<T> {
        self.ok_or_else(|| Error::last_os_error(kind))
    }
}

#[cfg(windows)]
impl<T> Context<T> for ::std::result::Result<T, ::windows::core::Error> {
    fn function(self, function: &'static str) -> Result<T> {
        self.map_err(Error::from).function(function)
    }

    fn context(self, ctx: impl AsRef<str>) -> Result<T> {
        self.map_err(Error::from).context(ctx)
    }

    fn kind(self, kind: ErrorKind) -> Result<T> {
        self.map_err(Error::from).kind(kind)
    }
}
