//! Error types and X11 error classification
//!
//! Every fallible entry point of the library returns [`SlopError`]. Protocol
//! errors reported by the server are sorted by [`classify`] into an
//! [`ErrorClass`]; the core never terminates the process itself, the caller
//! decides what a fatal error means.

use std::fmt;

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{ALLOC_COLOR_REQUEST, GRAB_KEYBOARD_REQUEST};
use x11rb::protocol::ErrorKind;
use x11rb::x11_utils::X11Error;

/// Result alias used across the crate
pub type Result<T, E = SlopError> = std::result::Result<T, E>;

/// How a failure should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection state is no longer trustworthy; abort.
    Fatal,
    /// Harmless; continue in a degraded mode.
    Benign,
    /// The current operation failed but the connection is intact.
    Recoverable,
}

/// A protocol error reported by the X server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub kind: ErrorKind,
    pub error_code: u8,
    pub major_opcode: u8,
    pub minor_opcode: u16,
    pub sequence: u16,
    pub bad_value: u32,
    pub request_name: Option<&'static str>,
}

impl ServerError {
    /// Build an error for `kind` raised by the core request `major_opcode`
    pub fn new(kind: ErrorKind, major_opcode: u8) -> Self {
        Self {
            kind,
            error_code: 0,
            major_opcode,
            minor_opcode: 0,
            sequence: 0,
            bad_value: 0,
            request_name: None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        classify(self)
    }
}

impl From<X11Error> for ServerError {
    fn from(err: X11Error) -> Self {
        Self {
            kind: err.error_kind,
            error_code: err.error_code,
            major_opcode: err.major_opcode,
            minor_opcode: err.minor_opcode,
            sequence: err.sequence,
            bad_value: err.bad_value,
            request_name: err.request_name,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "X Error of failed request:  {:?}", self.kind)?;
        write!(
            f,
            "  Major opcode of failed request: {:3}",
            self.major_opcode
        )?;
        if let Some(name) = self.request_name {
            write!(f, " ({})", name)?;
        }
        writeln!(f)?;
        write!(f, "  Serial number of failed request:{:5}", self.sequence)
    }
}

/// Main error type for display operations
#[derive(Error, Debug)]
pub enum SlopError {
    /// The display could not be opened
    #[error("Failed to open X display {display}: {reason}")]
    DisplayOpen { display: String, reason: String },

    /// An operation was attempted before `init` succeeded
    #[error("X engine is not initialized")]
    NotInitialized,

    /// The server refused the exclusive pointer grab
    #[error("Failed to grab X cursor (status {status})")]
    GrabFailed { status: String },

    /// The colormap could not provide the requested colour
    #[error("Couldn't allocate color of value {red},{green},{blue}")]
    ColorAllocation { red: f32, green: f32, blue: f32 },

    /// The server reported a protocol error
    #[error("{0}")]
    Server(ServerError),

    /// The connection to the server broke
    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The connection ran out of resource ids
    #[error("X resource ids exhausted")]
    IdsExhausted,
}

impl SlopError {
    /// Classify this error for the caller's termination policy
    pub fn class(&self) -> ErrorClass {
        match self {
            SlopError::DisplayOpen { .. }
            | SlopError::NotInitialized
            | SlopError::GrabFailed { .. }
            | SlopError::ColorAllocation { .. } => ErrorClass::Recoverable,
            SlopError::Server(err) => classify(err),
            SlopError::Connection(_) | SlopError::IdsExhausted => ErrorClass::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

impl From<ServerError> for SlopError {
    fn from(err: ServerError) -> Self {
        SlopError::Server(err)
    }
}

impl From<X11Error> for SlopError {
    fn from(err: X11Error) -> Self {
        SlopError::Server(err.into())
    }
}

impl From<ReplyError> for SlopError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::ConnectionError(e) => SlopError::Connection(e),
            ReplyError::X11Error(e) => e.into(),
        }
    }
}

impl From<ReplyOrIdError> for SlopError {
    fn from(err: ReplyOrIdError) -> Self {
        match err {
            ReplyOrIdError::IdsExhausted => SlopError::IdsExhausted,
            ReplyOrIdError::ConnectionError(e) => SlopError::Connection(e),
            ReplyOrIdError::X11Error(e) => e.into(),
        }
    }
}

impl SlopError {
    pub(crate) fn display_open(display: Option<&str>, err: ConnectError) -> Self {
        SlopError::DisplayOpen {
            display: display.unwrap_or("").to_string(),
            reason: err.to_string(),
        }
    }
}

/// Sort a server error into fatal, benign or recoverable
///
/// A refused keyboard grab is benign: selection still works through keymap
/// polling. A refused colour allocation only costs the overlay its colour.
/// Anything else leaves the connection in an unknown state.
pub fn classify(err: &ServerError) -> ErrorClass {
    match (err.major_opcode, &err.kind) {
        (GRAB_KEYBOARD_REQUEST, ErrorKind::Access) => ErrorClass::Benign,
        (ALLOC_COLOR_REQUEST, ErrorKind::Colormap | ErrorKind::Alloc | ErrorKind::Value) => {
            ErrorClass::Recoverable
        }
        _ => ErrorClass::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{CONFIGURE_WINDOW_REQUEST, GRAB_POINTER_REQUEST};

    #[test]
    fn test_keyboard_grab_access_is_benign() {
        let err = ServerError::new(ErrorKind::Access, GRAB_KEYBOARD_REQUEST);
        assert_eq!(classify(&err), ErrorClass::Benign);
    }

    #[test]
    fn test_access_on_other_requests_is_fatal() {
        let err = ServerError::new(ErrorKind::Access, GRAB_POINTER_REQUEST);
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }

    #[test]
    fn test_bad_window_is_fatal() {
        let err = ServerError::new(ErrorKind::Window, CONFIGURE_WINDOW_REQUEST);
        assert_eq!(classify(&err), ErrorClass::Fatal);
        assert!(SlopError::from(err).is_fatal());
    }

    #[test]
    fn test_color_allocation_is_recoverable() {
        let err = ServerError::new(ErrorKind::Colormap, ALLOC_COLOR_REQUEST);
        assert_eq!(classify(&err), ErrorClass::Recoverable);
    }

    #[test]
    fn test_acquisition_failures_are_recoverable() {
        let errors = [
            SlopError::DisplayOpen {
                display: ":9".to_string(),
                reason: "refused".to_string(),
            },
            SlopError::NotInitialized,
            SlopError::GrabFailed {
                status: "ALREADY_GRABBED".to_string(),
            },
        ];
        for err in errors {
            assert_eq!(err.class(), ErrorClass::Recoverable, "{}", err);
        }
    }

    #[test]
    fn test_server_error_display_names_request() {
        let mut err = ServerError::new(ErrorKind::Match, CONFIGURE_WINDOW_REQUEST);
        err.request_name = Some("ConfigureWindow");
        err.sequence = 42;
        let text = err.to_string();
        assert!(text.contains("X Error of failed request"));
        assert!(text.contains("ConfigureWindow"));
        assert!(text.contains("42"));
    }
}
