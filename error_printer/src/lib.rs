use std::fmt::{Debug, Display};
use std::panic::Location;

use tracing::{debug, error, info, warn};

/// A helper trait to log errors.
/// The logging functions will track the caller's callsite.
/// For a chain of calls A -> B -> C -> ErrorPrinter, the
/// topmost function without #[track_caller] is deemed the callsite.
pub trait ErrorPrinter {
    fn log_error<M: Display>(self, message: M) -> Self;

    fn warn_error<M: Display>(self, message: M) -> Self;

    fn debug_error<M: Display>(self, message: M) -> Self;

    fn info_error<M: Display>(self, message: M) -> Self;
}

impl<T, E: Debug> ErrorPrinter for Result<T, E> {
    /// If self is an Err(e), prints out the given string to tracing::error,
    /// appending "error: {e}" to the end of the message.
    #[track_caller]
    fn log_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = callsite();
            error!(caller = %caller, "{message}, error: {e:?}")
        }
        self
    }

    /// If self is an Err(e), prints out the given string to tracing::warn,
    /// appending "error: {e}" to the end of the message.
    #[track_caller]
    fn warn_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = callsite();
            warn!(caller = %caller, "{message}, error: {e:?}")
        }
        self
    }

    /// If self is an Err(e), prints out the given string to tracing::debug,
    /// appending "error: {e}" to the end of the message.
    #[track_caller]
    fn debug_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = callsite();
            debug!(caller = %caller, "{message}, error: {e:?}")
        }
        self
    }

    /// If self is an Err(e), prints out the given string to tracing::info,
    /// appending "error: {e}" to the end of the message.
    #[track_caller]
    fn info_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = callsite();
            info!(caller = %caller, "{message}, error: {e:?}")
        }
        self
    }
}

/// A helper trait to log when an option is None.
/// The logging functions will track the caller's callsite.
pub trait OptionPrinter {
    fn error_none<M: Display>(self, message: M) -> Self;

    fn warn_none<M: Display>(self, message: M) -> Self;

    fn debug_none<M: Display>(self, message: M) -> Self;

    fn info_none<M: Display>(self, message: M) -> Self;
}

impl<T> OptionPrinter for Option<T> {
    #[track_caller]
    fn error_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = callsite();
            error!(caller = %caller, "{message}")
        }
        self
    }

    #[track_caller]
    fn warn_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = callsite();
            warn!(caller = %caller, "{message}")
        }
        self
    }

    #[track_caller]
    fn debug_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = callsite();
            debug!(caller = %caller, "{message}")
        }
        self
    }

    #[track_caller]
    fn info_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = callsite();
            info!(caller = %caller, "{message}")
        }
        self
    }
}

#[track_caller]
fn callsite() -> String {
    let location = Location::caller();
    format!("{}:{}", location.file(), location.line())
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn test_log_error_passes_value_through() {
        let ok: Result<u32, String> = Ok(7);
        assert_eq!(ok.log_error("should not log"), Ok(7));
        assert!(!logs_contain("should not log"));

        let err: Result<u32, String> = Err("boom".to_owned());
        assert!(err.warn_error("upload part failed").is_err());
        assert!(logs_contain("upload part failed"));
        assert!(logs_contain("boom"));
        assert!(logs_contain("lib.rs"));
    }

    #[test]
    #[traced_test]
    fn test_option_printer() {
        let some = Some(1).info_none("missing value");
        assert_eq!(some, Some(1));
        assert!(!logs_contain("missing value"));

        let none: Option<u32> = None.info_none("header x-jpmc-mp-parts-count absent");
        assert!(none.is_none());
        assert!(logs_contain("header x-jpmc-mp-parts-count absent"));
    }
}
