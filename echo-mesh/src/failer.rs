//! Test-abort collaborator and the single `or_fail` adapter.

use std::fmt::Display;

/// External sink that aborts the current test execution when notified.
///
/// Abort-on-error variants of fallible operations are defined purely as
/// "call the fallible variant; on error, notify the failer" via
/// [`or_fail`]; nothing else duplicates that convention.
pub trait Failer: Send + Sync {
    fn fail(&self, message: &str) -> !;
}

/// Failer that aborts by panicking, which fails the surrounding test.
pub struct PanicFailer;

impl Failer for PanicFailer {
    fn fail(&self, message: &str) -> ! {
        panic!("{message}");
    }
}

/// Unwraps `result`, aborting through `failer` with context on error.
pub fn or_fail<T, E: Display>(failer: &dyn Failer, result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => failer.fail(&format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{or_fail, Failer, PanicFailer};

    #[test]
    fn or_fail_is_transparent_on_success() {
        let value: u32 = or_fail(&PanicFailer, Ok::<_, String>(7), "unused");
        assert_eq!(value, 7);
    }

    #[test]
    #[should_panic(expected = "building topology: boom")]
    fn or_fail_aborts_with_context_on_error() {
        let _: u32 = or_fail(
            &PanicFailer,
            Err::<u32, _>("boom".to_string()),
            "building topology",
        );
    }

    #[test]
    fn failer_is_object_safe() {
        let _failer: &dyn Failer = &PanicFailer;
    }
}
