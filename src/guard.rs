use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, turning a panic into `None` so it never reaches the host.
///
/// Every entry point the host (or a worker loop) calls goes through here
/// instead of scattering `catch_unwind` calls around the crate.
pub(crate) fn contain<T>(entry_point: &'static str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(entry_point, "contained internal panic");
            None
        }
    }
}
