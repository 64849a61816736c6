use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;

thread_local! {
    static CONTEXT: RefCell<Option<BTreeMap<String, String>>> = const { RefCell::new(None) };
}

/// Key/value entries attached to every record emitted from the current
/// thread until cleared.
///
/// Entries are visible only to the thread that wrote them. On pooled
/// threads (Tokio workers, rayon, thread pools) wrap each unit of work in
/// [`LogContext::scope`] so nothing leaks into the next task:
///
/// ```
/// use loghub_shipper::context::LogContext;
///
/// let _scope = LogContext::scoped([("requestId", "req-42")]);
/// assert_eq!(LogContext::get("requestId").as_deref(), Some("req-42"));
/// drop(_scope);
/// assert!(LogContext::is_empty());
/// ```
pub struct LogContext;

impl LogContext {
    pub fn put(key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        CONTEXT.with(|cell| {
            cell.borrow_mut().get_or_insert_with(BTreeMap::new).insert(key, value);
        });
    }

    pub fn put_all<K, V>(entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: ToString,
    {
        CONTEXT.with(|cell| {
            let mut guard = cell.borrow_mut();
            let map = guard.get_or_insert_with(BTreeMap::new);
            for (key, value) in entries {
                map.insert(key.into(), value.to_string());
            }
        });
    }

    pub fn get(key: &str) -> Option<String> {
        CONTEXT.with(|cell| cell.borrow().as_ref().and_then(|map| map.get(key).cloned()))
    }

    pub fn remove(key: &str) -> Option<String> {
        CONTEXT.with(|cell| cell.borrow_mut().as_mut().and_then(|map| map.remove(key)))
    }

    /// Copy of all entries for the current thread.
    pub fn snapshot() -> BTreeMap<String, String> {
        CONTEXT.with(|cell| cell.borrow().clone().unwrap_or_default())
    }

    pub fn is_empty() -> bool {
        CONTEXT.with(|cell| cell.borrow().as_ref().map_or(true, BTreeMap::is_empty))
    }

    /// Remove all entries but keep the allocated map for reuse.
    pub fn clear() {
        CONTEXT.with(|cell| {
            if let Some(map) = cell.borrow_mut().as_mut() {
                map.clear();
            }
        });
    }

    /// Drop the thread's map entirely; the next write allocates a new one.
    pub fn teardown() {
        CONTEXT.with(|cell| {
            cell.borrow_mut().take();
        });
    }

    /// Guard that tears the context down when dropped.
    pub fn scope() -> ContextScope {
        ContextScope { _not_send: PhantomData }
    }

    /// Put `entries` and return a guard that tears the context down on drop.
    pub fn scoped<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> ContextScope
    where
        K: Into<String>,
        V: ToString,
    {
        Self::put_all(entries);
        Self::scope()
    }
}

/// Clears the thread's [`LogContext`] on every exit path, unwinding included.
///
/// Not `Send`: it must be dropped on the thread whose context it guards.
#[must_use = "the context is torn down as soon as the scope is dropped"]
pub struct ContextScope {
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        LogContext::teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        LogContext::teardown();
        LogContext::put("userId", "12345");
        LogContext::put("amount", 150.5);
        LogContext::put("vip", true);

        assert_eq!(LogContext::get("userId").as_deref(), Some("12345"));
        assert_eq!(LogContext::get("amount").as_deref(), Some("150.5"));
        assert_eq!(LogContext::get("vip").as_deref(), Some("true"));

        assert_eq!(LogContext::remove("userId").as_deref(), Some("12345"));
        assert_eq!(LogContext::get("userId"), None);
        LogContext::teardown();
    }

    #[test]
    fn put_all_and_snapshot() {
        LogContext::teardown();
        LogContext::put_all([("a", "1"), ("b", "2")]);

        let snapshot = LogContext::snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["b"], "2");

        LogContext::clear();
        assert!(LogContext::is_empty());
        LogContext::teardown();
    }

    #[test]
    fn empty_before_first_write() {
        LogContext::teardown();
        assert!(LogContext::is_empty());
        assert!(LogContext::snapshot().is_empty());
        assert_eq!(LogContext::remove("missing"), None);
    }

    #[test]
    fn entries_are_thread_local() {
        LogContext::teardown();
        LogContext::put("owner", "main");

        let seen = std::thread::spawn(|| LogContext::get("owner")).join().unwrap();
        assert_eq!(seen, None);
        assert_eq!(LogContext::get("owner").as_deref(), Some("main"));
        LogContext::teardown();
    }

    #[test]
    fn scope_clears_on_drop() {
        {
            let _scope = LogContext::scoped([("requestId", "r-1")]);
            assert!(!LogContext::is_empty());
        }
        assert!(LogContext::is_empty());
    }

    #[test]
    fn scope_clears_when_unwinding() {
        let result = std::panic::catch_unwind(|| {
            let _scope = LogContext::scoped([("requestId", "r-2")]);
            panic!("handler failed");
        });
        assert!(result.is_err());
        assert!(LogContext::is_empty());
    }
}
