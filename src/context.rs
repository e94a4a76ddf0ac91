use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use uuid::Uuid;

use crate::env;

tokio::task_local! {
    /// Correlation cell for one logical task, installed by
    /// [`scope_correlation_id`]. Only the owning task can touch it, and it
    /// follows the task across suspension points and worker threads.
    static TASK_CORRELATION_ID: RefCell<Option<String>>;
}

thread_local! {
    /// Fallback cell for synchronous, thread-per-execution callers that
    /// never enter a task scope.
    static THREAD_CORRELATION_ID: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Set the correlation ID for the current logical execution scope.
///
/// Inside a [`scope_correlation_id`] scope the value is stored in the
/// task-local cell; otherwise in the calling thread's cell. Either way it
/// is never visible to sibling executions running concurrently.
pub fn set_correlation_id(value: impl Into<String>) {
    let mut value = Some(value.into());
    let stored = TASK_CORRELATION_ID.try_with(|cell| {
        *cell.borrow_mut() = value.take();
    });
    if stored.is_err() {
        THREAD_CORRELATION_ID.with(|cell| *cell.borrow_mut() = value.take());
    }
}

/// Get the correlation ID of the current logical execution scope, or
/// `None` if none was set.
///
/// When a task scope is active it is authoritative: a value set on the
/// underlying thread is not consulted.
pub fn get_correlation_id() -> Option<String> {
    if let Ok(value) = TASK_CORRELATION_ID.try_with(|cell| cell.borrow().clone()) {
        return value;
    }
    THREAD_CORRELATION_ID.with(|cell| cell.borrow().clone())
}

/// Clear the correlation ID for the current scope, restoring the unset
/// state. Absence is represented as `None`, never as an empty string.
pub fn clear_correlation_id() {
    let cleared = TASK_CORRELATION_ID.try_with(|cell| {
        cell.borrow_mut().take();
    });
    if cleared.is_err() {
        THREAD_CORRELATION_ID.with(|cell| {
            cell.borrow_mut().take();
        });
    }
}

/// Run `future` with its own task-scoped correlation cell, initialized to
/// `value`.
///
/// Tasks cooperatively sharing a worker thread each see only their own
/// value, and the value survives suspension and resume of the same task.
/// `set_correlation_id` / `clear_correlation_id` calls inside the scope
/// mutate the scoped cell and are discarded when the scope ends.
pub async fn scope_correlation_id<F>(value: impl Into<String>, future: F) -> F::Output
where
    F: Future,
{
    TASK_CORRELATION_ID
        .scope(RefCell::new(Some(value.into())), future)
        .await
}

/// Opaque identifier correlating all log lines of one logical execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new random identifier in RFC 4122 canonical hyphenated
    /// form (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a correlation ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Read the identifier from the `CORRELATION_ID` environment
    /// variable, if set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var(env::CORRELATION_ID_ENV)
            .ok()
            .filter(|value| !value.is_empty())
            .map(Self)
    }

    /// Resolve an identifier for a new run: an explicitly supplied value
    /// wins, else the environment override, else a freshly generated one.
    pub fn resolve(explicit: Option<&str>) -> Self {
        explicit
            .map(Self::from_string)
            .or_else(Self::from_env)
            .unwrap_or_else(Self::generate)
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Installs a correlation ID on creation and clears the current scope on
/// drop, so one logical run releases its identifier even on early return.
#[derive(Debug)]
pub struct CorrelationGuard {
    _private: (),
}

impl CorrelationGuard {
    pub fn set(value: impl Into<String>) -> Self {
        set_correlation_id(value);
        CorrelationGuard { _private: () }
    }
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        clear_correlation_id();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear_sequence() {
        clear_correlation_id();
        assert_eq!(get_correlation_id(), None);

        set_correlation_id("cid-1");
        assert_eq!(get_correlation_id().as_deref(), Some("cid-1"));

        set_correlation_id("cid-2");
        assert_eq!(get_correlation_id().as_deref(), Some("cid-2"));

        clear_correlation_id();
        assert_eq!(get_correlation_id(), None);
    }

    #[test]
    fn threads_do_not_share_ids() {
        set_correlation_id("main-thread");

        let observed = std::thread::spawn(|| {
            let before = get_correlation_id();
            set_correlation_id("worker-thread");
            (before, get_correlation_id())
        })
        .join()
        .unwrap();

        assert_eq!(observed.0, None);
        assert_eq!(observed.1.as_deref(), Some("worker-thread"));
        assert_eq!(get_correlation_id().as_deref(), Some("main-thread"));

        clear_correlation_id();
    }

    #[test]
    fn guard_clears_on_drop() {
        {
            let _guard = CorrelationGuard::set("guarded");
            assert_eq!(get_correlation_id().as_deref(), Some("guarded"));
        }
        assert_eq!(get_correlation_id(), None);
    }

    #[test]
    fn generated_ids_are_canonical_uuids() {
        let id = CorrelationId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        let lengths: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
        // Version nibble of a v4 UUID.
        assert!(parts[2].starts_with('4'));
        assert_ne!(id, CorrelationId::generate());
    }

    #[test]
    fn explicit_id_wins_over_generation() {
        let id = CorrelationId::resolve(Some("abc-123"));
        assert_eq!(id.as_str(), "abc-123");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_tasks_keep_their_own_ids() {
        async fn observe(own: &str) -> bool {
            for _ in 0..10 {
                if get_correlation_id().as_deref() != Some(own) {
                    return false;
                }
                tokio::task::yield_now().await;
            }
            true
        }

        let (a, b) = tokio::join!(
            scope_correlation_id("task-a", observe("task-a")),
            scope_correlation_id("task-b", observe("task-b")),
        );
        assert!(a);
        assert!(b);
    }

    #[tokio::test]
    async fn scope_does_not_leak_outside() {
        clear_correlation_id();
        scope_correlation_id("scoped", async {
            assert_eq!(get_correlation_id().as_deref(), Some("scoped"));
            set_correlation_id("rebound");
            assert_eq!(get_correlation_id().as_deref(), Some("rebound"));
        })
        .await;
        assert_eq!(get_correlation_id(), None);
    }

    #[tokio::test]
    async fn clear_inside_scope_only_affects_the_scope() {
        set_correlation_id("ambient");
        scope_correlation_id("scoped", async {
            clear_correlation_id();
            assert_eq!(get_correlation_id(), None);
        })
        .await;
        assert_eq!(get_correlation_id().as_deref(), Some("ambient"));
        clear_correlation_id();
    }
}
