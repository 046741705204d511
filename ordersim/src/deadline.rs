//! Deadlines for backing-store calls.

use std::future::Future;
use std::time::Duration;

/// Awaits `call`, mapping an elapsed deadline into the caller's error type.
pub(crate) async fn within<F, T, E>(
    limit: Duration,
    call: F,
    on_elapsed: impl FnOnce(Duration) -> E + Send,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(on_elapsed(limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_become_timeouts() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(1)
        };
        let result = within(Duration::from_millis(10), slow, |d| format!("{d:?}")).await;
        assert_eq!(result, Err("10ms".to_string()));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let result = within(Duration::from_secs(1), async { Ok::<_, String>(7) }, |_| {
            "late".to_string()
        })
        .await;
        assert_eq!(result, Ok(7));

        let result = within(
            Duration::from_secs(1),
            async { Err::<u8, _>("boom".to_string()) },
            |_| "late".to_string(),
        )
        .await;
        assert_eq!(result, Err("boom".to_string()));
    }
}
