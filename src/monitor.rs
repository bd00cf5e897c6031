use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// 计时执行同步闭包，耗时写入 debug 日志
pub fn measure<T, F>(label: &str, f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let output = f();
    let elapsed = start.elapsed();
    tracing::debug!("{} took {:.3}ms", label, elapsed.as_secs_f64() * 1000.0);
    (output, elapsed)
}

pub async fn measure_async<T, Fut>(label: &str, fut: Fut) -> (T, Duration)
where
    Fut: Future<Output = T>,
{
    let start = Instant::now();
    let output = fut.await;
    let elapsed = start.elapsed();
    tracing::debug!("{} took {:.3}ms", label, elapsed.as_secs_f64() * 1000.0);
    (output, elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn measures_async_elapsed_time() {
        let (value, elapsed) = measure_async("load grades", async {
            tokio::time::sleep(Duration::from_millis(120)).await;
            7
        })
        .await;

        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(120));
        assert!(elapsed < Duration::from_millis(125));
    }

    #[tokio::test(start_paused = true)]
    async fn measures_sync_closure() {
        let (sum, elapsed) = measure("sum", || (1..=10).sum::<u32>());
        assert_eq!(sum, 55);
        assert_eq!(elapsed, Duration::ZERO);
    }
}
