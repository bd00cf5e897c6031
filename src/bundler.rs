use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, join_all};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::utils::lock;

/// 单个请求的结算错误
#[derive(Debug, PartialEq, Eq)]
pub enum BundleError<E> {
    /// 请求本身失败
    Request(E),
    /// 请求在结算前被丢弃（批次任务被中止或 panic）
    Dropped,
}

impl<E: fmt::Display> fmt::Display for BundleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::Request(e) => write!(f, "bundled request failed: {}", e),
            BundleError::Dropped => write!(f, "bundled request dropped before settling"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for BundleError<E> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

type Thunk<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;

struct Pending<T, E> {
    id: RequestId,
    thunk: Thunk<T, E>,
    settle: oneshot::Sender<Result<T, E>>,
}

struct BundleState<T, E> {
    batch: Vec<Pending<T, E>>,
    timer: Option<JoinHandle<()>>,
    epoch: u64,
    next_id: u64,
}

/// 请求合并器
///
/// 入队的请求在静默 `delay` 后整批并发发出，每个请求的结果通过各自的
/// [`BundleTicket`] 返回，互不影响。
pub struct RequestBundler<T, E> {
    delay: Duration,
    state: Arc<Mutex<BundleState<T, E>>>,
}

impl<T, E> Clone for RequestBundler<T, E> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> RequestBundler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(BundleState {
                batch: Vec::new(),
                timer: None,
                epoch: 0,
                next_id: 0,
            })),
        }
    }

    /// 加入当前批次，每次入队都会重置静默计时
    pub fn enqueue<F, Fut>(&self, request: F) -> BundleTicket<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + self.delay;

        let mut state = lock(&self.state);
        let id = RequestId(state.next_id);
        state.next_id += 1;
        state.batch.push(Pending {
            id,
            thunk: Box::new(move || request().boxed()),
            settle: tx,
        });

        if let Some(previous) = state.timer.take() {
            previous.abort();
        }
        state.epoch += 1;
        let epoch = state.epoch;
        let shared = Arc::clone(&self.state);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let batch = {
                let mut state = lock(&shared);
                if state.epoch != epoch {
                    return;
                }
                state.timer = None;
                std::mem::take(&mut state.batch)
            };
            dispatch(batch).await;
        }));

        BundleTicket { id, rx }
    }

    /// 立即发出当前批次，不等待静默期
    pub fn flush(&self) -> JoinHandle<()> {
        let batch = {
            let mut state = lock(&self.state);
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.epoch += 1;
            std::mem::take(&mut state.batch)
        };
        tokio::spawn(dispatch(batch))
    }

    /// 当前批次中等待发出的请求数
    pub fn queued(&self) -> usize {
        lock(&self.state).batch.len()
    }
}

async fn dispatch<T, E>(batch: Vec<Pending<T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    if batch.is_empty() {
        return;
    }
    tracing::debug!("Dispatching bundle of {} requests", batch.len());

    // 每个请求在独立任务中运行并各自结算，单个失败或 panic 不影响其他请求
    let handles: Vec<_> = batch
        .into_iter()
        .map(|pending| {
            let Pending { id, thunk, settle } = pending;
            tokio::spawn(async move {
                let result = thunk().await;
                if settle.send(result).is_err() {
                    tracing::debug!("Ticket for request {:?} dropped before settling", id);
                }
            })
        })
        .collect();

    for outcome in join_all(handles).await {
        if let Err(e) = outcome {
            tracing::warn!("Bundled request did not settle: {}", e);
        }
    }
}

/// 单个请求的结算凭据
///
/// 丢弃凭据不会取消请求，只是放弃结果。
pub struct BundleTicket<T, E> {
    id: RequestId,
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> BundleTicket<T, E> {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl<T, E> Future for BundleTicket<T, E> {
    type Output = Result<T, BundleError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|settled| match settled {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BundleError::Request(e)),
            Err(_) => Err(BundleError::Dropped),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn each_ticket_resolves_to_its_own_result() {
        let bundler: RequestBundler<u32, String> = RequestBundler::new(Duration::from_millis(50));

        let ok = bundler.enqueue(|| async { Ok(1) });
        let failed = bundler.enqueue(|| async { Err("grade service down".to_string()) });
        let also_ok = bundler.enqueue(|| async { Ok(3) });
        assert_eq!(bundler.queued(), 3);

        assert_eq!(ok.await, Ok(1));
        assert_eq!(
            failed.await,
            Err(BundleError::Request("grade service down".to_string()))
        );
        assert_eq!(also_ok.await, Ok(3));
        assert_eq!(bundler.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_waits_for_quiescence() {
        let bundler: RequestBundler<(), ()> = RequestBundler::new(Duration::from_millis(50));
        let started = Arc::new(AtomicUsize::new(0));

        let mut tickets = Vec::new();
        for _ in 0..3 {
            let started = Arc::clone(&started);
            tickets.push(bundler.enqueue(move || async move {
                started.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            sleep(Duration::from_millis(30)).await;
        }

        // 最后一次入队在 t=60，批次在 t=110 发出
        assert_eq!(started.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(25)).await;
        assert_eq!(started.load(Ordering::SeqCst), 3);

        for ticket in tickets {
            assert_eq!(ticket.await, Ok(()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn requests_in_batch_run_concurrently() {
        let bundler: RequestBundler<u64, ()> = RequestBundler::new(Duration::from_millis(10));
        let slow = bundler.enqueue(|| async {
            sleep(Duration::from_millis(100)).await;
            Ok(100)
        });
        let fast = bundler.enqueue(|| async {
            sleep(Duration::from_millis(100)).await;
            Ok(1)
        });

        let start = Instant::now();
        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!((slow, fast), (Ok(100), Ok(1)));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_dispatches_immediately() {
        let bundler: RequestBundler<&'static str, ()> = RequestBundler::new(Duration::from_secs(60));
        let ticket = bundler.enqueue(|| async { Ok("sent") });
        let first_id = ticket.id();

        bundler.flush().await.unwrap();
        assert_eq!(ticket.await, Ok("sent"));

        let next = bundler.enqueue(|| async { Ok("later") });
        assert_eq!(next.id(), RequestId(first_id.0 + 1));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_request_reports_dropped() {
        let bundler: RequestBundler<u8, ()> = RequestBundler::new(Duration::from_millis(1));
        let ticket = bundler.enqueue(|| async { Ok("x".parse::<u8>().expect("handler bug")) });
        assert_eq!(ticket.await, Err(BundleError::Dropped));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_ticket_still_runs_request() {
        let bundler: RequestBundler<u32, ()> = RequestBundler::new(Duration::from_millis(20));
        let ran = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&ran);
        let ticket = bundler.enqueue(move || async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });
        let kept = bundler.enqueue(|| async { Ok(8) });
        drop(ticket);

        assert_eq!(kept.await, Ok(8));
        sleep(Duration::from_millis(5)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
