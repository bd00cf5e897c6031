use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::utils::lock;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

struct DebounceState {
    timer: Option<JoinHandle<()>>,
    /// 每次调用递增，旧定时器据此判断自己是否已被取代
    epoch: u64,
}

/// 防抖包装
///
/// 默认在最后一次调用后静默 `wait` 再执行（后沿）；`immediate` 为真时
/// 空闲期的第一次调用立即执行（前沿），窗口内的后续调用被抑制并延长窗口。
/// 后沿调用在 tokio 任务中执行，需要在运行时内调用 [`Debounce::call`]。
pub struct Debounce<A> {
    func: Callback<A>,
    wait: Duration,
    immediate: bool,
    state: Arc<Mutex<DebounceState>>,
}

impl<A> Debounce<A>
where
    A: Send + 'static,
{
    pub fn new<F>(wait: Duration, immediate: bool, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            wait,
            immediate,
            state: Arc::new(Mutex::new(DebounceState {
                timer: None,
                epoch: 0,
            })),
        }
    }

    pub fn trailing<F>(wait: Duration, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(wait, false, func)
    }

    pub fn leading<F>(wait: Duration, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(wait, true, func)
    }

    pub fn call(&self, args: A) {
        let deadline = Instant::now() + self.wait;

        let call_now = {
            let mut state = lock(&self.state);
            let call_now = self.immediate && state.timer.is_none();
            if let Some(previous) = state.timer.take() {
                previous.abort();
            }
            state.epoch += 1;
            let epoch = state.epoch;

            // 前沿模式下定时器只负责结束窗口，参数留给同步调用
            let (deferred, now_args) = if self.immediate {
                (None, Some(args))
            } else {
                (Some(args), None)
            };

            let shared = Arc::clone(&self.state);
            let func = Arc::clone(&self.func);
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                {
                    let mut state = lock(&shared);
                    if state.epoch != epoch {
                        return;
                    }
                    state.timer = None;
                }
                if let Some(args) = deferred {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| func(args)));
                    if outcome.is_err() {
                        tracing::warn!("Debounced callback panicked");
                    }
                }
            }));

            if call_now { now_args } else { None }
        };

        if let Some(args) = call_now {
            (self.func)(args);
        }
    }

    /// 取消尚未执行的后沿调用，并结束当前窗口
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.epoch += 1;
    }

    /// 是否存在未结束的定时器
    pub fn is_pending(&self) -> bool {
        lock(&self.state).timer.is_some()
    }
}

impl<A> Drop for Debounce<A> {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.state).timer.take() {
            timer.abort();
        }
    }
}

pub fn debounce<A, F>(wait: Duration, immediate: bool, func: F) -> Debounce<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debounce::new(wait, immediate, func)
}
