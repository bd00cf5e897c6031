use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::utils::lock;

/// 节流窗口
///
/// 每个窗口只放行第一次请求，窗口内的其余请求直接丢弃，不排队。
#[derive(Debug)]
pub struct ThrottleGate {
    limit: Duration,
    window_start: Mutex<Option<Instant>>,
}

impl ThrottleGate {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            window_start: Mutex::new(None),
        }
    }

    /// 约一帧（16ms），用于滚动事件
    pub fn per_frame() -> Self {
        Self::new(Duration::from_millis(16))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// 尝试进入窗口，返回本次是否放行
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut start = lock(&self.window_start);
        match *start {
            Some(opened) if now < opened + self.limit => false,
            _ => {
                *start = Some(now);
                true
            }
        }
    }

    /// 立即结束当前窗口
    pub fn reset(&self) {
        *lock(&self.window_start) = None;
    }
}

/// 节流包装：每个 `limit` 窗口最多执行一次
pub struct Throttle<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    gate: ThrottleGate,
}

impl<A> Throttle<A> {
    pub fn new<F>(limit: Duration, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
            gate: ThrottleGate::new(limit),
        }
    }

    /// 返回本次调用是否真正执行
    pub fn call(&self, args: A) -> bool {
        if !self.gate.try_acquire() {
            return false;
        }
        (self.func)(args);
        true
    }

    pub fn gate(&self) -> &ThrottleGate {
        &self.gate
    }
}

pub fn throttle<A, F>(limit: Duration, func: F) -> Throttle<A>
where
    F: Fn(A) + Send + Sync + 'static,
{
    Throttle::new(limit, func)
}
