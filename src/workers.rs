use std::collections::HashMap;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;

/// 后台任务信箱容量
const MAILBOX_CAPACITY: usize = 64;

/// 命名后台任务的消息句柄
#[derive(Debug)]
pub struct WorkerHandle<M> {
    name: String,
    tx: mpsc::Sender<M>,
}

impl<M> Clone for WorkerHandle<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<M> WorkerHandle<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 投递消息，任务已终止时返回错误
    pub async fn post(&self, message: M) -> Result<(), AppError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| AppError::Worker(format!("{} has terminated", self.name)))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Worker<M> {
    handle: WorkerHandle<M>,
    task: JoinHandle<()>,
}

/// 命名后台任务管理器
///
/// 按名称幂等创建：同名任务已存在时直接返回已有句柄。
pub struct WorkerManager<M> {
    workers: HashMap<String, Worker<M>>,
}

impl<M> Default for WorkerManager<M> {
    fn default() -> Self {
        Self {
            workers: HashMap::new(),
        }
    }
}

impl<M> WorkerManager<M>
where
    M: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建后台任务，handler 依次处理收到的每条消息
    pub fn create<F, Fut>(&mut self, name: &str, handler: F) -> WorkerHandle<M>
    where
        F: FnMut(M) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(existing) = self.workers.get(name) {
            if !existing.task.is_finished() {
                return existing.handle.clone();
            }
            tracing::debug!("Worker {} finished, recreating", name);
        }

        let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);
        let mut handler = handler;
        let task_name = name.to_string();
        let task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                handler(message).await;
            }
            tracing::debug!("Worker {} mailbox closed", task_name);
        });

        let handle = WorkerHandle {
            name: name.to_string(),
            tx,
        };
        self.workers.insert(
            name.to_string(),
            Worker {
                handle: handle.clone(),
                task,
            },
        );
        tracing::info!("Worker {} started", name);
        handle
    }

    pub fn get(&self, name: &str) -> Option<WorkerHandle<M>> {
        self.workers.get(name).map(|w| w.handle.clone())
    }

    pub async fn post(&self, name: &str, message: M) -> Result<(), AppError> {
        match self.workers.get(name) {
            Some(worker) => worker.handle.post(message).await,
            None => Err(AppError::Worker(format!("no worker named {}", name))),
        }
    }

    /// 终止指定任务，返回该任务是否存在
    pub fn terminate(&mut self, name: &str) -> bool {
        match self.workers.remove(name) {
            Some(worker) => {
                worker.task.abort();
                tracing::info!("Worker {} terminated", name);
                true
            }
            None => false,
        }
    }

    pub fn terminate_all(&mut self) {
        for (name, worker) in self.workers.drain() {
            worker.task.abort();
            tracing::info!("Worker {} terminated", name);
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl<M> Drop for WorkerManager<M> {
    fn drop(&mut self) {
        for worker in self.workers.values() {
            worker.task.abort();
        }
    }
}
