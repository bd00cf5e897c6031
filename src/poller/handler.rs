use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::AppError;
use crate::session::Session;

use super::model::NotificationSummary;

/// 通知数据来源
pub trait NotificationSource: Send + Sync {
    fn fetch<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<NotificationSummary, AppError>>;
}

/// 通知轮询
///
/// 登录期间按固定间隔拉取未读数和通知列表；会话变化时立即拉取一次，
/// 登出后概要清空。拉取失败只记录日志，保留上一次结果。
pub struct NotificationPoller;

impl NotificationPoller {
    pub fn spawn(
        source: Arc<dyn NotificationSource>,
        mut sessions: watch::Receiver<Option<Session>>,
        every: Duration,
    ) -> PollerHandle {
        let (tx, rx) = watch::channel(NotificationSummary::default());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            tracing::info!("Session store dropped, notification poller stopping");
                            break;
                        }
                        ticker.reset();
                    }
                }

                let token = sessions
                    .borrow_and_update()
                    .as_ref()
                    .map(|session| session.token.clone());

                match token {
                    Some(token) => match source.fetch(&token).await {
                        Ok(summary) => {
                            tracing::debug!("Fetched {} unread notifications", summary.unread_count);
                            tx.send_replace(summary);
                        }
                        Err(e) => {
                            tracing::warn!("Failed to poll notifications: {}", e);
                        }
                    },
                    None => {
                        if !tx.borrow().is_empty() {
                            tx.send_replace(NotificationSummary::default());
                        }
                    }
                }
            }
        });

        PollerHandle { summary: rx, task }
    }
}

pub struct PollerHandle {
    summary: watch::Receiver<NotificationSummary>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn latest(&self) -> NotificationSummary {
        self.summary.borrow().clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.summary.borrow().unread_count
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSummary> {
        self.summary.clone()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
