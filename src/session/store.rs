use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::watch;

use crate::error::AppError;

use super::model::Session;

/// 会话存储
///
/// 内存中最多保存一个会话，同时镜像到本地 JSON 文件以便重启后恢复。
/// 会话变化通过 watch 通道广播给订阅者（例如通知轮询）。
pub struct SessionStore {
    path: PathBuf,
    tx: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// 创建空存储，不读取文件
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            path: path.into(),
            tx,
        }
    }

    /// 从文件恢复会话；文件不存在或内容损坏时以未登录状态启动
    pub async fn restore(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let store = Self::new(path);
        match tokio::fs::read(&store.path).await {
            Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => {
                    tracing::info!("Restored session for user {}", session.user_id);
                    store.tx.send_replace(Some(session));
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring corrupt session file {}: {}",
                        store.path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 登录：替换当前会话并写入文件
    pub async fn login(&self, session: Session) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(&session)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;

        tracing::info!("User {} logged in as {:?}", session.user_id, session.role);
        self.tx.send_replace(Some(session));
        Ok(())
    }

    /// 登出：清空内存会话并删除文件
    pub async fn logout(&self) -> Result<Option<Session>, AppError> {
        let previous = self.tx.send_replace(None);
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if let Some(session) = &previous {
            tracing::info!("User {} logged out", session.user_id);
        }
        Ok(previous)
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}
