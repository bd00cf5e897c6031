use chrono::Utc;
use futures_util::future::BoxFuture;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::AppError;
use crate::poller::{NotificationSource, NotificationSummary};

const UNREAD_COUNT_PATH: &str = "notifications/unread-count";
const NOTIFICATIONS_PATH: &str = "notifications";

#[derive(Debug, Deserialize)]
struct UnreadCount {
    #[serde(alias = "unread_count")]
    count: u64,
}

/// 后端 REST 接口的最小客户端，只覆盖通知轮询需要的读取
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self::new(config.api_base_url()?))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// 拼接相对路径，开头的 `/` 会被忽略
    pub fn url(&self, path: &str) -> Result<Url, AppError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", path, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, AppError> {
        let url = self.url(path)?;
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            return Err(AppError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn notification_summary(&self, token: &str) -> Result<NotificationSummary, AppError> {
        let (unread, items) = tokio::try_join!(
            self.get_json::<UnreadCount>(UNREAD_COUNT_PATH, token),
            self.get_json::<Vec<serde_json::Value>>(NOTIFICATIONS_PATH, token),
        )?;

        Ok(NotificationSummary {
            unread_count: unread.count,
            items,
            fetched_at: Some(Utc::now()),
        })
    }
}

impl NotificationSource for ApiClient {
    fn fetch<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<NotificationSummary, AppError>> {
        Box::pin(self.notification_summary(token))
    }
}
