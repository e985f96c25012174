use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::EndpointsConfig;
use crate::error::Result;
use crate::transport::{ConfirmationSource, DocumentSink, RecordSource, ReplyPackage, ReplySink};

/// 原始记录的固定后缀
pub const RECORD_SUFFIX: &str = ".data";
/// 回执文件的固定前缀与后缀
pub const RECEIPT_PREFIX: &str = "quittungsfile";
pub const RECEIPT_SUFFIX: &str = ".txt";

/// 目录端点传输
///
/// 四个交换角色各对应一个已挂载目录; 远端会话协议不在本系统范围内,
/// 由挂载层 (或上游调度) 负责, 这里只保留窄接口。
pub struct LocalDirTransport {
    customer_outbound: PathBuf,
    payment_inbound: PathBuf,
    payment_outbound: PathBuf,
    customer_inbound: PathBuf,
}

impl LocalDirTransport {
    pub fn new(endpoints: &EndpointsConfig) -> Self {
        Self {
            customer_outbound: endpoints.customer_outbound.clone(),
            payment_inbound: endpoints.payment_inbound.clone(),
            payment_outbound: endpoints.payment_outbound.clone(),
            customer_inbound: endpoints.customer_inbound.clone(),
        }
    }
}

/// 列出目录下满足过滤条件的文件名, 排序后返回; 目录不存在视为空
async fn list_names<F>(dir: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let mut names = Vec::new();
    if !dir.exists() {
        return Ok(names);
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if keep(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[async_trait]
impl RecordSource for LocalDirTransport {
    async fn list(&self) -> Result<Vec<String>> {
        list_names(&self.customer_outbound, |name| name.ends_with(RECORD_SUFFIX)).await
    }

    async fn fetch(&self, name: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.customer_outbound.join(name)).await?)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        Ok(tokio::fs::remove_file(self.customer_outbound.join(name)).await?)
    }
}

#[async_trait]
impl DocumentSink for LocalDirTransport {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.payment_inbound).await?;
        Ok(tokio::fs::write(self.payment_inbound.join(name), bytes).await?)
    }
}

#[async_trait]
impl ConfirmationSource for LocalDirTransport {
    async fn list(&self) -> Result<Vec<String>> {
        list_names(&self.payment_outbound, |name| {
            name.starts_with(RECEIPT_PREFIX) && name.ends_with(RECEIPT_SUFFIX)
        })
        .await
    }

    async fn fetch(&self, name: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.payment_outbound.join(name)).await?)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        Ok(tokio::fs::remove_file(self.payment_outbound.join(name)).await?)
    }
}

#[async_trait]
impl ReplySink for LocalDirTransport {
    async fn deliver(&self, reply: &ReplyPackage) -> Result<()> {
        tokio::fs::create_dir_all(&self.customer_inbound).await?;

        tokio::fs::write(self.customer_inbound.join(&reply.archive_name), &reply.archive).await?;

        // 消息正文随附件一并投递, 通知渠道由协作方对接
        let message = format!(
            "To: {} <{}>\nSubject: {}\n\n{}",
            reply.recipient_name, reply.recipient_email, reply.subject, reply.body
        );
        let message_name = format!("{}.msg", reply.archive_name);
        tokio::fs::write(self.customer_inbound.join(message_name), message).await?;

        tracing::info!("[Transport] 回复已投递: {}", reply.archive_name);
        Ok(())
    }
}
