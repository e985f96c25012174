use async_trait::async_trait;

use crate::error::Result;

pub mod local;

pub use local::LocalDirTransport;

/// 原始记录来源 (客户系统出站)
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// 列出可处理的记录名, 固定后缀过滤由实现负责
    async fn list(&self) -> Result<Vec<String>>;
    async fn fetch(&self, name: &str) -> Result<String>;
    /// 处理成功后移除, 防止重复读取
    async fn remove(&self, name: &str) -> Result<()>;
}

/// 渲染产物去向 (支付系统入站)
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// 确认回执来源 (支付系统出站)
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    async fn list(&self) -> Result<Vec<String>>;
    async fn fetch(&self, name: &str) -> Result<String>;
    async fn remove(&self, name: &str) -> Result<()>;
}

/// 完整的回复包: 收件人元数据 + 消息 + 打包附件
#[derive(Debug, Clone)]
pub struct ReplyPackage {
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub archive_name: String,
    pub archive: Vec<u8>,
}

/// 回复去向 (客户系统入站 + 通知协作方)
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn deliver(&self, reply: &ReplyPackage) -> Result<()>;
}
