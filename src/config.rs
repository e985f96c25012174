use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::service::tracker::ConfirmationPolicy;

/// 应用配置
///
/// 启动时构建一次, 以引用传入各组件; 不存在任何进程级可变状态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub endpoints: EndpointsConfig,
    pub matching: MatchingConfig,
    pub reply: ReplyConfig,
}

/// 本地工作目录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// 下载的原始记录暂存目录
    pub inbox: PathBuf,
    /// 渲染产物 (txt/xml/zip) 目录
    pub outbox: PathBuf,
    /// 待确认标记目录
    pub pending: PathBuf,
    /// 支付系统 XML 模板路径
    pub template: PathBuf,
}

/// 三方交换端点 (客户系统 / 支付系统), 均为目录形式的投递点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// 客户系统产出记录的目录 (记录来源)
    pub customer_outbound: PathBuf,
    /// 支付系统接收文档的目录 (文档去向)
    pub payment_inbound: PathBuf,
    /// 支付系统产出回执的目录 (回执来源)
    pub payment_outbound: PathBuf,
    /// 客户系统接收回复的目录 (回复去向)
    pub customer_inbound: PathBuf,
}

/// 确认匹配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub confirmation_policy: ConfirmationPolicy,
}

/// 回复消息署名信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    pub sender_name: String,
    pub company_name: String,
    /// 回复正文中提到的支付系统名称
    pub payment_system: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                inbox: PathBuf::from("data/in"),
                outbox: PathBuf::from("data/out"),
                pending: PathBuf::from("data/wait"),
                template: PathBuf::from("fixtures/xml_invoice_template.xml"),
            },
            endpoints: EndpointsConfig {
                customer_outbound: PathBuf::from("endpoints/customer/out"),
                payment_inbound: PathBuf::from("endpoints/payment/in"),
                payment_outbound: PathBuf::from("endpoints/payment/out"),
                customer_inbound: PathBuf::from("endpoints/customer/in"),
            },
            matching: MatchingConfig {
                confirmation_policy: ConfirmationPolicy::default(),
            },
            reply: ReplyConfig {
                sender_name: "automatische verarbeitung".to_string(),
                company_name: "muster ag".to_string(),
                payment_system: "payment.example.ch".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 <- 配置文件 (可选) <- 环境变量
    ///
    /// 环境变量前缀 INVOICE_EXCHANGE, 层级用双下划线,
    /// 如 INVOICE_EXCHANGE__MATCHING__CONFIRMATION_POLICY=both-documents。
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;

        let mut builder = Config::builder().add_source(defaults);
        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("invoice_exchange").required(false)),
        };

        builder
            .add_source(
                Environment::with_prefix("INVOICE_EXCHANGE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_confirms_on_any_document() {
        let config = AppConfig::default();
        assert_eq!(
            config.matching.confirmation_policy,
            ConfirmationPolicy::AnyDocument
        );
    }
}
