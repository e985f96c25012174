use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Invoice;

/// 待确认标记 (PendingMarker)
///
/// 发票成功渲染后立即落盘, 是唯一跨运行周期存活的状态;
/// 只有确认对账流程有权删除它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMarker {
    pub invoice_number: String,
    pub order_number: String,
    pub sender_id: String,
    pub email: String,
    pub sender_name: String,
    pub submitted_at: DateTime<Utc>,
}

impl PendingMarker {
    pub fn from_invoice(invoice: &Invoice, submitted_at: DateTime<Utc>) -> Self {
        Self {
            invoice_number: invoice.invoice_number.clone(),
            order_number: invoice.order_number.clone(),
            sender_id: invoice.sender_id.clone(),
            email: invoice.email.clone(),
            sender_name: invoice.sender_name.clone(),
            submitted_at,
        }
    }

    /// 规范文件名, 与发票产物共用同一个键
    pub fn canonical_file_name(&self) -> String {
        format!("{}_{}_invoice", self.sender_id, self.invoice_number)
    }

    /// 待确认时长 (天), 用于观测, 不触发任何过期逻辑
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.submitted_at).num_days()
    }
}

/// 一次确认匹配的结果
#[derive(Debug, Clone)]
pub struct ConfirmedMatch {
    pub marker: PendingMarker,
    /// 最后一次处理时间戳 (字典序最大, 时间戳定宽补零所以等价于最新)
    pub latest_stamp: String,
    /// 回执文本中与该发票相关的片段, 进入回复打包
    pub matched_lines: Vec<String>,
}
