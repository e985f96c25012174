use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 发票主体 (从原始记录提取后的结构化形式)
///
/// 所有字段在提取阶段均为必填, 缺任何一个字段整条记录作废,
/// 不存在部分填充的发票。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub order_number: String,
    pub generation_place: String,
    pub generation_date: String,   // DD.MM.YYYY (记录头原样保留)
    pub generation_time: String,   // HH:MM:SS
    pub payment_goal_days: u32,    // 付款期限 (天数, 记录中固定两位)
    pub sender_number: String,
    pub sender_id: String,         // K 开头的发送方编号, 进入规范文件名
    pub sender_name: String,
    pub sender_address: String,
    pub sender_place: String,
    pub company_id: String,
    pub email: String,
    pub customer_id: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub recipient_place: String,
    pub positions: Vec<LineItem>,  // 至少一条明细
}

impl Invoice {
    /// 规范文件名: 同一张发票的所有产物 (txt/xml/note/zip) 共用这个键
    pub fn canonical_file_name(&self) -> String {
        format!("{}_{}_invoice", self.sender_id, self.invoice_number)
    }
}

/// 发票明细行 (RechnPos)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub position: u32,
    pub description: String,
    pub quantity: u32,
    pub unit_price: BigDecimal,  // 两位小数
    pub line_total: BigDecimal,  // 两位小数, 记录声明值 (可能与数量×单价不符)
    pub tax_code: String,
}

impl LineItem {
    /// 税码展示标签: 取首个下划线之后的部分, 无下划线时整码展示
    pub fn tax_label(&self) -> &str {
        match self.tax_code.split_once('_') {
            Some((_, label)) => label,
            None => &self.tax_code,
        }
    }
}

/// 单张发票的两种输出文档 (共用规范文件名, 扩展名不同)
#[derive(Debug, Clone)]
pub struct RenderedInvoice {
    pub file_name: String,  // 规范文件名, 不含扩展名
    pub text: String,
    pub xml: String,
}
