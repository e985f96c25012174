use std::path::PathBuf;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};
use crate::models::Invoice;

/// 支付系统要求的 XML 声明头
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// 结构化文档渲染器 (支付系统 XML)
///
/// 模板是外部下发的固定骨架; 每次渲染重新读取模板并按命名槽位填充,
/// 模板缺失只影响当前记录的结构化输出, 由调用方按记录粒度处理。
pub struct StructuredRenderer {
    template_path: PathBuf,
}

impl StructuredRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    pub fn render(&self, invoice: &Invoice, total: &BigDecimal, now: NaiveDateTime) -> Result<String> {
        let mut document = self.load_template()?;

        let date = now.format("%Y%m%d").to_string();
        let goal_date = now.date() + Duration::days(i64::from(invoice.payment_goal_days));

        // 交换段: 发送方编号 + 终端客户编号
        document.interchange.sender.id = invoice.sender_number.clone();
        document.interchange.receiver.id = invoice.customer_id.clone();

        // 文档头: 消息时间戳与各单据引用
        let header = &mut document.document.header;
        header.message.reference = now.format("%Y%m%d%H%M%S").to_string();
        header.message.date = date.clone();
        header.processing.date = date.clone();
        header.references.invoice.number = invoice.invoice_number.clone();
        header.references.invoice.date = date.clone();
        header.references.order.number = invoice.order_number.clone();
        header.references.order.date = date.clone();
        header.references.delivery.date = date;

        // 开票方段
        header.seller.company_id = invoice.company_id.clone();
        header.seller.party_id.id = invoice.sender_number.clone();
        header.seller.address.name = invoice.sender_name.clone();
        header.seller.address.street = invoice.sender_address.clone();
        header.seller.address.place = invoice.sender_place.clone();

        // 付款方段 (地址槽位按既有映射填开票方地址)
        header.buyer.party_id.id = invoice.customer_id.clone();
        header.buyer.address.name = invoice.sender_name.clone();
        header.buyer.address.street = invoice.sender_address.clone();
        header.buyer.address.place = invoice.sender_place.clone();

        // 汇总段: 总额以最小货币单位 (分) 表达, 定宽十位补零
        let summary = &mut document.document.summary;
        summary.total_amount.value = format!("{:010}", total_cents(total));
        summary.payment_terms.goal.days = format!("{:02}", invoice.payment_goal_days);
        summary.payment_terms.goal.date = goal_date.format("%d.%m.%Y").to_string();

        let body = quick_xml::se::to_string(&document)?;
        Ok(format!("{XML_DECLARATION}{body}"))
    }

    fn load_template(&self) -> Result<PaymentInvoiceDocument> {
        let xml = std::fs::read_to_string(&self.template_path).map_err(|source| {
            ExchangeError::TemplateUnavailable {
                path: self.template_path.clone(),
                source,
            }
        })?;
        Ok(quick_xml::de::from_str(&xml)?)
    }
}

/// 两位小数的金额换算成整数分
fn total_cents(total: &BigDecimal) -> i64 {
    (total.round(2) * BigDecimal::from(100))
        .with_scale(0)
        .to_i64()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// 支付系统文档骨架 (外部固定 schema, 命名槽位)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "paymentInvoice", rename_all = "camelCase")]
pub struct PaymentInvoiceDocument {
    pub interchange: Interchange,
    pub document: Document,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interchange {
    pub sender: Party,
    pub receiver: Party,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub header: Header,
    pub summary: Summary,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub message: Message,
    pub processing: Processing,
    pub references: References,
    pub seller: Seller,
    pub buyer: Buyer,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub reference: String,
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processing {
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct References {
    pub invoice: DocumentReference,
    pub order: DocumentReference,
    pub delivery: DocumentReference,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub number: String,
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub company_id: String,
    pub party_id: Party,
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub party_id: Party,
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub street: String,
    pub place: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_amount: Amount,
    pub payment_terms: PaymentTerms,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    pub goal: PaymentGoal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGoal {
    pub days: String,
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use chrono::{NaiveDate, NaiveTime};
    use std::str::FromStr;

    const TEMPLATE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/xml_invoice_template.xml");

    fn sample_invoice() -> Invoice {
        Invoice {
            invoice_number: "1001".to_string(),
            order_number: "A55".to_string(),
            generation_place: "uster".to_string(),
            generation_date: "07.08.2026".to_string(),
            generation_time: "14:30:55".to_string(),
            payment_goal_days: 30,
            sender_number: "4400".to_string(),
            sender_id: "K1200".to_string(),
            sender_name: "muster ag".to_string(),
            sender_address: "bahnhofstrasse 1".to_string(),
            sender_place: "8610 uster".to_string(),
            company_id: "che-123.456.789 mwst".to_string(),
            email: "billing@muster-ag.ch".to_string(),
            customer_id: "7001".to_string(),
            recipient_name: "hans meier".to_string(),
            recipient_address: "seestrasse 12".to_string(),
            recipient_place: "8610 uster".to_string(),
            positions: vec![LineItem {
                position: 1,
                description: "widget".to_string(),
                quantity: 2,
                unit_price: BigDecimal::from_str("10.00").unwrap(),
                line_total: BigDecimal::from_str("20.00").unwrap(),
                tax_code: "mwst_x".to_string(),
            }],
        }
    }

    fn sample_now() -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            NaiveTime::from_hms_opt(14, 30, 55).unwrap(),
        )
    }

    #[test]
    fn fills_all_named_slots() {
        let renderer = StructuredRenderer::new(TEMPLATE);
        let total = BigDecimal::from_str("20.00").unwrap();

        let xml = renderer.render(&sample_invoice(), &total, sample_now()).unwrap();
        let parsed: PaymentInvoiceDocument = quick_xml::de::from_str(&xml).unwrap();

        assert_eq!(parsed.interchange.sender.id, "4400");
        assert_eq!(parsed.interchange.receiver.id, "7001");
        assert_eq!(parsed.document.header.message.reference, "20260807143055");
        assert_eq!(parsed.document.header.message.date, "20260807");
        assert_eq!(parsed.document.header.processing.date, "20260807");
        assert_eq!(parsed.document.header.references.invoice.number, "1001");
        assert_eq!(parsed.document.header.references.order.number, "A55");
        assert_eq!(parsed.document.header.references.delivery.date, "20260807");
        assert_eq!(parsed.document.header.seller.company_id, "che-123.456.789 mwst");
        assert_eq!(parsed.document.header.seller.party_id.id, "4400");
        assert_eq!(parsed.document.header.seller.address.name, "muster ag");
        assert_eq!(parsed.document.header.buyer.party_id.id, "7001");
        assert_eq!(parsed.document.header.buyer.address.street, "bahnhofstrasse 1");
        assert_eq!(parsed.document.summary.total_amount.value, "0000002000");
        assert_eq!(parsed.document.summary.payment_terms.goal.days, "30");
        assert_eq!(parsed.document.summary.payment_terms.goal.date, "06.09.2026");
    }

    #[test]
    fn total_is_expressed_as_zero_padded_cents() {
        let renderer = StructuredRenderer::new(TEMPLATE);
        let total = BigDecimal::from_str("36.50").unwrap();

        let xml = renderer.render(&sample_invoice(), &total, sample_now()).unwrap();
        assert!(xml.contains("<value>0000003650</value>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = StructuredRenderer::new(TEMPLATE);
        let total = BigDecimal::from_str("20.00").unwrap();

        let first = renderer.render(&sample_invoice(), &total, sample_now()).unwrap();
        let second = renderer.render(&sample_invoice(), &total, sample_now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_template_is_reported_as_unavailable() {
        let renderer = StructuredRenderer::new("no/such/template.xml");
        let total = BigDecimal::from_str("20.00").unwrap();

        let err = renderer.render(&sample_invoice(), &total, sample_now()).unwrap_err();
        assert!(matches!(err, ExchangeError::TemplateUnavailable { .. }));
    }
}
