use std::str::FromStr;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

use crate::error::{ExchangeError, Result};
use crate::models::{Invoice, LineItem};

/// 明细内部的值分隔符
const POSITION_VALUE_SEPARATOR: char = ';';

/// 单条字段提取规则: 字段名 + 模式 + 是否必填
///
/// 模式中的 \u00F0-\u02AF 是线上格式的字面字节段 (带重音的拉丁字母),
/// 属于记录格式本身, 不能换成通用的大小写折叠。
struct FieldRule {
    /// 结构化字段键
    key: &'static str,
    /// 错误信息中使用的字段名
    name: &'static str,
    regex: Regex,
    required: bool,
}

/// 记录提取服务
///
/// 纯函数式: 输入原始文本, 输出完整 Invoice 或错误, 不做任何 I/O。
/// 任何必填字段缺失都会废弃整条记录, 绝不返回部分结果。
pub struct InvoiceExtractor {
    rules: Vec<FieldRule>,
    positions: Regex,
}

fn pattern(source: &str) -> std::result::Result<Regex, regex::Error> {
    // 记录格式大小写不敏感
    RegexBuilder::new(source).case_insensitive(true).build()
}

impl InvoiceExtractor {
    pub fn new() -> Result<Self> {
        let mut rules = Vec::new();
        let mut rule = |key, name, source: &str| -> Result<()> {
            rules.push(FieldRule {
                key,
                name,
                regex: pattern(source)?,
                required: true,
            });
            Ok(())
        };

        // 第一行: 发票头
        rule("invoice_number", "Invoice Number", r"Rechnung_([0-9]+);")?;
        rule("order_number", "Order Number", r"Auftrag_(A[0-9]+);")?;
        rule(
            "generation_place",
            "Generation Place",
            r"[a-z_0-9]+;[a-z_0-9]+;([a-z\u00F0-\u02AF]+);",
        )?;
        rule(
            "generation_date",
            "Generation Date",
            r"[a-z_0-9]+;[a-z_0-9]+;[\[a-z\u00F0-\u02AF]+;(\d\d\.\d\d\.\d\d\d\d);",
        )?;
        rule(
            "generation_time",
            "Generation Time",
            r"[a-z_0-9]+;[a-z_0-9]+;[\[a-z\u00F0-\u02AF]+;\d\d\.\d\d\.\d\d\d\d;(\d\d:\d\d:\d\d);",
        )?;
        rule("payment_goal", "Payment Date", r";ZahlungszielInTagen_(\d\d)")?;

        // 第二行: 发送方 (Herkunft)
        rule("sender_number", "Sender Number", r"Herkunft;([0-9]+);")?;
        rule("sender_id", "Sender ID", r"Herkunft;[0-9]+;(K[0-9]+);")?;
        rule(
            "sender_name",
            "Sender Name",
            r"Herkunft;[0-9]+;[a-z0-9]+;([a-z &\u00F0-\u02AF]+);",
        )?;
        rule(
            "sender_address",
            "Sender Address",
            r"Herkunft;[0-9]+;[a-z0-9]+;[a-z äöü]+;([a-z &\-\u00F0-\u02AF0-9]+);",
        )?;
        rule(
            "sender_place",
            "Sender Place",
            r"Herkunft;[0-9]+;[a-z0-9]+;[a-z äöü]+;[a-z &\-\u00F0-\u02AF0-9]+;([a-z \u00F0-\u02AF0-9]+);",
        )?;
        rule(
            "company_id",
            "Company ID",
            r"Herkunft;[0-9]+;[a-z0-9]+;[a-z äöü]+;[a-z &\-\u00F0-\u02AF0-9]+;[a-z \u00F0-\u02AF0-9]+;([a-z\-0-9\. ]+);",
        )?;
        rule(
            "email",
            "Email",
            r";([a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+)",
        )?;

        // 第三行: 收件方 (Endkunde)
        rule("customer_id", "Customer ID", r"Endkunde;([0-9]+);")?;
        rule(
            "recipient_name",
            "Recipient Name",
            r"Endkunde;[0-9]+;([a-z0-9 \u00F0-\u02AF]+);",
        )?;
        rule(
            "recipient_address",
            "Recipient Address",
            r"Endkunde;[0-9]+;[a-z0-9 \u00F0-\u02AF]+;([a-z0-9 \u00F0-\u02AF]+);",
        )?;
        rule(
            "recipient_place",
            "Recipient Place",
            r"Endkunde;[0-9]+;[a-z0-9 \u00F0-\u02AF]+;[a-z0-9 \u00F0-\u02AF]+;([a-z0-9 \u00F0-\u02AF]+)",
        )?;

        // 发票明细 (RechnPos), 重复组: 序号;描述;数量;单价;合计;税码
        let positions = pattern(
            r"RechnPos;([1-9][0-9]?;[a-z0-9\- &\u00F0-\u02AF]+;[1-9][0-9]?;[1-9][0-9]*\.[0-9]{2};[1-9][0-9]*\.[0-9]{2};[a-z0-9\-._% &\u00F0-\u02AF]+)",
        )?;

        Ok(Self { rules, positions })
    }

    /// 提取一条原始记录, record 为来源标识 (用于错误定位)
    pub fn extract(&self, raw: &str, record: &str) -> Result<Invoice> {
        let mut values: IndexMap<&'static str, String> = IndexMap::new();

        for rule in &self.rules {
            match rule.regex.captures(raw).and_then(|caps| caps.get(1)) {
                Some(found) => {
                    values.insert(rule.key, found.as_str().to_string());
                }
                None if rule.required => {
                    return Err(ExchangeError::MissingField {
                        field: rule.name,
                        record: record.to_string(),
                    });
                }
                None => {}
            }
        }

        let positions = self.extract_positions(raw, record)?;

        build_invoice(values, positions, record)
    }

    fn extract_positions(&self, raw: &str, record: &str) -> Result<Vec<LineItem>> {
        let mut items = Vec::new();
        for caps in self.positions.captures_iter(raw) {
            let Some(found) = caps.get(1) else { continue };
            items.push(parse_position(found.as_str(), record)?);
        }

        if items.is_empty() {
            return Err(ExchangeError::NoPositions {
                record: record.to_string(),
            });
        }
        Ok(items)
    }
}

fn parse_position(value: &str, record: &str) -> Result<LineItem> {
    let parts: Vec<&str> = value.split(POSITION_VALUE_SEPARATOR).collect();
    if parts.len() != 6 {
        return Err(ExchangeError::InvalidField {
            field: "Invoice Position",
            record: record.to_string(),
            value: value.to_string(),
        });
    }

    Ok(LineItem {
        position: parse_u32(parts[0], "Position Index", record)?,
        description: parts[1].to_string(),
        quantity: parse_u32(parts[2], "Position Quantity", record)?,
        unit_price: parse_amount(parts[3], "Position Unit Price", record)?,
        line_total: parse_amount(parts[4], "Position Total", record)?,
        tax_code: parts[5].to_string(),
    })
}

fn parse_u32(value: &str, field: &'static str, record: &str) -> Result<u32> {
    value.parse().map_err(|_| ExchangeError::InvalidField {
        field,
        record: record.to_string(),
        value: value.to_string(),
    })
}

fn parse_amount(value: &str, field: &'static str, record: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(value).map_err(|_| ExchangeError::InvalidField {
        field,
        record: record.to_string(),
        value: value.to_string(),
    })
}

fn build_invoice(
    mut values: IndexMap<&'static str, String>,
    positions: Vec<LineItem>,
    record: &str,
) -> Result<Invoice> {
    let mut take = |key: &'static str, name: &'static str| -> Result<String> {
        values
            .shift_remove(key)
            .ok_or_else(|| ExchangeError::MissingField {
                field: name,
                record: record.to_string(),
            })
    };

    let payment_goal = take("payment_goal", "Payment Date")?;

    Ok(Invoice {
        invoice_number: take("invoice_number", "Invoice Number")?,
        order_number: take("order_number", "Order Number")?,
        generation_place: take("generation_place", "Generation Place")?,
        generation_date: take("generation_date", "Generation Date")?,
        generation_time: take("generation_time", "Generation Time")?,
        payment_goal_days: parse_u32(&payment_goal, "Payment Date", record)?,
        sender_number: take("sender_number", "Sender Number")?,
        sender_id: take("sender_id", "Sender ID")?,
        sender_name: take("sender_name", "Sender Name")?,
        sender_address: take("sender_address", "Sender Address")?,
        sender_place: take("sender_place", "Sender Place")?,
        company_id: take("company_id", "Company ID")?,
        email: take("email", "Email")?,
        customer_id: take("customer_id", "Customer ID")?,
        recipient_name: take("recipient_name", "Recipient Name")?,
        recipient_address: take("recipient_address", "Recipient Address")?,
        recipient_place: take("recipient_place", "Recipient Place")?,
        positions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RECORD: &str = "\
Rechnung_1001;Auftrag_A55;uster;07.08.2026;14:30:55;ZahlungszielInTagen_30;
Herkunft;4400;K1200;muster ag;bahnhofstrasse 1;8610 uster;che-123.456.789 mwst;billing@muster-ag.ch;
Endkunde;7001;hans meier;seestrasse 12;8610 uster;
RechnPos;1;widget;2;10.00;20.00;mwst_x;
RechnPos;2;gadget deluxe;3;5.50;16.50;mwst_y;
";

    fn extractor() -> InvoiceExtractor {
        InvoiceExtractor::new().unwrap()
    }

    #[test]
    fn extracts_complete_invoice_from_well_formed_record() {
        let invoice = extractor().extract(SAMPLE_RECORD, "sample.data").unwrap();

        assert_eq!(invoice.invoice_number, "1001");
        assert_eq!(invoice.order_number, "A55");
        assert_eq!(invoice.generation_place, "uster");
        assert_eq!(invoice.generation_date, "07.08.2026");
        assert_eq!(invoice.generation_time, "14:30:55");
        assert_eq!(invoice.payment_goal_days, 30);
        assert_eq!(invoice.sender_number, "4400");
        assert_eq!(invoice.sender_id, "K1200");
        assert_eq!(invoice.sender_name, "muster ag");
        assert_eq!(invoice.sender_address, "bahnhofstrasse 1");
        assert_eq!(invoice.sender_place, "8610 uster");
        assert_eq!(invoice.company_id, "che-123.456.789 mwst");
        assert_eq!(invoice.email, "billing@muster-ag.ch");
        assert_eq!(invoice.customer_id, "7001");
        assert_eq!(invoice.recipient_name, "hans meier");
        assert_eq!(invoice.recipient_address, "seestrasse 12");
        assert_eq!(invoice.recipient_place, "8610 uster");
        assert_eq!(invoice.canonical_file_name(), "K1200_1001_invoice");

        assert_eq!(invoice.positions.len(), 2);
        let first = &invoice.positions[0];
        assert_eq!(first.position, 1);
        assert_eq!(first.description, "widget");
        assert_eq!(first.quantity, 2);
        assert_eq!(first.unit_price, BigDecimal::from_str("10.00").unwrap());
        assert_eq!(first.line_total, BigDecimal::from_str("20.00").unwrap());
        assert_eq!(first.tax_code, "mwst_x");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let upper = SAMPLE_RECORD.to_uppercase();
        let invoice = extractor().extract(&upper, "upper.data").unwrap();
        assert_eq!(invoice.invoice_number, "1001");
        assert_eq!(invoice.sender_id, "K1200");
    }

    #[test]
    fn accented_letters_in_literal_range_are_accepted() {
        let record = SAMPLE_RECORD.replace("hans meier", "jörg müller");
        let invoice = extractor().extract(&record, "umlaut.data").unwrap();
        assert_eq!(invoice.recipient_name, "jörg müller");
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let record = SAMPLE_RECORD.replace(";ZahlungszielInTagen_30", "");
        let err = extractor().extract(&record, "broken.data").unwrap_err();
        match err {
            ExchangeError::MissingField { field, record } => {
                assert_eq!(field, "Payment Date");
                assert_eq!(record, "broken.data");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn each_missing_identifier_invalidates_the_record() {
        for (needle, field) in [
            ("Rechnung_1001;", "Invoice Number"),
            ("Auftrag_A55;", "Order Number"),
            ("billing@muster-ag.ch;", "Email"),
        ] {
            let record = SAMPLE_RECORD.replace(needle, ";");
            let err = extractor().extract(&record, "broken.data").unwrap_err();
            match err {
                ExchangeError::MissingField { field: found, .. } => assert_eq!(found, field),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn record_without_positions_is_rejected() {
        let record: String = SAMPLE_RECORD
            .lines()
            .filter(|line| !line.starts_with("RechnPos"))
            .map(|line| format!("{line}\n"))
            .collect();
        let err = extractor().extract(&record, "empty.data").unwrap_err();
        assert!(matches!(err, ExchangeError::NoPositions { .. }));
    }
}
