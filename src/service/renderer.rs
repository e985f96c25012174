use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};

use crate::models::{Invoice, LineItem};

/// 固定版式里所有日期的展示格式
const DATE_FORMAT: &str = "%d.%m.%Y";

/// 明细区之后用于撑满信纸版面的换行基数
const FILLER_LINES: usize = 18;

/// 纯文本账单渲染器
///
/// 定宽列版式: 描述补齐 37 列, 单价 10 列, 行合计 11 列;
/// 版式为外部约定, 逐字节固定, 列宽与空白都不可调。
pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 渲染文本账单; 同一组 (发票, 总额, 日期) 输入的输出逐字节一致
    pub fn render(&self, invoice: &Invoice, total: &BigDecimal, today: NaiveDate) -> String {
        let mut positions_block = String::new();
        for item in &invoice.positions {
            positions_block.push_str(&position_line(item));
            positions_block.push('\n');
        }

        let total_str = format_amount(total);
        let total_spaced = letter_spaced(&total_str);
        let today_str = today.format(DATE_FORMAT).to_string();
        let goal_date = today + Duration::days(i64::from(invoice.payment_goal_days));
        let payment_goal = format!(
            "{:02} Tage ({})",
            invoice.payment_goal_days,
            goal_date.format(DATE_FORMAT)
        );
        let filler = "\n".repeat(FILLER_LINES.saturating_sub(invoice.positions.len()));

        let mut out = String::new();
        out.push_str("\n\n\n\n");
        out.push_str(&invoice.sender_name);
        out.push('\n');
        out.push_str(&invoice.sender_address);
        out.push('\n');
        out.push_str(&invoice.sender_place);
        out.push_str("\n\n");
        out.push_str(&invoice.company_id);
        out.push_str("\n\n\n\n\n");
        out.push_str(&format!(
            "Uster, den {today_str}                            {}\n",
            invoice.recipient_name
        ));
        out.push_str(&format!("                                                 {}\n", invoice.recipient_address));
        out.push_str(&format!("                                                 {}\n\n", invoice.recipient_place));
        out.push_str(&format!("Kundennummer:      {}\n", invoice.sender_id));
        out.push_str(&format!("Auftragsnummer:    {}\n\n", invoice.order_number));
        out.push_str(&format!("Rechnung Nr       {}\n", invoice.invoice_number));
        out.push_str("-----------------------\n");
        out.push_str(&positions_block);
        out.push_str("                                                              -----------\n");
        out.push_str(&format!("                                                Total CHF         {total_str}\n\n"));
        out.push_str("                                                MWST  CHF            0.00\n");
        out.push_str(&filler);
        out.push_str(&format!(
            "Zahlungsziel ohne Abzug {payment_goal}\n\nEinzahlungsschein\n\n\n\n\n\n\n\n\n\n\n\n"
        ));
        out.push_str(&format!(
            "    {total_spaced}                    {total_spaced}     {}\n",
            invoice.recipient_name
        ));
        out.push_str(&format!("                                               {}\n", invoice.recipient_address));
        out.push_str(&format!(
            "0 00000 00000 00000                            {}\n\n",
            invoice.recipient_place
        ));
        out.push_str(&invoice.recipient_name);
        out.push('\n');
        out.push_str(&invoice.recipient_address);
        out.push('\n');
        out.push_str(&invoice.recipient_place);
        out
    }
}

/// 单条明细的定宽行
fn position_line(item: &LineItem) -> String {
    let unit_price = format_amount(&item.unit_price);
    let line_total = format_amount(&item.line_total);
    format!(
        "  {}   {} {}{} {}{}  CHF {}{}  {}",
        item.position,
        item.description,
        pad(37, &item.description),
        item.quantity,
        pad(10, &unit_price),
        unit_price,
        pad(11, &line_total),
        line_total,
        item.tax_label(),
    )
}

/// 金额统一输出两位小数
pub(crate) fn format_amount(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

/// 支付凭条扫描用的间隔写法: "36.50" -> "36 . 50"
fn letter_spaced(amount: &str) -> String {
    match amount.split_once('.') {
        Some((integer, fraction)) => format!("{integer} . {fraction}"),
        None => amount.to_string(),
    }
}

fn pad(width: usize, value: &str) -> String {
    " ".repeat(width.saturating_sub(value.chars().count()))
}
