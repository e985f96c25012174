use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ConfirmedMatch, Invoice, PendingMarker};

/// 确认判定策略
///
/// 回执里对同一发票可能出现 .txt 和 .xml 两条确认。历史实现的布尔
/// 判断写法有歧义, 因此两种读法都保留, 由配置选择; 待产品方定稿。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationPolicy {
    /// 任一文档被确认即视为处理完成 (默认)
    #[default]
    AnyDocument,
    /// 两种文档都必须被确认
    BothDocuments,
}

/// 确认对账服务
///
/// 每张发票的状态机: 已提交 -> 待确认 -> 已确认 (终态)。
/// 无匹配不是错误, 标记留到下一轮; 不存在过期终态。
pub struct CorrelationTracker {
    policy: ConfirmationPolicy,
}

impl CorrelationTracker {
    pub fn new(policy: ConfirmationPolicy) -> Self {
        Self { policy }
    }

    /// 渲染成功后立即登记待确认标记
    pub fn submit(&self, invoice: &Invoice, now: DateTime<Utc>) -> PendingMarker {
        PendingMarker::from_invoice(invoice, now)
    }

    /// 在合并后的回执文本里逐个核对待确认标记
    ///
    /// 回执行格式: 时间戳 + 两个空格 + 规范文件名.扩展名,
    /// 时间戳定宽补零, 字典序最大即最新。
    pub fn reconcile_confirmations(
        &self,
        confirmation_text: &str,
        pending: &[PendingMarker],
    ) -> Result<Vec<ConfirmedMatch>> {
        let mut confirmed = Vec::new();

        for marker in pending {
            let file_name = marker.canonical_file_name();
            let txt_matches = find_stamps(confirmation_text, &file_name, "txt")?;
            let xml_matches = find_stamps(confirmation_text, &file_name, "xml")?;

            let is_confirmed = match self.policy {
                ConfirmationPolicy::AnyDocument => {
                    !txt_matches.is_empty() || !xml_matches.is_empty()
                }
                ConfirmationPolicy::BothDocuments => {
                    !txt_matches.is_empty() && !xml_matches.is_empty()
                }
            };

            if !is_confirmed {
                tracing::info!(
                    "The invoice number {} has not yet been processed",
                    marker.invoice_number
                );
                continue;
            }

            let Some(latest_stamp) = txt_matches
                .iter()
                .chain(xml_matches.iter())
                .map(|(stamp, _)| stamp.clone())
                .max()
            else {
                continue;
            };

            let matched_lines = txt_matches
                .into_iter()
                .chain(xml_matches)
                .map(|(_, line)| line)
                .collect();

            confirmed.push(ConfirmedMatch {
                marker: marker.clone(),
                latest_stamp,
                matched_lines,
            });
        }

        Ok(confirmed)
    }
}

/// 搜索某个扩展名的确认条目, 返回 (时间戳, 整条匹配片段) 列表
fn find_stamps(text: &str, file_name: &str, extension: &str) -> Result<Vec<(String, String)>> {
    let pattern = format!(
        r"([0-9]+-[0-9]+)  {}\.{}",
        regex::escape(file_name),
        regex::escape(extension)
    );
    let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;

    Ok(regex
        .captures_iter(text)
        .filter_map(|caps| {
            let stamp = caps.get(1)?.as_str().to_string();
            let line = caps.get(0)?.as_str().to_string();
            Some((stamp, line))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn marker() -> PendingMarker {
        PendingMarker {
            invoice_number: "1001".to_string(),
            order_number: "A55".to_string(),
            sender_id: "K1200".to_string(),
            email: "billing@muster-ag.ch".to_string(),
            sender_name: "muster ag".to_string(),
            submitted_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn pending_marker_is_matched_by_its_confirmation_line() {
        let tracker = CorrelationTracker::new(ConfirmationPolicy::AnyDocument);
        let text = "20260807-143055  K1200_1001_invoice.txt\n20260807-143056  K1200_1001_invoice.xml\n";

        let confirmed = tracker.reconcile_confirmations(text, &[marker()]).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].latest_stamp, "20260807-143056");
        assert_eq!(confirmed[0].matched_lines.len(), 2);
    }

    #[test]
    fn unrelated_invoice_is_not_matched() {
        let tracker = CorrelationTracker::new(ConfirmationPolicy::AnyDocument);
        let text = "20260807-143055  K9999_7777_invoice.txt\n20260807-143056  K9999_7777_invoice.xml\n";

        let confirmed = tracker.reconcile_confirmations(text, &[marker()]).unwrap();
        assert!(confirmed.is_empty());
    }

    #[test]
    fn txt_only_confirms_under_any_document_policy() {
        let text = "20260807-143055  K1200_1001_invoice.txt\n";

        let any = CorrelationTracker::new(ConfirmationPolicy::AnyDocument);
        assert_eq!(any.reconcile_confirmations(text, &[marker()]).unwrap().len(), 1);

        let both = CorrelationTracker::new(ConfirmationPolicy::BothDocuments);
        assert!(both.reconcile_confirmations(text, &[marker()]).unwrap().is_empty());
    }

    #[test]
    fn both_documents_policy_confirms_when_both_extensions_present() {
        let tracker = CorrelationTracker::new(ConfirmationPolicy::BothDocuments);
        let text = "20260807-143055  K1200_1001_invoice.txt\n20260808-090000  K1200_1001_invoice.xml\n";

        let confirmed = tracker.reconcile_confirmations(text, &[marker()]).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].latest_stamp, "20260808-090000");
    }

    #[test]
    fn latest_stamp_wins_across_repeated_confirmations() {
        let tracker = CorrelationTracker::new(ConfirmationPolicy::AnyDocument);
        let text = "20260806-235959  K1200_1001_invoice.txt\n\
                    20260807-000001  K1200_1001_invoice.txt\n\
                    20260806-120000  K1200_1001_invoice.xml\n";

        let confirmed = tracker.reconcile_confirmations(text, &[marker()]).unwrap();
        assert_eq!(confirmed[0].latest_stamp, "20260807-000001");
    }

    #[test]
    fn single_space_separator_does_not_match() {
        let tracker = CorrelationTracker::new(ConfirmationPolicy::AnyDocument);
        let text = "20260807-143055 K1200_1001_invoice.txt\n";

        let confirmed = tracker.reconcile_confirmations(text, &[marker()]).unwrap();
        assert!(confirmed.is_empty());
    }

    #[test]
    fn submit_builds_marker_from_invoice_metadata() {
        let tracker = CorrelationTracker::new(ConfirmationPolicy::AnyDocument);
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let invoice = crate::models::Invoice {
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
            positions: Vec::new(),
        };

        let pending = tracker.submit(&invoice, now);
        assert_eq!(pending, marker());
    }
}
