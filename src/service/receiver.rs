use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;

use crate::config::{AppConfig, ReplyConfig};
use crate::error::Result;
use crate::models::{ConfirmedMatch, PendingMarker};
use crate::service::bundle::build_reply_archive;
use crate::service::tracker::CorrelationTracker;
use crate::store::PendingStore;
use crate::transport::{ConfirmationSource, ReplyPackage, ReplySink};

/// 确认批次统计
#[derive(Debug, Clone, Default)]
pub struct ReceiveStats {
    pub receipts_fetched: usize,
    pub pending_total: usize,
    pub confirmed: usize,
    pub still_pending: usize,
    /// 最老的仍在等待的标记年龄 (天), 仅观测; 不触发过期
    pub oldest_pending_age_days: Option<i64>,
}

/// 确认回执批处理
pub struct ConfirmationReceiver {
    tracker: CorrelationTracker,
    store: PendingStore,
    outbox: PathBuf,
    reply: ReplyConfig,
}

impl ConfirmationReceiver {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            tracker: CorrelationTracker::new(config.matching.confirmation_policy),
            store: PendingStore::new(&config.paths.pending),
            outbox: config.paths.outbox.clone(),
            reply: config.reply.clone(),
        }
    }

    /// 处理一批确认回执: 匹配待确认 -> 打包回复 -> 清除标记
    pub async fn receive_batch(
        &self,
        source: &dyn ConfirmationSource,
        sink: &dyn ReplySink,
    ) -> Result<ReceiveStats> {
        let mut stats = ReceiveStats::default();

        // Phase 1: 拉取全部回执, 按文件名顺序拼接后再统一搜索
        let names = source.list().await?;
        let mut combined = String::new();
        for name in &names {
            combined.push_str(&source.fetch(name).await?);
            source.remove(name).await?;
        }
        stats.receipts_fetched = names.len();

        // Phase 2: 加载待确认标记并匹配
        let pending_map = self.store.list().await?;
        let pending: Vec<PendingMarker> = pending_map.values().cloned().collect();
        stats.pending_total = pending.len();

        let matches = self.tracker.reconcile_confirmations(&combined, &pending)?;

        // Phase 3: 逐个打包回复并删除标记
        for confirmed in &matches {
            tracing::info!(
                "The invoice number {} has been processed, sending confirmation",
                confirmed.marker.invoice_number
            );
            self.dispatch_reply(confirmed, sink).await?;
            self.store
                .remove(&confirmed.marker.canonical_file_name())
                .await?;
        }
        stats.confirmed = matches.len();

        // Phase 4: 统计仍在等待的标记 (年龄仅观测)
        let confirmed_keys: HashSet<String> = matches
            .iter()
            .map(|m| m.marker.canonical_file_name())
            .collect();
        let now = Utc::now();
        let mut oldest: Option<i64> = None;
        for marker in &pending {
            if confirmed_keys.contains(&marker.canonical_file_name()) {
                continue;
            }
            stats.still_pending += 1;
            let age = marker.age_days(now);
            if oldest.map_or(true, |o| age > o) {
                oldest = Some(age);
            }
        }
        stats.oldest_pending_age_days = oldest;

        tracing::info!(
            "[Receive] 批次完成 - 回执: {}, 确认: {}/{}, 仍待确认: {} (最老 {:?} 天)",
            stats.receipts_fetched,
            stats.confirmed,
            stats.pending_total,
            stats.still_pending,
            stats.oldest_pending_age_days
        );
        Ok(stats)
    }

    async fn dispatch_reply(&self, confirmed: &ConfirmedMatch, sink: &dyn ReplySink) -> Result<()> {
        let file_name = confirmed.marker.canonical_file_name();
        let txt_name = format!("{file_name}.txt");
        let xml_name = format!("{file_name}.xml");
        let txt_path = self.outbox.join(&txt_name);
        let xml_path = self.outbox.join(&xml_name);

        // 两份渲染产物加上命中的回执片段进同一个包
        let text = tokio::fs::read(&txt_path).await?;
        let xml = tokio::fs::read(&xml_path).await?;
        let receipt_slice = confirmed.matched_lines.join("\n");
        let archive = build_reply_archive(&[
            (txt_name, text),
            (xml_name, xml),
            (format!("{file_name}_receipt.txt"), receipt_slice.into_bytes()),
        ])?;

        // 打包完成后本地产物不再需要
        tokio::fs::remove_file(&txt_path).await?;
        tokio::fs::remove_file(&xml_path).await?;

        let reply = ReplyPackage {
            recipient_email: confirmed.marker.email.clone(),
            recipient_name: confirmed.marker.sender_name.clone(),
            subject: format!(
                "Erfolgte Verarbeitung Rechnung {}",
                confirmed.marker.invoice_number
            ),
            body: self.reply_body(confirmed),
            archive_name: format!("{file_name}.zip"),
            archive,
        };
        sink.deliver(&reply).await
    }

    fn reply_body(&self, confirmed: &ConfirmedMatch) -> String {
        format!(
            "Sehr geehrte/r {}\n\nAm {} wurde die erfolgreiche Bearbeitung der Rechnung {} \
             vom Zahlungssystem \"{}\" gemeldet.\n\nMit freundlichen Grüssen\n\n{}\n{}",
            confirmed.marker.sender_name,
            humanize_stamp(&confirmed.latest_stamp),
            confirmed.marker.invoice_number,
            self.reply.payment_system,
            self.reply.sender_name,
            self.reply.company_name
        )
    }
}

/// 回执时间戳 "YYYYMMDD-HHMMSS" 转为可读形式 "DD.MM.YYYY um HH:MM:SS"
///
/// 形状不符时原样返回, 不让一条畸形回执影响回复发送。
fn humanize_stamp(stamp: &str) -> String {
    let Some((date, time)) = stamp.split_once('-') else {
        return stamp.to_string();
    };
    match (
        date.get(0..4),
        date.get(4..6),
        date.get(6..8),
        time.get(0..2),
        time.get(2..4),
        time.get(4..6),
    ) {
        (Some(year), Some(month), Some(day), Some(hour), Some(minute), Some(second)) => {
            format!("{day}.{month}.{year} um {hour}:{minute}:{second}")
        }
        _ => stamp.to_string(),
    }
}
