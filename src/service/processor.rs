use std::path::PathBuf;

use chrono::{Local, NaiveDateTime, Utc};

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::RenderedInvoice;
use crate::service::extractor::InvoiceExtractor;
use crate::service::reconciler::reconcile;
use crate::service::renderer::TextRenderer;
use crate::service::structured::StructuredRenderer;
use crate::service::tracker::CorrelationTracker;
use crate::store::PendingStore;
use crate::transport::{DocumentSink, RecordSource};

/// 入站批次统计
#[derive(Debug, Clone, Default)]
pub struct ProcessStats {
    pub records_seen: usize,
    pub processed: usize,
    pub failed: usize,
    pub discrepancies: usize,
}

/// 入站发票批处理
///
/// 单条记录的错误只废弃该记录, 整批继续; 核心永不退出进程。
pub struct InvoiceProcessor {
    extractor: InvoiceExtractor,
    text_renderer: TextRenderer,
    structured_renderer: StructuredRenderer,
    tracker: CorrelationTracker,
    store: PendingStore,
    inbox: PathBuf,
    outbox: PathBuf,
}

impl InvoiceProcessor {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            extractor: InvoiceExtractor::new()?,
            text_renderer: TextRenderer::new(),
            structured_renderer: StructuredRenderer::new(&config.paths.template),
            tracker: CorrelationTracker::new(config.matching.confirmation_policy),
            store: PendingStore::new(&config.paths.pending),
            inbox: config.paths.inbox.clone(),
            outbox: config.paths.outbox.clone(),
        })
    }

    /// 处理一批入站记录: 提取 -> 对账 -> 渲染 -> 登记待确认
    pub async fn process_batch(
        &self,
        source: &dyn RecordSource,
        sink: &dyn DocumentSink,
    ) -> Result<ProcessStats> {
        let names = source.list().await?;
        let now = Local::now().naive_local();
        let mut stats = ProcessStats::default();

        tracing::info!("[Process] 批次开始, {} 条记录", names.len());

        for name in &names {
            stats.records_seen += 1;
            match self.process_record(name, source, sink, now).await {
                Ok(discrepancies) => {
                    stats.processed += 1;
                    stats.discrepancies += discrepancies;
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!("[Process] {}: 处理失败: {}", name, e);
                }
            }
        }

        tracing::info!(
            "[Process] 批次完成 - 处理: {}/{}, 失败: {}, 金额不符: {}",
            stats.processed,
            stats.records_seen,
            stats.failed,
            stats.discrepancies
        );
        Ok(stats)
    }

    async fn process_record(
        &self,
        name: &str,
        source: &dyn RecordSource,
        sink: &dyn DocumentSink,
        now: NaiveDateTime,
    ) -> Result<usize> {
        // Phase 1: 拉取原始记录并在本地暂存
        tracing::info!("[Process] Downloading {}", name);
        let raw = source.fetch(name).await?;
        tokio::fs::create_dir_all(&self.inbox).await?;
        let staged = self.inbox.join(name);
        tokio::fs::write(&staged, raw.as_bytes()).await?;

        // Phase 2: 提取 + 对账
        let invoice = self.extractor.extract(&raw, name)?;
        let outcome = reconcile(&invoice.positions);
        for discrepancy in &outcome.discrepancies {
            tracing::warn!("[Process] Discrepancy in {} detected: {}", name, discrepancy);
        }

        // Phase 3: 渲染两种文档 (互不依赖, 共用权威总额)
        let rendered = RenderedInvoice {
            file_name: invoice.canonical_file_name(),
            text: self.text_renderer.render(&invoice, &outcome.total, now.date()),
            xml: self.structured_renderer.render(&invoice, &outcome.total, now)?,
        };

        // Phase 4: 本地留存 + 投递支付系统
        let txt_name = format!("{}.txt", rendered.file_name);
        let xml_name = format!("{}.xml", rendered.file_name);
        tokio::fs::create_dir_all(&self.outbox).await?;
        tokio::fs::write(self.outbox.join(&txt_name), rendered.text.as_bytes()).await?;
        tokio::fs::write(self.outbox.join(&xml_name), rendered.xml.as_bytes()).await?;
        sink.put(&txt_name, rendered.text.as_bytes()).await?;
        sink.put(&xml_name, rendered.xml.as_bytes()).await?;

        // Phase 5: 登记待确认标记, 移除已消费记录与暂存副本
        let marker = self.tracker.submit(&invoice, Utc::now());
        self.store.save(&marker).await?;
        source.remove(name).await?;
        tokio::fs::remove_file(&staged).await?;

        tracing::info!("[Process] {}: 完成, 产物 {}.txt/.xml", name, rendered.file_name);
        Ok(outcome.discrepancies.len())
    }
}
