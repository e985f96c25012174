use std::path::PathBuf;

use clap::{Parser, Subcommand};
use invoice_exchange_rust::transport::LocalDirTransport;
use invoice_exchange_rust::{AppConfig, ConfirmationReceiver, InvoiceProcessor};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

/// 发票交换与确认对账批处理
#[derive(Parser)]
#[command(name = "invoice-exchange-rust", version)]
struct Cli {
    /// 配置文件路径 (缺省时读取工作目录下的 invoice_exchange.toml)
    #[arg(short, long, env = "INVOICE_EXCHANGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 处理一批入站发票记录 (提取 -> 对账 -> 渲染 -> 登记待确认)
    Process,
    /// 处理一批确认回执 (匹配待确认 -> 打包回复 -> 清除标记)
    Receive,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    info!("Starting with config: {:?}", config);

    let transport = LocalDirTransport::new(&config.endpoints);

    match cli.command {
        Command::Process => {
            let processor = InvoiceProcessor::new(&config)?;
            let stats = processor.process_batch(&transport, &transport).await?;
            info!(
                "Finished - processed {}/{} records ({} failed, {} discrepancies)",
                stats.processed, stats.records_seen, stats.failed, stats.discrepancies
            );
        }
        Command::Receive => {
            let receiver = ConfirmationReceiver::new(&config);
            let stats = receiver.receive_batch(&transport, &transport).await?;
            info!(
                "Finished - confirmed {}/{} pending invoices, {} still pending",
                stats.confirmed, stats.pending_total, stats.still_pending
            );
        }
    }

    Ok(())
}
