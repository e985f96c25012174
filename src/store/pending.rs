use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::Result;
use crate::models::PendingMarker;

/// 标记文件后缀 (规范文件名以 _invoice 结尾, 落盘加 .note)
const NOTE_SUFFIX: &str = "_invoice.note";

/// 待确认标记存储
///
/// 每个标记一个 JSON 文件, 键即规范文件名; 写入即持久,
/// 进程重启后依然可见 (crash-after-write 安全)。
pub struct PendingStore {
    dir: PathBuf,
}

impl PendingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 落盘一个标记, 幂等覆盖
    pub async fn save(&self, marker: &PendingMarker) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.note_path(&marker.canonical_file_name());
        let json = serde_json::to_vec_pretty(marker)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!("[Store] 标记已落盘: {:?}", path);
        Ok(())
    }

    /// 按文件名顺序列出全部标记, 键为规范文件名
    ///
    /// 目录不存在视为空; 无法解析的标记文件跳过并告警, 留待人工处理。
    pub async fn list(&self) -> Result<IndexMap<String, PendingMarker>> {
        let mut markers = IndexMap::new();
        if !self.dir.exists() {
            return Ok(markers);
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(NOTE_SUFFIX) {
                names.push(name);
            }
        }
        names.sort();

        for name in names {
            let path = self.dir.join(&name);
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<PendingMarker>(&bytes) {
                Ok(marker) => {
                    markers.insert(marker.canonical_file_name(), marker);
                }
                Err(e) => {
                    tracing::warn!("[Store] 标记文件无法解析, 跳过 {:?}: {}", path, e);
                }
            }
        }

        Ok(markers)
    }

    /// 确认完成后删除标记 (只有确认对账流程调用)
    pub async fn remove(&self, canonical_file_name: &str) -> Result<()> {
        let path = self.note_path(canonical_file_name);
        tokio::fs::remove_file(&path).await?;
        tracing::debug!("[Store] 标记已删除: {:?}", path);
        Ok(())
    }

    fn note_path(&self, canonical_file_name: &str) -> PathBuf {
        self.dir.join(format!("{canonical_file_name}.note"))
    }
}
