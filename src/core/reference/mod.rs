//! 参考指纹库：会话开始时一次性加载，之后只读，可在多个会话间共享

pub mod builder;
mod error;

pub use builder::{build_reference_records, fingerprint_card_image, CardImage};
pub use error::ReferenceError;

use crate::card_scanner::hasher::Fingerprint;
use log::info;
use serde::{Deserialize, Serialize};

/// hashes.json 中的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub id: String,
    pub fingerprint: Fingerprint,
}

/// 有序的参考库。id 不要求唯一，同 id 的多条记录是彼此独立的候选
#[derive(Debug, Clone)]
pub struct ReferenceDb {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceDb {
    /// 校验并构建。空库或任一条目非法都直接失败，不做部分加载
    pub fn from_records(records: Vec<ReferenceRecord>) -> Result<Self, ReferenceError> {
        if records.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let entries = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                if record.id.trim().is_empty() {
                    return Err(ReferenceError::EmptyId { index });
                }
                let fingerprint = Fingerprint::from_hex(&record.hash).ok_or_else(|| {
                    ReferenceError::MalformedHash {
                        index,
                        id: record.id.clone(),
                        hash: record.hash.clone(),
                    }
                })?;
                Ok(ReferenceEntry {
                    id: record.id,
                    fingerprint,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("📚 Reference database loaded: {} cards", entries.len());
        Ok(Self { entries })
    }

    /// 解析 `[{"id": "...", "hash": "..."}]`
    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        let records: Vec<ReferenceRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
