//! 最近邻匹配：对参考库逐条计算汉明距离，维护有界的 top-K 列表

use super::hasher::Fingerprint;
use crate::core::reference::ReferenceDb;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 参考库较小时不值得拆分任务
const PAR_MIN_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: String,
    pub distance: u32,
}

/// 距离最小的 k 条，升序；距离相同时保持参考库顺序
pub fn top_matches(query: Fingerprint, db: &ReferenceDb, k: usize) -> Vec<MatchCandidate> {
    if k == 0 {
        return Vec::new();
    }

    let entries = db.entries();
    let distances: Vec<u32> = entries
        .par_iter()
        .with_min_len(PAR_MIN_LEN)
        .map(|entry| query.distance(entry.fingerprint))
        .collect();

    let mut best: Vec<(usize, u32)> = Vec::with_capacity(k + 1);
    for (index, distance) in distances.into_iter().enumerate() {
        let pos = best
            .iter()
            .position(|&(_, d)| distance < d)
            .unwrap_or(best.len());
        if pos < k {
            best.insert(pos, (index, distance));
            best.truncate(k);
        }
    }

    best.into_iter()
        .map(|(index, distance)| MatchCandidate {
            id: entries[index].id.clone(),
            distance,
        })
        .collect()
}

pub fn best_match(query: Fingerprint, db: &ReferenceDb) -> Option<MatchCandidate> {
    top_matches(query, db, 1).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::ReferenceRecord;

    fn db(entries: &[(&str, &str)]) -> ReferenceDb {
        ReferenceDb::from_records(
            entries
                .iter()
                .map(|(id, hash)| ReferenceRecord {
                    id: id.to_string(),
                    hash: hash.to_string(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn fp(hex: &str) -> Fingerprint {
        Fingerprint::from_hex(hex).unwrap()
    }

    #[test]
    fn test_exact_match_distance_zero() {
        let db = db(&[("OP01-001", "0000000000000000")]);
        let best = best_match(fp("0000000000000000"), &db).unwrap();
        assert_eq!(best.id, "OP01-001");
        assert_eq!(best.distance, 0);
    }

    #[test]
    fn test_twenty_bits_apart() {
        let db = db(&[("OP01-001", "0000000000000000")]);
        // 5 个 0xf nibble = 20 位
        let best = best_match(fp("fffff00000000000"), &db).unwrap();
        assert_eq!(best.distance, 20);
    }

    #[test]
    fn test_sorted_and_truncated() {
        let db = db(&[
            ("A", "00000000000000ff"),
            ("B", "0000000000000000"),
            ("C", "000000000000000f"),
            ("D", "ffffffffffffffff"),
        ]);

        let top = top_matches(fp("0000000000000000"), &db, 3);
        let ids: Vec<_> = top.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
        assert!(top.windows(2).all(|w| w[0].distance <= w[1].distance));

        assert_eq!(top_matches(fp("0000000000000000"), &db, 10).len(), 4);
        assert!(top_matches(fp("0000000000000000"), &db, 0).is_empty());
    }

    #[test]
    fn test_ties_keep_database_order() {
        let db = db(&[
            ("first", "000000000000000f"),
            ("second", "00000000000000f0"),
            ("third", "0000000000000f00"),
        ]);
        let top = top_matches(fp("0000000000000000"), &db, 2);
        let ids: Vec<_> = top.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_ids_are_independent_candidates() {
        let db = db(&[
            ("OP01-001", "0000000000000000"),
            ("OP01-001", "0000000000000001"),
        ]);
        let top = top_matches(fp("0000000000000000"), &db, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].distance, 0);
        assert_eq!(top[1].distance, 1);
    }

    #[test]
    fn test_large_database_matches_sequential_order() {
        let records: Vec<_> = (0..1000u64)
            .map(|i| ReferenceRecord {
                id: format!("CARD-{:04}", i),
                hash: format!("{:016x}", i % 16),
            })
            .collect();
        let db = ReferenceDb::from_records(records).unwrap();

        let top = top_matches(fp("0000000000000000"), &db, 5);
        let ids: Vec<_> = top.iter().map(|c| c.id.as_str()).collect();
        // i % 16 == 0 的条目距离为 0，按库顺序
        assert_eq!(
            ids,
            vec!["CARD-0000", "CARD-0016", "CARD-0032", "CARD-0048", "CARD-0064"]
        );
    }
}
