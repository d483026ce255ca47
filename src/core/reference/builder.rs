//! 从卡图生成参考指纹（与实时扫描使用相同的插画区域与 aHash）

use super::{ReferenceError, ReferenceRecord};
use crate::card_scanner::frame::Rect;
use crate::card_scanner::hasher::{ahash_rgba, Fingerprint};
use crate::card_scanner::region::SamplingProfile;
use image::{imageops, DynamicImage};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashSet;

/// 一张已编码的卡图（png/jpeg/bmp）
#[derive(Debug, Clone)]
pub struct CardImage {
    pub id: String,
    pub bytes: Vec<u8>,
}

/// 整张卡图 → 插画区域 aHash
pub fn fingerprint_card_image(img: &DynamicImage) -> Fingerprint {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let art = SamplingProfile::Artwork.sample(Rect::new(0, 0, w, h), w, h);
    let crop = imageops::crop_imm(&rgba, art.x, art.y, art.w, art.h).to_image();
    ahash_rgba(&crop)
}

fn fingerprint_encoded(bytes: &[u8]) -> Result<Fingerprint, ReferenceError> {
    let img = image::load_from_memory(bytes)?;
    Ok(fingerprint_card_image(&img))
}

/// 批量生成参考记录：解码失败的图片跳过，同一 id 只保留第一张成功的，结果按 id 排序
pub fn build_reference_records(images: Vec<CardImage>) -> Vec<ReferenceRecord> {
    let total = images.len();

    let hashed: Vec<(String, Result<Fingerprint, ReferenceError>)> = images
        .into_par_iter()
        .map(|card| {
            let result = fingerprint_encoded(&card.bytes);
            (card.id, result)
        })
        .collect();

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(hashed.len());
    for (id, result) in hashed {
        let id = id.trim().to_string();
        if id.is_empty() || seen.contains(&id) {
            continue;
        }
        match result {
            Ok(fingerprint) => {
                records.push(ReferenceRecord {
                    id: id.clone(),
                    hash: fingerprint.to_hex(),
                });
                seen.insert(id);
            }
            Err(e) => warn!("⚠️ Skipping card {}: {}", id, e),
        }
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    info!("📚 Built {} reference records from {} images", records.len(), total);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::ReferenceDb;
    use image::{ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(img: RgbaImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn card_image(value: u8) -> Vec<u8> {
        encode_png(RgbaImage::from_pixel(60, 84, Rgba([value, value, value, 255])))
    }

    #[test]
    fn test_uniform_card_hash() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(60, 84, Rgba([90, 90, 90, 255])));
        assert_eq!(fingerprint_card_image(&img).to_hex(), "ffffffffffffffff");
    }

    #[test]
    fn test_build_skips_bad_and_duplicate_entries() {
        let images = vec![
            CardImage {
                id: "ST01-002".to_string(),
                bytes: card_image(10),
            },
            CardImage {
                id: "OP01-001".to_string(),
                bytes: vec![1, 2, 3],
            },
            CardImage {
                id: "OP01-001".to_string(),
                bytes: card_image(20),
            },
            CardImage {
                id: "ST01-002".to_string(),
                bytes: card_image(30),
            },
        ];

        let records = build_reference_records(images);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["OP01-001", "ST01-002"]);
        assert!(records.iter().all(|r| r.hash.len() == 16));

        // 生成结果可以直接作为参考库加载
        assert_eq!(ReferenceDb::from_records(records).unwrap().len(), 2);
    }
}
