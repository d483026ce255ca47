//! 平均哈希 (aHash)：8×8 灰度缩略图与均值比较，得到 64 位指纹

use super::edge_map::luma;
use super::frame::{Frame, Rect};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::fmt;

const HASH_SIZE: u32 = 8;

/// 64 位指纹，外部表示为 16 位十六进制（每个 nibble 高位在前）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const BITS: u32 = 64;
    pub const HEX_LEN: usize = 16;

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// 必须恰好 16 个十六进制字符（大小写均可）
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != Self::HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Self)
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// 汉明距离，范围 [0, 64]
    pub fn distance(&self, other: Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// 十六进制指纹之间逐 nibble 的汉明距离。长度不一致属于调用方错误
pub fn hamming_hex(a: &str, b: &str) -> u32 {
    assert_eq!(
        a.len(),
        b.len(),
        "fingerprint length mismatch: {:?} vs {:?}",
        a,
        b
    );
    a.chars()
        .zip(b.chars())
        .map(|(x, y)| (nibble(x) ^ nibble(y)).count_ones())
        .sum()
}

fn nibble(c: char) -> u32 {
    match c.to_digit(16) {
        Some(v) => v,
        None => panic!("non-hex fingerprint digit {:?}", c),
    }
}

/// 计算任意尺寸图像的 aHash
pub fn ahash_rgba(img: &RgbaImage) -> Fingerprint {
    let small = imageops::resize(img, HASH_SIZE, HASH_SIZE, FilterType::Triangle);

    let gray: Vec<u32> = small
        .pixels()
        .map(|p| luma(p[0], p[1], p[2]) as u32)
        .collect();
    let sum: u32 = gray.iter().sum();
    let n = gray.len() as u32;

    // sample >= sum / n，用整数比较避免浮点误差
    let bits = gray
        .iter()
        .fold(0u64, |acc, &v| (acc << 1) | (v * n >= sum) as u64);

    Fingerprint(bits)
}

/// 计算帧内某区域的 aHash
pub fn ahash_region(frame: &Frame, region: Rect) -> Fingerprint {
    ahash_rgba(&frame.crop_rgba(region))
}
