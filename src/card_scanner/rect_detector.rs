//! 基于边缘的卡片矩形检测（轴对齐包围盒 + 形状/尺寸校验）

use super::edge_map::{EdgeMap, LumaGrid};
use super::frame::{Frame, Rect};
use log::trace;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 下采样倍数
    pub downsample: u32,
    /// 估计平均幅值时的采样步长
    pub sample_stride: usize,
    /// 自适应阈值 = 平均幅值 × multiplier
    pub threshold_multiplier: f32,
    pub margin_x_ratio: f32,
    pub margin_y_ratio: f32,
    /// 边缘命中数占内部区域像素的最小比例
    pub min_hit_ratio: f32,
    /// 宽高比下限/上限（竖版卡片）
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// 宽、高相对帧尺寸的最小比例
    pub min_size_ratio: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            downsample: 3,
            sample_stride: 29,
            threshold_multiplier: 2.2,
            margin_x_ratio: 0.05,
            margin_y_ratio: 0.06,
            min_hit_ratio: 0.002,
            min_aspect: 0.55,
            max_aspect: 0.95,
            min_size_ratio: 0.25,
        }
    }
}

pub struct RectDetector {
    config: DetectorConfig,
}

impl RectDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// 检测帧内的卡片矩形。没有卡片是常态，返回 None
    pub fn detect(&self, frame: &Frame) -> Option<Rect> {
        let gray = LumaGrid::downsample(frame, self.config.downsample);
        let edges = EdgeMap::sobel(&gray);
        self.detect_in_edges(&edges, frame.width, frame.height)
    }

    fn detect_in_edges(&self, edges: &EdgeMap, frame_w: u32, frame_h: u32) -> Option<Rect> {
        let cfg = &self.config;
        let ds = cfg.downsample.max(1);
        let (w, h) = (edges.width, edges.height);
        if w < 3 || h < 3 {
            return None;
        }

        let threshold = edges.sampled_mean(cfg.sample_stride) * cfg.threshold_multiplier;

        let margin_x = (w as f32 * cfg.margin_x_ratio) as usize;
        let margin_y = (h as f32 * cfg.margin_y_ratio) as usize;
        if margin_x * 2 >= w || margin_y * 2 >= h {
            return None;
        }

        let mut min_x = w;
        let mut min_y = h;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut hits = 0usize;

        for y in margin_y..h - margin_y {
            for x in margin_x..w - margin_x {
                if edges.get(x, y) as f32 > threshold {
                    hits += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        let inner_pixels = (w - 2 * margin_x) * (h - 2 * margin_y);
        if hits == 0 || (hits as f32) < inner_pixels as f32 * cfg.min_hit_ratio {
            trace!("rect: too few edge hits ({} / {})", hits, inner_pixels);
            return None;
        }

        let rect_w = (max_x - min_x) as u32 * ds;
        let rect_h = (max_y - min_y) as u32 * ds;
        if rect_w == 0 || rect_h == 0 {
            return None;
        }

        let ratio = rect_w as f32 / rect_h as f32;
        if ratio < cfg.min_aspect || ratio > cfg.max_aspect {
            trace!("rect: aspect {:.2} outside band", ratio);
            return None;
        }

        if (rect_w as f32) < frame_w as f32 * cfg.min_size_ratio
            || (rect_h as f32) < frame_h as f32 * cfg.min_size_ratio
        {
            trace!("rect: {}x{} too small", rect_w, rect_h);
            return None;
        }

        let rect = Rect::new(min_x as u32 * ds, min_y as u32 * ds, rect_w, rect_h)
            .clamp_to(frame_w, frame_h);
        debug_assert!(rect.fits_within(frame_w, frame_h));
        Some(rect)
    }
}

impl Default for RectDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u32 = 320;
    const H: u32 = 240;

    /// 暗背景上的亮色实心卡片
    fn frame_with_card(x0: u32, y0: u32, x1: u32, y1: u32) -> Frame {
        let mut data = vec![0u8; (W * H * 4) as usize];
        for y in 0..H {
            for x in 0..W {
                let idx = ((y * W + x) * 4) as usize;
                data[idx + 3] = 255;
                if x >= x0 && x < x1 && y >= y0 && y < y1 {
                    data[idx..idx + 3].copy_from_slice(&[200, 200, 200]);
                }
            }
        }
        Frame::new(W, H, data, 0, 0)
    }

    fn assert_rect_invariants(r: Rect) {
        assert!(r.x + r.w <= W);
        assert!(r.y + r.h <= H);
        let ratio = r.aspect_ratio();
        assert!((0.55..=0.95).contains(&ratio), "ratio {}", ratio);
        assert!(r.w as f32 >= W as f32 * 0.25);
        assert!(r.h as f32 >= H as f32 * 0.25);
    }

    #[test]
    fn test_uniform_frame_has_no_rect() {
        let frame = Frame::new(W, H, vec![128u8; (W * H * 4) as usize], 0, 0);
        assert_eq!(RectDetector::new().detect(&frame), None);
    }

    #[test]
    fn test_detects_portrait_card() {
        let frame = frame_with_card(100, 40, 220, 200);
        let rect = RectDetector::new().detect(&frame).expect("card should be found");

        assert_eq!(rect, Rect::new(99, 39, 123, 162));
        assert_rect_invariants(rect);
    }

    #[test]
    fn test_square_ish_card_rejected() {
        // w/h ≈ 1.3
        let frame = frame_with_card(60, 45, 255, 195);
        assert_eq!(RectDetector::new().detect(&frame), None);
    }

    #[test]
    fn test_small_card_rejected() {
        let frame = frame_with_card(140, 90, 180, 150);
        assert_eq!(RectDetector::new().detect(&frame), None);
    }

    #[test]
    fn test_edges_inside_margin_ignored() {
        // 只有贴近画面左边缘的亮条
        let frame = frame_with_card(0, 0, 6, H);
        assert_eq!(RectDetector::new().detect(&frame), None);
    }

    #[test]
    fn test_detected_rects_respect_invariants() {
        let detector = RectDetector::new();
        for (x0, y0) in [(30, 20), (90, 30), (150, 40), (180, 25)] {
            let frame = frame_with_card(x0, y0, x0 + 110, y0 + 165);
            let rect = detector
                .detect(&frame)
                .unwrap_or_else(|| panic!("card at ({}, {}) not detected", x0, y0));
            assert_rect_invariants(rect);
        }
    }

    #[test]
    fn test_tiny_frame_has_no_rect() {
        let frame = Frame::new(6, 6, vec![255u8; 6 * 6 * 4], 0, 0);
        assert_eq!(RectDetector::new().detect(&frame), None);
    }
}
