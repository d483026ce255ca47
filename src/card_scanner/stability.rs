use super::frame::Rect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// 连续稳定帧数达到该值才输出
    pub min_stable_frames: u32,
    /// 矩形面积占帧面积的最小比例
    pub min_area_ratio: f32,
    /// 位置/尺寸容差 = max(min_tolerance_px, round(帧宽 × tolerance_ratio))
    pub tolerance_ratio: f32,
    pub min_tolerance_px: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            min_stable_frames: 6,
            min_area_ratio: 0.12,
            tolerance_ratio: 0.012,
            min_tolerance_px: 10,
        }
    }
}

/// 时序稳定过滤：矩形连续多帧几乎不动才认为卡片已放稳
pub struct StabilityTracker {
    config: StabilityConfig,
    consecutive_stable: u32,
    last_rect: Option<Rect>,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self::with_config(StabilityConfig::default())
    }

    pub fn with_config(config: StabilityConfig) -> Self {
        Self {
            config,
            consecutive_stable: 0,
            last_rect: None,
        }
    }

    pub fn tolerance(&self, frame_w: u32) -> u32 {
        let scaled = (frame_w as f32 * self.config.tolerance_ratio).round() as u32;
        scaled.max(self.config.min_tolerance_px)
    }

    /// 每帧调用一次，返回稳定后的矩形（总是当前帧的矩形）
    pub fn update(&mut self, rect: Option<Rect>, frame_w: u32, frame_h: u32) -> Option<Rect> {
        let Some(rect) = rect else {
            self.consecutive_stable = 0;
            self.last_rect = None;
            return None;
        };

        let frame_area = frame_w as f32 * frame_h as f32;
        if frame_area <= 0.0 || (rect.area() as f32) / frame_area < self.config.min_area_ratio {
            self.consecutive_stable = 0;
            self.last_rect = Some(rect);
            return None;
        }

        match self.last_rect {
            Some(last) => {
                let tol = self.tolerance(frame_w);
                let close = |a: u32, b: u32| a.abs_diff(b) < tol;
                if close(rect.x, last.x)
                    && close(rect.y, last.y)
                    && close(rect.w, last.w)
                    && close(rect.h, last.h)
                {
                    self.consecutive_stable += 1;
                } else {
                    self.consecutive_stable = 0;
                }
            }
            None => self.consecutive_stable = 0,
        }

        self.last_rect = Some(rect);

        if self.consecutive_stable >= self.config.min_stable_frames {
            Some(rect)
        } else {
            None
        }
    }

    pub fn stable_count(&self) -> u32 {
        self.consecutive_stable
    }

    pub fn last_rect(&self) -> Option<Rect> {
        self.last_rect
    }

    pub fn reset(&mut self) {
        self.consecutive_stable = 0;
        self.last_rect = None;
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}
