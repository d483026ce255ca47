//! 卡片内采样区域（按卡面版式的固定比例）

use super::frame::Rect;
use serde::{Deserialize, Serialize};

/// 采样方案：每种都是 卡片矩形 → 子矩形 的纯函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplingProfile {
    /// 中央插画区域，用于 aHash 匹配
    #[default]
    Artwork,
    /// 底部编号条带，交给外部 OCR
    CodeStrip,
}

impl SamplingProfile {
    pub fn sample(&self, card: Rect, frame_w: u32, frame_h: u32) -> Rect {
        let (cx, cy, cw, ch) = (card.x as f32, card.y as f32, card.w as f32, card.h as f32);
        let (x, y, w, h) = match self {
            SamplingProfile::Artwork => (
                (cx + cw * 0.12).round(),
                (cy + ch * 0.18).round(),
                (cw * 0.76).round(),
                (ch * 0.50).round(),
            ),
            SamplingProfile::CodeStrip => {
                let strip_h = (ch * 0.22).round();
                (cx, cy + ch - strip_h, cw, strip_h)
            }
        };
        let rect = Rect::clamped(x as i64, y as i64, w as i64, h as i64, frame_w, frame_h);
        debug_assert!(rect.fits_within(frame_w, frame_h));
        rect
    }
}

/// 取景引导框（仅供绘制参考）
pub fn guide_frame(frame_w: u32, frame_h: u32) -> Rect {
    let pad_x = (frame_w as f32 * 0.12).round() as i64;
    let pad_y = (frame_h as f32 * 0.10).round() as i64;
    Rect::clamped(
        pad_x,
        pad_y,
        frame_w as i64 - 2 * pad_x,
        frame_h as i64 - 2 * pad_y,
        frame_w,
        frame_h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artwork_window() {
        let card = Rect::new(100, 50, 200, 300);
        let art = SamplingProfile::Artwork.sample(card, 640, 480);
        assert_eq!(art, Rect::new(124, 104, 152, 150));
    }

    #[test]
    fn test_code_strip_is_bottom_of_card() {
        let card = Rect::new(100, 50, 200, 300);
        let strip = SamplingProfile::CodeStrip.sample(card, 640, 480);
        assert_eq!(strip, Rect::new(100, 284, 200, 66));
        assert_eq!(strip.y + strip.h, card.y + card.h);
    }

    #[test]
    fn test_sample_clamped_to_frame() {
        let card = Rect::new(500, 400, 200, 300);
        for profile in [SamplingProfile::Artwork, SamplingProfile::CodeStrip] {
            let r = profile.sample(card, 640, 480);
            assert!(r.fits_within(640, 480), "{:?} -> {:?}", profile, r);
        }
    }

    #[test]
    fn test_guide_frame() {
        assert_eq!(guide_frame(1000, 500), Rect::new(120, 50, 760, 400));
    }
}
