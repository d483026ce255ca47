use super::error::ScanError;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 像素格式，至少包含 RGB 三通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// 帧数据结构（单次 tick 内只读）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    /// RGBA 帧
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    pub fn from_rgb(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            format: PixelFormat::Rgb,
            ..Self::new(width, height, data, timestamp_ms, frame_number)
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }

    /// 校验尺寸与缓冲区长度，非法帧不进入流水线
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.width == 0 || self.height == 0 {
            return Err(ScanError::InvalidFrame {
                width: self.width,
                height: self.height,
            });
        }
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.format.bytes_per_pixel()))
            .ok_or(ScanError::InvalidFrame {
                width: self.width,
                height: self.height,
            })?;
        // 带行填充 (stride) 的缓冲区同样拒绝，否则按错误行宽读取
        if self.data.len() != expected {
            return Err(ScanError::BufferSize {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// 裁剪子区域为 RGBA 图像。区域必须已经 clamp 到帧内
    pub fn crop_rgba(&self, rect: Rect) -> RgbaImage {
        assert!(
            rect.fits_within(self.width, self.height),
            "crop rect {:?} outside {}x{} frame",
            rect,
            self.width,
            self.height
        );
        RgbaImage::from_fn(rect.w, rect.h, |x, y| {
            let [r, g, b] = self.rgb_at(rect.x + x, rect.y + y);
            Rgba([r, g, b, 255])
        })
    }
}

/// 整数像素矩形，左上角为原点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// 从有符号坐标构造并限制在帧内：x∈[0,W-1], y∈[0,H-1], w∈[1,W-x], h∈[1,H-y]
    pub fn clamped(x: i64, y: i64, w: i64, h: i64, frame_w: u32, frame_h: u32) -> Self {
        let fw = frame_w as i64;
        let fh = frame_h as i64;
        let x = x.min(fw - 1).max(0);
        let y = y.min(fh - 1).max(0);
        let w = w.min(fw - x).max(1);
        let h = h.min(fh - y).max(1);
        Self::new(x as u32, y as u32, w as u32, h as u32)
    }

    pub fn clamp_to(self, frame_w: u32, frame_h: u32) -> Self {
        Self::clamped(
            self.x as i64,
            self.y as i64,
            self.w as i64,
            self.h as i64,
            frame_w,
            frame_h,
        )
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.w as f32 / self.h as f32
    }

    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.w >= 1
            && self.h >= 1
            && self.x as u64 + self.w as u64 <= frame_w as u64
            && self.y as u64 + self.h as u64 <= frame_h as u64
    }
}

/// 从原生相机层传递的 YUV420 原始帧
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl RawFrame {
    pub fn to_rgba(&self) -> Result<Frame, ScanError> {
        if self.width == 0 || self.height == 0 {
            return Err(ScanError::InvalidFrame {
                width: self.width,
                height: self.height,
            });
        }

        let w = self.width as usize;
        let h = self.height as usize;
        let (pixels, rgba_len) = w
            .checked_mul(h)
            .and_then(|n| n.checked_mul(4).map(|len| (n, len)))
            .ok_or(ScanError::InvalidFrame {
                width: self.width,
                height: self.height,
            })?;
        let uv_w = w.div_ceil(2);
        let uv_len = uv_w * h.div_ceil(2);
        if self.y_plane.len() < pixels {
            return Err(ScanError::BufferSize {
                expected: pixels,
                actual: self.y_plane.len(),
            });
        }
        if self.u_plane.len() < uv_len || self.v_plane.len() < uv_len {
            return Err(ScanError::BufferSize {
                expected: uv_len,
                actual: self.u_plane.len().min(self.v_plane.len()),
            });
        }

        let mut rgba_data = vec![0u8; rgba_len];

        for y in 0..h {
            for x in 0..w {
                let y_idx = y * w + x;
                let uv_idx = (y / 2) * uv_w + x / 2;

                let y_val = self.y_plane[y_idx] as f32;
                let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                let r = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                let g = (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                let b = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;

                let rgba_idx = y_idx * 4;
                rgba_data[rgba_idx] = r;
                rgba_data[rgba_idx + 1] = g;
                rgba_data[rgba_idx + 2] = b;
                rgba_data[rgba_idx + 3] = 255;
            }
        }

        Ok(Frame::new(
            self.width,
            self.height,
            rgba_data,
            self.timestamp_ms,
            self.frame_number,
        ))
    }
}
