//! 灰度下采样 + Sobel 梯度幅值图

use super::frame::Frame;

/// L = 0.299R + 0.587G + 0.114B，截断为整数
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// 下采样后的亮度网格
#[derive(Debug, Clone)]
pub struct LumaGrid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl LumaGrid {
    /// 每个 factor×factor 块取左上角一个像素
    pub fn downsample(frame: &Frame, factor: u32) -> Self {
        let factor = factor.max(1);
        let width = (frame.width / factor) as usize;
        let height = (frame.height / factor) as usize;

        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let sy = y as u32 * factor;
            for x in 0..width {
                let [r, g, b] = frame.rgb_at(x as u32 * factor, sy);
                data.push(luma(r, g, b));
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> i32 {
        self.data[y * self.width + x] as i32
    }
}

/// 梯度幅值图，|Gx| + |Gy|，边框一像素恒为 0
#[derive(Debug, Clone)]
pub struct EdgeMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl EdgeMap {
    pub fn sobel(gray: &LumaGrid) -> Self {
        let w = gray.width;
        let h = gray.height;
        let mut data = vec![0u16; w * h];

        if w >= 3 && h >= 3 {
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    let gx = -gray.at(x - 1, y - 1) - 2 * gray.at(x - 1, y) - gray.at(x - 1, y + 1)
                        + gray.at(x + 1, y - 1)
                        + 2 * gray.at(x + 1, y)
                        + gray.at(x + 1, y + 1);
                    let gy = -gray.at(x - 1, y - 1) - 2 * gray.at(x, y - 1) - gray.at(x + 1, y - 1)
                        + gray.at(x - 1, y + 1)
                        + 2 * gray.at(x, y + 1)
                        + gray.at(x + 1, y + 1);

                    data[y * w + x] = (gx.abs() + gy.abs()) as u16;
                }
            }
        }

        Self {
            width: w,
            height: h,
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.width + x]
    }

    /// 每隔 stride 个值取样估计平均幅值
    pub fn sampled_mean(&self, stride: usize) -> f32 {
        let mut sum = 0u64;
        let mut count = 0u64;
        for &m in self.data.iter().step_by(stride.max(1)) {
            sum += m as u64;
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum as f32 / count as f32
        }
    }
}
