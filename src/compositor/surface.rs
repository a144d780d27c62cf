//! RGBA draw surface
//!
//! The compositor's drawing target: a plain RGBA buffer with the three
//! operations the preview needs. Scaling is nearest-neighbor; blending is
//! straight source-over with a global alpha.

use crate::capture::VideoFrame;

/// An owned RGBA pixel buffer
pub struct DrawSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl DrawSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize the buffer; contents are undefined until the next full draw
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.data = vec![0; (width * height * 4) as usize];
        }
    }

    /// Fill the whole surface with an opaque color
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }

    /// Fill a rectangle, blended over the existing pixels at `alpha`
    ///
    /// Coordinates may lie partly outside the surface; the rectangle is
    /// clipped.
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, rgba: [u8; 4], alpha: f64) {
        for dy in 0..height as i64 {
            let sy = y + dy;
            if sy < 0 || sy >= self.height as i64 {
                continue;
            }
            for dx in 0..width as i64 {
                let sx = x + dx;
                if sx < 0 || sx >= self.width as i64 {
                    continue;
                }
                let idx = ((sy as u32 * self.width + sx as u32) * 4) as usize;
                blend_pixel(&mut self.data[idx..idx + 4], rgba[0], rgba[1], rgba[2], alpha);
            }
        }
    }

    /// Draw `frame` scaled into the given rectangle, blended at `alpha`
    pub fn blit_scaled(
        &mut self,
        frame: &VideoFrame,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        alpha: f64,
    ) {
        if width == 0 || height == 0 || frame.width == 0 || frame.height == 0 {
            return;
        }

        for dy in 0..height {
            let sy = y + dy as i64;
            if sy < 0 || sy >= self.height as i64 {
                continue;
            }
            // Nearest-neighbor source row
            let src_y = ((dy as f64 * frame.height as f64 / height as f64) as u32)
                .min(frame.height - 1);

            for dx in 0..width {
                let sx = x + dx as i64;
                if sx < 0 || sx >= self.width as i64 {
                    continue;
                }
                let src_x = ((dx as f64 * frame.width as f64 / width as f64) as u32)
                    .min(frame.width - 1);

                let src_idx = ((src_y * frame.width + src_x) * 4) as usize;
                let dst_idx = ((sy as u32 * self.width + sx as u32) * 4) as usize;

                blend_pixel(
                    &mut self.data[dst_idx..dst_idx + 4],
                    frame.data[src_idx],
                    frame.data[src_idx + 1],
                    frame.data[src_idx + 2],
                    alpha,
                );
            }
        }
    }

    /// Pixel at (x, y) as RGBA
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Snapshot the surface as a frame
    pub fn to_frame(&self, timestamp_ms: f64) -> VideoFrame {
        VideoFrame::new(self.width, self.height, self.data.clone(), timestamp_ms)
    }
}

fn blend_pixel(dst: &mut [u8], r: u8, g: u8, b: u8, alpha: f64) {
    if alpha >= 1.0 {
        dst[0] = r;
        dst[1] = g;
        dst[2] = b;
        dst[3] = 255;
        return;
    }
    let a = alpha.max(0.0) as f32;
    let out_r = r as f32 * a + dst[0] as f32 * (1.0 - a);
    let out_g = g as f32 * a + dst[1] as f32 * (1.0 - a);
    let out_b = b as f32 * a + dst[2] as f32 * (1.0 - a);
    dst[0] = out_r.clamp(0.0, 255.0) as u8;
    dst[1] = out_g.clamp(0.0, 255.0) as u8;
    dst[2] = out_b.clamp(0.0, 255.0) as u8;
    dst[3] = 255;
}
