// src/surface/framebuffer.rs
//! Software framebuffer used as the drawing context for render hooks.

/// Packed 0xAARRGGBB pixel.
pub type Argb = u32;

pub const TRANSPARENT: Argb = 0x0000_0000;
pub const BLACK: Argb = 0xFF00_0000;
pub const WHITE: Argb = 0xFFFF_FFFF;

/// Row-major ARGB pixel buffer. All drawing operations clip to the bounds.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Box<[Argb]>,
}

impl Framebuffer {
    /// Creates a transparent framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; len].into_boxed_slice(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Argb] {
        &self.pixels
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Argb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Argb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    pub fn fill(&mut self, color: Argb) {
        self.pixels.fill(color);
    }

    /// Fills the rectangle at (`x`, `y`) of the given size.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Argb) {
        let x0 = x.max(0) as i64;
        let y0 = y.max(0) as i64;
        let x1 = (i64::from(x) + i64::from(width)).min(i64::from(self.width));
        let y1 = (i64::from(y) + i64::from(height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let stride = self.width as usize;
        for row in y0 as usize..y1 as usize {
            let start = row * stride;
            self.pixels[start + x0 as usize..start + x1 as usize].fill(color);
        }
    }

    /// Copies `src` onto this buffer with its top-left corner at (`x`, `y`).
    ///
    /// Pixels are copied as-is, no alpha blending.
    pub fn blit(&mut self, src: &Framebuffer, x: i32, y: i32) {
        let dst_x0 = i64::from(x).max(0);
        let dst_y0 = i64::from(y).max(0);
        let dst_x1 = (i64::from(x) + i64::from(src.width)).min(i64::from(self.width));
        let dst_y1 = (i64::from(y) + i64::from(src.height)).min(i64::from(self.height));
        if dst_x0 >= dst_x1 || dst_y0 >= dst_y1 {
            return;
        }
        let span = (dst_x1 - dst_x0) as usize;
        for dst_row in dst_y0..dst_y1 {
            let src_row = (dst_row - i64::from(y)) as usize;
            let src_col = (dst_x0 - i64::from(x)) as usize;
            let src_start = src_row * src.width as usize + src_col;
            let dst_start = dst_row as usize * self.width as usize + dst_x0 as usize;
            self.pixels[dst_start..dst_start + span]
                .copy_from_slice(&src.pixels[src_start..src_start + span]);
        }
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
