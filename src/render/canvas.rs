use super::palette::{rgb, Palette};
use super::text::TextOverlay;

/// Radius of the pulse circle at rest, in pixels.
pub const BASE_RADIUS: f32 = 100.0;
const TEXT_TOP_MARGIN: u32 = 20;

/// CPU-side RGBA frame for the pulse visual.
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Background, centred circle at `scale`, and the optional BPM label.
    pub fn draw(
        &mut self,
        palette: Palette,
        scale: f32,
        label: Option<&str>,
        overlay: Option<&TextOverlay>,
    ) {
        self.fill(palette.background);
        self.fill_circle(BASE_RADIUS * scale, palette.circle);

        if let (Some(text), Some(overlay)) = (label, overlay) {
            let tw = overlay.measure_width(text);
            let tx = (self.width / 2).saturating_sub(tw / 2);
            overlay.composite(
                &mut self.pixels,
                self.width,
                self.height,
                text,
                tx,
                TEXT_TOP_MARGIN,
                [255, 255, 255, 255],
            );
        }
    }

    fn fill(&mut self, color: u32) {
        let [r, g, b] = rgb(color);
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, 255]);
        }
    }

    fn fill_circle(&mut self, radius: f32, color: u32) {
        let [r, g, b] = rgb(color);
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;
        let y0 = (cy - radius).floor().max(0.0) as u32;
        let y1 = ((cy + radius).ceil() as u32).min(self.height);
        let x0 = (cx - radius).floor().max(0.0) as u32;
        let x1 = ((cx + radius).ceil() as u32).min(self.width);
        let r2 = radius * radius;

        for y in y0..y1 {
            let dy = y as f32 + 0.5 - cy;
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    let idx = ((y * self.width + x) * 4) as usize;
                    self.pixels[idx..idx + 4].copy_from_slice(&[r, g, b, 255]);
                }
            }
        }
    }
}
