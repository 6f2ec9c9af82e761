//! The tray bitmap: a purple frame holding four meter bars of growing width.

pub const ICON_SIZE: u32 = 64;

const PURPLE: [u8; 4] = [170, 29, 198, 255];
const BAR_BACKGROUND: [u8; 4] = [230, 230, 230, 255];
const BORDER: u32 = 4;
const BAR_HEIGHT: u32 = 6;

struct Canvas {
    size: u32,
    rgba: Vec<u8>,
}

impl Canvas {
    fn new(size: u32) -> Self {
        Self {
            size,
            rgba: vec![0; (size * size * 4) as usize],
        }
    }

    fn put(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x >= self.size || y >= self.size {
            return;
        }
        let offset = ((y * self.size + x) * 4) as usize;
        self.rgba[offset..offset + 4].copy_from_slice(&color);
    }

    /// Inclusive on both corners.
    fn fill(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: [u8; 4]) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.put(x, y, color);
            }
        }
    }

    fn outline(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, width: u32, color: [u8; 4]) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                let edge = x < x0 + width || x + width > x1 || y < y0 + width || y + width > y1;
                if edge {
                    self.put(x, y, color);
                }
            }
        }
    }
}

/// Row-major RGBA, `ICON_SIZE` × `ICON_SIZE`.
pub fn render_rgba() -> Vec<u8> {
    let mut canvas = Canvas::new(ICON_SIZE);
    let far = ICON_SIZE - BORDER;
    canvas.outline(BORDER, BORDER, far, far, 2, PURPLE);

    let left = BORDER * 2;
    let bar_width = ICON_SIZE - BORDER * 4;
    for i in 0..4 {
        let top = 10 + i * 12;
        canvas.fill(left, top, left + bar_width, top + BAR_HEIGHT, BAR_BACKGROUND);
        let filled = (bar_width as f32 * (0.3 + i as f32 * 0.2)) as u32;
        canvas.fill(left, top, left + filled, top + BAR_HEIGHT, PURPLE);
    }

    canvas.rgba
}

/// StatusNotifierItem pixmaps are ARGB32 in network byte order.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn rgba_to_argb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [px[3], px[0], px[1], px[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(rgba: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * ICON_SIZE + x) * 4) as usize;
        rgba[offset..offset + 4].try_into().unwrap()
    }

    #[test]
    fn has_expected_size() {
        assert_eq!(render_rgba().len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
    }

    #[test]
    fn frame_and_background() {
        let rgba = render_rgba();
        assert_eq!(pixel(&rgba, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&rgba, 63, 63), [0, 0, 0, 0]);
        assert_eq!(pixel(&rgba, 4, 4), PURPLE);
        assert_eq!(pixel(&rgba, 5, 30), PURPLE);
        assert_eq!(pixel(&rgba, 60, 60), PURPLE);
        assert_eq!(pixel(&rgba, 6, 30), [0, 0, 0, 0]);
        // gap between the first and second bar
        assert_eq!(pixel(&rgba, 30, 18), [0, 0, 0, 0]);
    }

    #[test]
    fn bars_fill_from_the_left_and_grow() {
        let rgba = render_rgba();
        let mut previous = 0;
        for i in 0..4 {
            let y = 10 + i * 12 + 3;
            assert_eq!(pixel(&rgba, 8, y), PURPLE, "bar {i} start");
            assert_eq!(pixel(&rgba, 56, y), BAR_BACKGROUND, "bar {i} end");

            let filled = (8..=56).filter(|&x| pixel(&rgba, x, y) == PURPLE).count();
            assert!(filled > previous, "bar {i} should be wider than bar {}", i.saturating_sub(1));
            previous = filled;
        }
    }

    #[test]
    fn argb_reorders_channels() {
        assert_eq!(rgba_to_argb(&[1, 2, 3, 4, 5, 6, 7, 8]), vec![4, 1, 2, 3, 8, 5, 6, 7]);
    }
}
