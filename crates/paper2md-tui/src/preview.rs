use paper2md_core::PreviewFrame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

const UPPER_HALF: &str = "\u{2580}";

/// Renders a [`PreviewFrame`] with one upper-half-block per cell: the
/// foreground is the top pixel, the background the bottom one. The image is
/// scaled to fit the area, keeping its aspect, and centred.
pub struct PreviewWidget<'a> {
    frame: &'a PreviewFrame,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(frame: &'a PreviewFrame) -> Self {
        Self { frame }
    }
}

/// Size in pixels (width, height) of `frame` fitted into `cols` x `rows` cells.
pub fn fitted_size(frame_width: u32, frame_height: u32, cols: u16, rows: u16) -> (u32, u32) {
    if frame_width == 0 || frame_height == 0 || cols == 0 || rows == 0 {
        return (0, 0);
    }
    let (fw, fh) = (u64::from(frame_width), u64::from(frame_height));
    let max_w = u64::from(cols);
    let max_h = u64::from(rows) * 2;
    let (width, height) = if fw * max_h >= max_w * fh {
        (max_w, fh * max_w / fw)
    } else {
        (fw * max_h / fh, max_h)
    };
    (width.max(1) as u32, height.max(1) as u32)
}

fn color(pixel: [u8; 3]) -> Color {
    Color::Rgb(pixel[0], pixel[1], pixel[2])
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (frame_w, frame_h) = (self.frame.width, self.frame.height);
        let (width, height) = fitted_size(frame_w, frame_h, area.width, area.height);
        if width == 0 || height == 0 {
            return;
        }
        let rows = height.div_ceil(2);
        let x0 = area.x + (area.width - width as u16) / 2;
        let y0 = area.y + (area.height - rows as u16) / 2;

        let sample = |x: u32, y: u32| {
            let sx = (u64::from(x) * u64::from(frame_w) / u64::from(width)) as u32;
            let sy = (u64::from(y) * u64::from(frame_h) / u64::from(height)) as u32;
            self.frame.pixel(sx, sy)
        };

        for row in 0..rows {
            for col in 0..width {
                let Some(cell) = buf.cell_mut((x0 + col as u16, y0 + row as u16)) else {
                    continue;
                };
                let top = sample(col, row * 2).map(color).unwrap_or(Color::Reset);
                let bottom = if row * 2 + 1 < height {
                    sample(col, row * 2 + 1).map(color).unwrap_or(Color::Reset)
                } else {
                    Color::Reset
                };
                cell.set_symbol(UPPER_HALF).set_fg(top).set_bg(bottom);
            }
        }
    }
}
