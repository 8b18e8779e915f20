//! Half-block page canvas.
//!
//! Each terminal cell is painted as `▀` with the foreground carrying the
//! upper pixel row and the background the lower one, so an `w x h` cell
//! area shows a `w x 2h` pixel image.

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph},
};

use crate::doc::{LinkTarget, PageData};
use crate::theme::{Palette, current_palette};

/// Pan distance in pixels per keypress
pub const PAN_STEP: i32 = 8;

const HALF_BLOCK: &str = "▀";

#[derive(Clone, Copy)]
struct CanvasLayout {
    area: Rect,
    /// Viewport pixel coordinate where image pixel (0, 0) lands; negative
    /// when the image overflows and is cropped
    origin_x: i64,
    origin_y: i64,
}

pub struct PageView {
    pan_x: u32,
    pan_y: u32,
    layout: Option<CanvasLayout>,
}

impl Default for PageView {
    fn default() -> Self {
        Self::new()
    }
}

impl PageView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pan_x: 0,
            pan_y: 0,
            layout: None,
        }
    }

    /// Shift the visible window over an overflowing page. The offset is
    /// clamped against the current image on the next render.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.pan_x = saturating_offset(self.pan_x, dx);
        self.pan_y = saturating_offset(self.pan_y, dy);
    }

    pub fn reset_pan(&mut self) {
        self.pan_x = 0;
        self.pan_y = 0;
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, page: Option<&PageData>) {
        let palette = current_palette();
        f.render_widget(
            Block::default().style(Style::default().bg(palette.bg)),
            area,
        );

        let Some(page) = page else {
            self.layout = None;
            if area.height > 0 {
                let msg_area = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
                f.render_widget(
                    Paragraph::new("Rendering page…")
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(palette.muted).bg(palette.bg)),
                    msg_area,
                );
            }
            return;
        };

        let (origin_x, pan_x) =
            axis_origin(page.image.width_px, u32::from(area.width), self.pan_x);
        let (origin_y, pan_y) = axis_origin(
            page.image.height_px,
            u32::from(area.height) * 2,
            self.pan_y,
        );
        self.pan_x = pan_x;
        self.pan_y = pan_y;
        self.layout = Some(CanvasLayout {
            area,
            origin_x,
            origin_y,
        });

        paint_page(f.buffer_mut(), area, page, origin_x, origin_y, palette);
    }

    /// Link annotation under a screen position, if any. A cell covers two
    /// pixel rows; both are tested.
    pub fn link_at<'a>(
        &self,
        page: &'a PageData,
        column: u16,
        row: u16,
    ) -> Option<&'a LinkTarget> {
        let layout = self.layout?;
        let area = layout.area;
        if column < area.x
            || column >= area.x.saturating_add(area.width)
            || row < area.y
            || row >= area.y.saturating_add(area.height)
        {
            return None;
        }

        let cell_x = i64::from(column - area.x);
        let cell_y = i64::from(row - area.y);
        let ix = u32::try_from(cell_x - layout.origin_x).ok()?;

        for half in 0..2 {
            let Ok(iy) = u32::try_from(cell_y * 2 + half - layout.origin_y) else {
                continue;
            };
            if let Some(link) = page.links.iter().find(|l| l.contains(ix, iy)) {
                return Some(&link.target);
            }
        }
        None
    }
}

fn saturating_offset(value: u32, delta: i32) -> u32 {
    let shifted = i64::from(value) + i64::from(delta);
    u32::try_from(shifted.max(0)).unwrap_or(u32::MAX)
}

/// Placement of the image along one axis: centered when it fits, cropped
/// by the (clamped) pan offset when it overflows.
fn axis_origin(image_px: u32, viewport_px: u32, pan: u32) -> (i64, u32) {
    if image_px <= viewport_px {
        (i64::from((viewport_px - image_px) / 2), 0)
    } else {
        let pan = pan.min(image_px - viewport_px);
        (-i64::from(pan), pan)
    }
}

fn paint_page(
    buf: &mut Buffer,
    area: Rect,
    page: &PageData,
    origin_x: i64,
    origin_y: i64,
    palette: &Palette,
) {
    for cy in 0..area.height {
        for cx in 0..area.width {
            let vx = u32::from(cx);
            let vy = u32::from(cy) * 2;
            let upper = sample(page, origin_x, origin_y, vx, vy);
            let lower = sample(page, origin_x, origin_y, vx, vy + 1);

            let cell = &mut buf[(area.x + cx, area.y + cy)];
            cell.set_symbol(HALF_BLOCK);
            cell.set_fg(upper.map_or(palette.bg, |(r, g, b)| Color::Rgb(r, g, b)));
            cell.set_bg(lower.map_or(palette.bg, |(r, g, b)| Color::Rgb(r, g, b)));
        }
    }
}

fn sample(page: &PageData, origin_x: i64, origin_y: i64, vx: u32, vy: u32) -> Option<(u8, u8, u8)> {
    let ix = u32::try_from(i64::from(vx) - origin_x).ok()?;
    let iy = u32::try_from(i64::from(vy) - origin_y).ok()?;
    page.image.pixel(ix, iy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{ImageData, LinkRect};

    fn page_with_pixels(width: u32, height: u32, pixels: Vec<u8>) -> PageData {
        PageData {
            page_num: 0,
            image: ImageData {
                pixels,
                width_px: width,
                height_px: height,
            },
            links: Vec::new(),
            scale: 1.0,
        }
    }

    #[test]
    fn axis_origin_centers_when_image_fits() {
        assert_eq!(axis_origin(10, 20, 0), (5, 0));
        assert_eq!(axis_origin(10, 20, 99), (5, 0));
        assert_eq!(axis_origin(20, 20, 3), (0, 0));
    }

    #[test]
    fn axis_origin_clamps_pan_to_overflow() {
        assert_eq!(axis_origin(30, 20, 0), (0, 0));
        assert_eq!(axis_origin(30, 20, 4), (-4, 4));
        assert_eq!(axis_origin(30, 20, 50), (-10, 10));
    }

    #[test]
    fn paint_maps_pixel_pairs_to_half_blocks() {
        // 2x2 image: red green / blue white
        let page = page_with_pixels(
            2,
            2,
            vec![
                255, 0, 0, 0, 255, 0, //
                0, 0, 255, 255, 255, 255,
            ],
        );
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);

        paint_page(&mut buf, area, &page, 0, 0, current_palette());

        assert_eq!(buf[(0, 0)].symbol(), HALF_BLOCK);
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(255, 0, 0));
        assert_eq!(buf[(0, 0)].bg, Color::Rgb(0, 0, 255));
        assert_eq!(buf[(1, 0)].fg, Color::Rgb(0, 255, 0));
        assert_eq!(buf[(1, 0)].bg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn paint_fills_margins_with_background() {
        let page = page_with_pixels(1, 1, vec![255, 0, 0]);
        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        let palette = current_palette();

        // Image centered at x=1; its single pixel is the upper half
        paint_page(&mut buf, area, &page, 1, 0, palette);

        assert_eq!(buf[(0, 0)].fg, palette.bg);
        assert_eq!(buf[(1, 0)].fg, Color::Rgb(255, 0, 0));
        assert_eq!(buf[(1, 0)].bg, palette.bg);
        assert_eq!(buf[(2, 0)].fg, palette.bg);
    }

    #[test]
    fn link_hit_test_covers_both_pixel_rows() {
        let mut page = page_with_pixels(8, 8, vec![0; 8 * 8 * 3]);
        page.links.push(LinkRect {
            x0: 2,
            y0: 2,
            x1: 6,
            y1: 4,
            target: LinkTarget::Internal { page: 7 },
        });

        let mut view = PageView::new();
        view.layout = Some(CanvasLayout {
            area: Rect::new(0, 0, 8, 4),
            origin_x: 0,
            origin_y: 0,
        });

        // Cell row 1 covers pixel rows 2-3, inside the link
        assert_eq!(
            view.link_at(&page, 3, 1),
            Some(&LinkTarget::Internal { page: 7 })
        );
        assert_eq!(view.link_at(&page, 0, 0), None);
        assert_eq!(view.link_at(&page, 3, 3), None);
        // Outside the canvas area entirely
        assert_eq!(view.link_at(&page, 20, 1), None);
    }

    #[test]
    fn pan_saturates_at_zero() {
        let mut view = PageView::new();
        view.pan(-100, -100);
        assert_eq!((view.pan_x, view.pan_y), (0, 0));
        view.pan(12, 3);
        assert_eq!((view.pan_x, view.pan_y), (12, 3));
    }
}
