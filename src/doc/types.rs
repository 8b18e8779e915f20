//! Shared types for rendered pages and document metadata

use super::outline::OutlineNode;

/// Raw RGB image produced by a render worker
#[derive(Clone)]
pub struct ImageData {
    /// Tightly packed RGB8 rows
    pub pixels: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageData {
    /// RGB triple at pixel coordinates, None outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width_px || y >= self.height_px {
            return None;
        }
        let idx = (y as usize * self.width_px as usize + x as usize) * 3;
        let px = self.pixels.get(idx..idx + 3)?;
        Some((px[0], px[1], px[2]))
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("pixels_len", &self.pixels.len())
            .finish()
    }
}

/// Navigation target of a link annotation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    /// Internal page (0-indexed)
    Internal { page: usize },
    /// External URI
    External { uri: String },
}

/// A clickable link region in pixmap pixel coordinates
#[derive(Clone, Debug)]
pub struct LinkRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub target: LinkTarget,
}

impl LinkRect {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// A fully rendered page
#[derive(Clone)]
pub struct PageData {
    /// Page index (0-based)
    pub page_num: usize,
    pub image: ImageData,
    /// Link annotations scaled to the rendered pixmap
    pub links: Vec<LinkRect>,
    /// Effective magnification from page points to pixels
    pub scale: f32,
}

impl std::fmt::Debug for PageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageData")
            .field("page_num", &self.page_num)
            .field("image", &self.image)
            .field("links", &self.links.len())
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Document metadata loaded once at open (and again on reload)
#[derive(Clone, Debug)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub outline: Vec<OutlineNode>,
}

impl DocumentInfo {
    pub fn has_outline(&self) -> bool {
        !self.outline.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_pixel_lookup() {
        let image = ImageData {
            pixels: vec![
                10, 20, 30, 40, 50, 60, //
                70, 80, 90, 100, 110, 120,
            ],
            width_px: 2,
            height_px: 2,
        };

        assert_eq!(image.pixel(0, 0), Some((10, 20, 30)));
        assert_eq!(image.pixel(1, 0), Some((40, 50, 60)));
        assert_eq!(image.pixel(0, 1), Some((70, 80, 90)));
        assert_eq!(image.pixel(1, 1), Some((100, 110, 120)));
        assert_eq!(image.pixel(2, 0), None);
        assert_eq!(image.pixel(0, 2), None);
    }

    #[test]
    fn link_rect_containment_is_half_open() {
        let rect = LinkRect {
            x0: 10,
            y0: 20,
            x1: 30,
            y1: 40,
            target: LinkTarget::Internal { page: 3 },
        };

        assert!(rect.contains(10, 20));
        assert!(rect.contains(29, 39));
        assert!(!rect.contains(30, 39));
        assert!(!rect.contains(29, 40));
        assert!(!rect.contains(9, 25));
    }
}
