//! Coordinate transformation between the viewer and PDF user space
//!
//! The viewer lays every page out as a 595x842 reference page rendered at a
//! fixed zoom, with the origin at the top-left. PDF user space has its origin
//! at the bottom-left and is measured in points of the page's real size.

use crate::elements::{Position, Size};

/// How overlay coordinates were captured on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerGeometry {
    pub scale: f64,
    pub reference_width: f64,
    pub reference_height: f64,
    pub default_signature_font_size: f64,
    pub default_page_number_font_size: f64,
}

impl Default for ViewerGeometry {
    fn default() -> Self {
        Self {
            scale: 1.2,
            reference_width: 595.0,
            reference_height: 842.0,
            default_signature_font_size: 32.0,
            default_page_number_font_size: 12.0,
        }
    }
}

/// A rectangle in PDF user space, `(x, y)` being the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewerGeometry {
    fn x_factor(&self, page_width: f64) -> f64 {
        page_width / self.reference_width / self.scale
    }

    fn y_factor(&self, page_height: f64) -> f64 {
        page_height / self.reference_height / self.scale
    }

    /// Box of an image-like overlay on a page of the given size
    pub fn box_to_pdf(
        &self,
        position: Position,
        size: Size,
        page_width: f64,
        page_height: f64,
    ) -> PdfBox {
        let fx = self.x_factor(page_width);
        let fy = self.y_factor(page_height);
        let height = size.height * fy;
        PdfBox {
            x: position.x * fx,
            y: page_height - position.y * fy - height,
            width: size.width * fx,
            height,
        }
    }

    /// Baseline origin for text anchored at `position`
    pub fn text_origin(&self, position: Position, page_width: f64, page_height: f64) -> (f64, f64) {
        (
            position.x * self.x_factor(page_width),
            page_height - position.y * self.y_factor(page_height),
        )
    }

    /// Font size in points for a viewer font size in pixels
    pub fn font_size_to_pdf(&self, font_size: f64, page_width: f64) -> f64 {
        font_size * self.x_factor(page_width)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    proptest! {
        /// Property: an overlay inside the viewer page lands inside the PDF page
        #[test]
        fn box_inside_viewer_stays_inside_page(
            page_w in dimension(),
            page_h in dimension(),
            fx in 0.0f64..0.5,
            fy in 0.0f64..0.5,
            fw in 0.01f64..0.5,
            fh in 0.01f64..0.5,
        ) {
            let geometry = ViewerGeometry::default();
            let viewer_w = geometry.reference_width * geometry.scale;
            let viewer_h = geometry.reference_height * geometry.scale;
            let pdf = geometry.box_to_pdf(
                Position { x: fx * viewer_w, y: fy * viewer_h },
                Size { width: fw * viewer_w, height: fh * viewer_h },
                page_w,
                page_h,
            );
            prop_assert!(pdf.x >= -1e-6 && pdf.x + pdf.width <= page_w + 1e-6);
            prop_assert!(pdf.y >= -1e-6 && pdf.y + pdf.height <= page_h + 1e-6);
        }
    }
}
