//! Coordinate transformation between preview and PDF coordinate systems
//!
//! Preview coordinates are pixels of the rendered page element (top-left
//! origin). Document coordinates are PDF points (bottom-left origin). Every
//! conversion needs a measured [`PageGeometry`]; an unmeasured preview fails
//! with `GeometryNotReady`.

use crate::error::{AnnotateError, Result};
use crate::geometry::{PageGeometry, Point, Rect};

fn ready(geometry: &PageGeometry) -> Result<()> {
    if geometry.is_ready() {
        Ok(())
    } else {
        Err(AnnotateError::GeometryNotReady { page: None })
    }
}

/// Convert a preview point (top-left origin, pixels) to PDF space (bottom-left origin, points)
pub fn to_document_space(point: Point, geometry: &PageGeometry) -> Result<Point> {
    ready(geometry)?;

    let x_pct = point.x / geometry.preview_width_pixels;
    let y_pct = point.y / geometry.preview_height_pixels;

    // Flip Y axis
    Ok(Point::new(
        x_pct * geometry.width_points,
        geometry.height_points - y_pct * geometry.height_points,
    ))
}

/// Convert a PDF point back to preview pixels
pub fn to_preview_space(point: Point, geometry: &PageGeometry) -> Result<Point> {
    ready(geometry)?;

    let x_pct = point.x / geometry.width_points;
    let y_pct = 1.0 - point.y / geometry.height_points;

    Ok(Point::new(
        x_pct * geometry.preview_width_pixels,
        y_pct * geometry.preview_height_pixels,
    ))
}

/// Convert a preview rectangle to PDF space.
///
/// The preview rectangle is anchored at its visual top-left corner; the
/// result is anchored at its bottom-left corner, as PDF drawing expects.
pub fn rect_to_document_space(rect: Rect, geometry: &PageGeometry) -> Result<Rect> {
    ready(geometry)?;

    let scaled_x = rect.x * geometry.scale_x();
    let scaled_y = rect.y * geometry.scale_y();
    let scaled_width = rect.width * geometry.scale_x();
    let scaled_height = rect.height * geometry.scale_y();

    Ok(Rect::new(
        scaled_x,
        geometry.height_points - scaled_y - scaled_height,
        scaled_width,
        scaled_height,
    ))
}

/// Convert a PDF rectangle (bottom-left anchored) to a preview rectangle (top-left anchored)
pub fn rect_to_preview_space(rect: Rect, geometry: &PageGeometry) -> Result<Rect> {
    ready(geometry)?;

    let scaled_y = geometry.height_points - rect.y - rect.height;

    Ok(Rect::new(
        rect.x / geometry.scale_x(),
        scaled_y / geometry.scale_y(),
        rect.width / geometry.scale_x(),
        rect.height / geometry.scale_y(),
    ))
}

/// Preview rotation is clockwise on screen. Flipping the y axis turns the
/// same visual rotation counter-clockwise, which is what PDF matrices use.
pub fn rotation_to_document_space(degrees: u32) -> u32 {
    (360 - degrees % 360) % 360
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_at(preview_w: f64, preview_h: f64) -> PageGeometry {
        PageGeometry::new(612.0, 792.0, preview_w, preview_h)
    }

    #[test]
    fn test_click_on_fit_to_width_preview() {
        let geometry = letter_at(800.0, 1035.0);
        let p = to_document_space(Point::new(100.0, 100.0), &geometry).unwrap();
        assert!((p.x - 76.5).abs() < 0.01);
        assert!((p.y - 715.4).abs() < 0.1);
    }

    #[test]
    fn test_corners() {
        let geometry = letter_at(600.0, 800.0);

        // Top-left preview (0, 0) maps to top-left PDF (0, 792)
        let p = to_document_space(Point::new(0.0, 0.0), &geometry).unwrap();
        assert!((p.x - 0.0).abs() < 0.1);
        assert!((p.y - 792.0).abs() < 0.1);

        // Bottom-right preview maps to bottom-right PDF
        let p = to_document_space(Point::new(600.0, 800.0), &geometry).unwrap();
        assert!((p.x - 612.0).abs() < 0.1);
        assert!((p.y - 0.0).abs() < 0.1);
    }

    #[test]
    fn test_y_axis_flip() {
        let geometry = letter_at(612.0, 792.0);
        let preview = to_preview_space(Point::new(0.0, 100.0), &geometry).unwrap();
        assert!((preview.y - 692.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_anchor_moves_to_bottom_left() {
        // 1:1 scale keeps the numbers readable
        let geometry = letter_at(612.0, 792.0);
        let rect = rect_to_document_space(Rect::new(50.0, 50.0, 200.0, 30.0), &geometry).unwrap();
        assert_eq!(rect, Rect::new(50.0, 712.0, 200.0, 30.0));
    }

    #[test]
    fn test_rect_scales_each_axis_independently() {
        let geometry = letter_at(306.0, 198.0); // x: 2 pt/px, y: 4 pt/px
        let rect = rect_to_document_space(Rect::new(10.0, 10.0, 20.0, 5.0), &geometry).unwrap();
        assert_eq!(rect.x, 20.0);
        assert_eq!(rect.width, 40.0);
        assert_eq!(rect.height, 20.0);
        assert_eq!(rect.y, 792.0 - 40.0 - 20.0);
    }

    #[test]
    fn test_unmeasured_preview_fails() {
        let geometry = letter_at(0.0, 1035.0);
        assert!(matches!(
            to_document_space(Point::new(1.0, 1.0), &geometry),
            Err(AnnotateError::GeometryNotReady { .. })
        ));
        assert!(rect_to_document_space(Rect::new(0.0, 0.0, 1.0, 1.0), &letter_at(800.0, 0.0))
            .is_err());
        assert!(to_preview_space(Point::new(1.0, 1.0), &letter_at(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_rotation_direction() {
        assert_eq!(rotation_to_document_space(0), 0);
        assert_eq!(rotation_to_document_space(25), 335);
        assert_eq!(rotation_to_document_space(90), 270);
        assert_eq!(rotation_to_document_space(360), 0);
    }
}
