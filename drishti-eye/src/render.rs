//! Drawing detections onto frames

use crate::error::VisionError;
use crate::frame::Frame;
use crate::models::Detection;
use opencv::{
    core::{Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

/// Per-class colours, RGB
const PALETTE: &[(u8, u8, u8)] = &[
    (255, 56, 56),
    (255, 157, 151),
    (255, 112, 31),
    (255, 178, 29),
    (207, 210, 49),
    (72, 249, 10),
    (146, 204, 23),
    (61, 219, 134),
    (26, 147, 52),
    (0, 212, 187),
    (44, 153, 168),
    (0, 194, 255),
    (52, 69, 147),
    (100, 115, 255),
    (0, 24, 236),
    (132, 56, 255),
    (82, 0, 133),
    (203, 56, 255),
    (255, 149, 200),
    (255, 55, 199),
];

const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;

/// Colour for `class_id` as RGB
pub fn class_color(class_id: usize) -> (u8, u8, u8) {
    PALETTE[class_id % PALETTE.len()]
}

/// Box line width scaled to the frame
pub fn line_width(width: i32, height: i32) -> i32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as i32).max(2)
}

/// Caption drawn above a box
pub fn label_text(detection: &Detection) -> String {
    format!("{} {:.2}", detection.class_name, detection.confidence)
}

fn bgr(rgb: (u8, u8, u8)) -> Scalar {
    Scalar::new(rgb.2 as f64, rgb.1 as f64, rgb.0 as f64, 0.0)
}

/// Render `detections` onto a copy of `frame`.
///
/// Never changes the frame's dimensions. With no detections the copy is
/// pixel-identical to the input.
pub fn draw_detections(frame: &Frame, detections: &[Detection]) -> Result<Frame, VisionError> {
    let mut canvas = frame.try_clone()?;
    if detections.is_empty() {
        return Ok(canvas);
    }

    let (width, height) = (canvas.cols(), canvas.rows());
    let thickness = line_width(width, height);
    let font_scale = (thickness as f64 / 3.0).max(0.4);
    let font_thickness = (thickness - 1).max(1);

    for detection in detections {
        let bbox = detection.bbox.clamp(width as f32, height as f32);
        if bbox.width < 1.0 || bbox.height < 1.0 {
            continue;
        }

        let color = bgr(class_color(detection.class_id));
        let rect = Rect::new(
            bbox.x.round() as i32,
            bbox.y.round() as i32,
            bbox.width.round() as i32,
            bbox.height.round() as i32,
        );
        imgproc::rectangle(&mut canvas, rect, color, thickness, imgproc::LINE_AA, 0)?;

        let text = label_text(detection);
        let mut baseline = 0;
        let text_size = imgproc::get_text_size(&text, FONT, font_scale, font_thickness, &mut baseline)?;

        // Label sits above the box unless that would leave the frame
        let outside = rect.y - text_size.height - 3 >= 0;
        let label_top = if outside { rect.y - text_size.height - 3 } else { rect.y };
        let label = Rect::new(rect.x, label_top, text_size.width, text_size.height + 3);
        imgproc::rectangle(&mut canvas, label, color, imgproc::FILLED, imgproc::LINE_AA, 0)?;

        imgproc::put_text(
            &mut canvas,
            &text,
            Point::new(rect.x, label_top + text_size.height + 1),
            FONT,
            font_scale,
            Scalar::new(255.0, 255.0, 255.0, 0.0),
            font_thickness,
            imgproc::LINE_AA,
            false,
        )?;
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;
    use opencv::core::{CV_8UC3, Vec3b};

    fn blank(width: i32, height: i32) -> Frame {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn person(bbox: BoundingBox) -> Detection {
        Detection {
            class_id: 0,
            class_name: "person".to_string(),
            confidence: 0.87,
            bbox,
        }
    }

    #[test]
    fn test_class_color_wraps() {
        assert_eq!(class_color(0), class_color(PALETTE.len()));
        assert_ne!(class_color(0), class_color(1));
    }

    #[test]
    fn test_line_width_minimum() {
        assert_eq!(line_width(64, 48), 2);
        assert_eq!(line_width(1280, 720), 3);
    }

    #[test]
    fn test_label_text() {
        let det = person(BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(label_text(&det), "person 0.87");
    }

    #[test]
    fn test_no_detections_is_identical() {
        let frame = blank(64, 48);
        let out = draw_detections(&frame, &[]).unwrap();
        assert_eq!(out.size().unwrap(), frame.size().unwrap());
        assert_eq!(out.data_bytes().unwrap(), frame.data_bytes().unwrap());
    }

    #[test]
    fn test_draw_keeps_dimensions_and_marks_pixels() {
        let frame = blank(320, 240);
        let det = person(BoundingBox::new(50.0, 60.0, 100.0, 80.0));
        let out = draw_detections(&frame, &[det]).unwrap();

        assert_eq!(out.cols(), 320);
        assert_eq!(out.rows(), 240);
        // Left edge of the box is painted
        let px = out.at_2d::<Vec3b>(100, 50).unwrap();
        assert_ne!(px.0, [0u8, 0, 0]);
        // Input untouched
        assert!(frame.data_bytes().unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_draw_box_outside_frame_is_skipped() {
        let frame = blank(64, 48);
        let det = person(BoundingBox::new(500.0, 500.0, 10.0, 10.0));
        let out = draw_detections(&frame, &[det]).unwrap();
        assert!(out.data_bytes().unwrap().iter().all(|b| *b == 0));
    }
}
