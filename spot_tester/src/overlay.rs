//! Draws spot outlines and occupancy counts onto a BGR frame for human viewing.

use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Vector},
    imgproc,
};
use spot_vision::{OccupancySummary, Region, RegionGeometry, SpotReading};

// BGR
const COLOR_GREEN: (f64, f64, f64) = (0.0, 255.0, 0.0);
const COLOR_RED: (f64, f64, f64) = (0.0, 0.0, 255.0);
const COLOR_WHITE: (f64, f64, f64) = (255.0, 255.0, 255.0);

const PANEL: (i32, i32, i32, i32) = (5, 15, 245, 105);
const PANEL_OPACITY: f64 = 0.6;

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Returns a copy of `frame` with every spot outlined and a stats panel in the corner.
///
/// `regions`, `geometry` and `readings` are aligned by position.
pub fn render(
    frame: &Mat,
    regions: &[Region],
    geometry: &[RegionGeometry],
    readings: &[SpotReading],
) -> opencv::Result<Mat> {
    let mut canvas = frame.clone();

    for ((region, record), reading) in regions.iter().zip(geometry).zip(readings) {
        let outline: Vector<Point> = region.polygon.iter().map(|p| Point::new(p.x, p.y)).collect();
        let color = if reading.status.is_available() { COLOR_GREEN } else { COLOR_RED };
        let contours: Vector<Vector<Point>> = std::iter::once(outline).collect();
        imgproc::polylines(&mut canvas, &contours, true, scalar(color), 2, imgproc::LINE_8, 0)?;

        imgproc::put_text(
            &mut canvas,
            &region.label(),
            bound_centre(record),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            scalar(COLOR_WHITE),
            1,
            imgproc::LINE_AA,
            false,
        )?;
    }

    let summary = OccupancySummary::from_statuses(&readings.iter().map(|r| r.status).collect::<Vec<_>>());
    draw_panel(&canvas, &summary)
}

fn bound_centre(record: &RegionGeometry) -> Point {
    let bound = record.bound;
    Point::new(
        bound.left() + (bound.width() / 2) as i32,
        bound.top() + (bound.height() / 2) as i32,
    )
}

fn draw_panel(canvas: &Mat, summary: &OccupancySummary) -> opencv::Result<Mat> {
    let mut backdrop = canvas.clone();
    let (x, y, w, h) = PANEL;
    imgproc::rectangle(
        &mut backdrop,
        Rect::new(x, y, w, h),
        Scalar::new(0.0, 0.0, 0.0, 0.0),
        -1,
        imgproc::LINE_8,
        0,
    )?;

    let mut blended = Mat::default();
    core::add_weighted(&backdrop, PANEL_OPACITY, canvas, 1.0 - PANEL_OPACITY, 0.0, &mut blended, -1)?;

    let lines = [
        (format!("Total Spots: {}", summary.total), COLOR_WHITE, 30),
        (format!("Available: {}", summary.available), COLOR_GREEN, 70),
        (format!("Occupied: {}", summary.occupied), COLOR_RED, 110),
    ];
    for (text, color, baseline) in lines {
        imgproc::put_text(
            &mut blended,
            &text,
            Point::new(10, baseline),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.8,
            scalar(color),
            2,
            imgproc::LINE_8,
            false,
        )?;
    }
    Ok(blended)
}
