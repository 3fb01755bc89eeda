use hoh_capture::PixelRect;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

const FOREGROUND: Luma<u8> = Luma([255]);

/// Binary mask selecting pixels whose every channel lies in `[low, high]`.
pub fn color_range_mask(img: &RgbImage, low: [u8; 3], high: [u8; 3]) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let px = img.get_pixel(x, y);
        let inside = (0..3).all(|c| px[c] >= low[c] && px[c] <= high[c]);
        if inside {
            FOREGROUND
        } else {
            Luma([0])
        }
    })
}

/// Outer borders of the top-level foreground blobs of a binary mask.
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    // Blobs touching the image edge are misclassified by the tracer, so trace
    // on a copy framed by one background pixel and shift the points back.
    let (w, h) = mask.dimensions();
    let mut framed = GrayImage::new(w + 2, h + 2);
    image::imageops::replace(&mut framed, mask, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect::<Vec<_>>()
        })
        .filter(|points| !points.is_empty())
        .collect()
}

/// Area enclosed by a contour (shoelace formula over its points).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Smallest pixel rectangle containing every contour point.
pub fn bounding_rect(points: &[Point<i32>]) -> PixelRect {
    let Some(first) = points.first() else {
        return PixelRect::new(0, 0, 0, 0);
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    let (x0, y0) = (x0.max(0), y0.max(0));
    PixelRect::from_corners(
        x0 as u32,
        y0 as u32,
        (x1 + 1).max(0) as u32,
        (y1 + 1).max(0) as u32,
    )
}

/// Mask of the given size with the contour and its interior set.
pub fn fill_contour(width: u32, height: u32, points: &[Point<i32>]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        if polygon.last() != Some(p) {
            polygon.push(*p);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, FOREGROUND);
    }

    for p in points {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
            mask.put_pixel(p.x as u32, p.y as u32, FOREGROUND);
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn mask_with_rect(w: u32, h: u32, rect: PixelRect) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom() {
                FOREGROUND
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn test_color_range_is_inclusive() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, Rgb([200, 200, 200]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        img.put_pixel(2, 0, Rgb([199, 255, 255]));
        img.put_pixel(3, 0, Rgb([230, 210, 198]));

        let mask = color_range_mask(&img, [200, 200, 200], [255, 255, 255]);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(1, 0)[0], 255);
        assert_eq!(mask.get_pixel(2, 0)[0], 0);
        assert_eq!(mask.get_pixel(3, 0)[0], 0);
    }

    #[test]
    fn test_rect_contour_area_and_bounds() {
        let rect = PixelRect::new(10, 20, 30, 40);
        let contours = external_contours(&mask_with_rect(100, 100, rect));
        assert_eq!(contours.len(), 1);
        assert_eq!(contour_area(&contours[0]), 29.0 * 39.0);
        assert_eq!(bounding_rect(&contours[0]), rect);
    }

    #[test]
    fn test_holes_are_not_external() {
        // A ring: outer square with a hole, plus a blob inside the hole
        let mut mask = mask_with_rect(100, 100, PixelRect::new(10, 10, 80, 80));
        for y in 20..80 {
            for x in 20..80 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 40..50 {
            for x in 40..50 {
                mask.put_pixel(x, y, FOREGROUND);
            }
        }

        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounding_rect(&contours[0]), PixelRect::new(10, 10, 80, 80));
    }

    #[test]
    fn test_blobs_on_left_edge_are_external() {
        // Blob at x=0 shares its rows with a second blob further right
        let mut mask = mask_with_rect(600, 800, PixelRect::new(0, 300, 120, 120));
        for y in 300..420 {
            for x in 400..520 {
                mask.put_pixel(x, y, FOREGROUND);
            }
        }

        let mut bounds: Vec<PixelRect> =
            external_contours(&mask).iter().map(|c| bounding_rect(c)).collect();
        bounds.sort_by_key(|r| r.x);
        assert_eq!(
            bounds,
            vec![
                PixelRect::new(0, 300, 120, 120),
                PixelRect::new(400, 300, 120, 120)
            ]
        );
    }

    #[test]
    fn test_full_mask_is_one_blob() {
        let mask = GrayImage::from_pixel(50, 40, FOREGROUND);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounding_rect(&contours[0]), PixelRect::new(0, 0, 50, 40));
        assert_eq!(contour_area(&contours[0]), 49.0 * 39.0);
    }

    #[test]
    fn test_degenerate_contours_have_no_area() {
        assert_eq!(contour_area(&[]), 0.0);
        assert_eq!(contour_area(&[Point::new(1, 1), Point::new(5, 1)]), 0.0);
    }

    #[test]
    fn test_fill_contour_matches_blob() {
        let rect = PixelRect::new(15, 5, 20, 12);
        let contours = external_contours(&mask_with_rect(60, 30, rect));
        let filled = fill_contour(60, 30, &contours[0]);

        let inside = filled
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .count();
        assert_eq!(inside as u64, rect.area());
        assert_eq!(filled.get_pixel(25, 10)[0], 255);
        assert_eq!(filled.get_pixel(14, 10)[0], 0);
    }

    #[test]
    fn test_fill_single_point() {
        let filled = fill_contour(5, 5, &[Point::new(2, 3)]);
        assert_eq!(filled.get_pixel(2, 3)[0], 255);
        assert_eq!(
            filled.enumerate_pixels().filter(|(_, _, p)| p[0] > 0).count(),
            1
        );
    }
}
