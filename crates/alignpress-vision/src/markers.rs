//! Candidate marker quadrilaterals: dark external regions reduced to four corners.

use alignpress_aruco::otsu_threshold_from_samples;
use alignpress_core::{GrayImage, GrayImageView};
use nalgebra::Point2;

use crate::contours::find_external_contours;
use crate::rect::convex_hull;

fn point_segment_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-12 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Douglas–Peucker on an open chain; keeps both endpoints.
fn simplify_chain(chain: &[Point2<f64>], epsilon: f64, out: &mut Vec<Point2<f64>>) {
    let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
        return;
    };
    let farthest = chain
        .iter()
        .enumerate()
        .skip(1)
        .take(chain.len().saturating_sub(2))
        .map(|(i, &p)| (i, point_segment_distance(p, first, last)))
        .max_by(|a, b| a.1.total_cmp(&b.1));
    match farthest {
        Some((i, d)) if d > epsilon => {
            simplify_chain(&chain[..=i], epsilon, out);
            out.pop();
            simplify_chain(&chain[i..], epsilon, out);
        }
        _ => {
            out.push(first);
            out.push(last);
        }
    }
}

/// Douglas–Peucker on a closed polygon, split at vertex 0 and its farthest vertex.
fn simplify_closed(poly: &[Point2<f64>], epsilon: f64) -> Vec<Point2<f64>> {
    if poly.len() < 4 {
        return poly.to_vec();
    }
    let split = (1..poly.len())
        .max_by(|&a, &b| (poly[a] - poly[0]).norm().total_cmp(&(poly[b] - poly[0]).norm()))
        .unwrap_or(1);

    let mut first_half = Vec::new();
    simplify_chain(&poly[..=split], epsilon, &mut first_half);
    let mut closing: Vec<Point2<f64>> = poly[split..].to_vec();
    closing.push(poly[0]);
    let mut second_half = Vec::new();
    simplify_chain(&closing, epsilon, &mut second_half);

    // drop the shared endpoints of the second half
    first_half.extend_from_slice(&second_half[1..second_half.len().saturating_sub(1)]);
    first_half
}

/// Sort four corners clockwise on screen, starting at the one nearest the top-left.
pub fn order_quad_clockwise(quad: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let cx = quad.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = quad.iter().map(|p| p.y).sum::<f32>() / 4.0;
    let mut sorted = quad;
    // y grows downward, so increasing atan2 sweeps clockwise
    sorted.sort_by(|a, b| (a.y - cy).atan2(a.x - cx).total_cmp(&(b.y - cy).atan2(b.x - cx)));
    let start = (0..4)
        .min_by(|&a, &b| (sorted[a].x + sorted[a].y).total_cmp(&(sorted[b].x + sorted[b].y)))
        .unwrap_or(0);
    [0, 1, 2, 3].map(|i| sorted[(start + i) % 4])
}

/// Quadrilateral outlines of dark regions at least `min_area` pixels in polygon area.
pub fn find_marker_quads(image: &GrayImageView<'_>, min_area: f64) -> Vec<[Point2<f32>; 4]> {
    let thr = otsu_threshold_from_samples(image.data);
    let mask = GrayImage {
        width: image.width,
        height: image.height,
        data: image
            .data
            .iter()
            .map(|&v| if v <= thr { 255 } else { 0 })
            .collect(),
    };

    let mut quads = Vec::new();
    for contour in find_external_contours(&mask.view()) {
        if contour.area() < min_area {
            continue;
        }
        let hull = convex_hull(&contour.points);
        let perimeter: f64 = (0..hull.len())
            .map(|i| (hull[(i + 1) % hull.len()] - hull[i]).norm())
            .sum();
        let poly = simplify_closed(&hull, (0.03 * perimeter).max(2.0));
        if poly.len() != 4 {
            log::trace!("marker candidate rejected: {} vertices", poly.len());
            continue;
        }
        let quad = [0, 1, 2, 3].map(|i| Point2::new(poly[i].x as f32, poly[i].y as f32));
        quads.push(order_quad_clockwise(quad));
    }
    quads
}
