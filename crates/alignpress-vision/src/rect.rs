//! Convex hull and minimum-area rotated rectangle.

use nalgebra::{Point2, Vector2};

use crate::RotatedRect;

fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Monotone-chain convex hull without collinear points.
pub fn convex_hull(points: &[Point2<f32>]) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = points
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(2 * pts.len());
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Smallest-area enclosing rectangle, tested against every hull edge direction.
///
/// The angle is reported in `(-45, 45]` degrees; width and height swap when the
/// edge direction is folded into that range.
pub fn min_area_rect(points: &[Point2<f32>]) -> Option<RotatedRect> {
    let hull = convex_hull(points);
    match hull.len() {
        0 => return None,
        1 => {
            return Some(RotatedRect {
                center: hull[0],
                size: Vector2::zeros(),
                angle_deg: 0.0,
            })
        }
        _ => {}
    }

    // (area, angle_rad, width, height, center)
    let mut best: Option<(f64, f64, f64, f64, Point2<f64>)> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let edge = b - a;
        let len = edge.norm();
        if len < 1e-12 {
            continue;
        }
        let u = edge / len;
        let v = Vector2::new(-u.y, u.x);

        let (mut min_u, mut max_u, mut min_v, mut max_v) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for p in &hull {
            let d = p - a;
            let (pu, pv) = (d.dot(&u), d.dot(&v));
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }
        let (w, h) = (max_u - min_u, max_v - min_v);
        let area = w * h;
        if best.is_none_or(|(best_area, ..)| area < best_area - 1e-9) {
            let center = a + u * (0.5 * (min_u + max_u)) + v * (0.5 * (min_v + max_v));
            best = Some((area, u.y.atan2(u.x), w, h, center));
        }
    }

    let (_, angle_rad, mut w, mut h, center) = best?;
    let mut angle = angle_rad.to_degrees();
    // the rectangle is symmetric under half turns
    if angle > 90.0 {
        angle -= 180.0;
    } else if angle <= -90.0 {
        angle += 180.0;
    }
    if angle > 45.0 {
        angle -= 90.0;
        std::mem::swap(&mut w, &mut h);
    } else if angle <= -45.0 {
        angle += 90.0;
        std::mem::swap(&mut w, &mut h);
    }
    Some(RotatedRect {
        center,
        size: Vector2::new(w, h),
        angle_deg: angle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect_outline(cx: f64, cy: f64, w: f64, h: f64, angle_deg: f64) -> Vec<Point2<f32>> {
        let (s, c) = angle_deg.to_radians().sin_cos();
        let mut pts = Vec::new();
        let steps = 20;
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            for (lx, ly) in [
                (-w / 2.0 + t * w, -h / 2.0),
                (w / 2.0, -h / 2.0 + t * h),
                (w / 2.0 - t * w, h / 2.0),
                (-w / 2.0, h / 2.0 - t * h),
            ] {
                pts.push(Point2::new(
                    (cx + c * lx - s * ly) as f32,
                    (cy + s * lx + c * ly) as f32,
                ));
            }
        }
        pts
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(2.0, 2.0),
        ];
        assert_eq!(convex_hull(&pts).len(), 4);
    }

    #[test]
    fn axis_aligned_rectangle() {
        let r = min_area_rect(&rect_outline(50.0, 40.0, 60.0, 20.0, 0.0)).expect("rect");
        assert_relative_eq!(r.center.x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(r.center.y, 40.0, epsilon = 1e-3);
        assert_relative_eq!(r.size.x, 60.0, epsilon = 1e-3);
        assert_relative_eq!(r.size.y, 20.0, epsilon = 1e-3);
        assert_relative_eq!(r.angle_deg, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn rotated_rectangle_angle_stays_in_range() {
        for angle in [-30.0, 10.0, 44.0] {
            let r = min_area_rect(&rect_outline(0.0, 0.0, 60.0, 20.0, angle)).expect("rect");
            assert_relative_eq!(r.angle_deg, angle, epsilon = 1e-2);
            assert_relative_eq!(r.size.x, 60.0, epsilon = 1e-2);
            assert_relative_eq!(r.size.y, 20.0, epsilon = 1e-2);
        }
        // a 70 degree long side folds to -20 with swapped sides
        let r = min_area_rect(&rect_outline(0.0, 0.0, 60.0, 20.0, 70.0)).expect("rect");
        assert_relative_eq!(r.angle_deg, -20.0, epsilon = 1e-2);
        assert_relative_eq!(r.size.x, 20.0, epsilon = 1e-2);
        assert_relative_eq!(r.size.y, 60.0, epsilon = 1e-2);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(min_area_rect(&[]).is_none());
        let one = min_area_rect(&[Point2::new(3.0, 4.0)]).expect("point");
        assert_eq!(one.size, Vector2::zeros());
        let seg = min_area_rect(&[Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)]).expect("seg");
        assert_relative_eq!(seg.size.x, 10.0);
        assert_relative_eq!(seg.size.y, 0.0);
    }
}
