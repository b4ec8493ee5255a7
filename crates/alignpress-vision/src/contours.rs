//! Connected components and outer boundary tracing.

use std::collections::VecDeque;

use alignpress_core::GrayImageView;
use nalgebra::Point2;

/// Closed outer boundary of one foreground region, in tracing order.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    /// Boundary pixel centers.
    pub points: Vec<Point2<f32>>,
}

impl Contour {
    /// Polygon area enclosed by the boundary pixel centers.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }
}

/// Shoelace area of a closed polygon (absolute value).
pub fn polygon_area(points: &[Point2<f32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    twice.abs() * 0.5
}

// Clockwise on screen (y down), starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

fn dir_index(dx: i32, dy: i32) -> usize {
    DIRS.iter().position(|&d| d == (dx, dy)).unwrap_or(WEST)
}

struct Labels {
    width: usize,
    height: usize,
    ids: Vec<u32>, // 0 = background
}

impl Labels {
    #[inline]
    fn at(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.ids[y as usize * self.width + x as usize]
    }
}

/// 8-connected labelling; returns labels and the raster-first pixel of each component.
fn label_components(binary: &GrayImageView<'_>) -> (Labels, Vec<(i32, i32)>) {
    let (w, h) = (binary.width, binary.height);
    let mut ids = vec![0u32; w * h];
    let mut starts = Vec::new();
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if binary.data[idx] == 0 || ids[idx] != 0 {
                continue;
            }
            starts.push((x as i32, y as i32));
            let label = starts.len() as u32;
            ids[idx] = label;
            queue.push_back((x as i32, y as i32));
            while let Some((cx, cy)) = queue.pop_front() {
                for (dx, dy) in DIRS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let n = ny as usize * w + nx as usize;
                    if binary.data[n] != 0 && ids[n] == 0 {
                        ids[n] = label;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }
    }
    (
        Labels {
            width: w,
            height: h,
            ids,
        },
        starts,
    )
}

/// Background pixels 4-connected to the image border.
fn outside_background(labels: &Labels) -> Vec<bool> {
    let (w, h) = (labels.width, labels.height);
    let mut seen = vec![false; w * h];
    let mut queue = VecDeque::new();
    let seed = |x: usize, y: usize, seen: &mut [bool], queue: &mut VecDeque<(usize, usize)>| {
        let i = y * w + x;
        if labels.ids[i] == 0 && !seen[i] {
            seen[i] = true;
            queue.push_back((x, y));
        }
    };
    for x in 0..w {
        seed(x, 0, &mut seen, &mut queue);
        seed(x, h - 1, &mut seen, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut seen, &mut queue);
        seed(w - 1, y, &mut seen, &mut queue);
    }
    while let Some((x, y)) = queue.pop_front() {
        if x > 0 {
            seed(x - 1, y, &mut seen, &mut queue);
        }
        if x + 1 < w {
            seed(x + 1, y, &mut seen, &mut queue);
        }
        if y > 0 {
            seed(x, y - 1, &mut seen, &mut queue);
        }
        if y + 1 < h {
            seed(x, y + 1, &mut seen, &mut queue);
        }
    }
    seen
}

/// Moore-neighbour trace of the outer boundary starting at the raster-first pixel.
fn trace_boundary(
    labels: &Labels,
    label: u32,
    start: (i32, i32),
    area_hint: usize,
) -> Vec<Point2<f32>> {
    let mut points = vec![start];
    let mut cur = start;
    // the west neighbour of the raster-first pixel is never part of the region
    let mut back = WEST;
    let mut first_move: Option<(i32, i32)> = None;
    let limit = 4 * area_hint + 16;

    for _ in 0..limit {
        let found = (1..=8).map(|k| (back + k) % 8).find_map(|d| {
            let (nx, ny) = (cur.0 + DIRS[d].0, cur.1 + DIRS[d].1);
            (labels.at(nx, ny) == label).then_some(((nx, ny), d))
        });
        let Some((next, d)) = found else {
            break; // isolated pixel
        };
        if cur == start {
            match first_move {
                Some(first) if first == next => break,
                None => first_move = Some(next),
                Some(_) => {}
            }
        }
        let probe = DIRS[(d + 7) % 8];
        let checked = (cur.0 + probe.0, cur.1 + probe.1);
        back = dir_index(checked.0 - next.0, checked.1 - next.1);
        cur = next;
        points.push(cur);
    }
    if points.len() > 1 && points.last() == Some(&start) {
        points.pop();
    }
    points
        .into_iter()
        .map(|(x, y)| Point2::new(x as f32, y as f32))
        .collect()
}

/// Outer contours of non-zero regions that are not nested inside another region's hole.
pub fn find_external_contours(binary: &GrayImageView<'_>) -> Vec<Contour> {
    if binary.width == 0 || binary.height == 0 {
        return Vec::new();
    }
    let (labels, starts) = label_components(binary);
    if starts.is_empty() {
        return Vec::new();
    }
    let outside = outside_background(&labels);

    let mut areas = vec![0usize; starts.len() + 1];
    for &id in &labels.ids {
        areas[id as usize] += 1;
    }

    starts
        .iter()
        .enumerate()
        .filter(|&(_, &(x, y))| x == 0 || outside[y as usize * labels.width + x as usize - 1])
        .map(|(i, &start)| {
            let label = i as u32 + 1;
            Contour {
                points: trace_boundary(&labels, label, start, areas[label as usize]),
            }
        })
        .collect()
}
