use imageproc::point::Point;
use imageproc::rect::Rect;

/// Enclosed area of a closed polygon (shoelace formula), always non-negative.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area = points.iter().zip(points.iter().cycle().skip(1)).fold(0i64, |acc, (p, q)| {
        acc + p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
    });
    (twice_area as f64 / 2.0).abs()
}

/// Axis aligned bounding rectangle, inclusive of the extreme pixels.
/// The rectangle is clipped to a `width` x `height` raster, None when nothing is left.
pub fn bounding_rect(points: &[Point<i32>], width: u32, height: u32) -> Option<Rect> {
    let first = points.first()?;
    let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
    for p in points {
        xmin = xmin.min(p.x);
        ymin = ymin.min(p.y);
        xmax = xmax.max(p.x);
        ymax = ymax.max(p.y);
    }
    let xmin = xmin.max(0);
    let ymin = ymin.max(0);
    let xmax = xmax.min(width as i32 - 1);
    let ymax = ymax.min(height as i32 - 1);
    if xmax < xmin || ymax < ymin {
        return None;
    }
    let w = (xmax - xmin + 1) as u32;
    let h = (ymax - ymin + 1) as u32;
    Some(Rect::at(xmin, ymin).of_size(w, h))
}

/// Distance from `p` to the infinite line through `a` and `b`.
/// Falls back to the point distance when `a == b`.
pub fn line_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return point_distance(p, a);
    }
    ((p.x - a.x) as f64 * dy - (p.y - a.y) as f64 * dx).abs() / len
}

pub fn point_distance(p: Point<i32>, q: Point<i32>) -> f64 {
    let dx = (p.x - q.x) as f64;
    let dy = (p.y - q.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Drop the interior points of straight horizontal, vertical and diagonal runs
/// of a closed chain, keeping only the points where the direction changes.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |from: Point<i32>, to: Point<i32>| ((to.x - from.x).signum(), (to.y - from.y).signum());
    let kept: Vec<Point<i32>> = (0..n).filter(|&i| {
        let prev = points[(i + n - 1) % n];
        let next = points[(i + 1) % n];
        step(prev, points[i]) != step(points[i], next)
    }).map(|i| points[i]).collect();
    if kept.len() < 2 {
        return points.to_vec();
    }
    kept
}
