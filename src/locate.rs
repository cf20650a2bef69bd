//! Plate locator: picks the first quadrilateral among the largest edge contours.
//!
//! The search is greedy. Contours are ranked by enclosed area only and the first
//! one whose approximation has exactly four vertices wins, so a rectangular
//! shape larger than the plate (a headlight bezel, a window) is accepted ahead
//! of the plate itself.

use image::GrayImage;
use imageproc::contours;
use imageproc::geometry;
use imageproc::point::Point;
use log::{ debug, trace };

use std::cmp::Ordering;

use crate::config::PipelineConfig;
use crate::utils::{ compress_chain, line_distance, point_distance, polygon_area };

/// Four vertex plate candidate, in contour order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad([Point<i32>; 4]);

impl Quad {
    pub fn new(points: [Point<i32>; 4]) -> Self {
        Self(points)
    }

    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        match points {
            [a, b, c, d] => Some(Self([*a, *b, *c, *d])),
            _ => None,
        }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.0
    }
}

pub fn find_plate(edges: &GrayImage, config: &PipelineConfig) -> Option<Quad> {
    let found = contours::find_contours::<i32>(edges);
    debug!("{} contours in edge map", found.len());

    let mut ranked: Vec<(f64, Vec<Point<i32>>)> = found.into_iter().map(|contour| {
        let points = compress_chain(&contour.points);
        (polygon_area(&points), points)
    }).collect();
    // stable, equal areas keep discovery order
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    ranked.into_iter().take(config.max_candidates).enumerate().find_map(|(rank, (area, points))| {
        let perimeter = geometry::arc_length(&points, true);
        if perimeter <= 0.0 {
            return None;
        }
        let approx = approximate_closed(&points, config.epsilon_ratio * perimeter);
        trace!("contour #{} area {:.1} perimeter {:.1} -> {} vertices", rank, area, perimeter, approx.len());
        let quad = Quad::from_points(&approx)?;
        debug!("plate candidate at rank {}: {:?}", rank, quad.points());
        Some(quad)
    })
}

fn farthest_from(points: &[Point<i32>], from: usize) -> usize {
    let origin = points[from];
    points.iter().enumerate().fold((from, 0.0), |best, (i, p)| {
        let d = point_distance(origin, *p);
        if d > best.1 { (i, d) } else { best }
    }).0
}

/// Douglas-Peucker on an open chain, both end points are kept.
fn simplify_chain(chain: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let last = chain.len() - 1;
    let mut keep = vec![false; chain.len()];
    keep[0] = true;
    keep[last] = true;

    let mut pending = vec![(0, last)];
    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }
        let (index, dmax) = (start + 1..end).fold((start, 0.0), |best, i| {
            let d = line_distance(chain[i], chain[start], chain[end]);
            if d > best.1 { (i, d) } else { best }
        });
        if dmax > epsilon {
            keep[index] = true;
            pending.push((start, index));
            pending.push((index, end));
        }
    }

    chain.iter().zip(keep).filter(|(_, k)| *k).map(|(p, _)| *p).collect()
}

/// Polygon approximation of a closed contour.
///
/// The contour is split at two mutually distant points and each half is
/// simplified independently, so the result does not depend on where the
/// contour tracing happened to start. No vertex is repeated at the end.
pub fn approximate_closed(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }
    let a = farthest_from(contour, farthest_from(contour, 0));
    let b = farthest_from(contour, a);
    if point_distance(contour[a], contour[b]) <= epsilon {
        return vec![contour[a]];
    }

    // walk the loop starting at `a`, closing back on it
    let ring: Vec<Point<i32>> = (0..=n).map(|i| contour[(a + i) % n]).collect();
    let split = (b + n - a) % n;

    let mut approx = simplify_chain(&ring[..=split], epsilon);
    approx.pop();
    approx.extend(simplify_chain(&ring[split..], epsilon));
    approx.pop();
    approx
}


#[cfg(test)]
mod test {
    use super::*;

    use imageproc::drawing;
    use imageproc::rect::Rect;
    use image::Luma;

    use crate::utils;

    const EDGE: Luma<u8> = Luma([255]);

    fn quad_bounds(quad: &Quad) -> (i32, i32, u32, u32) {
        let rect = utils::bounding_rect(quad.points(), 1000, 1000).unwrap();
        (rect.left(), rect.top(), rect.width(), rect.height())
    }

    fn assert_close(actual: (i32, i32, u32, u32), expected: (i32, i32, u32, u32)) {
        assert!((actual.0 - expected.0).abs() <= 1, "{:?} vs {:?}", actual, expected);
        assert!((actual.1 - expected.1).abs() <= 1, "{:?} vs {:?}", actual, expected);
        assert!((actual.2 as i32 - expected.2 as i32).abs() <= 2, "{:?} vs {:?}", actual, expected);
        assert!((actual.3 as i32 - expected.3 as i32).abs() <= 2, "{:?} vs {:?}", actual, expected);
    }

    #[test]
    fn empty_edge_map_has_no_candidate() {
        let edges = GrayImage::new(64, 48);
        assert!(find_plate(&edges, &PipelineConfig::default()).is_none());
    }

    #[test]
    fn open_line_has_no_candidate() {
        let mut edges = GrayImage::new(64, 48);
        drawing::draw_line_segment_mut(&mut edges, (5.0, 10.0), (55.0, 30.0), EDGE);
        assert!(find_plate(&edges, &PipelineConfig::default()).is_none());
    }

    #[test]
    fn finds_rectangle_outline() {
        let mut edges = GrayImage::new(100, 60);
        drawing::draw_hollow_rect_mut(&mut edges, Rect::at(20, 15).of_size(50, 20), EDGE);
        let quad = find_plate(&edges, &PipelineConfig::default()).expect("rectangle should be found");
        assert_close(quad_bounds(&quad), (20, 15, 50, 20));
    }

    #[test]
    fn skips_larger_non_quadrilateral() {
        let mut edges = GrayImage::new(200, 150);
        drawing::draw_hollow_circle_mut(&mut edges, (60, 75), 40, EDGE);
        drawing::draw_hollow_rect_mut(&mut edges, Rect::at(120, 60).of_size(40, 20), EDGE);
        let quad = find_plate(&edges, &PipelineConfig::default()).expect("rectangle should be found");
        assert_close(quad_bounds(&quad), (120, 60, 40, 20));
    }

    #[test]
    fn largest_quadrilateral_wins() {
        let mut edges = GrayImage::new(200, 150);
        drawing::draw_hollow_rect_mut(&mut edges, Rect::at(10, 10).of_size(100, 60), EDGE);
        drawing::draw_hollow_rect_mut(&mut edges, Rect::at(130, 100).of_size(50, 20), EDGE);
        let quad = find_plate(&edges, &PipelineConfig::default()).unwrap();
        assert_close(quad_bounds(&quad), (10, 10, 100, 60));
    }

    #[test]
    fn candidates_beyond_the_limit_are_ignored() {
        let mut edges = GrayImage::new(200, 150);
        drawing::draw_hollow_circle_mut(&mut edges, (60, 75), 40, EDGE);
        drawing::draw_hollow_rect_mut(&mut edges, Rect::at(120, 60).of_size(40, 20), EDGE);
        let config = PipelineConfig { max_candidates: 1, ..PipelineConfig::default() };
        assert!(find_plate(&edges, &config).is_none());
    }

    #[test]
    fn dense_rectangle_contour_reduces_to_corners() {
        let mut contour = Vec::new();
        for x in 0..30 { contour.push(Point::new(x, 0)); }
        for y in 0..10 { contour.push(Point::new(30, y)); }
        for x in (1..=30).rev() { contour.push(Point::new(x, 10)); }
        for y in (1..=10).rev() { contour.push(Point::new(0, y)); }
        let approx = approximate_closed(&contour, 0.02 * geometry::arc_length(&contour, true));
        assert_eq!(approx.len(), 4);
        for corner in &[Point::new(0, 0), Point::new(30, 0), Point::new(30, 10), Point::new(0, 10)] {
            assert!(approx.contains(corner), "{:?} missing from {:?}", corner, approx);
        }
    }

    #[test]
    fn tiny_contour_collapses() {
        let contour = vec![Point::new(0, 0), Point::new(1, 0), Point::new(1, 1)];
        assert_eq!(approximate_closed(&contour, 5.0).len(), 1);
    }
}
