//! Utilities for generating examples, benchmarks, and test cases.

use kurbo::Point;

use crate::{Region, Ring};

fn polygons(polys: impl IntoIterator<Item = Vec<Point>>) -> Region {
    Region::new(
        polys
            .into_iter()
            .filter_map(|pts| Ring::from_points(pts).ok()),
    )
}

/// Generate a bunch of squares, arranged in a grid.
///
/// The bottom-left of the first square is at (x0, y0). Each square has size
/// `size x size`, and the distance between squares (both horizontally and
/// vertically) is `offset`.
///
/// If `slant` is non-zero, generates parallelograms instead of squares: the
/// right-hand side of each square gets translated up by `slant`.
fn squares((x0, y0): (f64, f64), size: f64, offset: f64, slant: f64, count: usize) -> Region {
    let mut ret = Vec::new();
    for i in 0..count {
        let x = x0 + i as f64 * offset;
        for j in 0..count {
            let y = y0 + j as f64 * offset;
            ret.push(vec![
                Point::new(x, y),
                Point::new(x + size, y + slant),
                Point::new(x + size, y + size + slant),
                Point::new(x, y + size),
            ]);
        }
    }
    polygons(ret)
}

/// Generate an `n` by `n` checkerboard-like pattern with overlapping squares.
/// For `n = 3`, it looks like:
///
/// ```text
/// ┌────┐ ┌────┐ ┌────┐
/// │    │ │    │ │    │
/// │  ┌─┼─┼─┐┌─┼─┼─┐  │
/// └──┼─┘ └─┼┼─┘ └─┼──┘
/// ┌──┼─┐ ┌─┼┼─┐ ┌─┼──┐
/// │  └─┼─┼─┘└─┼─┼─┘  │
/// │  ┌─┼─┼─┐┌─┼─┼─┐  │
/// └──┼─┘ └─┼┼─┘ └─┼──┘
/// ┌──┼─┐ ┌─┼┼─┐ ┌─┼──┐
/// │  └─┼─┼─┘└─┼─┼─┘  │
/// │    │ │    │ │    │
/// └────┘ └────┘ └────┘
/// ```
///
/// We return the pattern as two regions: the outer collection of `n x n`
/// non-overlapping squares, and the inner collection of `(n - 1) x (n - 1)`
/// non-overlapping squares.
pub fn checkerboard(n: usize) -> (Region, Region) {
    (
        squares((0.0, 0.0), 30.0, 40.0, 0.0, n),
        squares((20.0, 20.0), 30.0, 40.0, 0.0, n.saturating_sub(1)),
    )
}

/// Like `checkerboard`, but with no exactly-horizontal lines.
pub fn slanted_checkerboard(n: usize) -> (Region, Region) {
    (
        squares((0.0, 0.0), 30.0, 40.0, 1.0, n),
        squares((20.0, 20.0), 30.0, 40.0, 1.0, n.saturating_sub(1)),
    )
}

/// The "evens" are a bunch of long, skinny parallelograms going from
/// bottom-left to top-right. The "odds" go from bottom-right to top-left.
pub fn slanties(n: usize) -> (Region, Region) {
    let h = 20.0 * n as f64;

    let mut even = Vec::new();
    let mut odd = Vec::new();
    for i in 0..n {
        let x_off = 20.0 * i as f64;
        even.push(vec![
            Point::new(x_off, 0.0),
            Point::new(x_off + 10.0, 0.0),
            Point::new(x_off + h + 10.0, h),
            Point::new(x_off + h, h),
        ]);

        odd.push(vec![
            Point::new(x_off + h, 0.0),
            Point::new(x_off + h + 10.0, 0.0),
            Point::new(x_off + 10.0, h),
            Point::new(x_off, h),
        ]);
    }

    (polygons(even), polygons(odd))
}

/// An `n` by `n` grid of circles of radius 10, and another grid of the same
/// circles shifted so that each one overlaps up to four of the first.
pub fn circles(n: usize) -> (Region, Region) {
    let grid = |offset: f64, count: usize| {
        Region::new((0..count).flat_map(|i| {
            (0..count).filter_map(move |j| {
                let center = Point::new(offset + 25.0 * i as f64, offset + 25.0 * j as f64);
                Ring::circle(center, 10.0).ok()
            })
        }))
    };
    (grid(0.0, n), grid(12.5, n.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_is_counter_clockwise() {
        let (a, b) = checkerboard(3);
        assert_eq!(a.rings().len(), 9);
        assert_eq!(b.rings().len(), 4);
        let (c, d) = slanties(3);
        let (e, f) = circles(2);
        for region in [a, b, c, d, e, f] {
            assert!(region.rings().iter().all(|r| !r.is_clockwise()));
        }
    }

    #[test]
    fn checkerboard_areas() {
        let (a, b) = checkerboard(2);
        assert!((a.area() - 4.0 * 900.0).abs() < 1e-9);
        assert!((b.area() - 900.0).abs() < 1e-9);
    }
}
