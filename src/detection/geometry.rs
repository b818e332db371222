use super::types::{Point, Quad};

/// Midpoint of the diagonal from `corners[0]` to `corners[2]`
///
/// Only this one diagonal is used; for a non-parallelogram the result is not
/// the centroid. Coordinates are floored (`div_euclid`), so odd sums round
/// toward negative infinity.
pub fn diagonal_center(quad: &Quad) -> Point {
    let [a, _, c, _] = quad.corners;
    Point::new((a.x + c.x).div_euclid(2), (a.y + c.y).div_euclid(2))
}
