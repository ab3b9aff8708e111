// Scalar geometry helpers shared by the simulation systems.
// Headings are in degrees: 0 points along +x, 90 along +y.

/// Euclidean distance between two points.
pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (ax - bx).hypot(ay - by)
}

/// Unit direction for a heading given in degrees.
pub fn heading_vector(heading_deg: f64) -> (f64, f64) {
    let rad = heading_deg.to_radians();
    (rad.cos(), rad.sin())
}

/// Moves a point `amount` units along `heading_deg`.
pub fn advance(x: f64, y: f64, heading_deg: f64, amount: f64) -> (f64, f64) {
    let (dir_x, dir_y) = heading_vector(heading_deg);
    (x + amount * dir_x, y + amount * dir_y)
}
