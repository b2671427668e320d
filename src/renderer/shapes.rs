//! Shape generation for 2D primitives

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::Vertex;

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

/// Generate vertices for a band covering `fraction` of a full turn,
/// starting at `start` (radians). `fraction = 1` is a closed ring.
pub fn ring(
    center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    start: f32,
    fraction: f32,
    color: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    let fraction = fraction.clamp(0.0, 1.0);
    let segments = ((segments as f32 * fraction).ceil() as u32).max(1);
    if fraction <= 0.0 {
        return Vec::new();
    }
    let span = 2.0 * PI * fraction;
    let mut vertices = Vec::with_capacity((segments * 6) as usize);

    for i in 0..segments {
        let theta1 = start + (i as f32 / segments as f32) * span;
        let theta2 = start + ((i + 1) as f32 / segments as f32) * span;

        let dir1 = Vec2::new(theta1.cos(), theta1.sin());
        let dir2 = Vec2::new(theta2.cos(), theta2.sin());
        let inner1 = center + dir1 * inner_radius;
        let outer1 = center + dir1 * outer_radius;
        let inner2 = center + dir2 * inner_radius;
        let outer2 = center + dir2 * outer_radius;

        // Two triangles per segment
        vertices.push(Vertex::new(inner1.x, inner1.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(inner2.x, inner2.y, color));

        vertices.push(Vertex::new(inner2.x, inner2.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(outer2.x, outer2.y, color));
    }

    vertices
}

/// Rectangle centered on `center`, rotated by `theta`
pub fn rect(center: Vec2, half_extents: Vec2, theta: f32, color: [f32; 4]) -> Vec<Vertex> {
    let along = Vec2::new(theta.cos(), theta.sin());
    let across = along.perp();
    let a = along * half_extents.x;
    let b = across * half_extents.y;
    let corners = [center - a - b, center + a - b, center + a + b, center - a + b];
    [0, 1, 2, 0, 2, 3]
        .into_iter()
        .map(|i| Vertex::new(corners[i].x, corners[i].y, color))
        .collect()
}

/// Thick line from `start` to `end` (flat ends)
pub fn thick_line(start: Vec2, end: Vec2, thickness: f32, color: [f32; 4]) -> Vec<Vertex> {
    let d = end - start;
    let theta = d.y.atan2(d.x);
    rect(
        (start + end) * 0.5,
        Vec2::new(d.length() * 0.5, thickness * 0.5),
        theta,
        color,
    )
}

/// Axis-aligned rectangular frame of width `thickness` inside `[0, w] × [0, h]`
pub fn frame(width: f32, height: f32, thickness: f32, color: [f32; 4]) -> Vec<Vertex> {
    let t = thickness;
    let mut vertices = Vec::with_capacity(24);
    vertices.extend(thick_line(Vec2::new(0.0, t * 0.5), Vec2::new(width, t * 0.5), t, color));
    vertices.extend(thick_line(
        Vec2::new(0.0, height - t * 0.5),
        Vec2::new(width, height - t * 0.5),
        t,
        color,
    ));
    vertices.extend(thick_line(Vec2::new(t * 0.5, 0.0), Vec2::new(t * 0.5, height), t, color));
    vertices.extend(thick_line(
        Vec2::new(width - t * 0.5, 0.0),
        Vec2::new(width - t * 0.5, height),
        t,
        color,
    ));
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_vertex_count() {
        assert_eq!(circle(Vec2::ZERO, 5.0, [1.0; 4], 16).len(), 48);
    }

    #[test]
    fn test_partial_ring() {
        assert_eq!(ring(Vec2::ZERO, 4.0, 5.0, 0.0, 1.0, [1.0; 4], 32).len(), 32 * 6);
        assert_eq!(ring(Vec2::ZERO, 4.0, 5.0, 0.0, 0.5, [1.0; 4], 32).len(), 16 * 6);
        assert!(ring(Vec2::ZERO, 4.0, 5.0, 0.0, 0.0, [1.0; 4], 32).is_empty());
    }

    #[test]
    fn test_thick_line_spans_endpoints() {
        let v = thick_line(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 2.0, [1.0; 4]);
        assert_eq!(v.len(), 6);
        let xs: Vec<f32> = v.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = v.iter().map(|v| v.position[1]).collect();
        assert!(xs.iter().all(|&x| (-1e-5..=10.0 + 1e-5).contains(&x)));
        assert!(ys.iter().all(|&y| y.abs() <= 1.0 + 1e-5));
    }
}
