//! Narrow-phase collision detection
//!
//! Every test reports its normal pointing from the first body to the second.
//! Circle pairs are solved analytically, circle/polygon pairs by finding the
//! face of least penetration and the Voronoi region of the circle center, and
//! polygon pairs with the separating axis test followed by reference/incident
//! face clipping (up to two contact points).

use glam::Vec2;

use super::body::Body;
use super::shape::{PolygonData, ShapeKind};

/// A reference face on the second polygon must beat the first by this much
const REFERENCE_FACE_TOLERANCE: f32 = 0.005;

/// Result of a colliding pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal from the first body toward the second
    pub normal: Vec2,
    /// Overlap depth along the normal
    pub penetration: f32,
    /// World-space contact points (first `point_count` are valid)
    pub points: [Vec2; 2],
    pub point_count: usize,
}

impl Contact {
    fn single(normal: Vec2, penetration: f32, point: Vec2) -> Self {
        Self {
            normal,
            penetration,
            points: [point, Vec2::ZERO],
            point_count: 1,
        }
    }

    /// Swap the roles of the two bodies
    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points[..self.point_count]
    }
}

/// Test a pair of bodies, dispatching on their shape kinds
pub fn collide(a: &Body, b: &Body) -> Option<Contact> {
    match (a.shape().kind(), b.shape().kind()) {
        (ShapeKind::Circle { radius: ra }, ShapeKind::Circle { radius: rb }) => {
            circle_circle(a.position, *ra, b.position, *rb)
        }
        (ShapeKind::Circle { radius }, ShapeKind::Polygon(_)) => {
            circle_polygon(a.position, *radius, b)
        }
        (ShapeKind::Polygon(_), ShapeKind::Circle { radius }) => {
            circle_polygon(b.position, *radius, a).map(Contact::flipped)
        }
        (ShapeKind::Polygon(pa), ShapeKind::Polygon(pb)) => polygon_polygon(a, pa, b, pb),
    }
}

/// Two circles overlap iff their center distance is below the radius sum
pub fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Option<Contact> {
    let delta = pos_b - pos_a;
    let radius = radius_a + radius_b;
    let dist_sq = delta.length_squared();

    if dist_sq >= radius * radius {
        return None;
    }

    let distance = dist_sq.sqrt();
    if distance == 0.0 {
        // Concentric: any axis works, pick +x for determinism
        return Some(Contact::single(Vec2::X, radius, pos_a));
    }

    let normal = delta / distance;
    Some(Contact::single(
        normal,
        radius - distance,
        pos_a + normal * radius_a,
    ))
}

/// Circle (first) against a polygon body (second)
fn circle_polygon(center: Vec2, radius: f32, poly_body: &Body) -> Option<Contact> {
    let poly = poly_body.shape().polygon_data()?;
    let transform = poly_body.shape().transform();

    // Circle center in polygon model space
    let local = transform.transpose() * (center - poly_body.position);

    // Face of least penetration
    let mut separation = f32::MIN;
    let mut face = 0;
    for (i, (&v, &n)) in poly.positions().iter().zip(poly.normals()).enumerate() {
        let s = n.dot(local - v);
        if s > radius {
            return None;
        }
        if s > separation {
            separation = s;
            face = i;
        }
    }

    let (v1, v2) = poly.face(face);

    // Center inside the polygon
    if separation < f32::EPSILON {
        let normal = -(transform * poly.normals()[face]);
        return Some(Contact::single(
            normal,
            radius - separation,
            center + normal * radius,
        ));
    }

    // Voronoi region of the face the center lies in
    let dot1 = (local - v1).dot(v2 - v1);
    let dot2 = (local - v2).dot(v1 - v2);

    let corner = if dot1 <= 0.0 {
        Some(v1)
    } else if dot2 <= 0.0 {
        Some(v2)
    } else {
        None
    };

    match corner {
        Some(vertex) => {
            let to_vertex = vertex - local;
            let dist_sq = to_vertex.length_squared();
            if dist_sq > radius * radius {
                return None;
            }
            let normal = (transform * to_vertex).normalize_or_zero();
            Some(Contact::single(
                normal,
                radius - dist_sq.sqrt(),
                transform * vertex + poly_body.position,
            ))
        }
        None => {
            let face_normal = poly.normals()[face];
            if (local - v1).dot(face_normal) > radius {
                return None;
            }
            let normal = -(transform * face_normal);
            Some(Contact::single(
                normal,
                radius - separation,
                center + normal * radius,
            ))
        }
    }
}

/// Polygon against polygon: SAT on both shapes' face normals, then clipping
fn polygon_polygon(a: &Body, pa: &PolygonData, b: &Body, pb: &PolygonData) -> Option<Contact> {
    let (separation_a, face_a) = axis_least_penetration(a, pa, b, pb);
    if separation_a >= 0.0 {
        return None;
    }

    let (separation_b, face_b) = axis_least_penetration(b, pb, a, pa);
    if separation_b >= 0.0 {
        return None;
    }

    // Ties go to the first body's face
    let flip = separation_b > separation_a + REFERENCE_FACE_TOLERANCE;
    let (ref_body, ref_poly, inc_body, inc_poly, ref_index) = if flip {
        (b, pb, a, pa, face_b)
    } else {
        (a, pa, b, pb, face_a)
    };

    let mut incident = incident_face(ref_body, ref_poly, inc_body, inc_poly, ref_index);

    // Reference face in world space
    let ref_transform = ref_body.shape().transform();
    let (r1, r2) = ref_poly.face(ref_index);
    let v1 = ref_transform * r1 + ref_body.position;
    let v2 = ref_transform * r2 + ref_body.position;

    let side_normal = (v2 - v1).normalize_or_zero();
    let ref_face_normal = Vec2::new(side_normal.y, -side_normal.x);
    let ref_c = ref_face_normal.dot(v1);
    let neg_side = -side_normal.dot(v1);
    let pos_side = side_normal.dot(v2);

    // Clip the incident face to the reference face's side planes
    if clip(-side_normal, neg_side, &mut incident) < 2 {
        return None;
    }
    if clip(side_normal, pos_side, &mut incident) < 2 {
        return None;
    }

    // Keep the clipped points behind the reference face
    let mut points = [Vec2::ZERO; 2];
    let mut point_count = 0;
    let mut depth = 0.0;
    for point in incident {
        let separation = ref_face_normal.dot(point) - ref_c;
        if separation <= 0.0 {
            points[point_count] = point;
            point_count += 1;
            depth -= separation;
        }
    }

    if point_count == 0 {
        return None;
    }

    Some(Contact {
        normal: if flip { -ref_face_normal } else { ref_face_normal },
        penetration: depth / point_count as f32,
        points,
        point_count,
    })
}

/// Largest signed distance of `b`'s support points from `a`'s face planes
///
/// Negative means every face of `a` is penetrated. Returns the face index.
fn axis_least_penetration(a: &Body, pa: &PolygonData, b: &Body, pb: &PolygonData) -> (f32, usize) {
    let ta = a.shape().transform();
    let tb_t = b.shape().transform().transpose();

    let mut best_distance = f32::MIN;
    let mut best_index = 0;

    for (i, (&v, &n)) in pa.positions().iter().zip(pa.normals()).enumerate() {
        // Face normal of A in B's model space
        let normal = tb_t * (ta * n);
        let support = pb.support(-normal);

        // Face vertex of A in B's model space
        let vertex = tb_t * (ta * v + a.position - b.position);

        let distance = normal.dot(support - vertex);
        if distance > best_distance {
            best_distance = distance;
            best_index = i;
        }
    }

    (best_distance, best_index)
}

/// Incident face (world space): the face of `inc` most anti-parallel to the reference normal
fn incident_face(
    ref_body: &Body,
    ref_poly: &PolygonData,
    inc_body: &Body,
    inc_poly: &PolygonData,
    ref_index: usize,
) -> [Vec2; 2] {
    let inc_transform = inc_body.shape().transform();
    let reference_normal =
        inc_transform.transpose() * (ref_body.shape().transform() * ref_poly.normals()[ref_index]);

    let mut incident = 0;
    let mut min_dot = f32::MAX;
    for (i, &n) in inc_poly.normals().iter().enumerate() {
        let dot = reference_normal.dot(n);
        if dot < min_dot {
            min_dot = dot;
            incident = i;
        }
    }

    let (p1, p2) = inc_poly.face(incident);
    [
        inc_transform * p1 + inc_body.position,
        inc_transform * p2 + inc_body.position,
    ]
}

/// Clip a segment against the half-plane `normal · p <= offset`
///
/// Returns how many points remain; the segment is rewritten in place.
fn clip(normal: Vec2, offset: f32, face: &mut [Vec2; 2]) -> usize {
    let mut out = *face;
    let mut count = 0;

    let distance_a = normal.dot(face[0]) - offset;
    let distance_b = normal.dot(face[1]) - offset;

    if distance_a <= 0.0 {
        out[count] = face[0];
        count += 1;
    }
    if distance_b <= 0.0 {
        out[count] = face[1];
        count += 1;
    }

    // Endpoints on opposite sides: add the intersection point
    if distance_a * distance_b < 0.0 && count < 2 {
        let alpha = distance_a / (distance_a - distance_b);
        out[count] = face[0] + (face[1] - face[0]) * alpha;
        count += 1;
    }

    *face = out;
    count
}
