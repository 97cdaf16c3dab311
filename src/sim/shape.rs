//! Shape geometry for rigid bodies
//!
//! A shape is either an analytic circle or a convex polygon stored in model
//! space (centroid at the origin, counter-clockwise winding, outward face
//! normals). Polygon storage is a fixed array of `MAX_VERTICES` entries.

use std::f32::consts::TAU;

use glam::{Mat2, Vec2};
use serde::{Deserialize, Serialize};

use crate::consts::{CIRCLE_VERTICES, MAX_VERTICES};
use crate::error::{PhysicsError, Result};
use crate::{cross, polar_to_cartesian, rotation};

/// Areas below this are considered degenerate
const MIN_AREA: f32 = 1e-6;

/// Shape discriminant, as reported to drawing code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Circle,
    Polygon,
}

/// Convex polygon vertices and face normals (model space)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonData {
    vertex_count: usize,
    positions: [Vec2; MAX_VERTICES],
    normals: [Vec2; MAX_VERTICES],
}

impl PolygonData {
    /// Regular polygon inscribed in a circle of `radius`
    pub fn regular(radius: f32, sides: usize) -> Result<Self> {
        require_positive("polygon radius", radius)?;
        if !(3..=MAX_VERTICES).contains(&sides) {
            return Err(PhysicsError::InvalidShapeParameters(format!(
                "polygon sides must be in 3..={}, got {}",
                MAX_VERTICES, sides
            )));
        }

        let step = TAU / sides as f32;
        let vertices: Vec<Vec2> = (0..sides)
            .map(|i| polar_to_cartesian(radius, step * i as f32))
            .collect();
        Self::from_vertices(&vertices)
    }

    /// Axis-aligned rectangle centered on the origin
    pub fn rectangle(width: f32, height: f32) -> Result<Self> {
        require_positive("rectangle width", width)?;
        require_positive("rectangle height", height)?;

        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::from_vertices(&[
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
            Vec2::new(-hw, -hh),
        ])
    }

    /// Build from a convex vertex loop (either winding); computes face normals
    pub fn from_vertices(vertices: &[Vec2]) -> Result<Self> {
        if !(3..=MAX_VERTICES).contains(&vertices.len()) {
            return Err(PhysicsError::InvalidShapeParameters(format!(
                "polygon needs 3..={} vertices, got {}",
                MAX_VERTICES,
                vertices.len()
            )));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidShapeParameters(
                "polygon vertices must be finite".into(),
            ));
        }

        let mut data = Self {
            vertex_count: vertices.len(),
            positions: [Vec2::ZERO; MAX_VERTICES],
            normals: [Vec2::ZERO; MAX_VERTICES],
        };
        data.positions[..vertices.len()].copy_from_slice(vertices);

        let area = data.signed_area();
        if !area.is_finite() || area.abs() < MIN_AREA {
            return Err(PhysicsError::InvalidShapeParameters(format!(
                "polygon area is degenerate ({})",
                area
            )));
        }
        // Keep counter-clockwise winding so normals point outward
        if area < 0.0 {
            data.positions[..data.vertex_count].reverse();
        }

        data.compute_normals();
        Ok(data)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn positions(&self) -> &[Vec2] {
        &self.positions[..self.vertex_count]
    }

    #[inline]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.vertex_count]
    }

    /// Index of the vertex after `i`, wrapping to close the loop
    #[inline]
    pub fn next_index(&self, i: usize) -> usize {
        if i + 1 < self.vertex_count { i + 1 } else { 0 }
    }

    /// Face `i` as its two endpoints
    #[inline]
    pub fn face(&self, i: usize) -> (Vec2, Vec2) {
        (self.positions[i], self.positions[self.next_index(i)])
    }

    /// Extreme vertex along `dir`
    pub fn support(&self, dir: Vec2) -> Vec2 {
        let mut best_projection = f32::MIN;
        let mut best_vertex = Vec2::ZERO;

        for &vertex in self.positions() {
            let projection = vertex.dot(dir);
            if projection > best_projection {
                best_vertex = vertex;
                best_projection = projection;
            }
        }

        best_vertex
    }

    /// Whether a model-space point lies strictly inside the polygon
    pub fn contains(&self, point: Vec2) -> bool {
        self.positions()
            .iter()
            .zip(self.normals())
            .all(|(&v, &n)| n.dot(point - v) < 0.0)
    }

    /// Shrink every vertex toward the origin by `factor`
    pub(crate) fn scale(&mut self, factor: f32) {
        for p in &mut self.positions[..self.vertex_count] {
            *p *= factor;
        }
    }

    fn signed_area(&self) -> f32 {
        (0..self.vertex_count)
            .map(|i| {
                let (a, b) = self.face(i);
                cross(a, b) / 2.0
            })
            .sum()
    }

    fn compute_normals(&mut self) {
        for i in 0..self.vertex_count {
            let (a, b) = self.face(i);
            let face = b - a;
            self.normals[i] = Vec2::new(face.y, -face.x).normalize_or_zero();
        }
    }
}

/// Mass and rotational inertia derived from a shape and density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassData {
    pub mass: f32,
    pub inertia: f32,
}

impl MassData {
    pub fn circle(radius: f32, density: f32) -> Result<Self> {
        require_positive("circle radius", radius)?;
        require_positive("density", density)?;

        let mass = std::f32::consts::PI * radius * radius * density;
        Self::checked(mass, mass * radius * radius)
    }

    /// Compute mass properties and move the polygon's centroid to the origin
    ///
    /// The polygon is split into triangles fanning from the origin; each
    /// contributes its area and second moment about the origin.
    pub fn polygon(data: &mut PolygonData, density: f32) -> Result<Self> {
        require_positive("density", density)?;

        const K_INV3: f32 = 1.0 / 3.0;
        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;

        for i in 0..data.vertex_count() {
            let (p1, p2) = data.face(i);
            let d = cross(p1, p2);
            let triangle_area = d / 2.0;

            area += triangle_area;
            center += triangle_area * K_INV3 * (p1 + p2);

            let intx2 = p1.x * p1.x + p2.x * p1.x + p2.x * p2.x;
            let inty2 = p1.y * p1.y + p2.y * p1.y + p2.y * p2.y;
            inertia += (0.25 * K_INV3 * d) * (intx2 + inty2);
        }

        if !area.is_finite() || area < MIN_AREA {
            return Err(PhysicsError::InvalidShapeParameters(format!(
                "polygon area is degenerate ({})",
                area
            )));
        }

        center /= area;
        if !center.is_finite() {
            return Err(PhysicsError::InvalidShapeParameters(
                "polygon centroid is not finite".into(),
            ));
        }
        for p in &mut data.positions[..data.vertex_count] {
            *p -= center;
        }
        // Parallel axis theorem: inertia was accumulated about the old origin
        let inertia = inertia - area * center.length_squared();

        Self::checked(density * area, density * inertia)
    }

    /// Accept only values whose reciprocals the solver can use
    fn checked(mass: f32, inertia: f32) -> Result<Self> {
        for (what, value) in [("mass", mass), ("inertia", inertia)] {
            let usable = value.is_finite() && value > 0.0 && (1.0 / value).is_finite();
            if !usable {
                return Err(PhysicsError::InvalidShapeParameters(format!(
                    "{} out of range ({})",
                    what, value
                )));
            }
        }
        Ok(Self { mass, inertia })
    }
}

/// Geometry variant of a shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle { radius: f32 },
    Polygon(PolygonData),
}

/// A body's collision shape plus its cached orientation matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    kind: ShapeKind,
    transform: Mat2,
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Self {
            kind: ShapeKind::Circle { radius },
            transform: Mat2::IDENTITY,
        }
    }

    pub fn polygon(data: PolygonData) -> Self {
        Self {
            kind: ShapeKind::Polygon(data),
            transform: Mat2::IDENTITY,
        }
    }

    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn shape_type(&self) -> ShapeType {
        match self.kind {
            ShapeKind::Circle { .. } => ShapeType::Circle,
            ShapeKind::Polygon(_) => ShapeType::Polygon,
        }
    }

    /// Circle radius, 0 for polygons
    pub fn radius(&self) -> f32 {
        match self.kind {
            ShapeKind::Circle { radius } => radius,
            ShapeKind::Polygon(_) => 0.0,
        }
    }

    pub fn polygon_data(&self) -> Option<&PolygonData> {
        match &self.kind {
            ShapeKind::Polygon(data) => Some(data),
            ShapeKind::Circle { .. } => None,
        }
    }

    /// Cached rotation matrix (model to world orientation)
    #[inline]
    pub fn transform(&self) -> Mat2 {
        self.transform
    }

    pub(crate) fn set_orientation(&mut self, radians: f32) {
        self.transform = rotation(radians);
    }

    /// Number of vertices used to draw this shape
    pub fn vertex_count(&self) -> usize {
        match &self.kind {
            ShapeKind::Circle { .. } => CIRCLE_VERTICES,
            ShapeKind::Polygon(data) => data.vertex_count(),
        }
    }

    /// Vertex `i` relative to the body position, with orientation applied
    ///
    /// Circles are sampled at `CIRCLE_VERTICES` evenly spaced angles.
    pub fn vertex_offset(&self, i: usize) -> Option<Vec2> {
        match &self.kind {
            ShapeKind::Circle { radius } => (i < CIRCLE_VERTICES)
                .then(|| polar_to_cartesian(*radius, TAU / CIRCLE_VERTICES as f32 * i as f32)),
            ShapeKind::Polygon(data) => data.positions().get(i).map(|&p| self.transform * p),
        }
    }

    /// Whether a point given relative to the body position lies inside
    pub fn contains_offset(&self, offset: Vec2) -> bool {
        match &self.kind {
            ShapeKind::Circle { radius } => offset.length_squared() < radius * radius,
            ShapeKind::Polygon(data) => data.contains(self.transform.transpose() * offset),
        }
    }
}

fn require_positive(what: &str, value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidShapeParameters(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}
