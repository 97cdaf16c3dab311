//! Deterministic simulation module
//!
//! Everything that moves bodies lives here. Same inputs give same outputs:
//! - Fixed timestep only
//! - Stable iteration order (creation order)
//! - No threading or clock access (see `scheduler` for that)

pub mod body;
pub mod collision;
pub mod manifold;
pub mod shape;
pub mod state;
pub mod tick;

pub use body::{Body, BodyHandle};
pub use collision::{Contact, circle_circle, collide};
pub use manifold::{Manifold, ManifoldPool, mix};
pub use shape::{MassData, PolygonData, Shape, ShapeKind, ShapeType};
pub use state::World;
pub use tick::{advance, step};
