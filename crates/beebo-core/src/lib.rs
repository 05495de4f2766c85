//! Beebo Core - Core types, part catalog, scene graph and geometry
//!
//! This crate provides the foundational types for the Beebo assembler:
//! - Placement slots (primary categories and accessory subcategories)
//! - The part catalog loaded from TOML
//! - Renderer-independent scene graph data for parsed models
//! - Bounding boxes and ray queries for collision probing

pub mod catalog;
pub mod geometry;
pub mod scene;
pub mod slot;

pub use catalog::{AccessoryCatalog, Catalog, CatalogError, Direction, PartDefinition, NONE_ID};
pub use geometry::{ray_triangle_intersect, Aabb, Ray, AXIS_DIRECTIONS};
pub use scene::{Material, Mesh, SceneNode};
pub use slot::{AccessorySlot, PrimaryCategory, Slot, UnknownSlot};
