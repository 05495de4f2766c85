//! Scene graph data produced by asset stores
//!
//! This is the renderer-independent form of a parsed model: a tree of nodes
//! with local transforms, each node carrying zero or more triangle meshes
//! and their materials.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;

/// Surface material flags relevant to presentation normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: Option<String>,
    /// Rendered with alpha blending
    pub transparent: bool,
    /// Base colour alpha, 1.0 = opaque
    pub opacity: f32,
    /// Alpha test threshold, 0.0 = disabled
    pub alpha_test: f32,
    pub alpha_to_coverage: bool,
    /// The colour texture carries an alpha channel
    pub transparent_texture: bool,
    pub depth_write: bool,
    /// Linear RGB
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            transparent: false,
            opacity: 1.0,
            alpha_test: 0.0,
            alpha_to_coverage: false,
            transparent_texture: false,
            depth_write: true,
            emissive: [0.0; 3],
            emissive_intensity: 1.0,
        }
    }
}

impl Material {
    /// Whether the authored material already asks for transparency
    pub fn has_transparency(&self) -> bool {
        self.transparent
            || self.opacity < 1.0
            || self.alpha_test > 0.0
            || self.alpha_to_coverage
            || self.transparent_texture
    }
}

/// Triangle mesh in node-local coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: Option<String>,
    pub positions: Vec<Vec3>,
    /// Triangle list indices; `None` means consecutive vertex triples
    pub indices: Option<Vec<u32>>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    /// Closed box between two corners, 8 vertices and 12 triangles
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let positions = vec![
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        Self::new(positions, Some(indices))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Vertex index triples, one per triangle
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let count = self.triangle_count();
        (0..count).map(move |t| match &self.indices {
            Some(indices) => [indices[t * 3], indices[t * 3 + 1], indices[t * 3 + 2]],
            None => {
                let base = (t * 3) as u32;
                [base, base + 1, base + 2]
            }
        })
    }

    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }
}

/// A node in a model's scene graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: Option<String>,
    /// Transform relative to the parent node
    pub transform: Mat4,
    pub meshes: Vec<Mesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Single node holding one mesh
    pub fn from_mesh(mesh: Mesh) -> Self {
        Self {
            meshes: vec![mesh],
            ..Default::default()
        }
    }

    /// Group node applying `transform` to its children
    pub fn group(transform: Mat4, children: Vec<SceneNode>) -> Self {
        Self {
            transform,
            children,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Visit every mesh with its world transform, depth first
    pub fn visit_meshes<'a>(&'a self, parent: Mat4, visit: &mut impl FnMut(&'a Mesh, Mat4)) {
        let world = parent * self.transform;
        for mesh in &self.meshes {
            visit(mesh, world);
        }
        for child in &self.children {
            child.visit_meshes(world, visit);
        }
    }

    /// Mutable visit of every mesh, depth first
    pub fn for_each_mesh_mut(&mut self, visit: &mut impl FnMut(&mut Mesh)) {
        for mesh in &mut self.meshes {
            visit(mesh);
        }
        for child in &mut self.children {
            child.for_each_mesh_mut(visit);
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(|c| c.mesh_count()).sum::<usize>()
    }

    /// World-space bounds with this node placed under `parent`
    pub fn world_bounds(&self, parent: Mat4) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.visit_meshes(parent, &mut |mesh, world| {
            for p in &mesh.positions {
                bounds.expand(world.transform_point3(*p));
            }
        });
        bounds
    }
}
