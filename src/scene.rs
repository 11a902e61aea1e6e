//! Scene graph: a tree of group/mesh/light/helper nodes owned by one session.
//!
//! The graph is backed by a [`hecs::World`]; tree structure comes from
//! [`Parent`] components. Nodes carry a [`Transform`] and, when they should
//! participate in picking, a [`Collider`]. World-space transforms are resolved
//! by walking the parent chain, so picking and rendering see composed
//! positions without the graph maintaining a cached hierarchy.
//!
//! A scene graph is created fresh per session and must not be touched after
//! its session begins disposal; the session enforces this by dropping the
//! graph during `dispose` and handing out a dead [`LiveToken`](crate::LiveToken)
//! to any still-pending async completions.

use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, World};

use crate::picking::Collider;

/// What a node contributes to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Pure grouping node; no drawable content of its own.
    Group,
    /// Drawable geometry.
    Mesh,
    /// Light source.
    Light,
    /// Visual aid (axes, grid, bounding box outline).
    Helper,
}

/// Identity component present on every node.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub name: String,
}

/// Tree edge: the entity this node is parented under.
#[derive(Clone, Copy, Debug)]
pub struct Parent(pub Entity);

/// Position, rotation, and scale of a node relative to its parent.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set the position (builder style).
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the rotation (builder style).
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set a uniform scale (builder style).
    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Set a per-axis scale (builder style).
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// The equivalent affine matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Compose `child` under `self` (both as parent-relative transforms).
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale * child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }
}

/// Tree of drawable/lightable nodes for one session.
pub struct SceneGraph {
    world: World,
}

impl SceneGraph {
    /// Create an empty scene graph.
    pub fn new() -> Self {
        Self {
            world: World::new(),
        }
    }

    fn spawn(
        &mut self,
        kind: NodeKind,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        let entity = self.world.spawn((
            Node {
                kind,
                name: name.into(),
            },
            transform,
        ));
        if let Some(parent) = parent {
            // Spawn just succeeded, so the insert cannot fail.
            let _ = self.world.insert_one(entity, Parent(parent));
        }
        entity
    }

    /// Add a grouping node.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        self.spawn(NodeKind::Group, name, transform, parent)
    }

    /// Add a mesh node.
    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        self.spawn(NodeKind::Mesh, name, transform, parent)
    }

    /// Add a light node.
    pub fn add_light(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        self.spawn(NodeKind::Light, name, transform, parent)
    }

    /// Add a helper node.
    pub fn add_helper(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        self.spawn(NodeKind::Helper, name, transform, parent)
    }

    /// Attach a picking collider to a node. Ignored for unknown nodes.
    pub fn attach_collider(&mut self, node: Entity, collider: Collider) {
        if self.world.insert_one(node, collider).is_err() {
            log::warn!("attach_collider: node {node:?} does not exist");
        }
    }

    /// Reparent a node. Passing `None` moves it to the root.
    ///
    /// A parent that would create a cycle (including self-parenting) is
    /// refused and logged; the node keeps its current parent.
    pub fn set_parent(&mut self, node: Entity, parent: Option<Entity>) {
        match parent {
            Some(parent) => {
                if node == parent || self.is_ancestor(node, parent) {
                    log::warn!("set_parent: refusing cycle at node {node:?}");
                    return;
                }
                if self.world.insert_one(node, Parent(parent)).is_err() {
                    log::warn!("set_parent: node {node:?} does not exist");
                }
            }
            None => {
                let _ = self.world.remove_one::<Parent>(node);
            }
        }
    }

    /// True if `candidate` appears in `node`'s ancestor chain (or is `node`).
    fn is_ancestor(&self, candidate: Entity, mut node: Entity) -> bool {
        loop {
            if node == candidate {
                return true;
            }
            match self.world.get::<&Parent>(node) {
                Ok(parent) => node = parent.0,
                Err(_) => return false,
            }
        }
    }

    /// Node metadata, if the node exists.
    pub fn node(&self, entity: Entity) -> Option<Node> {
        self.world.get::<&Node>(entity).ok().map(|n| (*n).clone())
    }

    /// Local transform of a node, if it exists.
    pub fn local_transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    /// World-space transform of a node, composed through its parent chain.
    ///
    /// Unknown entities resolve to the identity transform.
    pub fn world_transform(&self, entity: Entity) -> Transform {
        let local = match self.local_transform(entity) {
            Some(t) => t,
            None => return Transform::default(),
        };
        match self.world.get::<&Parent>(entity) {
            Ok(parent) => self.world_transform(parent.0).compose(&local),
            Err(_) => local,
        }
    }

    /// Remove a node and its entire subtree.
    pub fn remove(&mut self, entity: Entity) {
        let children: Vec<Entity> = self
            .world
            .query::<&Parent>()
            .iter()
            .filter(|(_, p)| p.0 == entity)
            .map(|(e, _)| e)
            .collect();
        for child in children {
            self.remove(child);
        }
        let _ = self.world.despawn(entity);
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> u32 {
        self.world.len()
    }

    /// True when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    /// The backing ECS world, for queries (picking iterates colliders).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the backing world, for demo-side animation.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nodes_spawn_and_count() {
        let mut scene = SceneGraph::new();
        assert!(scene.is_empty());
        let group = scene.add_group("root", Transform::new(), None);
        scene.add_mesh("cube", Transform::new(), Some(group));
        scene.add_light("sun", Transform::from_position(Vec3::new(0.0, 10.0, 0.0)), None);
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.node(group).unwrap().kind, NodeKind::Group);
    }

    #[test]
    fn world_transform_composes_parent_chain() {
        let mut scene = SceneGraph::new();
        let group = scene.add_group(
            "offset",
            Transform::from_position(Vec3::new(5.0, 0.0, 0.0)).uniform_scale(2.0),
            None,
        );
        let mesh = scene.add_mesh(
            "child",
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
            Some(group),
        );

        let world = scene.world_transform(mesh);
        assert_relative_eq!(world.position.x, 7.0);
        assert_relative_eq!(world.scale.x, 2.0);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut scene = SceneGraph::new();
        let group = scene.add_group("root", Transform::new(), None);
        let child = scene.add_group("mid", Transform::new(), Some(group));
        scene.add_mesh("leaf", Transform::new(), Some(child));
        scene.add_mesh("sibling", Transform::new(), None);

        scene.remove(group);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut scene = SceneGraph::new();
        let a = scene.add_group(
            "a",
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
            None,
        );
        let b = scene.add_group("b", Transform::new(), Some(a));
        let c = scene.add_group("c", Transform::new(), Some(b));

        // Self-parenting and ancestor loops are refused; the chain stays
        // a -> b -> c and the walks below terminate.
        scene.set_parent(a, Some(a));
        scene.set_parent(a, Some(b));
        scene.set_parent(a, Some(c));

        assert_relative_eq!(scene.world_transform(a).position.x, 1.0);
        assert_relative_eq!(scene.world_transform(c).position.x, 1.0);
    }

    #[test]
    fn reparent_to_root() {
        let mut scene = SceneGraph::new();
        let group = scene.add_group(
            "offset",
            Transform::from_position(Vec3::new(3.0, 0.0, 0.0)),
            None,
        );
        let mesh = scene.add_mesh(
            "child",
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
            Some(group),
        );

        scene.set_parent(mesh, None);
        let world = scene.world_transform(mesh);
        assert_relative_eq!(world.position.x, 1.0);
    }
}
