//! Arena-backed scene graph produced by the builder.
//!
//! Nodes are addressed by generational [`NodeHandle`]s; every node carries a
//! structured [`NamePath`] whose flattened form is unique across the graph and
//! indexed for constant-time lookup.

pub mod naming;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use sha2::{Digest, Sha256};

use crate::geometry::RenderableLeaf;
use crate::material::Material;
use crate::render::light::LightNode;
use naming::{ordinal_segment, NamePath, NameSuffix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodLevel {
    pub node: NodeHandle,
    pub min_distance: f32,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    /// Levels sorted by ascending minimum distance.
    Lod(Vec<LodLevel>),
    Mesh(RenderableLeaf),
    LightWrapper,
    Light(LightNode),
    LightTarget,
}

impl NodeKind {
    fn tag(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Lod(_) => "lod",
            NodeKind::Mesh(_) => "mesh",
            NodeKind::LightWrapper => "lightwrapper",
            NodeKind::Light(_) => "light",
            NodeKind::LightTarget => "target",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    path: NamePath,
    name: String,
    kind: NodeKind,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    local: Mat4,
    visible: bool,
}

impl GraphNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &NamePath {
        &self.path
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn local_transform(&self) -> Mat4 {
        self.local
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn as_mesh(&self) -> Option<&RenderableLeaf> {
        match &self.kind {
            NodeKind::Mesh(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&LightNode> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("a node named '{0}' already exists")]
    DuplicateName(String),
    #[error("stale or foreign node handle")]
    StaleHandle,
    #[error("node '{0}' is not a mesh")]
    NotAMesh(String),
    #[error("node '{0}' is not an LOD container")]
    NotALod(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<GraphNode>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    names: HashMap<String, NodeHandle>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_available(&self, name: &str) -> bool {
        !self.names.contains_key(name)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&GraphNode> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, handle: NodeHandle) -> Result<&mut GraphNode> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(GraphError::StaleHandle)
    }

    /// Adds a detached node. Fails if its flattened name is taken.
    pub fn insert(&mut self, path: NamePath, kind: NodeKind) -> Result<NodeHandle> {
        let name = path.encode();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let index = u32::try_from(self.slots.len()).map_err(|_| GraphError::StaleHandle)?;
        let handle = NodeHandle {
            index,
            generation: 0,
        };
        self.slots.push(Slot {
            generation: 0,
            node: Some(GraphNode {
                path,
                name: name.clone(),
                kind,
                parent: None,
                children: Vec::new(),
                local: Mat4::IDENTITY,
                visible: true,
            }),
        });
        self.names.insert(name, handle);
        Ok(handle)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeHandle,
        path: NamePath,
        kind: NodeKind,
    ) -> Result<NodeHandle> {
        self.get(parent).ok_or(GraphError::StaleHandle)?;
        let child = self.insert(path, kind)?;
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// Registers an existing child of `lod` as a level, keeping levels sorted.
    /// Equal distances keep insertion order.
    pub fn add_lod_level(&mut self, lod: NodeHandle, level: NodeHandle, min_distance: f32) -> Result<()> {
        let node = self.get_mut(lod)?;
        let name = node.name.clone();
        match &mut node.kind {
            NodeKind::Lod(levels) => {
                let at = levels
                    .iter()
                    .position(|existing| min_distance < existing.min_distance)
                    .unwrap_or(levels.len());
                levels.insert(
                    at,
                    LodLevel {
                        node: level,
                        min_distance,
                    },
                );
                Ok(())
            }
            _ => Err(GraphError::NotALod(name)),
        }
    }

    pub fn lod_levels(&self, lod: NodeHandle) -> &[LodLevel] {
        match self.get(lod).map(GraphNode::kind) {
            Some(NodeKind::Lod(levels)) => levels,
            _ => &[],
        }
    }

    /// Shows exactly one level of an LOD container for the given viewing
    /// distance: the last whose minimum distance does not exceed it.
    /// Returns the index of the active level.
    pub fn update_lod(&mut self, lod: NodeHandle, distance: f32) -> Option<usize> {
        let levels = self.lod_levels(lod).to_vec();
        if levels.is_empty() {
            return None;
        }
        let mut active = 0;
        for (i, level) in levels.iter().enumerate().skip(1) {
            if distance >= level.min_distance {
                active = i;
            } else {
                break;
            }
        }
        for (i, level) in levels.iter().enumerate() {
            if let Ok(node) = self.get_mut(level.node) {
                node.visible = i == active;
            }
        }
        Some(active)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.names.get(name).copied()
    }

    /// Like [`find_by_name`](Self::find_by_name) but only within the subtree at `ancestor`.
    pub fn find_descendant_by_name(&self, ancestor: NodeHandle, name: &str) -> Option<NodeHandle> {
        let found = self.find_by_name(name)?;
        let mut cursor = Some(found);
        while let Some(handle) = cursor {
            if handle == ancestor {
                return Some(found);
            }
            cursor = self.get(handle).and_then(GraphNode::parent);
        }
        None
    }

    /// Pre-order traversal, children in declaration order.
    pub fn descendants(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(handle) = stack.pop() {
            if let Some(node) = self.get(handle) {
                out.push(handle);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Names under `start` carrying the given suffix, in traversal order.
    pub fn names_with_suffix(&self, start: NodeHandle, suffix: NameSuffix) -> Vec<String> {
        self.descendants(start)
            .into_iter()
            .filter_map(|handle| self.get(handle))
            .filter(|node| node.path.suffix() == suffix)
            .map(|node| node.name.clone())
            .collect()
    }

    /// Copies the subtree rooted at `source` into the existing node `target`.
    ///
    /// `target` keeps its own path and parent but takes over the source's kind,
    /// local transform and visibility; the source's descendants are duplicated
    /// under it with their paths rebased from the source's chain onto the
    /// target's. A rebased name that is already taken gets an ordinal on its
    /// last segment (`foot`, `foot2`, ...) and its own descendants follow the
    /// renamed path. Geometry and materials stay shared.
    pub fn clone_subtree_into(&mut self, source: NodeHandle, target: NodeHandle) -> Result<()> {
        let source_path = self.get(source).ok_or(GraphError::StaleHandle)?.path.clone();
        let target_path = self.get(target).ok_or(GraphError::StaleHandle)?.path.clone();

        // Pre-order, so every parent is planned before its children.
        let subtree = self.descendants(source);
        let mut renamed: HashMap<NodeHandle, (NamePath, NamePath)> = HashMap::new();
        renamed.insert(source, (source_path, target_path));
        let mut planned = Vec::with_capacity(subtree.len().saturating_sub(1));
        let mut planned_names = HashSet::new();
        for &handle in subtree.iter().skip(1) {
            let node = self.get(handle).ok_or(GraphError::StaleHandle)?;
            let (old_parent, new_parent) = node
                .parent
                .and_then(|p| renamed.get(&p))
                .ok_or(GraphError::StaleHandle)?;
            let base = node
                .path
                .rebase(old_parent.segments(), new_parent.segments())
                .unwrap_or_else(|| new_parent.child(node.path.local_segment(), node.path.suffix()));

            let local = base.local_segment().to_string();
            let mut path = base;
            let mut ordinal = 1;
            while !self.name_available(&path.encode()) || planned_names.contains(&path.encode()) {
                ordinal += 1;
                path = path.with_local_segment(&ordinal_segment(&local, ordinal));
            }
            planned_names.insert(path.encode());
            renamed.insert(handle, (node.path.clone(), path.clone()));
            planned.push((handle, path));
        }

        let mut remap: HashMap<NodeHandle, NodeHandle> = HashMap::new();
        remap.insert(source, target);
        for (handle, path) in planned {
            let original = self.get(handle).ok_or(GraphError::StaleHandle)?.clone();
            let parent = original
                .parent
                .and_then(|p| remap.get(&p).copied())
                .ok_or(GraphError::StaleHandle)?;
            let copy = self.insert_child(parent, path, original.kind)?;
            let node = self.get_mut(copy)?;
            node.local = original.local;
            node.visible = original.visible;
            remap.insert(handle, copy);
        }

        let original = self.get(source).ok_or(GraphError::StaleHandle)?.clone();
        let node = self.get_mut(target)?;
        node.kind = original.kind;
        node.local = original.local;
        node.visible = original.visible;

        // LOD levels still point into the source subtree.
        for copy in remap.values().copied().collect::<Vec<_>>() {
            if let NodeKind::Lod(levels) = &mut self.get_mut(copy)?.kind {
                for level in levels.iter_mut() {
                    if let Some(mapped) = remap.get(&level.node) {
                        level.node = *mapped;
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    pub fn local_transform(&self, handle: NodeHandle) -> Option<Mat4> {
        self.get(handle).map(GraphNode::local_transform)
    }

    pub fn set_local_transform(&mut self, handle: NodeHandle, local: Mat4) -> Result<()> {
        self.get_mut(handle)?.local = local;
        Ok(())
    }

    /// Pre-multiplies the local transform, like applying a matrix to an
    /// object that may already carry an offset.
    pub fn apply_matrix(&mut self, handle: NodeHandle, matrix: Mat4) -> Result<()> {
        let node = self.get_mut(handle)?;
        node.local = matrix * node.local;
        Ok(())
    }

    pub fn set_position(&mut self, handle: NodeHandle, position: Vec3) -> Result<()> {
        let node = self.get_mut(handle)?;
        let (scale, rotation, _) = node.local.to_scale_rotation_translation();
        node.local = Mat4::from_scale_rotation_translation(scale, rotation, position);
        Ok(())
    }

    pub fn set_rotation(&mut self, handle: NodeHandle, rotation: Quat) -> Result<()> {
        let node = self.get_mut(handle)?;
        let (scale, _, translation) = node.local.to_scale_rotation_translation();
        node.local = Mat4::from_scale_rotation_translation(scale, rotation, translation);
        Ok(())
    }

    pub fn set_scale(&mut self, handle: NodeHandle, scale: Vec3) -> Result<()> {
        let node = self.get_mut(handle)?;
        let (_, rotation, translation) = node.local.to_scale_rotation_translation();
        node.local = Mat4::from_scale_rotation_translation(scale, rotation, translation);
        Ok(())
    }

    pub fn position(&self, handle: NodeHandle) -> Option<Vec3> {
        self.get(handle).map(|node| node.local.w_axis.truncate())
    }

    pub fn world_transform(&self, handle: NodeHandle) -> Option<Mat4> {
        let mut node = self.get(handle)?;
        let mut world = node.local;
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            world = node.local * world;
        }
        Some(world)
    }

    /// Visible only if the node and all its ancestors are.
    pub fn is_effectively_visible(&self, handle: NodeHandle) -> bool {
        let mut cursor = Some(handle);
        while let Some(current) = cursor {
            match self.get(current) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) -> Result<()> {
        self.get_mut(handle)?.visible = visible;
        Ok(())
    }

    /// Swaps one material slot of a mesh leaf. Other leaves sharing the old
    /// material are unaffected.
    pub fn set_material(&mut self, handle: NodeHandle, slot: usize, material: Arc<Material>) -> Result<()> {
        let node = self.get_mut(handle)?;
        let name = node.name.clone();
        match &mut node.kind {
            NodeKind::Mesh(leaf) => {
                if slot < leaf.materials.len() {
                    leaf.materials[slot] = material;
                } else {
                    leaf.materials.push(material);
                }
                Ok(())
            }
            _ => Err(GraphError::NotAMesh(name)),
        }
    }

    /// Stable digest of names, kinds and local transforms below `start`,
    /// used to compare two builds of the same document.
    pub fn fingerprint(&self, start: NodeHandle) -> String {
        let mut hasher = Sha256::new();
        for handle in self.descendants(start) {
            let Some(node) = self.get(handle) else {
                continue;
            };
            hasher.update(node.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(node.kind.tag().as_bytes());
            for value in node.local.to_cols_array() {
                // Fold -0.0 into 0.0 so equal transforms hash equally.
                hasher.update((value + 0.0).to_le_bytes());
            }
            hasher.update((node.children.len() as u32).to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
