//! Turns node descriptors into a [`SceneGraph`].
//!
//! Construction runs over an explicit work-list instead of recursion. A node
//! reference reserves its slot (and its unique name) when the parent is
//! processed, so children keep declaration order even though referenced
//! subtrees are filled in later. The first reference to an id builds it;
//! every later reference clones the finished subtree into its own slot with
//! the name prefix rebased.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Mat4;

use crate::geometry::GeometryFactory;
use crate::graph::naming::{ordinal_segment, NamePath, NameSuffix};
use crate::graph::{GraphError, GraphNode, NodeHandle, NodeKind, SceneGraph};
use crate::material::{MaterialResolutionError, MaterialResolver, DEFAULT_MATERIAL_ID};
use crate::render::light::load_light;
use crate::scene::{ChildRef, ConfigurationError, DescriptorMap, NodeDescriptor, NodeType, RawElement};
use crate::transform;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("node '{id}' referenced from '{referenced_by}' is not defined")]
    MissingReference { id: String, referenced_by: String },
    #[error("cyclic node reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },
    #[error("scene build was cancelled")]
    Cancelled,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// A recoverable problem, attributed to the descriptor it came from.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticKind {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Material(#[from] MaterialResolutionError),
}

#[derive(Debug)]
pub struct Diagnostic {
    pub node: String,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub diagnostics: Vec<Diagnostic>,
    pub nodes_built: usize,
    pub nodes_cloned: usize,
    pub primitives: usize,
    pub lights: usize,
}

/// Shared flag checked once per work item.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Output of a successful build.
#[derive(Debug)]
pub struct BuiltScene {
    pub graph: SceneGraph,
    /// Unsuffixed container named after the root id.
    pub container: NodeHandle,
    /// The assembled root node, the container's only child.
    pub root: NodeHandle,
    pub report: BuildReport,
    /// Resolver state after the build; owns the textures acquired so far.
    pub materials: MaterialResolver,
}

impl BuiltScene {
    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        self.graph.find_descendant_by_name(self.container, name)
    }

    pub fn names(&self) -> Vec<String> {
        self.graph
            .descendants(self.container)
            .into_iter()
            .filter_map(|handle| self.graph.get(handle))
            .map(|node| node.name().to_string())
            .collect()
    }

    pub fn fingerprint(&self) -> String {
        self.graph.fingerprint(self.container)
    }
}

#[derive(Debug, Clone)]
struct Inherited {
    materials: Vec<String>,
    cast: bool,
    receive: bool,
}

enum Work {
    Visit {
        slot: NodeHandle,
        id: String,
        inherited: Inherited,
    },
    Finish {
        slot: NodeHandle,
        id: String,
    },
}

fn suffix_for(descriptor: &NodeDescriptor) -> NameSuffix {
    match descriptor.node_type {
        NodeType::Node => NameSuffix::Object,
        NodeType::Lod => NameSuffix::Lod,
    }
}

fn kind_for(descriptor: &NodeDescriptor) -> NodeKind {
    match descriptor.node_type {
        NodeType::Node => NodeKind::Group,
        NodeType::Lod => NodeKind::Lod(Vec::new()),
    }
}

pub struct SceneBuilder<'a> {
    descriptors: &'a DescriptorMap,
    factory: GeometryFactory,
    cancel: CancellationToken,
    graph: SceneGraph,
    cache: HashMap<String, NodeHandle>,
    /// Ids currently being built, outermost first.
    active: Vec<String>,
    report: BuildReport,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(descriptors: &'a DescriptorMap, materials: MaterialResolver) -> Self {
        Self {
            descriptors,
            factory: GeometryFactory::new(materials),
            cancel: CancellationToken::new(),
            graph: SceneGraph::new(),
            cache: HashMap::new(),
            active: Vec::new(),
            report: BuildReport::default(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(mut self, root_id: &str) -> Result<BuiltScene> {
        let descriptors = self.descriptors;
        let root = descriptors
            .get(root_id)
            .ok_or_else(|| BuildError::MissingReference {
                id: root_id.to_string(),
                referenced_by: "rootId".to_string(),
            })?;
        log::info!(
            "Building scene graph from '{root_id}' ({} node descriptors)",
            descriptors.len()
        );

        let container_path = NamePath::root(root_id);
        let container = self.graph.insert(container_path.clone(), NodeKind::Group)?;
        let root_path = container_path
            .child(root_id, suffix_for(root))
            .collapse_leading_duplicate();
        let root_slot = self.graph.insert_child(container, root_path, kind_for(root))?;

        let mut stack = vec![Work::Visit {
            slot: root_slot,
            id: root_id.to_string(),
            inherited: Inherited {
                materials: root.material_ids.clone(),
                cast: root.cast_shadows.unwrap_or(false),
                receive: root.receive_shadows.unwrap_or(false),
            },
        }];

        while let Some(work) = stack.pop() {
            if self.cancel.is_cancelled() {
                log::info!("Scene build cancelled with {} items pending", stack.len() + 1);
                return Err(BuildError::Cancelled);
            }
            match work {
                Work::Visit { slot, id, inherited } => {
                    self.visit(slot, &id, inherited, &mut stack)?;
                }
                Work::Finish { slot, id } => {
                    self.active.pop();
                    self.cache.insert(id, slot);
                }
            }
        }

        let report = self.report;
        log::info!(
            "Built {} nodes ({} from descriptors, {} cloned, {} primitives, {} lights, {} diagnostics)",
            self.graph.len(),
            report.nodes_built,
            report.nodes_cloned,
            report.primitives,
            report.lights,
            report.diagnostics.len()
        );
        Ok(BuiltScene {
            graph: self.graph,
            container,
            root: root_slot,
            report,
            materials: self.factory.into_materials(),
        })
    }

    fn visit(
        &mut self,
        slot: NodeHandle,
        id: &str,
        inherited: Inherited,
        stack: &mut Vec<Work>,
    ) -> Result<()> {
        // Built by an earlier sibling after this slot was reserved.
        if let Some(&built) = self.cache.get(id) {
            return self.clone_cached(built, slot, id);
        }
        if let Some(start) = self.active.iter().position(|active| active == id) {
            let mut chain = self.active[start..].to_vec();
            chain.push(id.to_string());
            return Err(BuildError::CyclicReference { chain });
        }

        let descriptors = self.descriptors;
        let descriptor = descriptors
            .get(id)
            .ok_or_else(|| BuildError::MissingReference {
                id: id.to_string(),
                referenced_by: self.active.last().cloned().unwrap_or_default(),
            })?;
        let path = self.graph.get(slot).ok_or(GraphError::StaleHandle)?.path().clone();
        log::debug!("Building '{id}' as {path}");

        let effective = Inherited {
            materials: if descriptor.material_ids.is_empty() {
                inherited.materials
            } else {
                descriptor.material_ids.clone()
            },
            cast: inherited.cast || descriptor.cast_shadows.unwrap_or(false),
            receive: inherited.receive || descriptor.receive_shadows.unwrap_or(false),
        };

        self.active.push(id.to_string());
        stack.push(Work::Finish {
            slot,
            id: id.to_string(),
        });

        let mut pending = Vec::new();
        for child in &descriptor.children {
            match child {
                ChildRef::Node { id: child_id } => {
                    pending.extend(self.reserve(slot, &path, id, child_id, 0.0, &effective)?);
                }
                ChildRef::Lod {
                    id: child_id,
                    min_distance,
                } => {
                    pending.extend(self.reserve(slot, &path, id, child_id, *min_distance, &effective)?);
                }
                ChildRef::Primitive(raw) => self.add_primitive(slot, &path, id, raw, &effective)?,
                ChildRef::Light(raw) => self.add_light(slot, &path, id, raw)?,
            }
        }
        stack.extend(pending.into_iter().rev());

        let (steps, errors) = transform::parse_all(&descriptor.transformations);
        for err in errors {
            self.diagnose(id, err.into());
        }
        transform::apply(&mut self.graph, slot, &steps)?;

        self.report.nodes_built += 1;
        Ok(())
    }

    /// Inserts the placeholder for a referenced node. Returns the work item
    /// that will fill it, or `None` when a finished copy was cloned in.
    fn reserve(
        &mut self,
        parent: NodeHandle,
        parent_path: &NamePath,
        parent_id: &str,
        child_id: &str,
        min_distance: f32,
        inherited: &Inherited,
    ) -> Result<Option<Work>> {
        let descriptors = self.descriptors;
        let descriptor = descriptors
            .get(child_id)
            .ok_or_else(|| BuildError::MissingReference {
                id: child_id.to_string(),
                referenced_by: parent_id.to_string(),
            })?;
        let path = self.unique_child_path(parent_path, child_id, suffix_for(descriptor));
        let slot = self.graph.insert_child(parent, path, kind_for(descriptor))?;

        let parent_is_lod = matches!(
            self.graph.get(parent).map(GraphNode::kind),
            Some(NodeKind::Lod(_))
        );
        if parent_is_lod {
            self.graph.add_lod_level(parent, slot, min_distance)?;
        }

        if let Some(&built) = self.cache.get(child_id) {
            self.clone_cached(built, slot, child_id)?;
            return Ok(None);
        }
        Ok(Some(Work::Visit {
            slot,
            id: child_id.to_string(),
            inherited: inherited.clone(),
        }))
    }

    fn clone_cached(&mut self, built: NodeHandle, slot: NodeHandle, id: &str) -> Result<()> {
        self.graph.clone_subtree_into(built, slot)?;
        self.report.nodes_cloned += 1;
        if let (Some(source), Some(target)) = (self.graph.get(built), self.graph.get(slot)) {
            log::debug!("Cloned '{id}' from {} into {}", source.name(), target.name());
        }
        Ok(())
    }

    fn add_primitive(
        &mut self,
        parent: NodeHandle,
        parent_path: &NamePath,
        node_id: &str,
        raw: &RawElement,
        inherited: &Inherited,
    ) -> Result<()> {
        let material = inherited
            .materials
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_MATERIAL_ID);
        let created = self
            .factory
            .create_primitive(raw, material, inherited.cast, inherited.receive);
        for err in self.factory.materials_mut().take_diagnostics() {
            self.diagnose(node_id, err.into());
        }
        let mesh = match created {
            Ok(mesh) => mesh,
            Err(err) => {
                self.diagnose(node_id, err.into());
                return Ok(());
            }
        };

        let path = self.unique_child_path(parent_path, mesh.leaf.subtype.as_str(), NameSuffix::Object);
        let leaf = self.graph.insert_child(parent, path, NodeKind::Mesh(mesh.leaf))?;
        self.graph
            .set_local_transform(leaf, Mat4::from_translation(mesh.offset))?;
        self.report.primitives += 1;
        Ok(())
    }

    fn add_light(
        &mut self,
        parent: NodeHandle,
        parent_path: &NamePath,
        node_id: &str,
        raw: &RawElement,
    ) -> Result<()> {
        let light = match load_light(raw) {
            Ok(light) => light,
            Err(err) => {
                self.diagnose(node_id, err.into());
                return Ok(());
            }
        };

        let wrapper_path = self.unique_child_path(
            parent_path,
            &format!("lightwrapper_{}", light.id),
            NameSuffix::None,
        );
        let wrapper = self
            .graph
            .insert_child(parent, wrapper_path.clone(), NodeKind::LightWrapper)?;
        if let Some(target) = light.spot_target() {
            let node = self.graph.insert_child(
                wrapper,
                wrapper_path.with_suffix(NameSuffix::Target),
                NodeKind::LightTarget,
            )?;
            self.graph.set_local_transform(node, Mat4::from_translation(target))?;
        }
        let position = light.position;
        let node = self.graph.insert_child(
            wrapper,
            wrapper_path.with_suffix(NameSuffix::Light),
            NodeKind::Light(light),
        )?;
        self.graph.set_local_transform(node, Mat4::from_translation(position))?;
        self.report.lights += 1;
        Ok(())
    }

    /// `base`, then `base2`, `base3`, ... until the encoded name is free.
    fn unique_child_path(&self, parent: &NamePath, base: &str, suffix: NameSuffix) -> NamePath {
        let mut ordinal = 1;
        loop {
            let path = parent.child(&ordinal_segment(base, ordinal), suffix);
            if self.graph.name_available(&path.encode()) {
                return path;
            }
            ordinal += 1;
        }
    }

    fn diagnose(&mut self, node: &str, kind: DiagnosticKind) {
        log::warn!("Node '{node}': {kind}");
        self.report.diagnostics.push(Diagnostic {
            node: node.to_string(),
            kind,
        });
    }
}

pub fn build(descriptors: &DescriptorMap, root_id: &str, materials: MaterialResolver) -> Result<BuiltScene> {
    SceneBuilder::new(descriptors, materials).build(root_id)
}
