//! Keyframed position paths for built nodes.

use glam::{Quat, Vec3};

use crate::graph::{self, NodeHandle, SceneGraph};
use crate::scene::AnimationDescriptor;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnimationError {
    #[error("animation target '{0}' does not name a built node")]
    UnknownTarget(String),
    #[error("animation for '{0}' has no keyframes")]
    NoKeyframes(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Key {
    time: f32,
    position: Vec3,
}

/// Cubic Hermite blend of `p0`..`p1` with tangents already scaled to the segment.
fn hermite(p0: Vec3, m0: Vec3, p1: Vec3, m1: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11
}

/// Smoothly interpolated, looping position path driving one node.
#[derive(Debug, Clone)]
pub struct PathAnimation {
    target: String,
    node: NodeHandle,
    keys: Vec<Key>,
    rotate: bool,
    playing: bool,
    time: f32,
}

impl PathAnimation {
    pub fn new(descriptor: &AnimationDescriptor, node: NodeHandle) -> Result<Self, AnimationError> {
        if descriptor.points.is_empty() {
            return Err(AnimationError::NoKeyframes(descriptor.target.clone()));
        }
        let mut keys: Vec<Key> = descriptor
            .points
            .iter()
            .map(|k| Key {
                time: k.time,
                position: Vec3::from_array(k.position),
            })
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self {
            target: descriptor.target.clone(),
            node,
            keys,
            rotate: descriptor.rotate,
            playing: descriptor.autoplay,
            time: 0.0,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    /// Time of the last keyframe; the path loops after it.
    pub fn duration(&self) -> f32 {
        self.keys.last().map(|k| k.time).unwrap_or(0.0).max(0.0)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Halts and rewinds to the start.
    pub fn stop(&mut self) {
        self.playing = false;
        self.time = 0.0;
    }

    /// Slope at key `i` in units per second, one-sided at the ends.
    fn tangent(&self, i: usize) -> Vec3 {
        let last = self.keys.len() - 1;
        let (a, b) = match i {
            0 => (0, 1.min(last)),
            i if i == last => (last - 1, last),
            i => (i - 1, i + 1),
        };
        let dt = self.keys[b].time - self.keys[a].time;
        if dt > 0.0 {
            (self.keys[b].position - self.keys[a].position) / dt
        } else {
            Vec3::ZERO
        }
    }

    /// Position at `time`, clamped to the first and last keys.
    pub fn sample(&self, time: f32) -> Vec3 {
        let keys = &self.keys;
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return Vec3::ZERO;
        };
        if time <= first.time {
            return first.position;
        }
        if time >= last.time {
            return last.position;
        }
        let i = keys.partition_point(|k| k.time <= time).saturating_sub(1);
        let (k0, k1) = (keys[i], keys[i + 1]);
        let span = k1.time - k0.time;
        if span <= 0.0 {
            return k1.position;
        }
        let t = (time - k0.time) / span;
        hermite(
            k0.position,
            self.tangent(i) * span,
            k1.position,
            self.tangent(i + 1) * span,
            t,
        )
    }

    /// Advances the clock and moves the node. With `rotate`, the node turns
    /// to face its displacement around the Y axis.
    pub fn update(&mut self, delta: f32, graph: &mut SceneGraph) -> graph::Result<()> {
        if !self.playing {
            return Ok(());
        }
        let duration = self.duration();
        self.time += delta.max(0.0);
        if duration > 0.0 {
            self.time %= duration;
        }

        let previous = graph.position(self.node).unwrap_or(Vec3::ZERO);
        let next = self.sample(self.time);
        graph.set_position(self.node, next)?;

        let displacement = next - previous;
        if self.rotate && (displacement.x != 0.0 || displacement.z != 0.0) {
            let heading = displacement.x.atan2(displacement.z);
            graph.set_rotation(self.node, Quat::from_rotation_y(heading))?;
        }
        Ok(())
    }
}

/// Resolves each animation's target below `scope`. Unresolvable entries are
/// returned as errors and left out.
pub fn bind_animations(
    descriptors: &[AnimationDescriptor],
    graph: &SceneGraph,
    scope: NodeHandle,
) -> (Vec<PathAnimation>, Vec<AnimationError>) {
    let mut animations = Vec::new();
    let mut errors = Vec::new();
    for descriptor in descriptors {
        let bound = graph
            .find_descendant_by_name(scope, &descriptor.target)
            .ok_or_else(|| AnimationError::UnknownTarget(descriptor.target.clone()))
            .and_then(|node| PathAnimation::new(descriptor, node));
        match bound {
            Ok(animation) => animations.push(animation),
            Err(err) => {
                log::warn!("Skipping animation: {err}");
                errors.push(err);
            }
        }
    }
    (animations, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::naming::{NamePath, NameSuffix};
    use crate::graph::NodeKind;
    use crate::scene::Keyframe;

    fn descriptor(points: &[(f32, [f32; 3])]) -> AnimationDescriptor {
        AnimationDescriptor {
            target: "scene_kart_obj".to_string(),
            points: points
                .iter()
                .map(|&(time, position)| Keyframe { time, position })
                .collect(),
            rotate: true,
            autoplay: true,
        }
    }

    fn graph_with_kart() -> (SceneGraph, NodeHandle, NodeHandle) {
        let mut graph = SceneGraph::new();
        let scene = graph.insert(NamePath::root("scene"), NodeKind::Group).unwrap();
        let kart = graph
            .insert_child(
                scene,
                NamePath::root("scene").child("kart", NameSuffix::Object),
                NodeKind::Group,
            )
            .unwrap();
        (graph, scene, kart)
    }

    #[test]
    fn passes_through_keyframes() {
        let (_, _, kart) = graph_with_kart();
        let path = PathAnimation::new(
            &descriptor(&[(2.0, [0.0, 0.0, 4.0]), (0.0, [0.0, 0.0, 0.0]), (1.0, [3.0, 1.0, 2.0])]),
            kart,
        )
        .unwrap();
        assert_eq!(path.duration(), 2.0);
        assert_eq!(path.sample(0.0), Vec3::ZERO);
        assert!((path.sample(1.0) - Vec3::new(3.0, 1.0, 2.0)).length() < 1e-5);
        assert_eq!(path.sample(2.0), Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(path.sample(5.0), Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn collinear_keys_interpolate_linearly() {
        let (_, _, kart) = graph_with_kart();
        let path = PathAnimation::new(
            &descriptor(&[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 0.0, 0.0]), (2.0, [2.0, 0.0, 0.0])]),
            kart,
        )
        .unwrap();
        assert!((path.sample(0.5) - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-5);
        assert!((path.sample(1.25) - Vec3::new(1.25, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn update_moves_loops_and_turns() {
        let (mut graph, _, kart) = graph_with_kart();
        let mut path = PathAnimation::new(
            &descriptor(&[(0.0, [0.0, 0.0, 0.0]), (1.0, [0.0, 0.0, 1.0]), (2.0, [0.0, 0.0, 2.0])]),
            kart,
        )
        .unwrap();

        path.update(0.5, &mut graph).unwrap();
        let p = graph.position(kart).unwrap();
        assert!((p - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);
        // Moving along +Z keeps a zero heading.
        let (_, rotation, _) = graph.local_transform(kart).unwrap().to_scale_rotation_translation();
        assert!((rotation * Vec3::Z - Vec3::Z).length() < 1e-4);

        path.update(2.0, &mut graph).unwrap();
        let p = graph.position(kart).unwrap();
        assert!((p - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn heading_follows_displacement() {
        let (mut graph, _, kart) = graph_with_kart();
        let mut path = PathAnimation::new(
            &descriptor(&[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 0.0, 0.0]), (2.0, [2.0, 0.0, 0.0])]),
            kart,
        )
        .unwrap();
        path.update(0.25, &mut graph).unwrap();
        let (_, rotation, _) = graph.local_transform(kart).unwrap().to_scale_rotation_translation();
        // A quarter turn about y points the forward axis along +X.
        assert!((rotation * Vec3::Z - Vec3::X).length() < 1e-4);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(rotation.dot(expected).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn stopped_paths_do_nothing_and_rewind() {
        let (mut graph, _, kart) = graph_with_kart();
        let mut path = PathAnimation::new(
            &descriptor(&[(0.0, [0.0, 0.0, 0.0]), (1.0, [0.0, 0.0, 1.0])]),
            kart,
        )
        .unwrap();
        path.update(0.5, &mut graph).unwrap();
        path.stop();
        assert!(!path.is_playing());
        path.update(0.25, &mut graph).unwrap();
        assert!((graph.position(kart).unwrap() - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);

        path.play();
        path.update(0.25, &mut graph).unwrap();
        assert!((graph.position(kart).unwrap() - Vec3::new(0.0, 0.0, 0.25)).length() < 1e-5);
    }

    #[test]
    fn binding_reports_bad_entries() {
        let (graph, scene, _) = graph_with_kart();
        let mut missing = descriptor(&[(0.0, [0.0, 0.0, 0.0])]);
        missing.target = "scene_ghost_obj".to_string();
        let empty = descriptor(&[]);
        let good = descriptor(&[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 0.0, 0.0])]);

        let (animations, errors) = bind_animations(&[missing, empty, good], &graph, scene);
        assert_eq!(animations.len(), 1);
        assert_eq!(animations[0].target(), "scene_kart_obj");
        assert_eq!(
            errors,
            vec![
                AnimationError::UnknownTarget("scene_ghost_obj".to_string()),
                AnimationError::NoKeyframes("scene_kart_obj".to_string()),
            ]
        );
    }
}
