//! Structured names for built nodes.
//!
//! A name is the chain of ids from the scene root down to the node plus a
//! suffix describing what the node is. The flattened form joins the chain
//! with `_` and appends the suffix, e.g. `scene_table_leg_obj`. Cloning a
//! subtree swaps the chain prefix instead of pattern-replacing strings.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameSuffix {
    None,
    Object,
    Lod,
    Light,
    Target,
}

impl NameSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            NameSuffix::None => "",
            NameSuffix::Object => "_obj",
            NameSuffix::Lod => "_lod",
            NameSuffix::Light => "_light",
            NameSuffix::Target => "_target",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePath {
    segments: Vec<String>,
    suffix: NameSuffix,
}

impl NamePath {
    /// Path of the unnamed-suffix container holding a whole scene.
    pub fn root(id: &str) -> Self {
        Self {
            segments: vec![id.to_string()],
            suffix: NameSuffix::None,
        }
    }

    pub fn child(&self, segment: &str, suffix: NameSuffix) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments, suffix }
    }

    pub fn with_suffix(&self, suffix: NameSuffix) -> Self {
        Self {
            segments: self.segments.clone(),
            suffix,
        }
    }

    /// `[scene, scene, ..]` becomes `[scene, ..]`; used for the root node,
    /// whose id repeats the container's.
    pub fn collapse_leading_duplicate(mut self) -> Self {
        if self.segments.len() >= 2 && self.segments[0] == self.segments[1] {
            self.segments.remove(1);
        }
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn suffix(&self) -> NameSuffix {
        self.suffix
    }

    pub fn local_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn starts_with(&self, prefix: &[String]) -> bool {
        self.segments.len() >= prefix.len() && self.segments[..prefix.len()] == *prefix
    }

    /// Replaces `old_prefix` with `new_prefix`, or `None` if the path does not
    /// live under `old_prefix`.
    pub fn rebase(&self, old_prefix: &[String], new_prefix: &[String]) -> Option<Self> {
        if !self.starts_with(old_prefix) {
            return None;
        }
        let mut segments = new_prefix.to_vec();
        segments.extend_from_slice(&self.segments[old_prefix.len()..]);
        Some(Self {
            segments,
            suffix: self.suffix,
        })
    }

    /// Same path with the last segment replaced.
    pub fn with_local_segment(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => *last = segment.to_string(),
            None => segments.push(segment.to_string()),
        }
        Self {
            segments,
            suffix: self.suffix,
        }
    }

    pub fn encode(&self) -> String {
        let mut name = self.segments.join("_");
        name.push_str(self.suffix.as_str());
        name
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// `leg`, `leg2`, `leg3`, ... for repeated siblings.
pub fn ordinal_segment(base: &str, ordinal: usize) -> String {
    if ordinal <= 1 {
        base.to_string()
    } else {
        format!("{base}{ordinal}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_chain_and_suffix() {
        let container = NamePath::root("scene");
        assert_eq!(container.encode(), "scene");

        let root = container
            .child("scene", NameSuffix::Object)
            .collapse_leading_duplicate();
        assert_eq!(root.encode(), "scene_obj");

        let table = root.child("table", NameSuffix::Object);
        assert_eq!(table.encode(), "scene_table_obj");

        let rect = table.child("rectangle", NameSuffix::Object);
        assert_eq!(rect.to_string(), "scene_table_rectangle_obj");

        let lod = table.child("lamp", NameSuffix::Lod);
        assert_eq!(lod.encode(), "scene_table_lamp_lod");
    }

    #[test]
    fn collapse_only_touches_a_leading_repeat() {
        let path = NamePath::root("a").child("b", NameSuffix::Object).child("b", NameSuffix::Object);
        assert_eq!(path.clone().collapse_leading_duplicate(), path);
    }

    #[test]
    fn rebase_swaps_only_the_prefix() {
        let source = NamePath::root("scene").child("leg", NameSuffix::Object);
        let foot = source.child("foot", NameSuffix::Object).child("leg", NameSuffix::Object);
        let target = NamePath::root("scene").child("leg2", NameSuffix::Object);

        let rebased = foot.rebase(source.segments(), target.segments()).unwrap();
        assert_eq!(rebased.encode(), "scene_leg2_foot_leg_obj");

        let elsewhere = NamePath::root("other").child("foot", NameSuffix::Object);
        assert!(elsewhere.rebase(source.segments(), target.segments()).is_none());
    }

    #[test]
    fn ordinals_start_at_two() {
        assert_eq!(ordinal_segment("leg", 1), "leg");
        assert_eq!(ordinal_segment("leg", 2), "leg2");
        assert_eq!(ordinal_segment("leg", 3), "leg3");
    }
}
