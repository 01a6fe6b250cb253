// src/instancing/registry.rs
//! Instance group registry: id -> group, plus add/remove.
//! No rendering here; `BatchRenderer` walks the groups each frame.

use std::collections::hash_map::IterMut;
use std::collections::HashMap;

use bevy::log::{debug, trace};
use bevy::math::{DMat4, Mat4};

use super::capability::CapabilityGate;
use super::capture::capture_live_nodes;
use super::core::{CapturePolicy, InstancedDrawSink, NodeHierarchy, DEFAULT_MAX_INSTANCES_PER_BATCH};
use super::group::InstanceGroup;

pub struct InstanceGroups<N, M, Mt> {
    groups: HashMap<String, InstanceGroup<N, M, Mt>>,
    /// Ceiling handed to groups created from now on.
    default_max_instances_per_batch: usize,
    capture: CapturePolicy,
    gate: CapabilityGate,
}

impl<N, M, Mt> Default for InstanceGroups<N, M, Mt> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            default_max_instances_per_batch: DEFAULT_MAX_INSTANCES_PER_BATCH,
            capture: CapturePolicy::default(),
            gate: CapabilityGate::default(),
        }
    }
}

impl<N: Copy, M, Mt> InstanceGroups<N, M, Mt> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(max_instances_per_batch: usize, capture: CapturePolicy) -> Self {
        Self {
            default_max_instances_per_batch: max_instances_per_batch,
            capture,
            ..Self::default()
        }
    }

    /// Register (or fully replace) the group `id`.
    ///
    /// Matrices are truncated to single precision. When there is at least one
    /// instance, live nodes are captured from `hierarchy` per the capture
    /// policy. An empty `id` is ignored; missing mesh/material just leaves the
    /// group not ready.
    pub fn add_instance_group<H, S>(
        &mut self,
        id: &str,
        mesh: Option<M>,
        material: Option<Mt>,
        matrices: &[DMat4],
        hierarchy: &H,
        sink: &mut S,
    ) where
        H: NodeHierarchy<Node = N>,
        S: InstancedDrawSink<Mesh = M, Material = Mt>,
    {
        if id.is_empty() {
            trace!("Instancing: ignoring group with empty id");
            return;
        }

        let baked: Vec<Mat4> = matrices.iter().map(DMat4::as_mat4).collect();
        let live_nodes = if baked.is_empty() {
            Vec::new()
        } else {
            capture_live_nodes(hierarchy.instance_nodes(), baked.len(), self.capture)
        };

        if let Some(material) = material.as_ref() {
            self.gate.ensure_material(sink, material);
        }

        debug!(
            "Instancing: group '{}' -> {} instances ({} live)",
            id,
            baked.len(),
            live_nodes.len()
        );

        let group = InstanceGroup::new(mesh, material, live_nodes, baked, self.default_max_instances_per_batch);
        if self.groups.insert(id.to_string(), group).is_some() {
            debug!("Instancing: replaced existing group '{}'", id);
        }
    }

    /// Drop the group `id`; unknown ids are ignored.
    pub fn remove_instance_group(&mut self, id: &str) {
        if self.groups.remove(id).is_some() {
            debug!("Instancing: removed group '{}'", id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&InstanceGroup<N, M, Mt>> {
        self.groups.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut InstanceGroup<N, M, Mt>> {
        self.groups.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn default_max_instances_per_batch(&self) -> usize {
        self.default_max_instances_per_batch
    }

    pub fn set_default_max_instances_per_batch(&mut self, max: usize) {
        self.default_max_instances_per_batch = max;
    }

    /// Set the ceiling on every registered group and on future ones.
    pub fn set_max_instances_per_batch_all(&mut self, max: usize) {
        self.default_max_instances_per_batch = max;
        for group in self.groups.values_mut() {
            group.set_max_instances_per_batch(max);
        }
    }

    pub fn capture_policy(&self) -> CapturePolicy {
        self.capture
    }

    /// Applies to groups added afterwards; existing bindings stay as they are.
    pub fn set_capture_policy(&mut self, capture: CapturePolicy) {
        self.capture = capture;
    }

    pub fn capability_detected(&self) -> bool {
        self.gate.is_detected()
    }

    pub fn reset_capability_gate(&mut self) {
        self.gate.reset();
    }

    pub(crate) fn render_parts(&mut self) -> (&mut CapabilityGate, IterMut<'_, String, InstanceGroup<N, M, Mt>>) {
        (&mut self.gate, self.groups.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instancing::core::fakes::{FakeHierarchy, FakeSink};
    use bevy::math::DVec3;

    type Groups = InstanceGroups<usize, u32, u32>;

    fn matrices(n: usize) -> Vec<DMat4> {
        (0..n).map(|i| DMat4::from_translation(DVec3::new(i as f64 + 0.1, 0.0, 0.0))).collect()
    }

    #[test]
    fn empty_id_is_a_no_op() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        groups.add_instance_group("", Some(1), Some(2), &matrices(3), &FakeHierarchy::default(), &mut sink);
        assert!(groups.is_empty());
        assert!(sink.enabled.is_empty());
    }

    #[test]
    fn matrices_are_truncated_to_single_precision() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        let input = matrices(2);
        groups.add_instance_group("rocks", Some(1), Some(2), &input, &FakeHierarchy::default(), &mut sink);

        let group = groups.get("rocks").unwrap();
        assert_eq!(group.baked_matrices(), &[input[0].as_mat4(), input[1].as_mat4()]);
        assert!(group.live_nodes().is_empty());
        assert_eq!(group.batch_buffer().len(), 1023);
    }

    #[test]
    fn newest_children_bind_to_leading_indices() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        let hierarchy = FakeHierarchy::with_nodes(6);
        groups.add_instance_group("lamps", Some(1), Some(2), &matrices(4), &hierarchy, &mut sink);
        assert_eq!(groups.get("lamps").unwrap().live_nodes(), &[2, 3, 4, 5]);

        let few = FakeHierarchy::with_nodes(2);
        groups.add_instance_group("lamps", Some(1), Some(2), &matrices(4), &few, &mut sink);
        let group = groups.get("lamps").unwrap();
        assert_eq!(group.live_nodes(), &[0, 1]);
        assert_eq!(group.instance_count(), 4);
    }

    #[test]
    fn zero_matrices_skip_capture() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        groups.add_instance_group("lamp", Some(1), Some(2), &[], &FakeHierarchy::with_nodes(3), &mut sink);
        let group = groups.get("lamp").unwrap();
        assert_eq!(group.instance_count(), 0);
        assert!(group.live_nodes().is_empty());
        assert!(!group.is_ready());
    }

    #[test]
    fn re_adding_replaces_everything() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        let hierarchy = FakeHierarchy::default();
        groups.add_instance_group("rocks", Some(1), Some(2), &matrices(10), &hierarchy, &mut sink);
        groups.get_mut("rocks").unwrap().set_max_instances_per_batch(4);
        groups.add_instance_group("rocks", Some(5), None, &matrices(3), &hierarchy, &mut sink);

        let group = groups.get("rocks").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(group.mesh(), Some(&5));
        assert_eq!(group.material(), None);
        assert_eq!(group.instance_count(), 3);
        assert_eq!(group.max_instances_per_batch(), 1023);
    }

    #[test]
    fn material_gets_instancing_on_registration() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        groups.add_instance_group("a", None, Some(9), &matrices(1), &FakeHierarchy::default(), &mut sink);
        assert_eq!(sink.enabled, vec![9]);

        let mut unsupported = FakeSink { supported: false, ..Default::default() };
        let mut other = Groups::new();
        other.add_instance_group("a", None, Some(9), &matrices(1), &FakeHierarchy::default(), &mut unsupported);
        assert!(unsupported.enabled.is_empty());
        assert!(other.contains("a"));
    }

    #[test]
    fn removing_unknown_ids_is_silent() {
        let mut groups = Groups::new();
        let mut sink = FakeSink::default();
        groups.remove_instance_group("ghost");
        groups.add_instance_group("a", Some(1), Some(1), &matrices(1), &FakeHierarchy::default(), &mut sink);
        groups.remove_instance_group("a");
        groups.remove_instance_group("a");
        assert!(groups.is_empty());
    }

    #[test]
    fn settings_apply_to_existing_and_future_groups() {
        let mut groups = Groups::with_settings(100, CapturePolicy::Disabled);
        let mut sink = FakeSink::default();
        let hierarchy = FakeHierarchy::with_nodes(4);
        groups.add_instance_group("a", Some(1), Some(1), &matrices(2), &hierarchy, &mut sink);
        assert!(groups.get("a").unwrap().live_nodes().is_empty());
        assert_eq!(groups.get("a").unwrap().batch_buffer().len(), 100);

        groups.set_max_instances_per_batch_all(64);
        groups.set_capture_policy(CapturePolicy::Oldest);
        groups.add_instance_group("b", Some(1), Some(1), &matrices(2), &hierarchy, &mut sink);
        assert_eq!(groups.get("a").unwrap().max_instances_per_batch(), 64);
        assert_eq!(groups.get("b").unwrap().batch_buffer().len(), 64);
        assert_eq!(groups.get("b").unwrap().live_nodes(), &[0, 1]);
    }
}
