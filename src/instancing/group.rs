// src/instancing/group.rs
//! One registered instance group and its scratch batch buffer.

use bevy::math::Mat4;

use super::core::{effective_batch_size, NodeHierarchy, PropertyBlock};

/// Reusable per-group matrix scratch space.
/// Its length tracks the group's effective batch size; contents are
/// rewritten before every draw and mean nothing between frames.
#[derive(Debug, Clone, Default)]
pub struct BatchBuffer {
    matrices: Vec<Mat4>,
}

impl BatchBuffer {
    pub fn with_len(len: usize) -> Self {
        Self { matrices: vec![Mat4::IDENTITY; len] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Reallocate to `len` slots if the length differs. Returns true when it did.
    pub fn ensure_len(&mut self, len: usize) -> bool {
        if self.matrices.len() == len {
            return false;
        }
        self.matrices = vec![Mat4::IDENTITY; len];
        true
    }

    #[inline]
    pub fn as_slice(&self) -> &[Mat4] {
        &self.matrices
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [Mat4] {
        &mut self.matrices
    }
}

/// A named set of instances sharing one mesh and material.
///
/// Instance `i` renders with `live_nodes[i]`'s current world matrix when that
/// node exists, otherwise with `baked[i]`.
pub struct InstanceGroup<N, M, Mt> {
    pub(crate) mesh: Option<M>,
    pub(crate) material: Option<Mt>,
    pub(crate) live_nodes: Vec<N>,
    pub(crate) baked: Vec<Mat4>,
    pub(crate) buffer: BatchBuffer,
    pub(crate) max_instances_per_batch: usize,
    pub(crate) properties: Option<PropertyBlock>,
}

impl<N: Copy, M, Mt> InstanceGroup<N, M, Mt> {
    pub fn new(
        mesh: Option<M>,
        material: Option<Mt>,
        live_nodes: Vec<N>,
        baked: Vec<Mat4>,
        max_instances_per_batch: usize,
    ) -> Self {
        Self {
            mesh,
            material,
            live_nodes,
            baked,
            buffer: BatchBuffer::with_len(effective_batch_size(max_instances_per_batch)),
            max_instances_per_batch,
            properties: None,
        }
    }

    /// `max(live nodes, baked matrices)`.
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.live_nodes.len().max(self.baked.len())
    }

    pub fn is_ready(&self) -> bool {
        self.mesh.is_some()
            && self.material.is_some()
            && !self.buffer.is_empty()
            && self.instance_count() > 0
    }

    pub fn mesh(&self) -> Option<&M> {
        self.mesh.as_ref()
    }

    pub fn material(&self) -> Option<&Mt> {
        self.material.as_ref()
    }

    pub fn live_nodes(&self) -> &[N] {
        &self.live_nodes
    }

    pub fn baked_matrices(&self) -> &[Mat4] {
        &self.baked
    }

    pub fn batch_buffer(&self) -> &BatchBuffer {
        &self.buffer
    }

    /// The configured ceiling, before clamping.
    pub fn max_instances_per_batch(&self) -> usize {
        self.max_instances_per_batch
    }

    pub fn properties(&self) -> Option<&PropertyBlock> {
        self.properties.as_ref()
    }

    pub fn set_mesh(&mut self, mesh: Option<M>) {
        self.mesh = mesh;
    }

    pub fn set_material(&mut self, material: Option<Mt>) {
        self.material = material;
    }

    /// Takes effect on the next tick; the buffer is resized lazily there.
    pub fn set_max_instances_per_batch(&mut self, max: usize) {
        self.max_instances_per_batch = max;
    }

    pub fn set_properties(&mut self, properties: Option<PropertyBlock>) {
        self.properties = properties;
    }
}

/// Matrix for global instance `index`: live node first, then baked.
/// `None` means the index has neither.
#[inline]
pub(crate) fn resolve_instance<H: NodeHierarchy>(
    live_nodes: &[H::Node],
    baked: &[Mat4],
    index: usize,
    hierarchy: &H,
) -> Option<Mat4> {
    live_nodes
        .get(index)
        .and_then(|&node| hierarchy.world_matrix(node))
        .or_else(|| baked.get(index).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instancing::core::fakes::FakeHierarchy;
    use bevy::math::Vec3;

    type Group = InstanceGroup<usize, u32, u32>;

    fn baked(n: usize) -> Vec<Mat4> {
        (0..n).map(|i| Mat4::from_translation(Vec3::splat(i as f32))).collect()
    }

    #[test]
    fn readiness_needs_mesh_material_and_instances() {
        let mut g: Group = InstanceGroup::new(None, Some(1), Vec::new(), baked(3), 1023);
        assert!(!g.is_ready());
        g.set_mesh(Some(2));
        assert!(g.is_ready());
        g.set_material(None);
        assert!(!g.is_ready());

        let empty: Group = InstanceGroup::new(Some(1), Some(1), Vec::new(), Vec::new(), 1023);
        assert_eq!(empty.instance_count(), 0);
        assert!(!empty.is_ready());
    }

    #[test]
    fn buffer_starts_at_clamped_size() {
        let g: Group = InstanceGroup::new(Some(1), Some(1), Vec::new(), baked(1), 5000);
        assert_eq!(g.batch_buffer().len(), 1023);
        assert_eq!(g.max_instances_per_batch(), 5000);
    }

    #[test]
    fn ensure_len_only_reallocates_on_change() {
        let mut buf = BatchBuffer::with_len(4);
        assert!(!buf.ensure_len(4));
        assert!(buf.ensure_len(8));
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn live_node_wins_over_baked_and_falls_back_when_gone() {
        let mut hierarchy = FakeHierarchy::with_nodes(2);
        let baked = baked(3);
        let live = vec![0, 1];

        let m = resolve_instance(&live[..], &baked[..], 1, &hierarchy);
        assert_eq!(m, hierarchy.matrices[1]);

        hierarchy.matrices[1] = None;
        assert_eq!(resolve_instance(&live[..], &baked[..], 1, &hierarchy), Some(baked[1]));
        assert_eq!(resolve_instance(&live[..], &baked[..], 2, &hierarchy), Some(baked[2]));
        assert_eq!(resolve_instance(&live[..], &baked[..], 3, &hierarchy), None);
    }
}
