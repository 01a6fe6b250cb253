// src/instancing/renderer.rs
//! Per-frame batch renderer.
//!
//! For every ready group: enable instancing on its material if the platform
//! has it, size the scratch buffer to the clamped batch ceiling, then walk the
//! instances in ascending order, filling the buffer one batch at a time and
//! issuing one draw per batch. Without platform instancing the batches still go
//! to the sink; what it does with them is its business. The buffer is reused across batches and frames.

use std::ops::Range;

use bevy::log::trace;
use bevy::math::Mat4;

use super::core::{effective_batch_size, InstancedDraw, InstancedDrawSink, NodeHierarchy};
use super::group::{resolve_instance, InstanceGroup};
use super::registry::InstanceGroups;

/// What the last tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub groups_drawn: u32,
    /// Not ready (no mesh, no material or no instances).
    pub groups_skipped: u32,
    pub draw_calls: u32,
    /// Instances submitted across all draws.
    pub instances: u32,
    /// Batches dropped because no slot resolved to a real instance.
    pub empty_batches: u32,
    pub buffer_resizes: u32,
}

/// Consecutive `[start, end)` ranges of at most `batch_size` covering `0..total`.
/// The final range is short when `total` is not a multiple of `batch_size`.
pub fn batch_ranges(total: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(move |start| start..(start + batch_size).min(total))
}

#[derive(Debug, Default)]
pub struct BatchRenderer {
    frame: u64,
    last: FrameStats,
}

impl BatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render every registered group once.
    pub fn tick<N, M, Mt, H, S>(
        &mut self,
        groups: &mut InstanceGroups<N, M, Mt>,
        hierarchy: &H,
        sink: &mut S,
    ) -> FrameStats
    where
        N: Copy,
        H: NodeHierarchy<Node = N>,
        S: InstancedDrawSink<Mesh = M, Material = Mt>,
    {
        let mut stats = FrameStats::default();
        let (gate, entries) = groups.render_parts();

        for (id, group) in entries {
            if !group.is_ready() {
                stats.groups_skipped += 1;
                continue;
            }
            if let Some(material) = group.material.as_ref() {
                gate.ensure_material(sink, material);
            }

            trace!("Instancing: drawing group '{}'", id);
            draw_group(group, hierarchy, sink, &mut stats);
            stats.groups_drawn += 1;
        }

        self.frame += 1;
        self.last = stats;
        stats
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last
    }

    /// Ticks run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

fn draw_group<N, M, Mt, H, S>(
    group: &mut InstanceGroup<N, M, Mt>,
    hierarchy: &H,
    sink: &mut S,
    stats: &mut FrameStats,
) where
    N: Copy,
    H: NodeHierarchy<Node = N>,
    S: InstancedDrawSink<Mesh = M, Material = Mt>,
{
    let InstanceGroup {
        mesh,
        material,
        live_nodes,
        baked,
        buffer,
        max_instances_per_batch,
        properties,
    } = group;
    let (Some(mesh), Some(material)) = (mesh.as_ref(), material.as_ref()) else {
        return;
    };

    let total = live_nodes.len().max(baked.len());
    if total == 0 {
        return;
    }

    let batch_size = effective_batch_size(*max_instances_per_batch);
    if buffer.ensure_len(batch_size) {
        stats.buffer_resizes += 1;
    }

    for range in batch_ranges(total, batch_size) {
        let len = range.len();
        let mut any_valid = false;

        for (slot, index) in buffer.slots_mut()[..len].iter_mut().zip(range) {
            match resolve_instance(&live_nodes[..], &baked[..], index, hierarchy) {
                Some(matrix) => {
                    *slot = matrix;
                    any_valid = true;
                }
                None => *slot = Mat4::IDENTITY,
            }
        }

        if !any_valid {
            stats.empty_batches += 1;
            continue;
        }

        sink.draw_mesh_instanced(InstancedDraw {
            mesh,
            submesh: 0,
            material,
            matrices: &buffer.as_slice()[..len],
            properties: properties.as_ref(),
        });
        stats.draw_calls += 1;
        stats.instances += len as u32;
    }
}
