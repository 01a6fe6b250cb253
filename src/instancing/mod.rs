//! GPU instancing for prop groups.
//! Each group is a named set of instances whose matrices come either from a
//! live scene node (re-read every frame) or from a baked matrix. Every frame
//! the renderer slices each group into batches of at most
//! `HARDWARE_BATCH_LIMIT` instances and submits one instanced draw per batch.
//!
//! `core`..`renderer` are engine-agnostic and driven through the
//! `NodeHierarchy` / `InstancedDrawSink` seams; `resources`, `systems` and
//! `plugin` wire them into Bevy.

pub mod core;
pub mod capture;
pub mod capability;
pub mod group;
pub mod registry;
pub mod renderer;
pub mod settings;
pub mod resources;
pub mod systems;
pub mod plugin;

pub use self::core::{
    effective_batch_size, CapturePolicy, InstancedDraw, InstancedDrawSink, NodeHierarchy,
    PropertyBlock, PropertyValue, DEFAULT_MAX_INSTANCES_PER_BATCH, HARDWARE_BATCH_LIMIT,
};
pub use capability::CapabilityGate;
pub use group::{BatchBuffer, InstanceGroup};
pub use registry::InstanceGroups;
pub use renderer::{batch_ranges, BatchRenderer, FrameStats};
pub use resources::{DrawQueue, InstanceRegistry, InstanceRenderer, InstanceRoot, PlatformCapabilities};
