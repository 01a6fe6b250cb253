//! Batched hardware-instanced rendering for groups of props.
//!
//! Register a named group of instances (live scene nodes or baked matrices),
//! then once per frame the renderer packs their world matrices into
//! fixed-size batches and hands each batch to an instanced draw sink.

pub mod instancing;

pub use instancing::plugin::{InstanceGroupRequest, InstancingPlugin, InstancingSet};
pub use instancing::resources::{DrawQueue, InstanceRegistry, InstanceRenderer, InstanceRoot};
