// src/instancing/capability.rs
//! Lazy hardware-instancing detection.

use bevy::log::{debug, warn};

use super::core::InstancedDrawSink;

/// Caches the platform's instancing answer and switches materials over.
/// It never blocks a draw: on an unsupported platform the sink gets the
/// batches anyway and decides what to do with them.
#[derive(Debug, Default)]
pub struct CapabilityGate {
    supported: Option<bool>,
}

impl CapabilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the sink once; later calls reuse the cached answer.
    pub fn instancing_supported<S: InstancedDrawSink>(&mut self, sink: &S) -> bool {
        *self.supported.get_or_insert_with(|| {
            let supported = sink.supports_instancing();
            if supported {
                debug!("Instancing: hardware instancing available");
            } else {
                warn!("Instancing: hardware instancing is not supported on this platform; batches go to the draw sink without it");
            }
            supported
        })
    }

    /// Enables instancing on `material` when the platform allows it.
    /// Returns whether it did; drawing goes ahead either way.
    pub fn ensure_material<S: InstancedDrawSink>(&mut self, sink: &mut S, material: &S::Material) -> bool {
        if !self.instancing_supported(sink) {
            return false;
        }
        sink.enable_instancing(material);
        true
    }

    /// Forget the cached answer (host capabilities changed).
    pub fn reset(&mut self) {
        self.supported = None;
    }

    pub fn is_detected(&self) -> bool {
        self.supported.is_some()
    }
}
