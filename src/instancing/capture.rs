// src/instancing/capture.rs
//! Binds instance indices to live scene nodes.
//! Instance nodes are appended under one parent in creation order, so the
//! newest group's nodes sit at the tail of the child list.

use bevy::log::debug;

use super::core::CapturePolicy;

/// Pick up to `expected` nodes out of `children` according to `policy`.
///
/// The returned nodes bind to instance indices `0..len`; any index past that
/// has no live node and falls back to its baked matrix. A short child list
/// therefore leaves the trailing indices unbound, not the leading ones.
pub fn capture_live_nodes<N: Copy>(children: &[N], expected: usize, policy: CapturePolicy) -> Vec<N> {
    if expected == 0 || policy == CapturePolicy::Disabled {
        return Vec::new();
    }

    let available = expected.min(children.len());
    if available < expected {
        debug!(
            "Instancing: expected {} live nodes but parent has {} children; {} instances use baked matrices",
            expected,
            children.len(),
            expected - available
        );
    }

    match policy {
        CapturePolicy::Newest => children[children.len() - available..].to_vec(),
        CapturePolicy::Oldest => children[..available].to_vec(),
        CapturePolicy::Disabled => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_takes_the_tail_in_child_order() {
        let children = [10, 11, 12, 13, 14];
        assert_eq!(capture_live_nodes(&children, 3, CapturePolicy::Newest), vec![12, 13, 14]);
    }

    #[test]
    fn oldest_takes_the_head() {
        let children = [10, 11, 12, 13, 14];
        assert_eq!(capture_live_nodes(&children, 2, CapturePolicy::Oldest), vec![10, 11]);
    }

    #[test]
    fn short_child_list_binds_what_exists() {
        let children = [7, 8];
        assert_eq!(capture_live_nodes(&children, 5, CapturePolicy::Newest), vec![7, 8]);
    }

    #[test]
    fn nothing_to_bind() {
        let none: [u32; 0] = [];
        assert!(capture_live_nodes(&none, 4, CapturePolicy::Newest).is_empty());
        assert!(capture_live_nodes(&[1, 2, 3], 0, CapturePolicy::Newest).is_empty());
        assert!(capture_live_nodes(&[1, 2, 3], 3, CapturePolicy::Disabled).is_empty());
    }
}
