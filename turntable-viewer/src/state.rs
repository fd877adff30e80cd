//! Viewer state: the loaded instances and which one is active

use nalgebra::{Matrix4, Translation3, UnitQuaternion, Vector3};
use std::collections::VecDeque;
use std::sync::Arc;
use turntable_core::{AssetDescriptor, DrawList, MeshPrimitive, SceneNode};

/// Animated offset applied on top of a model's rest placement
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    /// Accumulated turntable rotation about +Y, radians
    pub spin: f32,
    /// Bounce rotation offset about +Y, radians
    pub yaw_offset: f32,
    /// Bounce lift along +Y
    pub lift: f32,
}

impl Pose {
    pub fn matrix(&self) -> Matrix4<f32> {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.spin + self.yaw_offset);
        Translation3::new(0.0, self.lift, 0.0).to_homogeneous() * rotation.to_homogeneous()
    }
}

/// A descriptor's loaded, renderable result
#[derive(Debug, Clone)]
pub struct LoadedInstance {
    pub descriptor: Arc<AssetDescriptor>,
    /// Position of the descriptor in the catalog
    pub catalog_index: usize,
    pub node: SceneNode,
    pub pose: Pose,
}

impl LoadedInstance {
    pub fn new(descriptor: Arc<AssetDescriptor>, catalog_index: usize, node: SceneNode) -> Self {
        Self {
            descriptor,
            catalog_index,
            node,
            pose: Pose::default(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.node.visible
    }
}

/// Everything the controller knows about the catalog at runtime.
///
/// Instances are kept in catalog order whatever order they finish loading in.
#[derive(Debug, Default)]
pub struct ViewerState {
    active_index: usize,
    instances: Vec<LoadedInstance>,
    pending: VecDeque<Arc<AssetDescriptor>>,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with every descriptor waiting to load
    pub fn with_pending(descriptors: impl IntoIterator<Item = Arc<AssetDescriptor>>) -> Self {
        Self {
            pending: descriptors.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> Option<&LoadedInstance> {
        self.instances.get(self.active_index)
    }

    pub fn active_mut(&mut self) -> Option<&mut LoadedInstance> {
        self.instances.get_mut(self.active_index)
    }

    pub fn get(&self, index: usize) -> Option<&LoadedInstance> {
        self.instances.get(index)
    }

    pub fn instances(&self) -> &[LoadedInstance] {
        &self.instances
    }

    pub fn pending(&self) -> impl Iterator<Item = &Arc<AssetDescriptor>> {
        self.pending.iter()
    }

    /// Add a loaded instance at its catalog position and return its index.
    /// The active instance stays active.
    pub fn insert(&mut self, instance: LoadedInstance) -> usize {
        self.settle(&instance.descriptor.id);
        let position = self
            .instances
            .partition_point(|existing| existing.catalog_index < instance.catalog_index);
        if !self.instances.is_empty() && position <= self.active_index {
            self.active_index += 1;
        }
        self.instances.insert(position, instance);
        position
    }

    /// Remove a descriptor from the pending queue once its load has resolved
    pub fn settle(&mut self, id: &str) {
        self.pending.retain(|d| d.id != id);
    }

    /// Make `index` active and the only visible instance, in one pass
    pub(crate) fn show_only(&mut self, index: usize) -> Option<&mut LoadedInstance> {
        if index >= self.instances.len() {
            return None;
        }
        self.active_index = index;
        for (i, instance) in self.instances.iter_mut().enumerate() {
            instance.node.visible = i == index;
        }
        self.instances.get_mut(index)
    }

    pub fn visible_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_visible()).count()
    }
}

impl DrawList for ViewerState {
    fn for_each_draw(&self, f: &mut dyn FnMut(&MeshPrimitive, &Matrix4<f32>)) {
        for instance in self.instances.iter().filter(|i| i.is_visible()) {
            instance.node.for_each_mesh(&instance.pose.matrix(), &mut |mesh: &MeshPrimitive, world: &Matrix4<f32>| {
                f(mesh, world)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use turntable_core::Point3f;

    fn instance(id: &str, catalog_index: usize) -> LoadedInstance {
        let descriptor = Arc::new(AssetDescriptor::new(id, id, format!("{}.glb", id)));
        let mut node = SceneNode::new(id);
        node.visible = false;
        LoadedInstance::new(descriptor, catalog_index, node)
    }

    #[test]
    fn instances_stay_in_catalog_order() {
        let mut state = ViewerState::new();
        assert_eq!(state.insert(instance("c", 2)), 0);
        assert_eq!(state.insert(instance("a", 0)), 0);
        assert_eq!(state.insert(instance("b", 1)), 1);
        let ids: Vec<_> = state.instances().iter().map(|i| i.descriptor.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn insert_before_active_keeps_active_instance() {
        let mut state = ViewerState::new();
        state.insert(instance("b", 1));
        state.show_only(0);
        state.insert(instance("a", 0));
        assert_eq!(state.active_index(), 1);
        assert_eq!(state.active().unwrap().descriptor.id, "b");
    }

    #[test]
    fn insert_settles_pending() {
        let a = Arc::new(AssetDescriptor::new("a", "A", "a.glb"));
        let b = Arc::new(AssetDescriptor::new("b", "B", "b.glb"));
        let mut state = ViewerState::with_pending([a, b]);
        state.insert(instance("a", 0));
        let pending: Vec<_> = state.pending().map(|d| d.id.clone()).collect();
        assert_eq!(pending, ["b"]);
    }

    #[test]
    fn show_only_is_exclusive() {
        let mut state = ViewerState::new();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            state.insert(instance(id, i));
        }
        state.show_only(2);
        assert_eq!(state.visible_count(), 1);
        assert!(state.get(2).unwrap().is_visible());
        assert!(state.show_only(3).is_none());
        assert_eq!(state.active_index(), 2);
    }

    #[test]
    fn pose_lifts_then_spins() {
        let pose = Pose {
            spin: std::f32::consts::FRAC_PI_2,
            yaw_offset: 0.0,
            lift: 0.5,
        };
        let p = pose.matrix().transform_point(&Point3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3f::new(0.0, 0.5, -1.0), epsilon = 1e-6);
    }
}
