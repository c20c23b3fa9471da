// engine.rs - Worlds, models, links, joints and shapes
//
// Every link has at most one parent joint. A joint either hangs its child
// off another link of the same model or off the world frame. Frame data is
// computed by walking from a link up to its root and composing joint
// motion on the way back down.

use crate::entity::{
    JointKind, JointRecord, LinkRecord, ModelRecord, ShapeGeometry, ShapeRecord, WorldRecord,
};
use crate::error::KinematicError;
use crate::{JointId, LinkId, ModelId, ShapeId, WorldId};
use glam::DVec3;
use strand_core::quantities::{FrameData, Pose};
use strand_core::time::SimulationTime;
use strand_core::{DemandPolicy, StepConfig};

/// Kinematic tree backend.
pub struct KinematicEngine {
    pub(crate) worlds: Vec<WorldRecord>,
    pub(crate) models: Vec<ModelRecord>,
    pub(crate) links: Vec<LinkRecord>,
    pub(crate) joints: Vec<JointRecord>,
    pub(crate) shapes: Vec<ShapeRecord>,
    pub(crate) time: SimulationTime,
    pub(crate) policy: DemandPolicy,
}

impl KinematicEngine {
    /// Axis given to revolute joints when none is set explicitly.
    pub const DEFAULT_AXIS: DVec3 = DVec3::X;

    pub fn new(config: &StepConfig) -> Self {
        Self {
            worlds: Vec::new(),
            models: Vec::new(),
            links: Vec::new(),
            joints: Vec::new(),
            shapes: Vec::new(),
            time: SimulationTime::new(config.time_step),
            policy: crate::backend::default_policy(),
        }
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn construct_empty_world(&mut self, name: &str) -> WorldId {
        self.worlds.push(WorldRecord {
            name: name.to_string(),
        });
        WorldId::new(self.worlds.len() - 1)
    }

    pub fn construct_empty_model(
        &mut self,
        world: WorldId,
        name: &str,
    ) -> Result<ModelId, KinematicError> {
        self.world(world)?;
        self.models.push(ModelRecord {
            name: name.to_string(),
            world,
        });
        Ok(ModelId::new(self.models.len() - 1))
    }

    pub fn construct_empty_link(
        &mut self,
        model: ModelId,
        name: &str,
    ) -> Result<LinkId, KinematicError> {
        self.model(model)?;
        self.links.push(LinkRecord {
            name: name.to_string(),
            model,
            parent_joint: None,
            shapes: Vec::new(),
        });
        Ok(LinkId::new(self.links.len() - 1))
    }

    /// Attach `child` to `parent` (or the world) with a revolute joint
    /// about [`Self::DEFAULT_AXIS`].
    pub fn attach_revolute_joint(
        &mut self,
        child: LinkId,
        parent: Option<LinkId>,
        name: &str,
    ) -> Result<JointId, KinematicError> {
        self.attach_joint(child, parent, name, JointKind::Revolute, Self::DEFAULT_AXIS)
    }

    /// Attach `child` to `parent` (or the world) with a prismatic joint
    /// sliding along `axis`.
    pub fn attach_prismatic_joint(
        &mut self,
        child: LinkId,
        parent: Option<LinkId>,
        name: &str,
        axis: DVec3,
    ) -> Result<JointId, KinematicError> {
        self.attach_joint(child, parent, name, JointKind::Prismatic, axis)
    }

    fn attach_joint(
        &mut self,
        child: LinkId,
        parent: Option<LinkId>,
        name: &str,
        kind: JointKind,
        axis: DVec3,
    ) -> Result<JointId, KinematicError> {
        let axis = normalized_axis(axis)?;
        let child_model = self.link(child)?.model;
        if let Some(parent) = parent {
            if self.link(parent)?.model != child_model {
                return Err(KinematicError::ModelMismatch { child, parent });
            }
            if self.ancestors(parent).any(|link| link == child) {
                return Err(KinematicError::Cycle { child, parent });
            }
        }

        let id = JointId::new(self.joints.len());
        self.joints.push(JointRecord {
            name: name.to_string(),
            kind,
            child,
            parent,
            axis,
            position: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
        });

        let replaced = self.links[child.index()].parent_joint.replace(id);
        if let Some(old) = replaced {
            tracing::debug!(%child, %old, new = %id, "replaced parent joint");
        }
        Ok(id)
    }

    pub fn attach_box_shape(
        &mut self,
        link: LinkId,
        name: &str,
        size: DVec3,
        pose: Pose,
    ) -> Result<ShapeId, KinematicError> {
        if !(size.is_finite() && size.min_element() > 0.0) {
            return Err(KinematicError::InvalidShape);
        }
        self.attach_shape(link, name, ShapeGeometry::Box { size }, pose)
    }

    pub fn attach_sphere_shape(
        &mut self,
        link: LinkId,
        name: &str,
        radius: f64,
        pose: Pose,
    ) -> Result<ShapeId, KinematicError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(KinematicError::InvalidShape);
        }
        self.attach_shape(link, name, ShapeGeometry::Sphere { radius }, pose)
    }

    fn attach_shape(
        &mut self,
        link: LinkId,
        name: &str,
        geometry: ShapeGeometry,
        pose: Pose,
    ) -> Result<ShapeId, KinematicError> {
        self.link(link)?;
        let id = ShapeId::new(self.shapes.len());
        self.shapes.push(ShapeRecord {
            name: name.to_string(),
            link,
            geometry,
            pose,
        });
        self.links[link.index()].shapes.push(id);
        Ok(id)
    }

    pub fn world_name(&self, world: WorldId) -> Result<&str, KinematicError> {
        Ok(&self.world(world)?.name)
    }

    pub fn model_name(&self, model: ModelId) -> Result<&str, KinematicError> {
        Ok(&self.model(model)?.name)
    }

    pub fn model_world(&self, model: ModelId) -> Result<WorldId, KinematicError> {
        Ok(self.model(model)?.world)
    }

    pub fn link_name(&self, link: LinkId) -> Result<&str, KinematicError> {
        Ok(&self.link(link)?.name)
    }

    pub fn link_model(&self, link: LinkId) -> Result<ModelId, KinematicError> {
        Ok(self.link(link)?.model)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links of `model`, in construction order.
    pub fn links_of(&self, model: ModelId) -> impl Iterator<Item = LinkId> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter(move |(_, link)| link.model == model)
            .map(|(idx, _)| LinkId::new(idx))
    }

    pub fn parent_joint(&self, link: LinkId) -> Result<Option<JointId>, KinematicError> {
        Ok(self.link(link)?.parent_joint)
    }

    pub fn joint_name(&self, joint: JointId) -> Result<&str, KinematicError> {
        Ok(&self.joint(joint)?.name)
    }

    pub fn joint_kind(&self, joint: JointId) -> Result<JointKind, KinematicError> {
        Ok(self.joint(joint)?.kind)
    }

    pub fn joint_axis(&self, joint: JointId) -> Result<DVec3, KinematicError> {
        Ok(self.joint(joint)?.axis)
    }

    pub fn joint_child(&self, joint: JointId) -> Result<LinkId, KinematicError> {
        Ok(self.joint(joint)?.child)
    }

    pub fn joint_parent(&self, joint: JointId) -> Result<Option<LinkId>, KinematicError> {
        Ok(self.joint(joint)?.parent)
    }

    /// Joints that currently connect a link to its parent.
    ///
    /// Joints replaced by a later attach stay addressable but no longer
    /// move anything.
    pub fn active_joints(&self) -> impl Iterator<Item = JointId> + '_ {
        self.links.iter().filter_map(|link| link.parent_joint)
    }

    pub fn shape_count(&self, link: LinkId) -> Result<usize, KinematicError> {
        Ok(self.link(link)?.shapes.len())
    }

    /// The `index`-th shape attached to `link`.
    pub fn shape(&self, link: LinkId, index: usize) -> Result<Option<ShapeId>, KinematicError> {
        Ok(self.link(link)?.shapes.get(index).copied())
    }

    pub fn shape_name(&self, shape: ShapeId) -> Result<&str, KinematicError> {
        Ok(&self.shape_record(shape)?.name)
    }

    pub fn shape_geometry(&self, shape: ShapeId) -> Result<ShapeGeometry, KinematicError> {
        Ok(self.shape_record(shape)?.geometry)
    }

    pub fn shape_link(&self, shape: ShapeId) -> Result<LinkId, KinematicError> {
        Ok(self.shape_record(shape)?.link)
    }

    /// Set the joint axis. Axes are stored normalized.
    pub fn set_joint_axis(&mut self, joint: JointId, axis: DVec3) -> Result<(), KinematicError> {
        let axis = normalized_axis(axis)?;
        self.joint_mut(joint)?.axis = axis;
        Ok(())
    }

    pub fn set_joint_position(&mut self, joint: JointId, value: f64) -> Result<(), KinematicError> {
        self.joint_mut(joint)?.position = value;
        Ok(())
    }

    pub fn set_joint_velocity(&mut self, joint: JointId, value: f64) -> Result<(), KinematicError> {
        self.joint_mut(joint)?.velocity = value;
        Ok(())
    }

    pub fn set_joint_acceleration(
        &mut self,
        joint: JointId,
        value: f64,
    ) -> Result<(), KinematicError> {
        self.joint_mut(joint)?.acceleration = value;
        Ok(())
    }

    pub fn joint_position(&self, joint: JointId) -> Result<f64, KinematicError> {
        Ok(self.joint(joint)?.position)
    }

    pub fn joint_velocity(&self, joint: JointId) -> Result<f64, KinematicError> {
        Ok(self.joint(joint)?.velocity)
    }

    pub fn joint_acceleration(&self, joint: JointId) -> Result<f64, KinematicError> {
        Ok(self.joint(joint)?.acceleration)
    }

    /// Pose, velocity and acceleration of `link` in world coordinates.
    pub fn frame_data_relative_to_world(&self, link: LinkId) -> Result<FrameData, KinematicError> {
        self.link(link)?;
        Ok(self.link_frame(link))
    }

    /// Frame data of a shape, rigidly attached to its link.
    pub fn shape_frame_data_relative_to_world(
        &self,
        shape: ShapeId,
    ) -> Result<FrameData, KinematicError> {
        let record = self.shape_record(shape)?;
        Ok(self.link_frame(record.link).rigid_child(&record.pose))
    }

    /// Link ids are assumed valid.
    pub(crate) fn link_frame(&self, link: LinkId) -> FrameData {
        let Some(joint) = self.links[link.index()].parent_joint else {
            return FrameData::default();
        };
        let joint = &self.joints[joint.index()];
        let parent = match joint.parent {
            Some(parent) => self.link_frame(parent),
            None => FrameData::default(),
        };
        compose(&parent, joint)
    }

    /// Parent chain of `link`, starting with `link` itself.
    fn ancestors(&self, link: LinkId) -> impl Iterator<Item = LinkId> + '_ {
        std::iter::successors(Some(link), move |current| {
            self.links[current.index()]
                .parent_joint
                .and_then(|joint| self.joints[joint.index()].parent)
        })
    }

    fn world(&self, id: WorldId) -> Result<&WorldRecord, KinematicError> {
        self.worlds.get(id.index()).ok_or(KinematicError::UnknownWorld(id))
    }

    fn model(&self, id: ModelId) -> Result<&ModelRecord, KinematicError> {
        self.models.get(id.index()).ok_or(KinematicError::UnknownModel(id))
    }

    fn link(&self, id: LinkId) -> Result<&LinkRecord, KinematicError> {
        self.links.get(id.index()).ok_or(KinematicError::UnknownLink(id))
    }

    fn joint(&self, id: JointId) -> Result<&JointRecord, KinematicError> {
        self.joints.get(id.index()).ok_or(KinematicError::UnknownJoint(id))
    }

    pub(crate) fn joint_mut(&mut self, id: JointId) -> Result<&mut JointRecord, KinematicError> {
        self.joints
            .get_mut(id.index())
            .ok_or(KinematicError::UnknownJoint(id))
    }

    fn shape_record(&self, id: ShapeId) -> Result<&ShapeRecord, KinematicError> {
        self.shapes.get(id.index()).ok_or(KinematicError::UnknownShape(id))
    }
}

fn normalized_axis(axis: DVec3) -> Result<DVec3, KinematicError> {
    axis.try_normalize().ok_or(KinematicError::InvalidAxis)
}

/// Child frame data from the parent frame and the joint's motion.
///
/// The joint frame coincides with the parent frame, so a revolute child
/// shares the parent's origin and a prismatic child sits at
/// `axis * position` in the parent frame.
fn compose(parent: &FrameData, joint: &JointRecord) -> FrameData {
    let pose = parent.pose.then(&joint.local_pose());
    let axis = parent.pose.transform_vector(joint.axis);
    let w = parent.angular_velocity;
    let alpha = parent.angular_acceleration;

    match joint.kind {
        JointKind::Revolute => {
            let w_rel = axis * joint.velocity;
            FrameData {
                pose,
                linear_velocity: parent.linear_velocity,
                angular_velocity: w + w_rel,
                linear_acceleration: parent.linear_acceleration,
                angular_acceleration: alpha + w.cross(w_rel) + axis * joint.acceleration,
            }
        }
        JointKind::Prismatic => {
            let r = pose.position - parent.pose.position;
            let v_rel = axis * joint.velocity;
            FrameData {
                pose,
                linear_velocity: parent.linear_velocity + w.cross(r) + v_rel,
                angular_velocity: w,
                linear_acceleration: parent.linear_acceleration
                    + alpha.cross(r)
                    + w.cross(w.cross(r))
                    + 2.0 * w.cross(v_rel)
                    + axis * joint.acceleration,
                angular_acceleration: alpha,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn near(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    fn engine_with_model() -> (KinematicEngine, ModelId) {
        let mut engine = KinematicEngine::new(&StepConfig::default());
        let world = engine.construct_empty_world("world");
        let model = engine.construct_empty_model(world, "model").unwrap();
        (engine, model)
    }

    #[test]
    fn prismatic_joint_frame_data() {
        let (mut engine, model) = engine_with_model();
        let base = engine.construct_empty_link(model, "base").unwrap();
        let hinge = engine.attach_revolute_joint(base, None, "hinge").unwrap();
        assert_eq!(engine.joint_axis(hinge).unwrap(), DVec3::X);
        engine.set_joint_axis(hinge, DVec3::Z).unwrap();

        let child = engine.construct_empty_link(model, "child").unwrap();
        let slider = engine
            .attach_prismatic_joint(child, Some(base), "slider", DVec3::Z)
            .unwrap();
        engine.set_joint_position(slider, 2.5).unwrap();
        engine.set_joint_velocity(slider, 9.1).unwrap();
        engine.set_joint_acceleration(slider, 10.2).unwrap();

        let frame = engine.frame_data_relative_to_world(child).unwrap();
        assert_eq!(frame.pose.position, DVec3::new(0.0, 0.0, 2.5));
        assert_eq!(frame.linear_velocity, DVec3::new(0.0, 0.0, 9.1));
        assert_eq!(frame.linear_acceleration, DVec3::new(0.0, 0.0, 10.2));
        assert_eq!(frame.angular_velocity, DVec3::ZERO);

        let offset = Pose::from_translation(DVec3::new(0.0, 11.5, 0.0));
        let sphere = engine.attach_sphere_shape(child, "ball", 1.0, offset).unwrap();
        assert_eq!(engine.shape_count(child).unwrap(), 1);
        assert_eq!(engine.shape(child, 0).unwrap(), Some(sphere));

        let frame = engine.shape_frame_data_relative_to_world(sphere).unwrap();
        assert_eq!(frame.pose.position, DVec3::new(0.0, 11.5, 2.5));
        assert_eq!(frame.linear_velocity, DVec3::new(0.0, 0.0, 9.1));
        assert_eq!(frame.linear_acceleration, DVec3::new(0.0, 0.0, 10.2));
    }

    #[test]
    fn spinning_parent_carries_slider() {
        let (mut engine, model) = engine_with_model();
        let base = engine.construct_empty_link(model, "base").unwrap();
        let hinge = engine.attach_revolute_joint(base, None, "hinge").unwrap();
        engine.set_joint_axis(hinge, DVec3::Z).unwrap();
        engine.set_joint_position(hinge, FRAC_PI_2).unwrap();
        engine.set_joint_velocity(hinge, 2.0).unwrap();

        let child = engine.construct_empty_link(model, "child").unwrap();
        let slider = engine
            .attach_prismatic_joint(child, Some(base), "slider", DVec3::X)
            .unwrap();
        engine.set_joint_position(slider, 1.0).unwrap();
        engine.set_joint_velocity(slider, 3.0).unwrap();

        let frame = engine.frame_data_relative_to_world(child).unwrap();
        // Slider axis X is rotated onto world Y.
        assert!(near(frame.pose.position, DVec3::new(0.0, 1.0, 0.0)));
        // w x r + v_rel
        assert!(near(frame.linear_velocity, DVec3::new(-2.0, 3.0, 0.0)));
        // w x (w x r) + 2 w x v_rel
        assert!(near(frame.linear_acceleration, DVec3::new(-12.0, -4.0, 0.0)));
        assert!(near(frame.angular_velocity, DVec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn reattaching_replaces_parent_joint() {
        let (mut engine, model) = engine_with_model();
        let a = engine.construct_empty_link(model, "a").unwrap();
        let b = engine.construct_empty_link(model, "b").unwrap();
        let first = engine.attach_revolute_joint(b, Some(a), "first").unwrap();
        let second = engine
            .attach_prismatic_joint(b, None, "second", DVec3::Y)
            .unwrap();

        assert_eq!(engine.parent_joint(b).unwrap(), Some(second));
        assert_eq!(engine.joint_parent(second).unwrap(), None);
        assert_eq!(engine.active_joints().collect::<Vec<_>>(), vec![second]);
        assert_eq!(engine.joint_name(first).unwrap(), "first");
    }

    #[test]
    fn invalid_topology_is_rejected() {
        let (mut engine, model) = engine_with_model();
        let a = engine.construct_empty_link(model, "a").unwrap();
        let b = engine.construct_empty_link(model, "b").unwrap();
        engine.attach_revolute_joint(b, Some(a), "ab").unwrap();
        assert_eq!(
            engine.attach_revolute_joint(a, Some(b), "ba"),
            Err(KinematicError::Cycle { child: a, parent: b })
        );

        let world = engine.construct_empty_world("other");
        let other = engine.construct_empty_model(world, "other").unwrap();
        let c = engine.construct_empty_link(other, "c").unwrap();
        assert_eq!(
            engine.attach_revolute_joint(c, Some(a), "ca"),
            Err(KinematicError::ModelMismatch { child: c, parent: a })
        );
        assert_eq!(
            engine.attach_prismatic_joint(c, None, "zero", DVec3::ZERO),
            Err(KinematicError::InvalidAxis)
        );
        assert_eq!(
            engine.attach_box_shape(c, "flat", DVec3::new(1.0, 0.0, 1.0), Pose::IDENTITY),
            Err(KinematicError::InvalidShape)
        );
        assert!(matches!(
            engine.frame_data_relative_to_world(LinkId::new(99)),
            Err(KinematicError::UnknownLink(_))
        ));
    }

    #[test]
    fn lookups_report_hierarchy() {
        let (mut engine, model) = engine_with_model();
        let link = engine.construct_empty_link(model, "link").unwrap();
        let shape = engine
            .attach_box_shape(link, "crate", DVec3::ONE, Pose::IDENTITY)
            .unwrap();
        assert_eq!(engine.model_name(model).unwrap(), "model");
        assert_eq!(engine.world_name(engine.model_world(model).unwrap()).unwrap(), "world");
        assert_eq!(engine.link_model(link).unwrap(), model);
        assert_eq!(engine.links_of(model).collect::<Vec<_>>(), vec![link]);
        assert_eq!(engine.shape_link(shape).unwrap(), link);
        assert_eq!(
            engine.shape_geometry(shape).unwrap(),
            ShapeGeometry::Box { size: DVec3::ONE }
        );
        // Unjointed links sit at the world origin.
        assert_eq!(
            engine.frame_data_relative_to_world(link).unwrap(),
            FrameData::default()
        );
    }
}
