//! Quantities shared between backends and consumers.
//!
//! None of these are special to the containers: any crate can define its
//! own and store it next to these. They live here so independent backends
//! agree on the common kinematic vocabulary.

use glam::{DQuat, DVec3};

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        orientation: DQuat::IDENTITY,
    };

    pub fn from_translation(position: DVec3) -> Self {
        Self {
            position,
            orientation: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(orientation: DQuat) -> Self {
        Self {
            position: DVec3::ZERO,
            orientation,
        }
    }

    /// `self` followed by `local`, where `local` is expressed in `self`'s frame.
    pub fn then(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.orientation * local.position,
            orientation: self.orientation * local.orientation,
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.position + self.orientation * point
    }

    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.orientation * vector
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pose and motion of a frame, all expressed in world coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FrameData {
    pub pose: Pose,
    pub linear_velocity: DVec3,
    pub angular_velocity: DVec3,
    pub linear_acceleration: DVec3,
    pub angular_acceleration: DVec3,
}

impl FrameData {
    /// Frame data of a point rigidly attached to this frame at `offset`.
    pub fn rigid_child(&self, offset: &Pose) -> FrameData {
        let r = self.pose.transform_vector(offset.position);
        let w = self.angular_velocity;
        let alpha = self.angular_acceleration;
        FrameData {
            pose: self.pose.then(offset),
            linear_velocity: self.linear_velocity + w.cross(r),
            angular_velocity: w,
            linear_acceleration: self.linear_acceleration + alpha.cross(r) + w.cross(w.cross(r)),
            angular_acceleration: alpha,
        }
    }
}

/// Pose of one body.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct WorldPose {
    pub body: usize,
    pub pose: Pose,
}

/// World poses of every body in a scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldPoses {
    pub entries: Vec<WorldPose>,
    pub annotation: String,
}

/// Velocity of one body in world coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BodyVelocity {
    pub body: usize,
    pub linear: DVec3,
    pub angular: DVec3,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyVelocities {
    pub entries: Vec<BodyVelocity>,
}

/// Acceleration of one body in world coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BodyAcceleration {
    pub body: usize,
    pub linear: DVec3,
    pub angular: DVec3,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyAccelerations {
    pub entries: Vec<BodyAcceleration>,
}

/// Generalized coordinates of one single-axis joint.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct JointState {
    pub joint: u64,
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointStates {
    pub entries: Vec<JointState>,
}

/// Axis-aligned box around every body position.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SceneBounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl SceneBounds {
    /// Bounds of `points`, or `None` when there are none.
    pub fn around(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |bounds, p| Self {
            min: bounds.min.min(p),
            max: bounds.max.max(p),
        }))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BodyCount(pub usize);

/// Simulated time at the end of the tick that produced an output.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SimClock {
    pub tick: u64,
    pub seconds: f64,
}
