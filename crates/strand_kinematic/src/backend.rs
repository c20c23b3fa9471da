// backend.rs - Step protocol for the kinematic engine

use crate::{JointId, KinematicEngine, LinkId};
use std::any::Any;
use strand_core::quantities::{
    BodyAcceleration, BodyAccelerations, BodyVelocities, BodyVelocity, JointState, JointStates,
    SimClock, WorldPose, WorldPoses,
};
use strand_core::{
    ComputePlan, DemandPolicy, Input, Output, State, StepBackend, StepError, TypeKey,
};

/// Joint accelerations to hold from this tick on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointCommands {
    pub entries: Vec<(JointId, f64)>,
}

pub(crate) fn default_policy() -> DemandPolicy {
    DemandPolicy::new()
        .required::<WorldPoses>()
        .required::<SimClock>()
        .expected::<BodyVelocities>()
        .on_demand::<BodyAccelerations>()
}

impl KinematicEngine {
    fn clock(&self) -> SimClock {
        SimClock {
            tick: self.time.tick_count(),
            seconds: self.time.seconds(),
        }
    }

    fn link_ids(&self) -> impl Iterator<Item = LinkId> {
        (0..self.links.len()).map(LinkId::new)
    }

    fn joint_states(&self) -> JointStates {
        let entries = self
            .active_joints()
            .map(|joint| {
                let record = &self.joints[joint.index()];
                JointState {
                    joint: joint.raw(),
                    position: record.position,
                    velocity: record.velocity,
                    acceleration: record.acceleration,
                }
            })
            .collect();
        JointStates { entries }
    }

    fn reject(&self, reason: String) -> StepError {
        StepError::RejectedState {
            backend: self.name().to_string(),
            reason,
        }
    }

    /// Check every entry against the live joints before anything is applied.
    fn validate(&self, states: &JointStates) -> Result<Vec<(JointId, JointState)>, StepError> {
        let live: Vec<JointId> = self.active_joints().collect();
        if states.entries.len() != live.len() {
            return Err(self.reject(format!(
                "expected {} joint states, got {}",
                live.len(),
                states.entries.len()
            )));
        }

        let mut seen = Vec::with_capacity(live.len());
        states
            .entries
            .iter()
            .map(|entry| {
                let joint = JointId::from_raw(entry.joint)
                    .filter(|joint| live.contains(joint))
                    .ok_or_else(|| self.reject(format!("unknown joint id {}", entry.joint)))?;
                let finite = [entry.position, entry.velocity, entry.acceleration]
                    .iter()
                    .all(|value| value.is_finite());
                if !finite {
                    return Err(self.reject(format!("non-finite state for {joint}")));
                }
                if seen.contains(&joint) {
                    return Err(self.reject(format!("duplicate state for {joint}")));
                }
                seen.push(joint);
                Ok((joint, *entry))
            })
            .collect()
    }
}

impl StepBackend for KinematicEngine {
    fn name(&self) -> &str {
        "kinematic-engine"
    }

    fn policy(&self) -> &DemandPolicy {
        &self.policy
    }

    fn policy_mut(&mut self) -> &mut DemandPolicy {
        &mut self.policy
    }

    fn required_state(&self) -> Vec<TypeKey> {
        vec![TypeKey::of::<JointStates>()]
    }

    /// Semi-implicit Euler: velocity first, then position from the new velocity.
    fn simulate(&mut self, input: &Input) {
        if let Some(commands) = input.query::<JointCommands>() {
            for &(joint, acceleration) in &commands.entries {
                match self.joint_mut(joint) {
                    Ok(record) => record.acceleration = acceleration,
                    Err(err) => tracing::warn!(%err, "ignoring joint command"),
                }
            }
        }

        let dt = self.time.time_step();
        let active: Vec<JointId> = self.active_joints().collect();
        for joint in active {
            let record = &mut self.joints[joint.index()];
            record.velocity += record.acceleration * dt;
            record.position += record.velocity * dt;
        }
        self.time.advance_tick();
    }

    fn write(&self, state: &mut State) {
        state.insert_or_assign(self.joint_states());
        state.insert_or_assign(self.clock());
    }

    fn write_required_data(&self, output: &mut Output, plan: &ComputePlan) {
        let frames: Vec<_> = self
            .link_ids()
            .map(|link| (link.index(), self.link_frame(link)))
            .collect();

        if plan.wants::<WorldPoses>() {
            output.insert_or_assign(WorldPoses {
                entries: frames
                    .iter()
                    .map(|(body, frame)| WorldPose {
                        body: *body,
                        pose: frame.pose,
                    })
                    .collect(),
                annotation: String::new(),
            });
        }
        if plan.wants::<SimClock>() {
            output.insert_or_assign(self.clock());
        }
        if plan.wants::<BodyVelocities>() {
            output.insert_or_assign(BodyVelocities {
                entries: frames
                    .iter()
                    .map(|(body, frame)| BodyVelocity {
                        body: *body,
                        linear: frame.linear_velocity,
                        angular: frame.angular_velocity,
                    })
                    .collect(),
            });
        }
        if plan.wants::<BodyAccelerations>() {
            output.insert_or_assign(BodyAccelerations {
                entries: frames
                    .iter()
                    .map(|(body, frame)| BodyAcceleration {
                        body: *body,
                        linear: frame.linear_acceleration,
                        angular: frame.angular_acceleration,
                    })
                    .collect(),
            });
        }
        for (key, tier) in plan.keys() {
            output.classify(key, tier);
        }
    }

    fn apply_state(&mut self, state: &State) -> Result<(), StepError> {
        let states = state
            .query::<JointStates>()
            .ok_or_else(|| self.reject("state carries no JointStates".to_string()))?;
        let validated = self.validate(states)?;

        for (joint, entry) in validated {
            let record = &mut self.joints[joint.index()];
            record.position = entry.position;
            record.velocity = entry.velocity;
            record.acceleration = entry.acceleration;
        }
        if let Some(clock) = state.query::<SimClock>() {
            self.time.set_tick_count(clock.tick);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
