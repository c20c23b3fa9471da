// scene.rs - Ten bodies falling at one unit per tick
//
// Body i starts at (i, 4i, 9i). Every tick lowers each body's z by 1.0,
// so after N ticks body i sits at z = 9i - N.

use std::any::Any;
use strand_core::glam::DVec3;
use strand_core::quantities::{BodyCount, Pose, SceneBounds, SimClock, WorldPose, WorldPoses};
use strand_core::time::SimulationTime;
use strand_core::{
    ComputePlan, DemandPolicy, Input, Output, State, StepBackend, StepConfig, StepError, TypeKey,
};

const ANNOTATION: &str = "MinimalFallingScene initialized";

pub struct MinimalFallingScene {
    poses: WorldPoses,
    time: SimulationTime,
    policy: DemandPolicy,
}

impl MinimalFallingScene {
    pub const BODY_COUNT: usize = 10;
    pub const FALL_PER_TICK: f64 = 1.0;

    pub fn new(config: &StepConfig) -> Self {
        let entries = (0..Self::BODY_COUNT)
            .map(|body| {
                let i = body as f64;
                WorldPose {
                    body,
                    pose: Pose::from_translation(DVec3::new(i, i * 4.0, i * 9.0)),
                }
            })
            .collect();

        Self {
            poses: WorldPoses {
                entries,
                annotation: ANNOTATION.to_string(),
            },
            time: SimulationTime::new(config.time_step),
            policy: DemandPolicy::new()
                .required::<WorldPoses>()
                .required::<SimClock>()
                .expected::<BodyCount>()
                .on_demand::<SceneBounds>(),
        }
    }

    /// Live poses.
    pub fn poses(&self) -> &WorldPoses {
        &self.poses
    }

    fn clock(&self) -> SimClock {
        SimClock {
            tick: self.time.tick_count(),
            seconds: self.time.seconds(),
        }
    }
}

impl StepBackend for MinimalFallingScene {
    fn name(&self) -> &str {
        "minimal-falling-scene"
    }

    fn policy(&self) -> &DemandPolicy {
        &self.policy
    }

    fn policy_mut(&mut self) -> &mut DemandPolicy {
        &mut self.policy
    }

    fn required_state(&self) -> Vec<TypeKey> {
        vec![TypeKey::of::<WorldPoses>()]
    }

    fn simulate(&mut self, _input: &Input) {
        for entry in &mut self.poses.entries {
            entry.pose.position.z -= Self::FALL_PER_TICK;
        }
        self.time.advance_tick();
    }

    fn write(&self, state: &mut State) {
        state.insert_or_assign(self.poses.clone());
        state.insert_or_assign(self.clock());
    }

    fn write_required_data(&self, output: &mut Output, plan: &ComputePlan) {
        if plan.wants::<WorldPoses>() {
            output.insert_or_assign(self.poses.clone());
        }
        if plan.wants::<SimClock>() {
            output.insert_or_assign(self.clock());
        }
        if plan.wants::<BodyCount>() {
            output.insert_or_assign(BodyCount(self.poses.entries.len()));
        }
        if plan.wants::<SceneBounds>() {
            let points = self.poses.entries.iter().map(|entry| entry.pose.position);
            if let Some(bounds) = SceneBounds::around(points) {
                output.insert_or_assign(bounds);
            }
        }
        for (key, tier) in plan.keys() {
            output.classify(key, tier);
        }
    }

    fn apply_state(&mut self, state: &State) -> Result<(), StepError> {
        let poses = state
            .query::<WorldPoses>()
            .ok_or_else(|| StepError::RejectedState {
                backend: self.name().to_string(),
                reason: "state carries no WorldPoses".to_string(),
            })?;
        self.poses = poses.clone();
        if let Some(clock) = state.query::<SimClock>() {
            self.time.set_tick_count(clock.tick);
        }
        tracing::debug!(
            tick = self.time.tick_count(),
            bodies = self.poses.entries.len(),
            "restored falling scene"
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use strand_core::Stepper;
    use tracing::Level;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    fn stepper() -> Stepper {
        Stepper::new(Box::new(MinimalFallingScene::new(&StepConfig::default())))
    }

    fn z_bits(poses: &WorldPoses) -> Vec<u64> {
        poses
            .entries
            .iter()
            .map(|entry| entry.pose.position.z.to_bits())
            .collect()
    }

    #[test]
    fn bodies_fall_one_unit_per_tick() {
        let mut stepper = stepper();
        let ticks = 7;
        for _ in 0..ticks {
            stepper.run_tick(Input::new(), |_| {}).unwrap();
        }

        stepper.prepare_input(Input::new()).unwrap();
        let output = stepper.step().unwrap();
        let n = (ticks + 1) as f64;
        let poses = output.query::<WorldPoses>().expect("poses are always written");
        assert_eq!(poses.entries.len(), 10);
        assert_eq!(poses.annotation, ANNOTATION);
        for (i, entry) in poses.entries.iter().enumerate() {
            assert_eq!(entry.pose.position.z, (i as f64 * 9.0) - n);
            assert_eq!(entry.pose.position.x, i as f64);
            assert_eq!(entry.pose.position.y, i as f64 * 4.0);
        }
        assert_eq!(output.query::<SimClock>().map(|c| c.tick), Some(ticks + 1));
    }

    #[test]
    fn state_missing_poses_is_rejected_untouched() {
        let mut stepper = stepper();
        for _ in 0..3 {
            stepper.run_tick(Input::new(), |_| {}).unwrap();
        }
        let scene = stepper.backend_as::<MinimalFallingScene>().unwrap();
        let before = z_bits(scene.poses());

        let mut incomplete = State::new();
        incomplete.insert_or_assign(SimClock { tick: 99, seconds: 0.0 });

        let result = stepper.set_state_to(&incomplete);
        assert!(matches!(result, Err(StepError::MissingRequiredData { .. })));

        let scene = stepper.backend_as::<MinimalFallingScene>().unwrap();
        assert_eq!(z_bits(scene.poses()), before);
        assert_eq!(scene.clock().tick, 3);
    }

    struct LevelCounter {
        errors: Arc<AtomicUsize>,
        warnings: Arc<AtomicUsize>,
    }

    impl<S: tracing::Subscriber> Layer<S> for LevelCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            match *event.metadata().level() {
                Level::ERROR => self.errors.fetch_add(1, Ordering::SeqCst),
                Level::WARN => self.warnings.fetch_add(1, Ordering::SeqCst),
                _ => 0,
            };
        }
    }

    #[test]
    fn rejected_state_reports_exactly_one_failure() {
        let errors = Arc::new(AtomicUsize::new(0));
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(LevelCounter {
            errors: Arc::clone(&errors),
            warnings: Arc::clone(&warnings),
        });

        tracing::subscriber::with_default(subscriber, || {
            let mut stepper = stepper();
            stepper.run_tick(Input::new(), |_| {}).unwrap();
            let before = z_bits(stepper.backend_as::<MinimalFallingScene>().unwrap().poses());

            let mut incomplete = State::new();
            incomplete.insert_or_assign(BodyCount(3));
            assert!(stepper.set_state_to(&incomplete).is_err());

            let scene = stepper.backend_as::<MinimalFallingScene>().unwrap();
            assert_eq!(z_bits(scene.poses()), before);
        });

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn written_state_restores_a_fresh_scene() {
        let mut original = stepper();
        for _ in 0..4 {
            original.run_tick(Input::new(), |_| {}).unwrap();
        }
        let snapshot = original.snapshot();

        let mut fresh = stepper();
        fresh.set_state_to(&snapshot).unwrap();
        let restored = fresh.backend_as::<MinimalFallingScene>().unwrap();
        assert_eq!(restored.poses(), original.backend_as::<MinimalFallingScene>().unwrap().poses());
        assert_eq!(restored.clock().tick, 4);
    }

    #[test]
    fn snapshot_does_not_alias_live_state() {
        let mut stepper = stepper();
        let mut snapshot = stepper.snapshot();
        snapshot.get_or_insert_default::<WorldPoses>().entries.clear();

        stepper.run_tick(Input::new(), |_| {}).unwrap();
        let scene = stepper.backend_as::<MinimalFallingScene>().unwrap();
        assert_eq!(scene.poses().entries.len(), 10);
    }

    #[test]
    fn bounds_are_computed_only_on_demand() {
        let mut stepper = stepper();
        stepper
            .run_tick(Input::new(), |output| {
                assert!(!output.has::<SceneBounds>());
                assert!(!output.has::<BodyCount>());
            })
            .unwrap();

        let mut input = Input::new();
        input.request::<SceneBounds>();
        stepper
            .run_tick(input, |output| {
                let bounds = output.query::<SceneBounds>().expect("requested bounds");
                assert_eq!(bounds.min, DVec3::new(0.0, 0.0, -2.0));
                assert_eq!(bounds.max, DVec3::new(9.0, 36.0, 79.0));
            })
            .unwrap();

        // Read on the previous tick, so produced once more.
        stepper
            .run_tick(Input::new(), |output| {
                assert!(output.has::<SceneBounds>());
            })
            .unwrap();
        stepper
            .run_tick(Input::new(), |output| {
                assert!(!output.has::<SceneBounds>());
                assert!(output.query::<SceneBounds>().is_none());
            })
            .unwrap();
    }

    #[test]
    fn body_count_persists_once_asked_for() {
        let mut stepper = stepper();
        stepper
            .run_tick(Input::new(), |output| {
                output.get_or_insert_default::<BodyCount>();
            })
            .unwrap();
        stepper
            .run_tick(Input::new(), |output| {
                assert_eq!(output.query::<BodyCount>(), Some(&BodyCount(10)));
            })
            .unwrap();
        stepper
            .run_tick(Input::new(), |output| {
                assert!(output.status_of::<BodyCount>().exists);
            })
            .unwrap();
    }
}
