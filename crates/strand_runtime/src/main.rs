//! Strand Runtime
//!
//! Loads a backend by name and capability, then drives it through the
//! step protocol, logging what each tick produces.
//!
//! Usage: `strand [config.json]`

mod settings;

use anyhow::{Context, Result};
use settings::RuntimeConfig;
use std::path::PathBuf;
use strand_core::glam::DVec3;
use strand_core::quantities::{BodyVelocities, Pose, SceneBounds, SimClock, WorldPoses};
use strand_core::{EngineHandle, Input, PluginRegistry};
use strand_kinematic::{KinematicEngine, KinematicPlugin};
use strand_minimal::MinimalPlugin;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Strand v{}", strand_core::VERSION);
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => RuntimeConfig::load(&path)?,
        None => RuntimeConfig::default(),
    };
    tracing::debug!(?config, "runtime configuration");

    let mut handle = load_backend(&builtin_plugins()?, &config)?;
    tracing::info!(plugin = handle.plugin(), "backend loaded");
    build_demo_scene(&mut handle)?;

    let mut stepper = handle.into_stepper(&config.step);
    for tick in 0..config.ticks {
        let last = tick + 1 == config.ticks;
        stepper.run_tick(Input::new(), |output| report(output, last))?;
    }

    let snapshot = stepper.snapshot();
    tracing::info!(
        ticks = stepper.tick_count(),
        quantities = snapshot.len(),
        "finished"
    );
    Ok(())
}

fn builtin_plugins() -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry.register(Box::new(MinimalPlugin))?;
    registry.register(Box::new(KinematicPlugin))?;
    Ok(registry)
}

/// Load the configured backend, or the first one offering every
/// requested capability when none is named.
fn load_backend(registry: &PluginRegistry, config: &RuntimeConfig) -> Result<EngineHandle> {
    let requested = config.requested_capabilities();
    let handle = match &config.backend {
        Some(name) => registry.request(name, &requested, &config.step)?,
        None => registry.find(&requested, &config.step)?,
    };
    Ok(handle)
}

/// Give an empty kinematic engine something to move.
fn build_demo_scene(handle: &mut EngineHandle) -> Result<()> {
    let Some(engine) = handle.downcast_mut::<KinematicEngine>() else {
        return Ok(());
    };

    let world = engine.construct_empty_world("demo");
    let model = engine.construct_empty_model(world, "arm")?;
    let base = engine.construct_empty_link(model, "base")?;
    let tip = engine.construct_empty_link(model, "tip")?;
    let hinge = engine.attach_revolute_joint(base, None, "hinge")?;
    engine.set_joint_axis(hinge, DVec3::Z)?;
    engine.set_joint_velocity(hinge, 1.0)?;
    let slider = engine.attach_prismatic_joint(tip, Some(base), "slider", DVec3::X)?;
    engine.set_joint_position(slider, 1.0)?;
    engine.set_joint_acceleration(slider, 0.5)?;
    engine
        .attach_sphere_shape(tip, "ball", 0.25, Pose::IDENTITY)
        .context("attaching demo shape")?;
    Ok(())
}

/// Log this tick's output. Asks for optional quantities so the next tick
/// produces them.
fn report(output: &mut strand_core::Output, last: bool) {
    let clock = output.query::<SimClock>().copied().unwrap_or_default();
    if let Some(poses) = output.query::<WorldPoses>() {
        for entry in &poses.entries {
            tracing::info!(
                tick = clock.tick,
                body = entry.body,
                position = ?entry.pose.position,
                "pose"
            );
        }
    }
    if let Some(bounds) = output.query::<SceneBounds>() {
        tracing::info!(min = ?bounds.min, max = ?bounds.max, "scene bounds");
    }
    if let Some(velocities) = output.query::<BodyVelocities>() {
        tracing::debug!(bodies = velocities.entries.len(), "body velocities");
    }
    if !last {
        output.get_or_insert_default::<BodyVelocities>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::{Capability, StepBackend, StepConfig};

    #[test]
    fn unnamed_backend_is_found_by_capability() {
        let registry = builtin_plugins().unwrap();
        let handle = load_backend(&registry, &RuntimeConfig::default()).unwrap();
        assert_eq!(handle.plugin(), MinimalPlugin::NAME);

        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "capabilities": ["shapes"] }"#).unwrap();
        let handle = load_backend(&registry, &config).unwrap();
        assert_eq!(handle.plugin(), KinematicPlugin::NAME);
    }

    #[test]
    fn demo_scene_steps_on_kinematic_backend() {
        let registry = builtin_plugins().unwrap();
        let config = StepConfig::default();
        let mut handle = registry
            .find(&[Capability::SHAPES], &config)
            .unwrap();
        assert_eq!(handle.plugin(), KinematicPlugin::NAME);
        build_demo_scene(&mut handle).unwrap();

        let mut stepper = handle.into_stepper(&config);
        for _ in 0..3 {
            stepper.run_tick(Input::new(), |output| report(output, false)).unwrap();
        }
        assert!(stepper.last_plan().wants::<BodyVelocities>());
    }

    #[test]
    fn demo_scene_is_skipped_for_other_backends() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(MinimalPlugin)).unwrap();
        let mut handle = registry
            .request(MinimalPlugin::NAME, &[], &StepConfig::default())
            .unwrap();
        build_demo_scene(&mut handle).unwrap();
        assert_eq!(handle.backend().name(), "minimal-falling-scene");
    }
}
