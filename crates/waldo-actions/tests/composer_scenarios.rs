//! Integration tests: full per-tick control pipelines against the scriptable
//! kinematic simulator.
//!
//! Covers the end-to-end contracts of the control layer:
//! 1. A saturated relative arm command moves every motor target by exactly
//!    its per-joint delta limit, clipped to the static joint range
//! 2. Zero-velocity base ticks and all-zero humanoid ticks are inert
//! 3. Blocked base motion rolls the full kinematic state back exactly
//! 4. Composed sub-actions dispatch in declaration order with exactly one
//!    physics step per tick
//! 5. Registry-driven agent wiring from a TOML control config

use approx::assert_relative_eq;
use nalgebra::Point3;

use waldo_actions::prelude::*;
use waldo_core::prelude::*;
use waldo_test_utils::{KinematicTestSim, PrismaticIk};

fn rel_pos_config(dim: usize, limit: f32) -> ArmActionConfig {
    ArmActionConfig {
        controller: ArmControllerKind::RelPos,
        grip_controller: None,
        disable_grip: false,
        arm_joint_dimensionality: dim,
        delta_pos_limit: vec![limit; dim],
        arm_joint_mask: None,
        should_clip: true,
        grasp_thresh_dist: 0.15,
    }
}

// ---------------------------------------------------------------------------
// Arm end-to-end
// ---------------------------------------------------------------------------

#[test]
fn saturated_arm_command_moves_each_joint_by_its_delta_limit() {
    // Seven joints, delta limit 0.1 each; joint 6 sits near its max so the
    // limit clamp must catch it.
    let mut sim = KinematicTestSim::new(7).with_arm_limits(
        vec![-1.0; 7],
        vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.05],
    );
    let mut config = rel_pos_config(7, 0.1);
    config.controller = ArmControllerKind::RelPosMask;
    config.arm_joint_mask = Some(vec![1; 7]);
    let mut composer = ActionComposer::new()
        .with_action("arm", Box::new(ArmAction::new(&config, "").unwrap()));

    composer.step(
        &mut sim,
        &Command::new().with_arg(ArmAction::ARM_ARG, vec![1.0; 7]),
    );

    let targets = sim.arm_motor_targets();
    for target in targets.iter().take(6) {
        assert_relative_eq!(*target, 0.1, epsilon = 1e-6);
    }
    // Joint 6 saturates at its static max.
    assert_relative_eq!(targets[6], 0.05, epsilon = 1e-6);
    assert_eq!(sim.step_log(), &[StepKind::Arm]);
}

#[test]
fn arm_targets_stay_within_static_limits_for_random_commands() {
    let mut sim = KinematicTestSim::new(4).with_arm_limits(vec![-0.3; 4], vec![0.3; 4]);
    let mut config = rel_pos_config(4, 0.2);
    config.controller = ArmControllerKind::RelPosMask;
    config.arm_joint_mask = Some(vec![1; 4]);
    let mut action = ArmAction::new(&config, "").unwrap();

    for seed in 0..50 {
        let cmd = Command::new().with_arg(
            ArmAction::ARM_ARG,
            waldo_test_utils::deterministic_vec(4, seed),
        );
        action.step(&mut sim, &cmd);
        let (min_limit, max_limit) = sim.arm_joint_limits();
        for ((target, lo), hi) in sim
            .arm_motor_targets()
            .iter()
            .zip(min_limit.iter())
            .zip(max_limit.iter())
        {
            assert!(*target >= *lo && *target <= *hi);
        }
    }
}

// ---------------------------------------------------------------------------
// Base velocity end-to-end
// ---------------------------------------------------------------------------

#[test]
fn zero_velocity_tick_is_byte_for_byte_inert() {
    let mut sim = KinematicTestSim::new(4)
        .with_ctrl_freq(10.0)
        .with_base_type(BaseType::Leg)
        .with_params(AgentParams {
            leg_init_params: vec![0.2, 0.4],
            ..AgentParams::default()
        });
    sim.set_joint_positions(&[0.5, -0.5, 0.25, -0.25]);
    sim.set_joint_velocities(&[1.0, -1.0, 2.0, -2.0]);
    sim.set_joint_forces(&[0.1, 0.2, 0.3, 0.4]);

    let before_transform = sim.base_transform();
    let before_positions = sim.joint_positions();
    let before_velocities = sim.joint_velocities();
    let before_forces = sim.joint_forces();

    let mut composer = ActionComposer::new().with_action(
        "base_velocity",
        Box::new(BaseVelocityAction::new(&BaseVelocityConfig::default(), "").unwrap()),
    );
    composer.step(
        &mut sim,
        &Command::new().with_arg(BaseVelocityAction::ARG, vec![0.0, 0.0]),
    );

    assert_eq!(sim.base_transform(), before_transform);
    assert_eq!(sim.joint_positions(), before_positions);
    assert_eq!(sim.joint_velocities(), before_velocities);
    assert_eq!(sim.joint_forces(), before_forces);
    // Zero tick: no probe, no leg reassertion, but still one physics step.
    assert_eq!(sim.internal_step_count(), 0);
    assert_eq!(sim.leg_joint_positions(), None);
    assert_eq!(sim.step_log(), &[StepKind::BaseVelocity]);
}

#[test]
fn blocked_base_motion_restores_exact_pre_tick_state() {
    let mut sim = KinematicTestSim::new(3).with_ctrl_freq(10.0);
    sim.set_joint_positions(&[0.5, -0.5, 0.25]);
    sim.set_joint_velocities(&[1.0, -1.0, 2.0]);
    sim.set_joint_forces(&[0.1, 0.2, 0.3]);
    sim.push_contact(Contact::new(ContactBody::AgentLink(1), ContactBody::Scene));

    let before_transform = sim.base_transform();
    let config = BaseVelocityConfig {
        allow_dyn_slide: false,
        ..BaseVelocityConfig::default()
    };
    let mut composer = ActionComposer::new().with_action(
        "base_velocity",
        Box::new(BaseVelocityAction::new(&config, "").unwrap()),
    );
    composer.step(
        &mut sim,
        &Command::new().with_arg(BaseVelocityAction::ARG, vec![1.0, 0.5]),
    );

    assert_eq!(sim.base_transform(), before_transform);
    assert_eq!(sim.joint_positions(), vec![0.5, -0.5, 0.25]);
    assert_eq!(sim.joint_velocities(), vec![1.0, -1.0, 2.0]);
    assert_eq!(sim.joint_forces(), vec![0.1, 0.2, 0.3]);
    assert_eq!(sim.step_log(), &[StepKind::BaseVelocity]);
}

// ---------------------------------------------------------------------------
// End-effector end-to-end
// ---------------------------------------------------------------------------

#[test]
fn repeated_zero_ee_commands_keep_the_persistent_target() {
    let mut sim = KinematicTestSim::new(3).with_params(AgentParams {
        ee_constraint: vec![WorkspaceBox::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        )],
        ..AgentParams::default()
    });
    sim.set_arm_joint_positions(&[0.2, 0.1, 0.3]);

    let mut action = ArmEeAction::new(
        &EeActionConfig::default(),
        Box::new(PrismaticIk::new(3)),
        None,
        "",
    )
    .unwrap();
    action.reset(&mut sim);
    let target = action.ee_target().unwrap();

    for _ in 0..20 {
        action.step(
            &mut sim,
            &Command::new().with_arg(ArmEeAction::ARG, vec![0.0, 0.0, 0.0]),
        );
    }
    let after = action.ee_target().unwrap();
    assert_relative_eq!((after - target).norm(), 0.0, epsilon = 1e-6);
    // The arm is servoing toward that same target.
    let targets = sim.arm_motor_targets();
    assert_relative_eq!(targets[0], target.x, epsilon = 1e-6);
    assert_relative_eq!(targets[1], target.y, epsilon = 1e-6);
    assert_relative_eq!(targets[2], target.z, epsilon = 1e-6);
}

// ---------------------------------------------------------------------------
// Humanoid end-to-end
// ---------------------------------------------------------------------------

#[test]
fn all_zero_humanoid_command_is_idempotent() {
    let mut sim = KinematicTestSim::new(2);
    let config = HumanoidJointConfig { num_joints: 2 };
    let mut composer = ActionComposer::new().with_action(
        "humanoid",
        Box::new(HumanoidJointAction::new(&config, "").unwrap()),
    );

    let dim = 2 * 4 + 16;
    composer.step(
        &mut sim,
        &Command::new().with_arg(HumanoidJointAction::ARG, vec![0.0; dim]),
    );

    assert!(sim.humanoid_pose().is_none());
    assert_eq!(sim.step_log(), &[StepKind::HumanoidJoint]);
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

#[test]
fn arm_and_grip_compose_with_one_step_and_ordered_effects() {
    let mut config = rel_pos_config(3, 0.1);
    config.grip_controller = Some(GripControllerKind::MagicGrasp);
    let mut sim = KinematicTestSim::new(3).with_graspable(ObjectId(11), 0.1);

    let mut composer = ActionComposer::new()
        .with_action("arm", Box::new(ArmAction::new(&config, "").unwrap()))
        .with_action("stop", Box::new(StopAction::new("")));

    let cmd = Command::new()
        .with_arg(ArmAction::ARM_ARG, vec![1.0, 0.0, 0.0])
        .with_arg(ArmAction::GRIP_ARG, vec![1.0])
        .with_arg(StopAction::ARG, vec![-1.0]);
    composer.step(&mut sim, &cmd);

    // Arm moved, object grasped, no stop raised, one step of the last
    // action's kind.
    assert_relative_eq!(sim.arm_motor_targets()[0], 0.1, epsilon = 1e-6);
    assert_eq!(sim.grasped_object(), Some(ObjectId(11)));
    assert!(!composer.wants_terminate());
    assert_eq!(sim.step_log(), &[StepKind::Stop]);
}

#[test]
fn stop_action_terminates_and_still_steps() {
    let mut sim = KinematicTestSim::new(1);
    let mut composer =
        ActionComposer::new().with_action("stop", Box::new(StopAction::new("")));

    composer.step(
        &mut sim,
        &Command::new().with_arg(StopAction::ARG, vec![1.0]),
    );
    assert!(composer.wants_terminate());
    assert_eq!(sim.step_log(), &[StepKind::Stop]);

    // Reset clears the intent for the next episode.
    composer.reset(&mut sim);
    assert!(!composer.wants_terminate());
}

#[test]
fn multi_tick_episode_requests_one_step_per_tick() {
    let mut sim = KinematicTestSim::new(3);
    let mut composer = ActionComposer::new()
        .with_action("arm", Box::new(ArmAction::new(&rel_pos_config(3, 0.1), "").unwrap()));

    for _ in 0..25 {
        composer.step(
            &mut sim,
            &Command::new().with_arg(ArmAction::ARM_ARG, vec![0.1, 0.1, 0.1]),
        );
    }
    assert_eq!(sim.step_log().len(), 25);
    assert!(sim.step_log().iter().all(|k| *k == StepKind::Arm));
}

// ---------------------------------------------------------------------------
// Registry-driven wiring
// ---------------------------------------------------------------------------

#[test]
fn registry_wires_an_agent_from_toml_config() {
    let toml = r#"
        [arm]
        controller = "rel_pos_mask"
        arm_joint_dimensionality = 3
        delta_pos_limit = [0.1, 0.1, 0.1]
        arm_joint_mask = [1, 0, 1, 1]
        grip_controller = "magic_grasp"

        [base_velocity]
        lin_speed = 5.0
        allow_back = false
    "#;
    let config = ControlConfig::from_toml(toml).unwrap();

    let mut registry = ActionRegistry::new();
    let arm_config = config.arm.clone().unwrap();
    registry.register("arm_action", move || {
        Ok(Box::new(ArmAction::new(&arm_config, "")?) as _)
    });
    let base_config = config.base_velocity.clone().unwrap();
    registry.register("base_velocity", move || {
        Ok(Box::new(BaseVelocityAction::new(&base_config, "")?) as _)
    });
    registry.register("stop", || Ok(Box::new(StopAction::new("")) as _));

    let mut composer = registry
        .compose(&["arm_action", "base_velocity", "stop"])
        .unwrap();

    // Schema spans every bound sub-action.
    let ActionSpace::Dict { spaces } = composer.action_space() else {
        panic!("expected Dict schema");
    };
    assert_eq!(spaces["arm_action"].size(), 3);
    assert_eq!(spaces["grip_action"].size(), 1);
    assert_eq!(spaces["base_vel"].size(), 2);
    assert_eq!(spaces["stop"].size(), 1);

    // One tick drives arm, base, and stop together.
    let mut sim = KinematicTestSim::new(4).with_ctrl_freq(10.0);
    let cmd = Command::new()
        .with_arg("arm_action", vec![1.0, 0.0, 0.0])
        .with_arg("base_vel", vec![1.0, 0.0])
        .with_arg("stop", vec![1.0]);
    composer.step(&mut sim, &cmd);

    assert_relative_eq!(sim.arm_motor_targets()[0], 0.1, epsilon = 1e-6);
    assert_relative_eq!(sim.base_transform().translation.vector.x, 0.5, epsilon = 1e-5);
    assert!(composer.wants_terminate());
    assert_eq!(sim.step_log(), &[StepKind::Stop]);
}

#[test]
fn unknown_registry_name_fails_composition() {
    let registry = ActionRegistry::new();
    let err = registry.compose(&["arm_action"]).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownAction(_)));
}
