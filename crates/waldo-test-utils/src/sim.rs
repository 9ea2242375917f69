//! Scriptable kinematic simulator implementing the full control-layer seam.
//!
//! [`KinematicTestSim`] owns plain joint vectors and a base transform,
//! records every step request, and lets tests script contacts, graspable
//! objects, and navigation filtering. No dynamics: every write is verbatim.

use std::collections::HashSet;

use nalgebra::{Isometry3, Matrix4, Point3};

use waldo_core::sim::{AgentParams, ArticulatedAgent, BaseType, Simulator};
use waldo_core::types::{Contact, ObjectId, Observation, StepKind};

type TranslationFilter = Box<dyn Fn(Point3<f32>, Point3<f32>) -> Point3<f32> + Send + Sync>;

// ---------------------------------------------------------------------------
// KinematicTestSim
// ---------------------------------------------------------------------------

/// In-memory agent + simulator facade for controller tests.
pub struct KinematicTestSim {
    joint_positions: Vec<f32>,
    joint_velocities: Vec<f32>,
    joint_forces: Vec<f32>,
    arm_motor_targets: Vec<f32>,
    arm_limits_min: Vec<f32>,
    arm_limits_max: Vec<f32>,
    fixed_arm_joint_values: Option<Vec<f32>>,
    leg_joint_positions: Option<Vec<f32>>,
    humanoid_pose: Option<(Vec<f32>, Matrix4<f32>)>,
    base_transform: Isometry3<f32>,
    base_type: BaseType,
    params: AgentParams,
    ctrl_freq: f32,
    contacts: Vec<Contact>,
    step_log: Vec<StepKind>,
    internal_step_count: u32,
    grasped: Option<ObjectId>,
    graspable: Option<(ObjectId, f32)>,
    contact_objects: HashSet<ObjectId>,
    grasp_update_count: u32,
    translation_filter: Option<TranslationFilter>,
}

impl KinematicTestSim {
    /// Agent with `dof` joints at zero, wide symmetric limits, and an
    /// identity base transform.
    #[must_use]
    pub fn new(dof: usize) -> Self {
        Self {
            joint_positions: vec![0.0; dof],
            joint_velocities: vec![0.0; dof],
            joint_forces: vec![0.0; dof],
            arm_motor_targets: vec![0.0; dof],
            arm_limits_min: vec![-std::f32::consts::PI; dof],
            arm_limits_max: vec![std::f32::consts::PI; dof],
            fixed_arm_joint_values: None,
            leg_joint_positions: None,
            humanoid_pose: None,
            base_transform: Isometry3::identity(),
            base_type: BaseType::Mobile,
            params: AgentParams::default(),
            ctrl_freq: 30.0,
            contacts: Vec::new(),
            step_log: Vec::new(),
            internal_step_count: 0,
            grasped: None,
            graspable: None,
            contact_objects: HashSet::new(),
            grasp_update_count: 0,
            translation_filter: None,
        }
    }

    // -- builders --

    #[must_use]
    pub fn with_arm_limits(mut self, min: Vec<f32>, max: Vec<f32>) -> Self {
        self.arm_limits_min = min;
        self.arm_limits_max = max;
        self
    }

    #[must_use]
    pub fn with_ctrl_freq(mut self, hz: f32) -> Self {
        self.ctrl_freq = hz;
        self
    }

    #[must_use]
    pub fn with_base_type(mut self, base_type: BaseType) -> Self {
        self.base_type = base_type;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = params;
        self
    }

    /// Script the closest graspable object and its distance.
    #[must_use]
    pub fn with_graspable(mut self, object: ObjectId, dist: f32) -> Self {
        self.graspable = Some((object, dist));
        self
    }

    /// Install a navigation filter applied to base translations.
    #[must_use]
    pub fn with_translation_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Point3<f32>, Point3<f32>) -> Point3<f32> + Send + Sync + 'static,
    {
        self.translation_filter = Some(Box::new(filter));
        self
    }

    // -- scripting --

    /// Script a contact reported by the next collision query.
    pub fn push_contact(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    /// Seed a held object.
    pub fn grasp(&mut self, object: ObjectId) {
        self.grasped = Some(object);
    }

    /// Script whether the end-effector touches `object`.
    pub fn set_contact_with(&mut self, object: ObjectId, touching: bool) {
        if touching {
            self.contact_objects.insert(object);
        } else {
            self.contact_objects.remove(&object);
        }
    }

    // -- inspection --

    /// Every step kind requested so far, in order.
    #[must_use]
    pub fn step_log(&self) -> &[StepKind] {
        &self.step_log
    }

    #[must_use]
    pub const fn internal_step_count(&self) -> u32 {
        self.internal_step_count
    }

    #[must_use]
    pub const fn grasp_update_count(&self) -> u32 {
        self.grasp_update_count
    }

    /// Last leg posture write, if any.
    #[must_use]
    pub fn leg_joint_positions(&self) -> Option<&[f32]> {
        self.leg_joint_positions.as_deref()
    }

    /// Last kinematic arm pin, if any.
    #[must_use]
    pub fn fixed_arm_joint_values(&self) -> Option<&[f32]> {
        self.fixed_arm_joint_values.as_deref()
    }

    /// Last humanoid pose write: `(joint rotations, root transform)`.
    #[must_use]
    pub const fn humanoid_pose(&self) -> Option<&(Vec<f32>, Matrix4<f32>)> {
        self.humanoid_pose.as_ref()
    }
}

impl ArticulatedAgent for KinematicTestSim {
    fn joint_positions(&self) -> Vec<f32> {
        self.joint_positions.clone()
    }

    fn set_joint_positions(&mut self, positions: &[f32]) {
        self.joint_positions = positions.to_vec();
    }

    fn joint_velocities(&self) -> Vec<f32> {
        self.joint_velocities.clone()
    }

    fn set_joint_velocities(&mut self, velocities: &[f32]) {
        self.joint_velocities = velocities.to_vec();
    }

    fn joint_forces(&self) -> Vec<f32> {
        self.joint_forces.clone()
    }

    fn set_joint_forces(&mut self, forces: &[f32]) {
        self.joint_forces = forces.to_vec();
    }

    fn arm_joint_limits(&self) -> (Vec<f32>, Vec<f32>) {
        (self.arm_limits_min.clone(), self.arm_limits_max.clone())
    }

    fn arm_motor_targets(&self) -> Vec<f32> {
        self.arm_motor_targets.clone()
    }

    fn set_arm_motor_targets(&mut self, targets: &[f32]) {
        self.arm_motor_targets = targets.to_vec();
    }

    fn arm_joint_positions(&self) -> Vec<f32> {
        self.joint_positions.clone()
    }

    fn set_arm_joint_positions(&mut self, positions: &[f32]) {
        self.joint_positions = positions.to_vec();
    }

    fn set_fixed_arm_joint_values(&mut self, positions: &[f32]) {
        self.fixed_arm_joint_values = Some(positions.to_vec());
    }

    fn set_leg_joint_positions(&mut self, positions: &[f32]) {
        self.leg_joint_positions = Some(positions.to_vec());
    }

    fn set_joint_transform(&mut self, joints: &[f32], root: &Matrix4<f32>) {
        self.humanoid_pose = Some((joints.to_vec(), *root));
    }

    fn base_transform(&self) -> Isometry3<f32> {
        self.base_transform
    }

    fn set_base_transform(&mut self, transform: &Isometry3<f32>) {
        self.base_transform = *transform;
    }

    fn base_type(&self) -> BaseType {
        self.base_type
    }

    fn params(&self) -> &AgentParams {
        &self.params
    }
}

impl Simulator for KinematicTestSim {
    fn ctrl_freq(&self) -> f32 {
        self.ctrl_freq
    }

    fn filter_translation(&self, start: Point3<f32>, end: Point3<f32>) -> Point3<f32> {
        match &self.translation_filter {
            Some(filter) => filter(start, end),
            None => end,
        }
    }

    fn step(&mut self, kind: StepKind) -> Observation {
        self.step_log.push(kind);
        Observation::zeros(0)
    }

    fn internal_step(&mut self, _substeps: i32) {
        self.internal_step_count += 1;
    }

    fn contacts(&self) -> Vec<Contact> {
        self.contacts.clone()
    }

    fn grasped_object(&self) -> Option<ObjectId> {
        self.grasped
    }

    fn update_grasped_object(&mut self) {
        self.grasp_update_count += 1;
    }

    fn closest_graspable(&self) -> Option<(ObjectId, f32)> {
        self.graspable
    }

    fn snap_to_object(&mut self, object: ObjectId) {
        self.grasped = Some(object);
    }

    fn release_grasp(&mut self) {
        self.grasped = None;
    }

    fn contact_with(&self, object: ObjectId) -> bool {
        self.contact_objects.contains(&object)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use waldo_core::types::ContactBody;

    #[test]
    fn new_sim_is_zeroed() {
        let sim = KinematicTestSim::new(3);
        assert_eq!(sim.joint_positions(), vec![0.0; 3]);
        assert_eq!(sim.arm_motor_targets(), vec![0.0; 3]);
        assert_eq!(sim.base_transform(), Isometry3::identity());
        assert!(sim.step_log().is_empty());
    }

    #[test]
    fn writes_are_verbatim() {
        let mut sim = KinematicTestSim::new(2);
        sim.set_arm_motor_targets(&[0.5, -0.5]);
        assert_eq!(sim.arm_motor_targets(), vec![0.5, -0.5]);
        sim.set_joint_velocities(&[1.0, 2.0]);
        assert_eq!(sim.joint_velocities(), vec![1.0, 2.0]);
    }

    #[test]
    fn step_log_records_kinds_in_order() {
        let mut sim = KinematicTestSim::new(1);
        sim.step(StepKind::Arm);
        sim.step(StepKind::Empty);
        assert_eq!(sim.step_log(), &[StepKind::Arm, StepKind::Empty]);
    }

    #[test]
    fn scripted_contacts_are_returned() {
        let mut sim = KinematicTestSim::new(1);
        assert!(sim.contacts().is_empty());
        sim.push_contact(Contact::new(ContactBody::AgentLink(0), ContactBody::Scene));
        assert_eq!(sim.contacts().len(), 1);
    }

    #[test]
    fn grasp_lifecycle() {
        let mut sim = KinematicTestSim::new(1).with_graspable(ObjectId(1), 0.1);
        assert_eq!(sim.grasped_object(), None);
        assert_eq!(sim.closest_graspable(), Some((ObjectId(1), 0.1)));
        sim.snap_to_object(ObjectId(1));
        assert_eq!(sim.grasped_object(), Some(ObjectId(1)));
        sim.update_grasped_object();
        assert_eq!(sim.grasp_update_count(), 1);
        sim.release_grasp();
        assert_eq!(sim.grasped_object(), None);
    }

    #[test]
    fn contact_with_is_scriptable() {
        let mut sim = KinematicTestSim::new(1);
        assert!(!sim.contact_with(ObjectId(2)));
        sim.set_contact_with(ObjectId(2), true);
        assert!(sim.contact_with(ObjectId(2)));
        sim.set_contact_with(ObjectId(2), false);
        assert!(!sim.contact_with(ObjectId(2)));
    }

    #[test]
    fn translation_filter_is_applied() {
        let sim = KinematicTestSim::new(1)
            .with_translation_filter(|_start, end| Point3::new(end.x.min(1.0), end.y, end.z));
        let out = sim.filter_translation(Point3::origin(), Point3::new(5.0, 0.0, 0.0));
        assert_eq!(out, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn sim_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KinematicTestSim>();
    }
}
