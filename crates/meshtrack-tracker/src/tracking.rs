//! Assembly and solution of one tracking problem.
use meshtrack_optim::{Problem, TerminationReason, Variable};

use crate::camera::CameraInfo;
use crate::config::TrackerConfig;
use crate::energy::EnergyCallback;
use crate::error::TrackerError;
use crate::level::ImageLevel;
use crate::residuals::{
    ResidualArap, ResidualDeform, ResidualImageProjection, ResidualInextent, ResidualRotTV,
    ResidualTV, ResidualTemporalMotion,
};
use crate::types::DataTermErrorType;

const ROTATION: &str = "rotation";
const TRANSLATION: &str = "translation";

fn vertex_name(i: usize) -> String {
    format!("vertex_{i}")
}

fn local_rotation_name(i: usize) -> String {
    format!("local_rot_{i}")
}

/// Rigid motion of the whole mesh: axis-angle rotation and translation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidMotion {
    pub rotation: [f64; 3],
    pub translation: [f64; 3],
}

/// Reference mesh the tracked mesh deforms from.
#[derive(Debug, Clone, Default)]
pub struct MeshTemplate {
    /// Template vertex positions.
    pub vertices: Vec<[f64; 3]>,
    /// Per vertex gray value, required by the intensity data term.
    pub grays: Vec<f64>,
    /// Per vertex color, required by the color data term.
    pub colors: Vec<[f64; 3]>,
    /// Undirected edges between vertex indices.
    pub edges: Vec<(usize, usize)>,
}

impl MeshTemplate {
    /// Check that per vertex attributes and edges are consistent with the vertex list.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let n = self.vertices.len();
        if n == 0 {
            return Err(TrackerError::InvalidMesh("template has no vertices".into()));
        }
        if !self.grays.is_empty() && self.grays.len() != n {
            return Err(TrackerError::InvalidMesh(format!(
                "{} gray values for {n} vertices",
                self.grays.len()
            )));
        }
        if !self.colors.is_empty() && self.colors.len() != n {
            return Err(TrackerError::InvalidMesh(format!(
                "{} colors for {n} vertices",
                self.colors.len()
            )));
        }
        if let Some(&(a, b)) = self
            .edges
            .iter()
            .find(|&&(a, b)| a >= n || b >= n || a == b)
        {
            return Err(TrackerError::InvalidMesh(format!(
                "invalid edge ({a}, {b}) for {n} vertices"
            )));
        }
        Ok(())
    }

    /// Reference values the data term compares vertex `i` against.
    fn reference(&self, error_type: DataTermErrorType, i: usize) -> Option<&[f64]> {
        match error_type {
            DataTermErrorType::Intensity => self.grays.get(i).map(std::slice::from_ref),
            DataTermErrorType::Color => self.colors.get(i).map(|c| c.as_slice()),
            DataTermErrorType::Depth | DataTermErrorType::DepthPlane => None,
        }
    }
}

/// Current estimate of the tracked mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingState {
    /// Rigid motion applied to the deformed mesh.
    pub motion: RigidMotion,
    /// Deformed vertex positions, before the rigid motion.
    pub vertices: Vec<[f64; 3]>,
    /// Per vertex rotation from the template to the deformed mesh.
    pub local_rotations: Vec<[f64; 3]>,
}

impl TrackingState {
    /// Start at the template with identity motion.
    pub fn from_template(template: &MeshTemplate) -> Self {
        Self {
            motion: RigidMotion::default(),
            vertices: template.vertices.clone(),
            local_rotations: vec![[0.0; 3]; template.vertices.len()],
        }
    }
}

/// Outcome of one [`MeshTracker::track`] call.
#[derive(Debug, Clone)]
pub struct TrackingSummary {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub iterations: usize,
    pub termination_reason: TerminationReason,
    /// Number of residual blocks in the problem.
    pub num_residual_blocks: usize,
    /// Cost recorded at every iteration, starting with the initial cost.
    pub energies: Vec<f64>,
}

/// Builds and solves the tracking problem of one frame.
#[derive(Debug, Clone, Default)]
pub struct MeshTracker {
    config: TrackerConfig,
    energy: EnergyCallback,
}

impl MeshTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            energy: EnergyCallback::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Energy recorded during the last solve.
    pub fn energy(&self) -> &EnergyCallback {
        &self.energy
    }

    /// Track the mesh into `level`, refining `state` in place.
    ///
    /// `previous_motion` enables the temporal motion prior when its weights are non zero.
    pub fn track(
        &mut self,
        camera: &CameraInfo,
        level: &ImageLevel,
        template: &MeshTemplate,
        state: &mut TrackingState,
        previous_motion: Option<&RigidMotion>,
    ) -> Result<TrackingSummary, TrackerError> {
        self.config.validate()?;
        template.validate()?;
        let n = template.vertices.len();
        if state.vertices.len() != n || state.local_rotations.len() != n {
            return Err(TrackerError::InvalidMesh(format!(
                "state has {} vertices and {} local rotations, template has {n} vertices",
                state.vertices.len(),
                state.local_rotations.len()
            )));
        }
        let size = level.size();
        if camera.width != size.width || camera.height != size.height {
            return Err(TrackerError::CameraImageMismatch(
                camera.width,
                camera.height,
                size.width,
                size.height,
            ));
        }

        let config = &self.config;
        let mut problem = Problem::new();
        let uses_local_rotations = config.arap_weight != 0.0 || config.rot_tv_weight != 0.0;

        let motion_fixed = !config.ba_type.optimizes_motion();
        let structure_fixed = !config.ba_type.optimizes_structure();

        problem.add_variable(
            Variable::angle_axis(ROTATION).with_fixed(motion_fixed),
            state.motion.rotation.to_vec(),
        )?;
        problem.add_variable(
            Variable::euclidean(TRANSLATION, 3).with_fixed(motion_fixed),
            state.motion.translation.to_vec(),
        )?;
        for (i, vertex) in state.vertices.iter().enumerate() {
            problem.add_variable(
                Variable::euclidean(vertex_name(i), 3).with_fixed(structure_fixed),
                vertex.to_vec(),
            )?;
            if uses_local_rotations {
                problem.add_variable(
                    Variable::angle_axis(local_rotation_name(i)).with_fixed(structure_fixed),
                    state.local_rotations[i].to_vec(),
                )?;
            }
        }

        if config.data_weight != 0.0 {
            for i in 0..n {
                let factor = match template.reference(config.error_type, i) {
                    Some(reference) => ResidualImageProjection::with_reference(
                        config.data_weight,
                        reference,
                        camera,
                        level,
                        config.error_type,
                    )?,
                    None => ResidualImageProjection::new(
                        config.data_weight,
                        camera,
                        level,
                        config.error_type,
                    )?,
                };
                let factor = factor.with_loss(config.data_loss);
                problem.add_factor(
                    Box::new(factor),
                    vec![ROTATION.into(), TRANSLATION.into(), vertex_name(i)],
                )?;
            }
        }

        for &(a, b) in &template.edges {
            let (va, vb) = (&template.vertices[a], &template.vertices[b]);
            if config.tv_weight != 0.0 {
                problem.add_factor(
                    Box::new(ResidualTV::new(config.tv_weight, va, vb)),
                    vec![vertex_name(a), vertex_name(b)],
                )?;
            }
            if config.rot_tv_weight != 0.0 {
                problem.add_factor(
                    Box::new(ResidualRotTV::new(config.rot_tv_weight)),
                    vec![local_rotation_name(a), local_rotation_name(b)],
                )?;
            }
            if config.inextent_weight != 0.0 {
                problem.add_factor(
                    Box::new(ResidualInextent::new(config.inextent_weight, va, vb)),
                    vec![vertex_name(a), vertex_name(b)],
                )?;
            }
            if config.arap_weight != 0.0 {
                // each endpoint's local rotation explains the edge
                for (i, j) in [(a, b), (b, a)] {
                    problem.add_factor(
                        Box::new(ResidualArap::new(
                            config.arap_weight,
                            &template.vertices[i],
                            &template.vertices[j],
                        )),
                        vec![vertex_name(i), vertex_name(j), local_rotation_name(i)],
                    )?;
                }
            }
        }

        if config.deform_weight != 0.0 {
            for (i, vertex) in template.vertices.iter().enumerate() {
                problem.add_factor(
                    Box::new(ResidualDeform::new(config.deform_weight, vertex)),
                    vec![vertex_name(i)],
                )?;
            }
        }

        if let Some(previous) = previous_motion {
            if config.temporal_rot_weight != 0.0 || config.temporal_trans_weight != 0.0 {
                problem.add_factor(
                    Box::new(
                        ResidualTemporalMotion::new(
                            &previous.rotation,
                            &previous.translation,
                            config.temporal_rot_weight,
                            config.temporal_trans_weight,
                        )
                        .with_verbose(config.verbose),
                    ),
                    vec![ROTATION.into(), TRANSLATION.into()],
                )?;
            }
        }

        let num_residual_blocks = problem.get_factors().len();
        log::debug!(
            "tracking {} vertices with {:?} ({:?}): {} variables, {} residual blocks",
            n,
            config.error_type,
            config.ba_type,
            problem.get_variables().len(),
            num_residual_blocks
        );

        self.energy.reset();
        let result = config
            .solver
            .optimize_with_callback(&mut problem, &mut self.energy)?;

        state
            .motion
            .rotation
            .copy_from_slice(problem.get_variable_values(ROTATION)?);
        state
            .motion
            .translation
            .copy_from_slice(problem.get_variable_values(TRANSLATION)?);
        for i in 0..n {
            state.vertices[i].copy_from_slice(problem.get_variable_values(&vertex_name(i))?);
            if uses_local_rotations {
                state.local_rotations[i]
                    .copy_from_slice(problem.get_variable_values(&local_rotation_name(i))?);
            }
        }

        log::debug!(
            "tracking finished: {:?} after {} iterations, cost {:.6e} -> {:.6e}",
            result.termination_reason,
            result.iterations,
            result.initial_cost,
            result.final_cost
        );

        Ok(TrackingSummary {
            initial_cost: result.initial_cost,
            final_cost: result.final_cost,
            iterations: result.iterations,
            termination_reason: result.termination_reason,
            num_residual_blocks,
            energies: self.energy.energies().to_vec(),
        })
    }
}
