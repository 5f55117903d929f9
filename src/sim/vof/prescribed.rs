use log::info;

use crate::Vector;
use crate::sim::vof::config::VofConfig;
use crate::sim::vof::error::VofResult;
use crate::sim::vof::field::FaceFluxField;

/// Relative slack (of the period) when comparing times against phase edges.
const PHASE_TIME_TOL: f64 = 1e-9;

/// Which flow the controller hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// External fields forwarded unchanged.
    Passthrough,
    /// The snapshot taken at cycle start.
    Forward,
    /// The negated snapshot.
    Reversed,
}

/// Owned copy of the prescribed flow at cycle start.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    /// Cell-centre velocity.
    pub velocity: Vec<Vector>,
    pub flux: FaceFluxField,
}

impl FlowSnapshot {
    pub fn negated(&self) -> Self {
        Self {
            velocity: self.velocity.iter().map(|&u| -u).collect(),
            flux: self.flux.negated(),
        }
    }
}

/// Flow fields to use for one timestep.
#[derive(Debug, Clone, Copy)]
pub struct FlowFields<'a> {
    pub phase: FlowPhase,
    pub velocity: &'a [Vector],
    pub flux: &'a FaceFluxField,
}

/// Periodically reverses a prescribed flow for reversibility benchmarks.
///
/// With `tau = t mod period` the flow is the snapshot while
/// `tau < reverse_time` and the negated snapshot afterwards. The snapshot is
/// captured on the first [`PrescribedFlowController::update`] (or by an
/// explicit [`PrescribedFlowController::capture`]) and kept until
/// [`PrescribedFlowController::reset`].
#[derive(Debug, Clone)]
pub struct PrescribedFlowController {
    enabled: bool,
    period: f64,
    reverse_time: f64,
    phase: FlowPhase,
    forward: Option<FlowSnapshot>,
    reversed: Option<FlowSnapshot>,
}

impl PrescribedFlowController {
    pub fn new(config: &VofConfig) -> VofResult<Self> {
        config.validate()?;
        let enabled = config.prescribed_velocity && config.period > 0.0;
        Ok(Self {
            enabled,
            period: config.period,
            reverse_time: config.effective_reverse_time(),
            phase: FlowPhase::Passthrough,
            forward: None,
            reversed: None,
        })
    }

    /// Phase of the most recent update.
    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    /// Phase for a step starting at elapsed time `time`.
    pub fn phase_at(&self, time: f64) -> FlowPhase {
        if !self.enabled {
            return FlowPhase::Passthrough;
        }
        let slack = PHASE_TIME_TOL * self.period;
        let mut tau = time.rem_euclid(self.period);
        if self.period - tau <= slack {
            tau = 0.0;
        }
        if tau + slack >= self.reverse_time {
            FlowPhase::Reversed
        } else {
            FlowPhase::Forward
        }
    }

    pub fn snapshot(&self) -> Option<&FlowSnapshot> {
        self.forward.as_ref()
    }

    /// Stores a copy of the given flow as the cycle-start snapshot.
    pub fn capture(&mut self, velocity: &[Vector], flux: &FaceFluxField) {
        let snapshot = FlowSnapshot {
            velocity: velocity.to_vec(),
            flux: flux.clone(),
        };
        self.reversed = Some(snapshot.negated());
        self.forward = Some(snapshot);
    }

    /// Drops the snapshot; the next update captures a new one.
    pub fn reset(&mut self) {
        self.forward = None;
        self.reversed = None;
        self.phase = FlowPhase::Passthrough;
    }

    /// Selects the flow for the step starting at `time`.
    ///
    /// `velocity` and `flux` are the externally supplied fields; they are
    /// returned as-is in `Passthrough` and captured on the first call otherwise.
    pub fn update<'a>(
        &'a mut self,
        time: f64,
        velocity: &'a [Vector],
        flux: &'a FaceFluxField,
    ) -> FlowFields<'a> {
        let phase = self.phase_at(time);
        if phase != self.phase {
            info!("Prescribed flow: {:?} -> {:?} at t={time}", self.phase, phase);
            self.phase = phase;
        }
        if phase != FlowPhase::Passthrough && self.forward.is_none() {
            self.capture(velocity, flux);
        }

        let selected = match phase {
            FlowPhase::Passthrough => None,
            FlowPhase::Forward => self.forward.as_ref(),
            FlowPhase::Reversed => self.reversed.as_ref(),
        };
        match selected {
            Some(s) => FlowFields {
                phase,
                velocity: &s.velocity,
                flux: &s.flux,
            },
            None => FlowFields {
                phase,
                velocity,
                flux,
            },
        }
    }
}
