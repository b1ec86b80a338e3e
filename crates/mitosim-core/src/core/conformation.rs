//! The conformation solver: derives a fully determined helical parameterization
//! from a partial constraint set, and synthesizes loop-brush initial coordinates.
//!
//! The governing relation is `t² = s² + (2πr)²` with the axial-compression ratio
//! `a = t / s`, where `t` is the contour length of one helical turn, `s` the
//! axial rise per turn and `r` the helix radius.

use nalgebra::{Point3, Vector3};
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use thiserror::Error;

use super::loops::{self, LoopError, LoopSpan};

/// Stand-in step for the zero-constraint case: an effectively infinite rise per
/// turn yields a near-zero-curvature (straight) backbone.
pub const DEGENERATE_HELIX_STEP: f64 = 1e9;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConformationError {
    #[error(
        "specify 0 or 2 of the four helix parameters \
         (radius, turn length, step, axial compression), got {0}"
    )]
    WrongConstraintCount(usize),

    #[error("helix turn length {turn_length} must exceed the step {step}")]
    TurnShorterThanStep { turn_length: f64, step: f64 },

    #[error("helix turn length {turn_length} must exceed the circumference 2πr = {circumference}")]
    TurnShorterThanCircumference { turn_length: f64, circumference: f64 },

    #[error("axial compression factor {0} must exceed 1")]
    CompressionNotExpanding(f64),
}

/// A partial helix specification. Exactly zero or two of the four fields may be
/// set; [`HelixConstraints::solve`] completes the parameterization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HelixConstraints {
    pub radius: Option<f64>,
    pub turn_length: Option<f64>,
    pub step: Option<f64>,
    pub axial_compression: Option<f64>,
}

/// A fully determined helix: radius and axial rise per turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helix {
    pub radius: f64,
    pub step: f64,
}

impl Helix {
    /// Contour length of one full turn.
    pub fn turn_length(&self) -> f64 {
        (self.step * self.step + (TAU * self.radius).powi(2)).sqrt()
    }
}

impl HelixConstraints {
    pub fn solve(&self) -> Result<Helix, ConformationError> {
        let given = [
            self.radius.is_some(),
            self.turn_length.is_some(),
            self.step.is_some(),
            self.axial_compression.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count();

        match (self.radius, self.turn_length, self.step, self.axial_compression) {
            (None, None, None, None) => Ok(Helix {
                radius: 0.0,
                step: DEGENERATE_HELIX_STEP,
            }),
            (Some(radius), None, Some(step), None) => Ok(Helix { radius, step }),
            (None, Some(turn_length), Some(step), None) => {
                Ok(Helix {
                    radius: radius_from_turn_and_step(turn_length, step)?,
                    step,
                })
            }
            (Some(radius), Some(turn_length), None, None) => {
                let circumference = TAU * radius;
                let step_squared = turn_length * turn_length - circumference * circumference;
                if step_squared <= 0.0 {
                    return Err(ConformationError::TurnShorterThanCircumference {
                        turn_length,
                        circumference,
                    });
                }
                Ok(Helix {
                    radius,
                    step: step_squared.sqrt(),
                })
            }
            (Some(radius), None, None, Some(compression)) => {
                if compression <= 1.0 {
                    return Err(ConformationError::CompressionNotExpanding(compression));
                }
                Ok(Helix {
                    radius,
                    step: TAU * radius / (compression * compression - 1.0).sqrt(),
                })
            }
            (None, Some(turn_length), None, Some(compression)) => {
                let step = turn_length / compression;
                Ok(Helix {
                    radius: radius_from_turn_and_step(turn_length, step)?,
                    step,
                })
            }
            (None, None, Some(step), Some(compression)) => {
                let turn_length = step * compression;
                Ok(Helix {
                    radius: radius_from_turn_and_step(turn_length, step)?,
                    step,
                })
            }
            _ => Err(ConformationError::WrongConstraintCount(given)),
        }
    }
}

fn radius_from_turn_and_step(turn_length: f64, step: f64) -> Result<f64, ConformationError> {
    let radius_squared = (turn_length * turn_length - step * step) / (4.0 * PI * PI);
    if radius_squared <= 0.0 {
        return Err(ConformationError::TurnShorterThanStep { turn_length, step });
    }
    Ok(radius_squared.sqrt())
}

/// Synthesizes a loop-brush conformation of `n` particles: backbone particles are
/// mapped onto the parametric helix at unit contour spacing, and each root loop
/// is folded out perpendicular to the helix axis from its attachment point.
///
/// With `random_loop_orientations`, the fold direction of each loop is rotated by
/// an independent random angle around the axis; otherwise it points radially
/// outward.
pub fn make_helical_loopbrush(
    n: usize,
    helix: Helix,
    loops: &[LoopSpan],
    random_loop_orientations: bool,
    rng: &mut impl Rng,
) -> Result<Vec<Point3<f64>>, LoopError> {
    let backbone = loops::backbone_indices(loops, n)?;
    let turn_length = helix.turn_length();
    let d_theta = TAU / turn_length;
    let d_z = helix.step / turn_length;

    let mut coords = vec![Point3::origin(); n];
    for (j, &i) in backbone.iter().enumerate() {
        let theta = j as f64 * d_theta;
        coords[i] = Point3::new(
            helix.radius * theta.cos(),
            helix.radius * theta.sin(),
            j as f64 * d_z,
        );
    }

    for &root in &loops::root_loops(loops) {
        let lp = loops[root];
        let attach = coords[lp.start];
        let mut phi = attach.y.atan2(attach.x);
        if random_loop_orientations {
            phi = rng.gen_range(0.0..TAU);
        }
        let dir = Vector3::new(phi.cos(), phi.sin(), 0.0);

        // Out-and-back fold; the return leg is offset axially so bonded
        // neighbors never coincide.
        let len = lp.len();
        for k in 1..len {
            let reach = k.min(len - k) as f64;
            let axial = if k > len / 2 { 0.4 } else { 0.0 };
            coords[lp.start + k] = attach + dir * reach + Vector3::z() * axial;
        }
    }

    Ok(coords)
}

/// The uniform variant of the loop-brush: every backbone particle advances by
/// the same helical phase, set by `period_particles` backbone particles per
/// turn (contour spacing of `chain_bond_length` when omitted). Each root loop
/// folds as a random walk of step `chain_bond_length` bridged between its two
/// anchors.
pub fn make_uniform_helical_loopbrush(
    n: usize,
    helix: Helix,
    period_particles: Option<f64>,
    loops: &[LoopSpan],
    chain_bond_length: f64,
    rng: &mut impl Rng,
) -> Result<Vec<Point3<f64>>, LoopError> {
    if chain_bond_length <= 0.0 {
        return Err(LoopError::InvalidParameter(
            "chain bond length must be positive".to_string(),
        ));
    }
    if period_particles.is_some_and(|p| p <= 0.0) {
        return Err(LoopError::InvalidParameter(
            "period-particles must be positive".to_string(),
        ));
    }

    let backbone = loops::backbone_indices(loops, n)?;
    let per_turn = period_particles.unwrap_or(helix.turn_length() / chain_bond_length);
    let d_theta = TAU / per_turn;
    let d_z = helix.step / per_turn;

    let mut coords = vec![Point3::origin(); n];
    for (j, &i) in backbone.iter().enumerate() {
        let theta = j as f64 * d_theta;
        coords[i] = Point3::new(
            helix.radius * theta.cos(),
            helix.radius * theta.sin(),
            j as f64 * d_z,
        );
    }

    for &root in &loops::root_loops(loops) {
        let lp = loops[root];
        let len = lp.len();
        let attach = coords[lp.start];
        let span = coords[lp.end] - attach;

        // Random walk from the near anchor; the accumulated drift is shared
        // out over the steps so the walk lands on the far anchor.
        let mut walk = vec![Vector3::zeros(); len + 1];
        for k in 1..=len {
            let step: [f64; 3] = UnitSphere.sample(rng);
            walk[k] = walk[k - 1] + Vector3::from(step) * chain_bond_length;
        }
        let drift = (walk[len] - span) / len as f64;
        for k in 1..len {
            coords[lp.start + k] = attach + walk[k] - drift * k as f64;
        }
    }

    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn turn_and_step_round_trip_recovers_the_turn_length() {
        let helix = HelixConstraints {
            turn_length: Some(500.0),
            step: Some(100.0),
            ..Default::default()
        }
        .solve()
        .unwrap();
        assert!((helix.radius - 77.97).abs() < 0.01);
        assert!(f64_approx_equal(helix.turn_length(), 500.0));
    }

    #[test]
    fn step_exceeding_turn_length_is_incompatible() {
        let err = HelixConstraints {
            turn_length: Some(100.0),
            step: Some(500.0),
            ..Default::default()
        }
        .solve()
        .unwrap_err();
        assert!(matches!(err, ConformationError::TurnShorterThanStep { .. }));
    }

    #[test]
    fn radius_and_turn_length_solve_the_step() {
        let helix = HelixConstraints {
            radius: Some(10.0),
            turn_length: Some(100.0),
            ..Default::default()
        }
        .solve()
        .unwrap();
        assert!(f64_approx_equal(helix.turn_length(), 100.0));
    }

    #[test]
    fn circumference_exceeding_turn_length_is_incompatible() {
        let err = HelixConstraints {
            radius: Some(100.0),
            turn_length: Some(100.0),
            ..Default::default()
        }
        .solve()
        .unwrap_err();
        assert!(matches!(
            err,
            ConformationError::TurnShorterThanCircumference { .. }
        ));
    }

    #[test]
    fn compression_below_one_is_incompatible() {
        let err = HelixConstraints {
            radius: Some(10.0),
            axial_compression: Some(0.5),
            ..Default::default()
        }
        .solve()
        .unwrap_err();
        assert_eq!(err, ConformationError::CompressionNotExpanding(0.5));
    }

    #[test]
    fn compression_and_step_solve_a_consistent_helix() {
        let helix = HelixConstraints {
            step: Some(15.0),
            axial_compression: Some(4.0),
            ..Default::default()
        }
        .solve()
        .unwrap();
        assert!(f64_approx_equal(helix.turn_length() / helix.step, 4.0));
    }

    #[test]
    fn no_constraints_yield_the_degenerate_helix() {
        let helix = HelixConstraints::default().solve().unwrap();
        assert_eq!(helix.radius, 0.0);
        assert_eq!(helix.step, DEGENERATE_HELIX_STEP);
    }

    #[test]
    fn single_constraint_is_rejected_with_the_count() {
        let err = HelixConstraints {
            radius: Some(5.0),
            ..Default::default()
        }
        .solve()
        .unwrap_err();
        assert_eq!(err, ConformationError::WrongConstraintCount(1));
    }

    #[test]
    fn three_constraints_are_rejected() {
        let err = HelixConstraints {
            radius: Some(5.0),
            step: Some(10.0),
            axial_compression: Some(2.0),
            ..Default::default()
        }
        .solve()
        .unwrap_err();
        assert_eq!(err, ConformationError::WrongConstraintCount(3));
    }

    #[test]
    fn loopbrush_places_backbone_on_the_helix_radius() {
        let helix = HelixConstraints {
            turn_length: Some(50.0),
            step: Some(10.0),
            ..Default::default()
        }
        .solve()
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let coords = make_helical_loopbrush(100, helix, &[], false, &mut rng).unwrap();
        assert_eq!(coords.len(), 100);
        for p in &coords {
            let radial = (p.x * p.x + p.y * p.y).sqrt();
            assert!(f64_approx_equal(radial, helix.radius));
        }
    }

    #[test]
    fn degenerate_helix_is_a_straight_line_along_the_axis() {
        let helix = HelixConstraints::default().solve().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let coords = make_helical_loopbrush(10, helix, &[], false, &mut rng).unwrap();
        for (j, p) in coords.iter().enumerate() {
            assert!(p.x.abs() < 1e-6);
            assert!((p.z - j as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn uniform_brush_advances_each_backbone_particle_by_one_phase() {
        let helix = HelixConstraints {
            radius: Some(10.0),
            step: Some(20.0),
            ..Default::default()
        }
        .solve()
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let coords =
            make_uniform_helical_loopbrush(100, helix, Some(50.0), &[], 1.0, &mut rng).unwrap();

        // 50 particles per turn at step 20: a constant axial rise of 0.4.
        for pair in coords.windows(2) {
            assert!(f64_approx_equal(pair[1].z - pair[0].z, 0.4));
        }
        for p in &coords {
            let radial = (p.x * p.x + p.y * p.y).sqrt();
            assert!(f64_approx_equal(radial, 10.0));
        }
    }

    #[test]
    fn uniform_loop_walk_stays_bonded_and_bridges_the_anchors() {
        let helix = HelixConstraints::default().solve().unwrap();
        let loops = vec![LoopSpan::new(5, 45)];
        let mut rng = StdRng::seed_from_u64(11);
        let coords =
            make_uniform_helical_loopbrush(60, helix, None, &loops, 1.0, &mut rng).unwrap();

        // Walk plus the shared-out drift: every bond along the loop body stays
        // within a bounded multiple of the nominal bond length.
        for k in 5..45 {
            let bond = (coords[k + 1] - coords[k]).norm();
            assert!(bond < 2.5, "bond {k} stretched to {bond}");
        }
    }

    #[test]
    fn uniform_brush_rejects_a_non_positive_period() {
        let helix = HelixConstraints::default().solve().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = make_uniform_helical_loopbrush(10, helix, Some(0.0), &[], 1.0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter(_)));
    }

    #[test]
    fn loop_particles_fold_out_from_their_attachment_point() {
        let helix = HelixConstraints::default().solve().unwrap();
        let loops = vec![LoopSpan::new(2, 8)];
        let mut rng = StdRng::seed_from_u64(5);
        let coords = make_helical_loopbrush(12, helix, &loops, false, &mut rng).unwrap();

        let attach = coords[2];
        // Midpoint of the loop reaches furthest out.
        let mid = coords[5];
        let reach = ((mid.x - attach.x).powi(2) + (mid.y - attach.y).powi(2)).sqrt();
        assert!((reach - 3.0).abs() < 1e-6);
        // The far anchor is back on the backbone.
        assert!((coords[8].z - attach.z - 1.0).abs() < 1e-6);
    }
}
