//! Consistency checks and ray tracing for built geometries.
//!
//! The checker samples random points and directions in a box and asks the
//! geometry the same question in different ways. A well-behaved geometry
//! agrees with itself:
//! - `is_inside(x)` holds exactly when `is_where(x)` is a region;
//! - `hownear(x)` never exceeds the distance `howfar` finds along any ray;
//! - the midpoint of a step stays in the region the step started in;
//! - boundary normals point against the direction of travel.
//!
//! # Key Components
//! - [`check`]: parallel random sampling with a progress bar
//! - [`trace`]: the regions, media and step lengths along one ray

use std::f64::consts::PI;
use std::fmt;

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::geometry::{GeometryQuery, OUTSIDE};
use crate::settings::{Settings, UNLIMITED_STEP};

/// One straight segment of a traced ray.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub region: i32,
    pub medium: i32,
    pub start: Point3<f64>,
    /// Infinite for the final segment when no further boundary is found.
    pub length: f64,
}

/// Follow a ray from `origin` along the unit vector `u`, one boundary at a time.
///
/// **How it Works**: Starting from `is_where(origin)`, `howfar` with an
/// unlimited step gives the next crossing, which sets the region of the
/// next segment. The trace ends when no boundary is left, or after
/// `max_step()` crossings, which only a misbehaving geometry exceeds.
pub fn trace<G: GeometryQuery + ?Sized>(
    geometry: &G,
    origin: &Point3<f64>,
    u: &Vector3<f64>,
) -> Vec<TraceStep> {
    let mut x = *origin;
    let mut ireg = geometry.is_where(&x);
    let mut steps = Vec::new();
    let limit = geometry.max_step().max(0) as usize + 1;

    for _ in 0..limit {
        let step = |length| TraceStep {
            region: ireg,
            medium: geometry.medium(ireg),
            start: x,
            length,
        };
        match geometry.howfar(ireg, &x, u, UNLIMITED_STEP) {
            Some(hit) => {
                steps.push(step(hit.distance));
                x += u * hit.distance;
                ireg = hit.region;
            }
            None => {
                steps.push(step(f64::INFINITY));
                return steps;
            }
        }
    }
    warn!(
        "`{}`: trace stopped after {} boundary crossings",
        geometry.name(),
        limit - 1
    );
    steps
}

/// Outcome of [`check`]: counts of samples failing each test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub samples: usize,
    /// Samples that landed in a region.
    pub inside: usize,
    pub inside_mismatches: usize,
    pub hownear_violations: usize,
    pub step_mismatches: usize,
    pub normal_violations: usize,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.inside_mismatches == 0
            && self.hownear_violations == 0
            && self.step_mismatches == 0
            && self.normal_violations == 0
    }

    fn merge(self, other: Self) -> Self {
        Self {
            samples: self.samples + other.samples,
            inside: self.inside + other.inside,
            inside_mismatches: self.inside_mismatches + other.inside_mismatches,
            hownear_violations: self.hownear_violations + other.hownear_violations,
            step_mismatches: self.step_mismatches + other.step_mismatches,
            normal_violations: self.normal_violations + other.normal_violations,
        }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Check:
  - Samples: {} ({} inside)
  - is_inside / is_where mismatches: {}
  - hownear beyond boundary: {}
  - step midpoint outside region: {}
  - normals along travel: {}
  ",
            self.samples,
            self.inside,
            self.inside_mismatches,
            self.hownear_violations,
            self.step_mismatches,
            self.normal_violations,
        )
    }
}

/// Uniform point in the sampling box.
fn random_point(rng: &mut StdRng, settings: &Settings) -> Point3<f64> {
    let [cx, cy, cz] = settings.centre;
    let mut coord = |c: f64| c + settings.extent * (2.0 * rng.random::<f64>() - 1.0);
    Point3::new(coord(cx), coord(cy), coord(cz))
}

/// Uniform direction on the unit sphere.
fn random_direction(rng: &mut StdRng) -> Vector3<f64> {
    let cos_theta = 2.0 * rng.random::<f64>() - 1.0;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * rng.random::<f64>();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

fn check_sample<G: GeometryQuery + ?Sized>(
    geometry: &G,
    settings: &Settings,
    rng: &mut StdRng,
) -> CheckReport {
    let x = random_point(rng, settings);
    let u = random_direction(rng);
    let ireg = geometry.is_where(&x);
    let mut report = CheckReport {
        samples: 1,
        inside: usize::from(ireg != OUTSIDE),
        ..Default::default()
    };

    if geometry.is_inside(&x) != (ireg != OUTSIDE) {
        report.inside_mismatches += 1;
    }
    let near = geometry.hownear(ireg, &x);
    if let Some(hit) = geometry.howfar(ireg, &x, &u, UNLIMITED_STEP) {
        if near > hit.distance + settings.tolerance {
            report.hownear_violations += 1;
        }
        if geometry.is_where(&(x + u * (0.5 * hit.distance))) != ireg {
            report.step_mismatches += 1;
        }
        if hit.normal.dot(&u) > settings.tolerance {
            report.normal_violations += 1;
        }
    }
    report
}

/// Run `settings.samples` random checks on `geometry` in parallel.
///
/// Sample `i` draws from its own generator seeded with `seed + i`, so a
/// report is reproducible whatever the thread count.
pub fn check<G: GeometryQuery + Sync + ?Sized>(
    geometry: &G,
    settings: &Settings,
    show_progress: bool,
) -> CheckReport {
    let seed = settings.seed.unwrap_or_else(rand::random);
    let n = settings.samples;

    let pb = if show_progress {
        ProgressBar::new(n as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>7}/{len:7} {msg} ETA: {eta_precise}",
    ) {
        pb.set_style(style.progress_chars("█▇▆▅▄▃▂▁"));
    }
    pb.set_message("samples".to_string());

    let report = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let report = check_sample(geometry, settings, &mut rng);
            pb.inc(1);
            report
        })
        .reduce(CheckReport::default, CheckReport::merge);

    pb.finish_with_message("done");
    report
}
