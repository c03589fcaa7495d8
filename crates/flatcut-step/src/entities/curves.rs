//! Edge curves: lines and circles stay exact; ellipses, B-splines, and
//! polylines are sampled and trimmed to the edge's vertices.

use super::geometry::{parse_axis_placement, parse_cartesian_point};
use super::EntityArgs;
use crate::error::{Result, StepError};
use crate::parser::{StepEntity, StepFile};
use flatcut_brep::Edge;
use flatcut_math::{Point3, Vec3};
use std::f64::consts::TAU;
use tracing::warn;

/// Samples over a full ellipse.
const ELLIPSE_SAMPLES: usize = 96;
/// Samples per B-spline control point, clamped to a sane range.
const SPLINE_SAMPLES_PER_POLE: usize = 8;
const SPLINE_SAMPLES_MIN: usize = 16;
const SPLINE_SAMPLES_MAX: usize = 1024;

/// Build the geometry of an EDGE_CURVE running from `v1` to `v2`.
///
/// `same_sense` tells whether the curve's parameterization runs from `v1`
/// to `v2` (true) or the other way.
pub fn edge_geometry(
    file: &StepFile,
    curve_id: u64,
    v1: Point3,
    v2: Point3,
    same_sense: bool,
) -> Result<Edge> {
    let entity = file.require(curve_id)?;

    if entity.has_record("B_SPLINE_CURVE") || entity.type_name() == "B_SPLINE_CURVE_WITH_KNOTS"
    {
        let samples = sample_bspline(file, entity)?;
        let closed = is_closed_sample(&samples);
        return Ok(trimmed(&samples, closed, v1, v2, same_sense));
    }

    match entity.type_name() {
        "LINE" => Ok(Edge::line(v1, v2)),
        "CIRCLE" => {
            let args = entity.args();
            let placement = parse_axis_placement(file, args.entity_ref(1)?)?;
            let radius = args.real(2)?;
            if radius <= 0.0 {
                return Err(StepError::InvalidGeometry(format!(
                    "CIRCLE #{curve_id} has radius {radius}"
                )));
            }
            let mut edge = Edge::arc(v1, v2, placement.location, placement.z_axis(), same_sense);
            // keep the declared radius rather than the vertex distance
            if let flatcut_brep::Curve::Circle(c) = &mut edge.curve {
                c.radius = radius;
            }
            Ok(edge)
        }
        "ELLIPSE" => {
            let args = entity.args();
            let placement = parse_axis_placement(file, args.entity_ref(1)?)?;
            let (a, b) = (args.real(2)?, args.real(3)?);
            let (c, x, y) = (
                placement.location,
                placement.x_axis().into_inner(),
                placement.y_axis().into_inner(),
            );
            let samples: Vec<Point3> = (0..=ELLIPSE_SAMPLES)
                .map(|i| {
                    let t = TAU * i as f64 / ELLIPSE_SAMPLES as f64;
                    c + x * (a * t.cos()) + y * (b * t.sin())
                })
                .collect();
            Ok(trimmed(&samples, true, v1, v2, same_sense))
        }
        "POLYLINE" => {
            let points = entity
                .args()
                .entity_ref_list(1)?
                .into_iter()
                .map(|p| parse_cartesian_point(file, p))
                .collect::<Result<Vec<_>>>()?;
            let closed = is_closed_sample(&points);
            Ok(trimmed(&points, closed, v1, v2, same_sense))
        }
        // curves on surfaces carry their 3D curve as the second parameter
        "SURFACE_CURVE" | "SEAM_CURVE" | "INTERSECTION_CURVE" | "BOUNDED_SURFACE_CURVE" => {
            let inner = entity.args().entity_ref(1)?;
            edge_geometry(file, inner, v1, v2, same_sense)
        }
        // the vertices already trim the basis curve
        "TRIMMED_CURVE" => {
            let args = entity.args();
            let basis = args.entity_ref(1)?;
            let sense = args.boolean(4).unwrap_or(true);
            edge_geometry(file, basis, v1, v2, same_sense == sense)
        }
        other => {
            warn!(entity = curve_id, kind = other, "unsupported edge curve, using a chord");
            Ok(Edge::line(v1, v2))
        }
    }
}

fn is_closed_sample(points: &[Point3]) -> bool {
    match (points.first(), points.last()) {
        (Some(a), Some(b)) if points.len() > 2 => (a - b).norm() < 1e-9,
        _ => false,
    }
}

fn nearest_index(points: &[Point3], target: &Point3) -> usize {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .norm_squared()
                .total_cmp(&(*b - target).norm_squared())
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Cut the run of `samples` between the points nearest `v1` and `v2`.
///
/// Closed sample rings are walked in parameter direction when `forward`,
/// against it otherwise; open runs are walked by index order. The result
/// starts exactly at `v1` and ends exactly at `v2`.
fn trimmed(samples: &[Point3], closed: bool, v1: Point3, v2: Point3, forward: bool) -> Edge {
    let mut run: Vec<Point3> = Vec::new();
    if closed {
        let ring = &samples[..samples.len() - 1];
        let n = ring.len();
        let i = nearest_index(ring, &v1);
        let j = nearest_index(ring, &v2);
        let full = (v1 - v2).norm() < 1e-9;
        let steps = match (forward, full) {
            (_, true) => n,
            (true, false) => (j + n - i) % n,
            (false, false) => (i + n - j) % n,
        };
        for k in 0..=steps {
            let idx = if forward { (i + k) % n } else { (i + n - k % n) % n };
            run.push(ring[idx]);
        }
    } else {
        let i = nearest_index(samples, &v1);
        let j = nearest_index(samples, &v2);
        if i <= j {
            run.extend_from_slice(&samples[i..=j]);
        } else {
            run.extend(samples[j..=i].iter().rev());
        }
    }

    if run.len() < 2 {
        return Edge::line(v1, v2);
    }
    let last = run.len() - 1;
    run[0] = v1;
    run[last] = v2;
    Edge::polyline(run).unwrap_or_else(|| Edge::line(v1, v2))
}

/// Evaluate a (possibly rational) B-spline curve at evenly spaced
/// parameters over its domain.
fn sample_bspline(file: &StepFile, entity: &StepEntity) -> Result<Vec<Point3>> {
    // simple form: (name, degree, poles, form, closed, self_int, mults, knots, spec)
    // complex form: B_SPLINE_CURVE(degree, poles, ...) + B_SPLINE_CURVE_WITH_KNOTS(mults, knots, spec)
    let (degree, pole_ids, mults, knots) = match entity.record_args("B_SPLINE_CURVE") {
        Some(curve) => {
            let knot_args = entity.record_args("B_SPLINE_CURVE_WITH_KNOTS").ok_or_else(|| {
                StepError::Malformed {
                    entity_id: entity.id,
                    type_name: "B_SPLINE_CURVE".into(),
                    message: "complex B-spline without knots".into(),
                }
            })?;
            (
                curve.integer(0)?,
                curve.entity_ref_list(1)?,
                knot_args.integer_list(0)?,
                knot_args.real_list(1)?,
            )
        }
        None => {
            let args = entity.args();
            (
                args.integer(1)?,
                args.entity_ref_list(2)?,
                args.integer_list(6)?,
                args.real_list(7)?,
            )
        }
    };
    let weights = match entity.record_args("RATIONAL_B_SPLINE_CURVE") {
        Some(r) => Some(r.real_list(0)?),
        None => None,
    };

    let poles = pole_ids
        .into_iter()
        .map(|p| parse_cartesian_point(file, p))
        .collect::<Result<Vec<_>>>()?;

    let spline = BSpline::new(degree, poles, &mults, &knots, weights).ok_or_else(|| {
        StepError::InvalidGeometry(format!("inconsistent B-spline #{}", entity.id))
    })?;

    let n = (spline.poles.len() * SPLINE_SAMPLES_PER_POLE).clamp(SPLINE_SAMPLES_MIN, SPLINE_SAMPLES_MAX);
    let (t0, t1) = spline.domain();
    Ok((0..=n)
        .map(|i| spline.eval(t0 + (t1 - t0) * i as f64 / n as f64))
        .collect())
}

struct BSpline {
    degree: usize,
    poles: Vec<Point3>,
    weights: Vec<f64>,
    knots: Vec<f64>,
}

impl BSpline {
    fn new(
        degree: i64,
        poles: Vec<Point3>,
        mults: &[i64],
        distinct: &[f64],
        weights: Option<Vec<f64>>,
    ) -> Option<Self> {
        let degree = usize::try_from(degree).ok().filter(|d| *d >= 1)?;
        if mults.len() != distinct.len() {
            return None;
        }
        let knots: Vec<f64> = mults
            .iter()
            .zip(distinct)
            .flat_map(|(m, k)| std::iter::repeat(*k).take((*m).max(0) as usize))
            .collect();
        if knots.len() != poles.len() + degree + 1 {
            return None;
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; poles.len()]);
        if weights.len() != poles.len() {
            return None;
        }
        Some(Self {
            degree,
            poles,
            weights,
            knots,
        })
    }

    fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.poles.len()])
    }

    fn span(&self, t: f64) -> usize {
        let n = self.poles.len() - 1;
        if t >= self.knots[n + 1] {
            // last non-empty span
            let mut k = n;
            while k > self.degree && self.knots[k] >= self.knots[n + 1] {
                k -= 1;
            }
            return k;
        }
        let mut k = self.degree;
        while k < n && self.knots[k + 1] <= t {
            k += 1;
        }
        k
    }

    /// de Boor's algorithm in homogeneous coordinates.
    fn eval(&self, t: f64) -> Point3 {
        let p = self.degree;
        let k = self.span(t);
        let mut d: Vec<(Vec3, f64)> = (0..=p)
            .map(|j| {
                let i = j + k - p;
                let w = self.weights[i];
                (self.poles[i].coords * w, w)
            })
            .collect();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = j + k - p;
                let denom = self.knots[i + p + 1 - r] - self.knots[i];
                let alpha = if denom.abs() < 1e-15 {
                    0.0
                } else {
                    (t - self.knots[i]) / denom
                };
                d[j] = (
                    d[j - 1].0 * (1.0 - alpha) + d[j].0 * alpha,
                    d[j - 1].1 * (1.0 - alpha) + d[j].1 * alpha,
                );
            }
        }
        let (v, w) = d[p];
        Point3::from(v / w)
    }
}
