//! # Smoothing Splines
//!
//! Weighted cubic smoothing splines for planar point sequences.
//!
//! Given points `P_i`, strictly increasing parameters `u_i`, weights `w_i`
//! and a target `s`, the fit looks for the smoothest cubic B-spline curve `S`
//! whose weighted residual
//!
//! ```text
//! delta = sum_i (w_i * |P_i - S(u_i)|)^2
//! ```
//!
//! does not exceed `s`. Smoothness is measured by the squared jumps of the
//! third derivative at the interior knots, which vanish exactly when `S` is a
//! single cubic polynomial. Interior knots sit at the data parameters
//! (`u_2 .. u_{m-3}`), so with no smoothing the curve interpolates.
//!
//! The trade-off is solved as the penalised least-squares system
//! `(A'W^2A + lambda * J'J) c = A'W^2 P` and `lambda` is searched on a log
//! scale until `delta` meets the target. If the least-squares cubic
//! polynomial already satisfies the target it is returned as is.

use crate::Point;
use crate::primitives::{MAX_FIT_ITERATIONS, SMOOTHING_TOLERANCE, SPLINE_DEGREE};
use crate::smoothing::SmoothError;

const K: usize = SPLINE_DEGREE;

/// Search bracket for `lambda`, relative to the data/penalty scale ratio.
const LAMBDA_FLOOR: f64 = 1e-12;
const LAMBDA_CEILING: f64 = 1e6;

/// Relative pivot below which the normal equations are treated as singular.
const PIVOT_EPS: f64 = 1e-14;

/// Stored diagonals of a symmetric band matrix: the main diagonal and the
/// `K + 1` below it. A third-derivative jump couples `K + 2` neighbouring
/// coefficients, which sets the width.
const BAND: usize = K + 2;

/// Lower band of a symmetric matrix; `band[i][d]` holds entry `(i, i - d)`.
type Band = Vec<[f64; BAND]>;

// =============================================================================
// CURVE
// =============================================================================

/// A planar cubic B-spline curve with clamped knots.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    knots: Vec<f64>,
    cx: Vec<f64>,
    cy: Vec<f64>,
}

impl BSplineCurve {
    /// Evaluate the curve at parameter `u`.
    ///
    /// Parameters outside the knot range extend the first or last polynomial piece.
    #[must_use]
    pub fn evaluate(&self, u: f64) -> Point {
        let (span, basis) = basis_functions(&self.knots, self.cx.len(), u);
        let mut point = Point::default();
        for (offset, b) in basis.iter().enumerate() {
            let j = span - K + offset;
            point.x += b * self.cx[j];
            point.y += b * self.cy[j];
        }
        point
    }

    /// Parameter range covered by the knots.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        let n = self.cx.len();
        (self.knots[K], self.knots[n])
    }

    /// Number of polynomial pieces.
    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.cx.len() - K
    }
}

// =============================================================================
// BASIS
// =============================================================================

/// Knot span containing `u` for a spline with `n` coefficients.
fn find_span(knots: &[f64], n: usize, u: f64) -> usize {
    if u >= knots[n] {
        return n - 1;
    }
    if u <= knots[K] {
        return K;
    }
    let (mut low, mut high) = (K, n);
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// The `K + 1` non-zero basis functions at `u` (Cox-de Boor), with their span.
fn basis_functions(knots: &[f64], n: usize, u: f64) -> (usize, [f64; K + 1]) {
    let span = find_span(knots, n, u);
    let mut values = [0.0; K + 1];
    let mut left = [0.0; K + 1];
    let mut right = [0.0; K + 1];
    values[0] = 1.0;
    for j in 1..=K {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = values[r] / (right[r + 1] + left[j - r]);
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    (span, values)
}

/// Clamped knot vector over `params`, with interior knots at the data sites
/// when `interior` is set.
fn clamped_knots(params: &[f64], interior: bool) -> Vec<f64> {
    let m = params.len();
    let first = params[0];
    let last = params[m - 1];
    let mut knots = vec![first; K + 1];
    if interior {
        knots.extend_from_slice(&params[2..m - 2]);
    }
    knots.extend(std::iter::repeat_n(last, K + 1));
    knots
}

// =============================================================================
// PENALTY
// =============================================================================

/// One jump row per interior knot: the third-derivative jump there as a
/// linear function of the coefficients `j .. j + BAND`, where `j` is the row
/// index.
fn jump_operator(knots: &[f64], n: usize) -> Result<Vec<[f64; BAND]>, SmoothError> {
    let mut unit = [0.0; BAND];
    unit[0] = 1.0;
    let mut rows = vec![unit; n];

    // Differentiate three times: degree K-d+1 down to K-d. Row j keeps
    // starting at coefficient j, so its right neighbour is shifted by one.
    for d in 1..=K {
        let degree = (K + 1 - d) as f64;
        let mut next = Vec::with_capacity(rows.len() - 1);
        for j in 0..rows.len() - 1 {
            let span = knots[j + K + 1] - knots[j + d];
            if span <= 0.0 {
                return Err(SmoothError::DegenerateParameterization);
            }
            let scale = degree / span;
            next.push(shifted_difference(&rows[j], &rows[j + 1], scale));
        }
        rows = next;
    }

    Ok(rows
        .windows(2)
        .map(|pair| shifted_difference(&pair[0], &pair[1], 1.0))
        .collect())
}

/// `scale * (hi - lo)` where `hi` starts one coefficient after `lo`.
fn shifted_difference(lo: &[f64; BAND], hi: &[f64; BAND], scale: f64) -> [f64; BAND] {
    std::array::from_fn(|t| {
        let upper = if t > 0 { hi[t - 1] } else { 0.0 };
        scale * (upper - lo[t])
    })
}

/// `J'J` for the jump operator, in band form.
fn gram_of(rows: &[[f64; BAND]], n: usize) -> Band {
    let mut gram = vec![[0.0; BAND]; n];
    for (j, row) in rows.iter().enumerate() {
        for (a, ra) in row.iter().enumerate().take(n - j) {
            for (b, rb) in row.iter().enumerate().take(a + 1) {
                gram[j + a][a - b] += ra * rb;
            }
        }
    }
    gram
}

// =============================================================================
// LEAST SQUARES
// =============================================================================

/// A candidate curve and its weighted residual.
struct Fit {
    curve: BSplineCurve,
    residual: f64,
}

/// Normal equations of a weighted least-squares spline problem on fixed knots.
struct Problem<'a> {
    points: &'a [Point],
    weights: &'a [f64],
    knots: Vec<f64>,
    rows: Vec<(usize, [f64; K + 1])>,
    normal: Band,
    rhs_x: Vec<f64>,
    rhs_y: Vec<f64>,
    penalty: Option<Band>,
}

impl<'a> Problem<'a> {
    fn new(
        points: &'a [Point],
        params: &[f64],
        weights: &'a [f64],
        interior: bool,
    ) -> Result<Self, SmoothError> {
        let knots = clamped_knots(params, interior);
        let n = knots.len() - K - 1;

        let mut normal = vec![[0.0; BAND]; n];
        let mut rhs_x = vec![0.0; n];
        let mut rhs_y = vec![0.0; n];
        let mut rows = Vec::with_capacity(points.len());

        for ((point, &u), &w) in points.iter().zip(params).zip(weights) {
            let (span, basis) = basis_functions(&knots, n, u);
            let w2 = w * w;
            for (a, ba) in basis.iter().enumerate() {
                let ia = span - K + a;
                rhs_x[ia] += w2 * ba * point.x;
                rhs_y[ia] += w2 * ba * point.y;
                for (b, bb) in basis.iter().enumerate().take(a + 1) {
                    normal[ia][a - b] += w2 * ba * bb;
                }
            }
            rows.push((span, basis));
        }

        let penalty = if n > K + 1 {
            Some(gram_of(&jump_operator(&knots, n)?, n))
        } else {
            None
        };

        Ok(Self {
            points,
            weights,
            knots,
            rows,
            normal,
            rhs_x,
            rhs_y,
            penalty,
        })
    }

    /// Ratio of data to penalty scale; the natural unit for `lambda`.
    fn lambda_scale(&self) -> f64 {
        let data: f64 = self.normal.iter().map(|row| row[0]).sum();
        let penalty: f64 = self
            .penalty
            .as_ref()
            .map(|p| p.iter().map(|row| row[0]).sum())
            .unwrap_or(0.0);
        if penalty > 0.0 { data / penalty } else { 1.0 }
    }

    fn solve(&self, lambda: f64) -> Result<Fit, SmoothError> {
        let mut system = self.normal.clone();
        if let Some(penalty) = &self.penalty {
            for (row, prow) in system.iter_mut().zip(penalty) {
                for (value, p) in row.iter_mut().zip(prow) {
                    *value += lambda * p;
                }
            }
        }

        let factor = band_cholesky(&system)?;
        let cx = band_solve(&factor, &self.rhs_x);
        let cy = band_solve(&factor, &self.rhs_y);
        if cx.iter().chain(&cy).any(|c| !c.is_finite()) {
            return Err(SmoothError::SingularFit);
        }

        let mut residual = 0.0;
        for (((span, basis), point), w) in self.rows.iter().zip(self.points).zip(self.weights) {
            let (mut sx, mut sy) = (0.0, 0.0);
            for (offset, b) in basis.iter().enumerate() {
                sx += b * cx[span - K + offset];
                sy += b * cy[span - K + offset];
            }
            let (dx, dy) = (point.x - sx, point.y - sy);
            residual += w * w * (dx * dx + dy * dy);
        }

        Ok(Fit {
            curve: BSplineCurve {
                knots: self.knots.clone(),
                cx,
                cy,
            },
            residual,
        })
    }
}

/// Banded Cholesky factor `L` of a symmetric positive definite band matrix.
///
/// `L` has the same band as the input, so the cost is linear in its size.
fn band_cholesky(matrix: &Band) -> Result<Band, SmoothError> {
    let n = matrix.len();
    let max_diag = matrix.iter().map(|row| row[0].abs()).fold(0.0, f64::max);
    let mut l = vec![[0.0; BAND]; n];
    for i in 0..n {
        let first = i.saturating_sub(BAND - 1);
        for j in first..=i {
            let dot: f64 = (first..j).map(|k| l[i][i - k] * l[j][j - k]).sum();
            if i == j {
                let pivot = matrix[i][0] - dot;
                if !pivot.is_finite() || pivot <= PIVOT_EPS * max_diag {
                    return Err(SmoothError::SingularFit);
                }
                l[i][0] = pivot.sqrt();
            } else {
                l[i][i - j] = (matrix[i][i - j] - dot) / l[j][0];
            }
        }
    }
    Ok(l)
}

/// Solve `L L' x = rhs` by forward and back substitution over the band.
fn band_solve(l: &Band, rhs: &[f64]) -> Vec<f64> {
    let n = l.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let first = i.saturating_sub(BAND - 1);
        let dot: f64 = (first..i).map(|k| l[i][i - k] * y[k]).sum();
        y[i] = (rhs[i] - dot) / l[i][0];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let last = (i + BAND).min(n);
        let dot: f64 = (i + 1..last).map(|k| l[k][k - i] * x[k]).sum();
        x[i] = (y[i] - dot) / l[i][0];
    }
    x
}

// =============================================================================
// FITTING
// =============================================================================

/// Fit a weighted cubic smoothing spline through `points`.
///
/// `params` must be strictly increasing and `weights` positive, one per point.
/// `target` is the allowed weighted residual.
pub fn fit_smoothing_spline(
    points: &[Point],
    params: &[f64],
    weights: &[f64],
    target: f64,
) -> Result<BSplineCurve, SmoothError> {
    let m = points.len();
    if params.len() != m || weights.len() != m {
        return Err(SmoothError::InvalidParameter(format!(
            "{} points, {} parameters, {} weights",
            m,
            params.len(),
            weights.len()
        )));
    }
    if m <= K {
        return Err(SmoothError::TooFewFittingPoints(m));
    }
    if params.iter().any(|u| !u.is_finite()) || params.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SmoothError::DegenerateParameterization);
    }
    if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
        return Err(SmoothError::InvalidParameter(
            "weights must be positive".to_string(),
        ));
    }
    if !target.is_finite() || target < 0.0 {
        return Err(SmoothError::InvalidParameter(format!(
            "smoothing factor {}",
            target
        )));
    }

    let polynomial = Problem::new(points, params, weights, false)?.solve(0.0)?;
    if polynomial.residual <= target || m == K + 1 {
        return Ok(polynomial.curve);
    }

    let problem = Problem::new(points, params, weights, true)?;
    let scale = problem.lambda_scale();
    let mut lo = scale * LAMBDA_FLOOR;
    let mut hi = scale * LAMBDA_CEILING;

    let smoothest = problem.solve(hi)?;
    if smoothest.residual <= target {
        return Ok(smoothest.curve);
    }
    let mut best = problem.solve(lo)?;
    if best.residual >= target {
        return Ok(best.curve);
    }

    let tolerance = SMOOTHING_TOLERANCE * target;
    for _ in 0..MAX_FIT_ITERATIONS {
        let mid = (lo * hi).sqrt();
        let fit = problem.solve(mid)?;
        if (fit.residual - target).abs() <= tolerance {
            return Ok(fit.curve);
        }
        if fit.residual > target {
            hi = mid;
        } else {
            lo = mid;
            best = fit;
        }
    }

    tracing::debug!(
        smoothing_factor = target,
        residual = best.residual,
        "smoothing search did not converge"
    );
    Ok(best.curve)
}

// =============================================================================
// TESTS
// =============================================================================
