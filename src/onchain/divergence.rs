//! Nonlinear divergence of a short series.
//!
//! Fits `a·e^(b·x) + c` over `x = 0..n` with a damped least-squares
//! (Levenberg–Marquardt) solver and measures how far the fitted curve
//! strays from the straight line between the first and last sample.

/// Score for histories too short to fit.
pub const SHORT_HISTORY_SEED: f64 = 0.05;
/// Score when the fit fails or diverges.
pub const FAILED_FIT_SEED: f64 = 0.08;
pub const MIN_POINTS: usize = 5;
pub const MAX_EVALUATIONS: usize = 2000;

const INITIAL_GUESS: [f64; 3] = [0.1, 0.1, 0.1];
const MAX_DAMPING: f64 = 1e16;

fn model(p: &[f64; 3], x: f64) -> f64 {
    p[0] * (p[1] * x).exp() + p[2]
}

fn sum_sq(p: &[f64; 3], ys: &[f64]) -> f64 {
    ys.iter()
        .enumerate()
        .map(|(i, y)| (model(p, i as f64) - y).powi(2))
        .sum()
}

/// Solve a 3x3 system by Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut rhs: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if !a[pivot][col].is_finite() || a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        rhs.swap(col, pivot);
        for row in col + 1..3 {
            let f = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= f * a[col][k];
            }
            rhs[row] -= f * rhs[col];
        }
    }
    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Least-squares fit of the exponential kernel.
///
/// Returns `None` when the data is not finite, the parameters blow up, or the
/// evaluation budget runs out before the residual settles.
pub fn fit_exponential(ys: &[f64], max_evals: usize) -> Option<[f64; 3]> {
    if ys.iter().any(|y| !y.is_finite()) {
        return None;
    }

    let mut p = INITIAL_GUESS;
    let mut cost = sum_sq(&p, ys);
    let mut evals = 1;
    let mut damping = 1e-3;
    if !cost.is_finite() {
        return None;
    }

    while evals < max_evals {
        let mut jtj = [[0.0; 3]; 3];
        let mut jtr = [0.0; 3];
        for (i, y) in ys.iter().enumerate() {
            let x = i as f64;
            let e = (p[1] * x).exp();
            let jac = [e, p[0] * x * e, 1.0];
            let r = y - (p[0] * e + p[2]);
            for a in 0..3 {
                jtr[a] += jac[a] * r;
                for b in 0..3 {
                    jtj[a][b] += jac[a] * jac[b];
                }
            }
        }
        if jtr.iter().all(|g| g.abs() < 1e-12) {
            return Some(p);
        }

        let mut lhs = jtj;
        for (i, row) in lhs.iter_mut().enumerate() {
            row[i] += damping * jtj[i][i].max(1e-12);
        }

        evals += 1;
        let accepted = solve3(lhs, jtr).and_then(|step| {
            let trial = [p[0] + step[0], p[1] + step[1], p[2] + step[2]];
            let trial_cost = sum_sq(&trial, ys);
            (trial_cost.is_finite() && trial_cost < cost).then_some((trial, trial_cost))
        });

        match accepted {
            Some((trial, trial_cost)) => {
                let improvement = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
                p = trial;
                cost = trial_cost;
                damping = (damping / 10.0).max(1e-12);
                if improvement < 1e-10 || cost < 1e-20 {
                    return Some(p);
                }
            }
            None => {
                damping *= 10.0;
                // no downhill step left: local minimum
                if damping > MAX_DAMPING {
                    return Some(p);
                }
            }
        }
    }
    None
}

/// Divergence score in [0, 1]. Never panics; short or unfittable series
/// return the documented seeds.
pub fn calculate_divergence(series: &[f64], scale: f64) -> f64 {
    if series.len() < MIN_POINTS {
        return SHORT_HISTORY_SEED;
    }
    let Some(p) = fit_exponential(series, MAX_EVALUATIONS) else {
        return FAILED_FIT_SEED;
    };

    let n = series.len();
    let first = series[0];
    let last = series[n - 1];
    let span = (n - 1) as f64;
    let gap = (0..n)
        .map(|i| {
            let x = i as f64;
            let linear = first + (last - first) * x / span;
            (model(&p, x) - linear).abs()
        })
        .sum::<f64>()
        / n as f64;

    let score = gap / scale.max(1e-9);
    if score.is_finite() {
        score.min(1.0)
    } else {
        FAILED_FIT_SEED
    }
}
