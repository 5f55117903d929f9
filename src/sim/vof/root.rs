/// Outcome of a bracketed root search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSearch {
    pub x: f64,
    /// `f(x)`, the true residual (not the Illinois-scaled one).
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Finds `x` in `[lo, hi]` with `|f(x)| <= tol` for a continuous,
/// non-decreasing `f` with `f(lo) <= 0 <= f(hi)`.
///
/// Illinois variant of regula falsi; whenever the secant point leaves the
/// open bracket or the bracket shrinks too slowly, the step falls back to
/// bisection. `f_lo` and `f_hi` are the known endpoint values. Without
/// convergence the endpoint with the smaller residual is returned.
pub fn illinois<F>(
    f: F,
    (lo, f_lo): (f64, f64),
    (hi, f_hi): (f64, f64),
    tol: f64,
    max_iterations: usize,
) -> RootSearch
where
    F: Fn(f64) -> f64,
{
    let done = |x, residual, iterations, converged| RootSearch {
        x,
        residual,
        iterations,
        converged,
    };
    if f_lo.abs() <= tol {
        return done(lo, f_lo, 0, true);
    }
    if f_hi.abs() <= tol {
        return done(hi, f_hi, 0, true);
    }

    let (mut a, mut b) = (lo, hi);
    // True residuals at the bracket ends, and the scaled ones used for secants
    let (mut ra, mut rb) = (f_lo, f_hi);
    let (mut fa, mut fb) = (f_lo, f_hi);
    let mut side = 0i8;
    let mut width = b - a;
    let mut iterations = 0;

    for it in 1..=max_iterations {
        iterations = it;
        let mut x = if fb != fa { (a * fb - b * fa) / (fb - fa) } else { a };
        // Bisect every third step unless the bracket halved meanwhile
        if !(x > a && x < b) || (it % 3 == 0 && (b - a) > 0.5 * width) {
            x = 0.5 * (a + b);
        }
        if it % 3 == 0 {
            width = b - a;
        }

        let fx = f(x);
        if fx.abs() <= tol {
            return done(x, fx, it, true);
        }
        if fx < 0.0 {
            a = x;
            ra = fx;
            fa = fx;
            if side == -1 {
                fb *= 0.5;
            }
            side = -1;
        } else {
            b = x;
            rb = fx;
            fb = fx;
            if side == 1 {
                fa *= 0.5;
            }
            side = 1;
        }
        if b - a <= f64::EPSILON * a.abs().max(b.abs()).max(f64::MIN_POSITIVE) {
            break;
        }
    }

    if ra.abs() <= rb.abs() {
        done(a, ra, iterations, false)
    } else {
        done(b, rb, iterations, false)
    }
}
