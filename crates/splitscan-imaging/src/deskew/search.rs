// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded one-dimensional minimization for the angle search.
//
// The angle losses are piecewise constant at pixel scale, so gradients are
// useless below a certain stride. The search compares the loss on both sides
// of the current point at a finite step, moves (and accelerates) downhill,
// and halves the step whenever neither side improves.

/// Limits and step schedule of a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub lower: f64,
    pub upper: f64,
    /// Initial trial distance either side of the current point.
    pub step: f64,
    /// Converged once the trial distance falls below this.
    pub tolerance: f64,
    /// Cap on trial rounds; running out means no convergence.
    pub max_iterations: u32,
}

/// Where the search ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub x: f64,
    pub value: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// Minimize `f` over `[options.lower, options.upper]` starting from `start`.
///
/// Non-finite values of `f` are treated as `+inf`.
pub fn minimize_bounded<F>(f: F, start: f64, options: &SearchOptions) -> SearchOutcome
where
    F: Fn(f64) -> f64,
{
    let clamp = |x: f64| x.clamp(options.lower, options.upper);
    let eval = |x: f64| {
        let v = f(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    let mut x = clamp(if start.is_finite() { start } else { 0.0 });
    let mut value = eval(x);
    let mut step = options.step;
    let mut iterations = 0;

    while step >= options.tolerance {
        if iterations >= options.max_iterations {
            return SearchOutcome {
                x,
                value,
                iterations,
                converged: false,
            };
        }
        iterations += 1;

        let below = clamp(x - step);
        let above = clamp(x + step);
        let (f_below, f_above) = (eval(below), eval(above));
        let (candidate, f_candidate, direction) = if f_above <= f_below {
            (above, f_above, 1.0)
        } else {
            (below, f_below, -1.0)
        };

        if f_candidate < value {
            x = candidate;
            value = f_candidate;
            // Keep going the same way with a doubling stride while it pays.
            let mut stride = 2.0 * step;
            loop {
                let next = clamp(x + direction * stride);
                if next == x {
                    break;
                }
                let f_next = eval(next);
                if f_next >= value {
                    break;
                }
                x = next;
                value = f_next;
                stride *= 2.0;
            }
        } else {
            step /= 2.0;
        }
    }

    SearchOutcome {
        x,
        value,
        iterations,
        converged: true,
    }
}
