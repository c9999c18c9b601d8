//! Gamma and factorial for real arguments.

use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Largest integer argument whose gamma value is finite
const MAX_EXACT_GAMMA: f64 = 171.0;

/// Gamma function. Positive integers use the exact product, everything else
/// the Lanczos approximation with reflection below 0.5.
pub fn gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z.fract() == 0.0 {
        if z <= 0.0 {
            // poles at 0, -1, -2, ...
            return f64::NAN;
        }
        if z <= MAX_EXACT_GAMMA {
            let n = z as u32;
            return (1..n).fold(1.0f64, |acc, v| acc * v as f64);
        }
        return f64::INFINITY;
    }
    lanczos_gamma(z)
}

fn lanczos_gamma(z: f64) -> f64 {
    if z < 0.5 {
        PI / ((PI * z).sin() * lanczos_gamma(1.0 - z))
    } else {
        let z = z - 1.0;
        let mut x = LANCZOS_COEFFICIENTS[0];
        for (i, p) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
            x += p / (z + i as f64);
        }
        let t = z + LANCZOS_G + 0.5;
        (2.0 * PI).sqrt() * t.powf(z + 0.5) * (-t).exp() * x
    }
}

/// `x! = gamma(x + 1)`, defined for fractional arguments too
pub fn factorial(x: f64) -> f64 {
    gamma(x + 1.0)
}
