// probtest-stats/src/normal.rs
// ============================================================================
// Module: Standard Normal Quantile
// Description: Inverse CDF (probit function) for the standard normal distribution.
// Purpose: Provide `z = Φ⁻¹(p)` for Wilson score bounds and sample-size derivation.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Wilson score bounds and the confidence-first sample-size formula both need
//! the standard normal quantile function `Φ⁻¹`. There is no closed form, so
//! this module uses Peter Acklam's rational approximation, relative error
//! below 1.15e-9 across `(0, 1)` by construction, which is more than
//! sufficient for statistically-qualified test verdicts, and — being a
//! fixed, coefficient-driven computation — is bit-exact and deterministic
//! across runs.

// ============================================================================
// SECTION: Rational Approximation Coefficients
// ============================================================================

/// Numerator coefficients for the central region rational approximation.
const A: [f64; 6] = [
    -39.696_830_286_653_76,
    220.946_098_424_520_5,
    -275.928_510_446_968_7,
    138.357_751_867_269,
    -30.664_798_066_147_16,
    2.506_628_277_459_239,
];

/// Denominator coefficients for the central region rational approximation.
const B: [f64; 5] = [
    -54.476_098_798_224_06,
    161.585_836_858_040_9,
    -155.698_979_859_886_6,
    66.801_311_887_719_72,
    -13.280_681_552_885_72,
];

/// Numerator coefficients for the tail region rational approximation.
const C: [f64; 6] = [
    -0.007_784_894_002_430_293,
    -0.322_396_458_041_136_5,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];

/// Denominator coefficients for the tail region rational approximation.
const D: [f64; 4] = [
    0.007_784_695_709_041_462,
    0.322_467_129_070_039_8,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];

/// Lower region boundary for the piecewise approximation.
const P_LOW: f64 = 0.024_25;
/// Upper region boundary for the piecewise approximation (`1 - P_LOW`).
const P_HIGH: f64 = 1.0 - P_LOW;

// ============================================================================
// SECTION: Inverse CDF
// ============================================================================

/// Computes `z = Φ⁻¹(p)`, the standard normal quantile function.
///
/// Returns `None` when `p` is outside the open interval `(0, 1)`.
#[must_use]
pub fn inverse_cdf(p: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }

    let z = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        rational(&C, q) / poly_denominator(&D, q)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        q * rational(&A, r) / poly_denominator(&B, r)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -rational(&C, q) / poly_denominator(&D, q)
    };

    Some(z)
}

/// Evaluates a numerator polynomial in Horner form.
fn rational(coeffs: &[f64; 6], x: f64) -> f64 {
    let mut acc = coeffs[0];
    for &c in &coeffs[1..] {
        acc = acc.mul_add(x, c);
    }
    acc
}

/// Evaluates a denominator polynomial `(...(x*d0+d1)...+dn)+1` in Horner
/// form, implicitly appending the trailing `+1` term.
fn poly_denominator(coeffs: &[f64], x: f64) -> f64 {
    let mut acc = coeffs[0];
    for &c in &coeffs[1..] {
        acc = acc.mul_add(x, c);
    }
    acc.mul_add(x, 1.0)
}
