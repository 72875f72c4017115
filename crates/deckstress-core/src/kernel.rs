//! Exact combinatorial probability.
//!
//! All arithmetic is integer: binomial coefficients are `u128`, and each
//! probability is a single exact ratio rounded half-up to six decimals.

use thiserror::Error;

use crate::model::Probability;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// A caller violated a precondition. This is a contract bug, not user input.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
    #[error("internal error: inexact division computing comb({n}, {k}) at step {step}")]
    Inexact { n: i64, k: i64, step: i64 },
    #[error("internal error: integer overflow computing {context}")]
    Overflow { context: String },
}

impl KernelError {
    pub const fn code(&self) -> &'static str {
        match self {
            KernelError::InvalidInput(_) => "INVALID_INPUT",
            KernelError::Inexact { .. } | KernelError::Overflow { .. } => "INTERNAL_ERROR",
        }
    }
}

/// Binomial coefficient `n choose k`.
///
/// Uses the multiplicative expansion over the smaller of `k` and `n - k`; the
/// running product after step `i` is `C(n - k + i, i)`, so division by `i` is
/// always exact.
pub fn comb(n: i64, k: i64) -> Result<u128, KernelError> {
    if n < 0 || k < 0 {
        return Err(KernelError::InvalidInput(format!(
            "comb requires non-negative arguments, got n={n}, k={k}"
        )));
    }
    if k > n {
        return Err(KernelError::InvalidInput(format!(
            "comb requires k <= n, got n={n}, k={k}"
        )));
    }

    let k_small = k.min(n - k);
    let mut acc: u128 = 1;
    for step in 1..=k_small {
        let factor = (n - k_small + step) as u128;
        let product = acc.checked_mul(factor).ok_or_else(|| KernelError::Overflow {
            context: format!("comb({n}, {k})"),
        })?;
        let divisor = step as u128;
        if product % divisor != 0 {
            return Err(KernelError::Inexact { n, k, step });
        }
        acc = product / divisor;
    }
    Ok(acc)
}

/// Probability of at least `min_hits` successes when drawing `draws` cards
/// without replacement from `population` cards of which `successes` succeed.
pub fn hypergeom_p_ge_x(
    population: i64,
    successes: i64,
    draws: i64,
    min_hits: i64,
) -> Result<Probability, KernelError> {
    if population < 0 || successes < 0 || draws < 0 || min_hits < 0 {
        return Err(KernelError::InvalidInput(format!(
            "hypergeometric arguments must be non-negative, got N={population}, K={successes}, n={draws}, x={min_hits}"
        )));
    }
    if successes > population || draws > population {
        return Err(KernelError::InvalidInput(format!(
            "hypergeometric requires K <= N and n <= N, got N={population}, K={successes}, n={draws}"
        )));
    }
    if min_hits > draws {
        return Err(KernelError::InvalidInput(format!(
            "hypergeometric requires x <= n, got n={draws}, x={min_hits}"
        )));
    }

    if min_hits == 0 {
        return Ok(Probability::ONE);
    }
    let max_hits = successes.min(draws);
    if min_hits > max_hits {
        return Ok(Probability::ZERO);
    }

    let failures = population - successes;
    let denominator = comb(population, draws)?;
    let mut numerator: u128 = 0;
    for hits in min_hits..=max_hits {
        let misses = draws - hits;
        if misses > failures {
            continue;
        }
        let term = comb(successes, hits)?
            .checked_mul(comb(failures, misses)?)
            .and_then(|term| numerator.checked_add(term))
            .ok_or_else(|| KernelError::Overflow {
                context: format!("hypergeometric numerator for N={population}, K={successes}, n={draws}"),
            })?;
        numerator = term;
    }

    Probability::from_ratio(numerator, denominator).ok_or_else(|| KernelError::Overflow {
        context: format!("probability rounding for N={population}, K={successes}, n={draws}"),
    })
}

/// Probability of drawing at least one success. Zero draws never hit.
pub fn hypergeom_p_ge_1(population: i64, successes: i64, draws: i64) -> Result<Probability, KernelError> {
    if draws == 0 {
        hypergeom_p_ge_x(population, successes, 0, 0)?;
        return Ok(Probability::ZERO);
    }
    hypergeom_p_ge_x(population, successes, draws, 1)
}

/// Seam over the exact kernel so the stress pipeline can be driven without it.
pub trait ProbabilityKernel {
    fn p_ge_1(&self, population: i64, successes: i64, draws: i64) -> Result<Probability, KernelError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactKernel;

impl ProbabilityKernel for ExactKernel {
    fn p_ge_1(&self, population: i64, successes: i64, draws: i64) -> Result<Probability, KernelError> {
        hypergeom_p_ge_1(population, successes, draws)
    }
}
