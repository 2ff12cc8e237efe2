use crate::error::FplError;

/// Margin the Over/Under markets are assumed to carry
pub const BOOKMAKER_MARGIN: f64 = 0.05;

/// Odds further than this many standard deviations from the mean are dropped
const OUTLIER_STD_DEVS: f64 = 3.0;

/// Convert fractional odds ("5/2", "11 / 4", "EVS") to decimal odds
pub fn parse_fractional_odds(text: &str) -> Result<f64, FplError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.eq_ignore_ascii_case("evs") || cleaned.eq_ignore_ascii_case("evens") {
        return Ok(2.0);
    }

    let (num, den) = cleaned
        .split_once('/')
        .ok_or_else(|| FplError::InvalidOdds(text.to_string()))?;
    let num: f64 = num
        .parse()
        .map_err(|_| FplError::InvalidOdds(text.to_string()))?;
    let den: f64 = den
        .parse()
        .map_err(|_| FplError::InvalidOdds(text.to_string()))?;

    if den <= 0.0 || num < 0.0 {
        return Err(FplError::InvalidOdds(text.to_string()));
    }

    Ok(num / den + 1.0)
}

/// Drop bookmaker odds that sit more than three sample standard deviations from
/// the mean. Rows with two or fewer prices are returned untouched.
pub fn filter_outliers(odds: &[f64]) -> Vec<f64> {
    if odds.len() <= 2 {
        return odds.to_vec();
    }

    let n = odds.len() as f64;
    let mean = odds.iter().sum::<f64>() / n;
    let variance = odds.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    odds.iter()
        .copied()
        .filter(|o| (o - mean).abs() <= OUTLIER_STD_DEVS * std_dev)
        .collect()
}

pub fn average_odds(odds: &[f64]) -> Option<f64> {
    if odds.is_empty() {
        None
    } else {
        Some(odds.iter().sum::<f64>() / odds.len() as f64)
    }
}

/// Probability implied by the average of the given decimal odds, after inflating
/// the price by `margin`. No odds (or zero odds) means zero probability.
pub fn implied_probability(odds: &[f64], margin: f64) -> f64 {
    match average_odds(odds) {
        Some(avg) if avg > 0.0 => {
            let fair_odds = avg / (1.0 - margin);
            1.0 / fair_odds
        }
        _ => 0.0,
    }
}

/// Cumulative distribution function of Normal(mean, std_dev)
pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Approximation of the error function using Abramowitz and Stegun formula
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fractional_odds() {
        assert!((parse_fractional_odds("5/2").unwrap() - 3.5).abs() < 1e-9);
        assert!((parse_fractional_odds("11 / 4").unwrap() - 3.75).abs() < 1e-9);
        assert!((parse_fractional_odds("1/5").unwrap() - 1.2).abs() < 1e-9);
        assert!((parse_fractional_odds("EVS").unwrap() - 2.0).abs() < 1e-9);
        assert!(parse_fractional_odds("SP").is_err());
        assert!(parse_fractional_odds("3/0").is_err());
        assert!(parse_fractional_odds("").is_err());
    }

    #[test]
    fn test_filter_outliers() {
        // Short rows are kept as they are
        assert_eq!(filter_outliers(&[2.0, 50.0]), vec![2.0, 50.0]);

        let mut odds = vec![3.0; 12];
        odds.push(40.0);
        let filtered = filter_outliers(&odds);
        assert_eq!(filtered.len(), 12);
        assert!(filtered.iter().all(|o| *o == 3.0));

        let tight = vec![2.5, 2.6, 2.75, 2.4];
        assert_eq!(filter_outliers(&tight), tight);
    }

    #[test]
    fn test_implied_probability() {
        assert!((implied_probability(&[2.0, 2.0], 0.0) - 0.5).abs() < 1e-9);
        // 4.0 / 0.95 -> probability 0.2375
        assert!((implied_probability(&[4.0], BOOKMAKER_MARGIN) - 0.2375).abs() < 1e-9);
        assert_eq!(implied_probability(&[], BOOKMAKER_MARGIN), 0.0);
        assert_eq!(average_odds(&[]), None);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0, 0.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96, 0.0, 1.0) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(10.0, 8.0, 4.0) - 0.6915).abs() < 1e-3);
        assert!(normal_cdf(-5.0, 0.0, 1.0) < 1e-5);
    }
}
