use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Sharpness measure used to rank candidate reconstruction depths. All
/// metrics are computed on the amplitude of the refocused field; higher is
/// sharper.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMetric {
    /// Squared two-pixel differences along rows and columns.
    #[default]
    Brenner,
    /// Mean Sobel gradient magnitude.
    Sobel,
    /// Variance of the Sobel gradient magnitude.
    SobelVariance,
    /// Variance of the amplitude.
    Variance,
    /// Variance of the Laplacian, sensitive to fine dark-field structure.
    DarkFocus,
    /// Brightest amplitude relative to the mean.
    Peak,
}

impl std::fmt::Display for FocusMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brenner => write!(f, "Brenner"),
            Self::Sobel => write!(f, "Sobel"),
            Self::SobelVariance => write!(f, "Sobel variance"),
            Self::Variance => write!(f, "Variance"),
            Self::DarkFocus => write!(f, "Dark focus"),
            Self::Peak => write!(f, "Peak"),
        }
    }
}

impl std::str::FromStr for FocusMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "brenner" => Ok(Self::Brenner),
            "sobel" => Ok(Self::Sobel),
            "sobelvariance" => Ok(Self::SobelVariance),
            "variance" => Ok(Self::Variance),
            "darkfocus" => Ok(Self::DarkFocus),
            "peak" => Ok(Self::Peak),
            other => Err(format!("unknown focus metric '{other}'")),
        }
    }
}

pub fn score_with_metric(data: &Array2<f32>, metric: FocusMetric) -> f64 {
    match metric {
        FocusMetric::Brenner => brenner(data),
        FocusMetric::Sobel => sobel_mean(data),
        FocusMetric::SobelVariance => variance_of(sobel_magnitudes(data).into_iter()),
        FocusMetric::Variance => variance_of(data.iter().map(|&v| v as f64)),
        FocusMetric::DarkFocus => laplacian_variance(data),
        FocusMetric::Peak => peak_ratio(data),
    }
}

/// Brenner gradient: mean of `(I[x+2] - I[x])^2` over both axes.
pub fn brenner(data: &Array2<f32>) -> f64 {
    let (h, w) = data.dim();
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for row in 0..h {
        for col in 0..w {
            let v = data[[row, col]] as f64;
            if col + 2 < w {
                let d = data[[row, col + 2]] as f64 - v;
                sum += d * d;
                count += 1;
            }
            if row + 2 < h {
                let d = data[[row + 2, col]] as f64 - v;
                sum += d * d;
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Sobel gradient magnitude at every interior pixel.
///
///   Gx = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]
///   Gy = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]]
fn sobel_magnitudes(data: &Array2<f32>) -> Vec<f64> {
    let (h, w) = data.dim();
    if h < 3 || w < 3 {
        return Vec::new();
    }
    let p = |r: usize, c: usize| data[[r, c]] as f64;
    let mut out = Vec::with_capacity((h - 2) * (w - 2));
    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let gx = -p(row - 1, col - 1) + p(row - 1, col + 1) - 2.0 * p(row, col - 1)
                + 2.0 * p(row, col + 1)
                - p(row + 1, col - 1)
                + p(row + 1, col + 1);
            let gy = -p(row - 1, col - 1) - 2.0 * p(row - 1, col) - p(row - 1, col + 1)
                + p(row + 1, col - 1)
                + 2.0 * p(row + 1, col)
                + p(row + 1, col + 1);
            out.push((gx * gx + gy * gy).sqrt());
        }
    }
    out
}

pub fn sobel_mean(data: &Array2<f32>) -> f64 {
    let mags = sobel_magnitudes(data);
    if mags.is_empty() {
        return 0.0;
    }
    mags.iter().sum::<f64>() / mags.len() as f64
}

/// Variance of the 5-point Laplacian over interior pixels.
pub fn laplacian_variance(data: &Array2<f32>) -> f64 {
    let (h, w) = data.dim();
    if h < 3 || w < 3 {
        return 0.0;
    }
    let p = |r: usize, c: usize| data[[r, c]] as f64;
    variance_of((1..h - 1).flat_map(|row| {
        (1..w - 1).map(move |col| {
            -4.0 * p(row, col) + p(row - 1, col) + p(row + 1, col) + p(row, col - 1) + p(row, col + 1)
        })
    }))
}

fn peak_ratio(data: &Array2<f32>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let max = data.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v as f64));
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / data.len() as f64;
    if mean.abs() > 0.0 {
        max / mean
    } else {
        max
    }
}

fn variance_of(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut n = 0usize;
    for v in values {
        sum += v;
        sum_sq += v * v;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_scores_zero_for_gradient_metrics() {
        let flat = Array2::from_elem((16, 16), 0.7f32);
        for metric in [
            FocusMetric::Brenner,
            FocusMetric::Sobel,
            FocusMetric::SobelVariance,
            FocusMetric::Variance,
            FocusMetric::DarkFocus,
        ] {
            assert!(
                score_with_metric(&flat, metric).abs() < 1e-9,
                "{metric} should be zero on a flat image"
            );
        }
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("sobel-variance".parse::<FocusMetric>(), Ok(FocusMetric::SobelVariance));
        assert_eq!("DarkFocus".parse::<FocusMetric>(), Ok(FocusMetric::DarkFocus));
        assert!("laplace".parse::<FocusMetric>().is_err());
    }
}
