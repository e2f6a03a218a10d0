//! Automatic histogram threshold selection.
//!
//! The algorithms follow the classic ImageJ auto-threshold family. Each one
//! maps a histogram to a bin index; voxels above that bin are foreground.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{Result, SegmentationError};
use crate::histogram::Histogram;

const MAX_ITERATIONS: usize = 10_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum AutoThresholdMethod {
    /// IsoData variant that ignores the two edge bins.
    #[default]
    Default,
    Huang,
    Intermodes,
    IsoData,
    Li,
    MaxEntropy,
    Mean,
    #[strum(to_string = "MinError", serialize = "MinError(I)")]
    #[serde(alias = "MinError(I)")]
    MinError,
    Minimum,
    Moments,
    Otsu,
    Percentile,
    RenyiEntropy,
    Shanbhag,
    Triangle,
    Yen,
}

impl AutoThresholdMethod {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "threshold",
            name: name.to_string(),
        })
    }

    /// Pick the threshold bin for `histogram`.
    ///
    /// # Errors
    /// `EmptyHistogram` when no voxel is counted, `ThresholdNotFound` when
    /// the method cannot decide (for example a histogram that never turns
    /// bimodal under smoothing).
    pub fn select(self, histogram: &Histogram) -> Result<usize> {
        if histogram.total() == 0 {
            return Err(SegmentationError::EmptyHistogram);
        }
        let data: Vec<f64> = histogram.counts().iter().map(|&c| c as f64).collect();

        let bin = match self {
            AutoThresholdMethod::Default => ij_isodata(&data),
            AutoThresholdMethod::Huang => huang(&data),
            AutoThresholdMethod::Intermodes => intermodes(&data),
            AutoThresholdMethod::IsoData => isodata(&data),
            AutoThresholdMethod::Li => li(&data),
            AutoThresholdMethod::MaxEntropy => max_entropy(&data),
            AutoThresholdMethod::Mean => mean(&data),
            AutoThresholdMethod::MinError => min_error(&data),
            AutoThresholdMethod::Minimum => minimum(&data),
            AutoThresholdMethod::Moments => moments(&data),
            AutoThresholdMethod::Otsu => otsu(&data),
            AutoThresholdMethod::Percentile => percentile(&data),
            AutoThresholdMethod::RenyiEntropy => renyi_entropy(&data),
            AutoThresholdMethod::Shanbhag => shanbhag(&data),
            AutoThresholdMethod::Triangle => triangle(&data),
            AutoThresholdMethod::Yen => yen(&data),
        };

        bin.filter(|&b| b < data.len())
            .ok_or(SegmentationError::ThresholdNotFound { method: self })
    }
}

/// Free-function form of [`AutoThresholdMethod::select`].
pub fn select_threshold(method: AutoThresholdMethod, histogram: &Histogram) -> Result<usize> {
    method.select(histogram)
}

fn total(data: &[f64]) -> f64 {
    data.iter().sum()
}

fn normalized(data: &[f64]) -> Vec<f64> {
    let sum = total(data);
    data.iter().map(|&v| v / sum).collect()
}

fn ij_isodata(data: &[f64]) -> Option<usize> {
    let mut data = data.to_vec();
    let last = data.len() - 1;
    data[0] = 0.0;
    data[last] = 0.0;

    let mut min = 0;
    while data[min] == 0.0 && min < last {
        min += 1;
    }
    let mut max = last;
    while data[max] == 0.0 && max > 0 {
        max -= 1;
    }
    if min >= max {
        return Some(data.len() / 2);
    }

    let mut moving = min;
    let mut result;
    loop {
        let (mut sum1, mut sum2, mut sum3, mut sum4) = (0.0, 0.0, 0.0, 0.0);
        for (i, &v) in data.iter().enumerate().take(moving + 1).skip(min) {
            sum1 += i as f64 * v;
            sum2 += v;
        }
        for (i, &v) in data.iter().enumerate().take(max + 1).skip(moving + 1) {
            sum3 += i as f64 * v;
            sum4 += v;
        }
        result = (sum1 / sum2 + sum3 / sum4) / 2.0;
        moving += 1;
        if !((moving + 1) as f64 <= result && moving + 1 < max) {
            break;
        }
    }
    Some(result.round() as usize)
}

fn isodata(data: &[f64]) -> Option<usize> {
    let len = data.len();
    let mut g = data.iter().skip(1).position(|&v| v > 0.0).map_or(0, |i| i + 2);

    loop {
        let (mut low, mut low_total) = (0.0, 0.0);
        for (i, &v) in data.iter().enumerate().take(g + 1) {
            low_total += v;
            low += v * i as f64;
        }
        let (mut high, mut high_total) = (0.0, 0.0);
        for (i, &v) in data.iter().enumerate().skip(g + 1) {
            high_total += v;
            high += v * i as f64;
        }
        if low_total > 0.0 && high_total > 0.0 {
            low /= low_total;
            high /= high_total;
            if g == ((low + high) / 2.0).round() as usize {
                return Some(g);
            }
        }
        g += 1;
        if g + 2 > len {
            return None;
        }
    }
}

fn mean(data: &[f64]) -> Option<usize> {
    let weighted: f64 = data.iter().enumerate().map(|(i, &v)| i as f64 * v).sum();
    Some((weighted / total(data)).floor() as usize)
}

/// Between-class variance over the interior bins. Ties go to the higher bin,
/// so a histogram with a single populated bin still yields the last interior bin.
fn otsu(data: &[f64]) -> Option<usize> {
    let len = data.len();
    if len < 3 {
        return None;
    }
    let count = total(data);
    let weighted: f64 = data.iter().enumerate().map(|(i, &v)| i as f64 * v).sum();

    let mut below = data[0];
    let mut below_sum = 0.0;
    let mut best = 0;
    let mut best_variance = 0.0;
    for (k, &v) in data.iter().enumerate().take(len - 1).skip(1) {
        below_sum += k as f64 * v;
        below += v;
        let denom = below * (count - below);
        let variance = if denom != 0.0 {
            let num = below / count * weighted - below_sum;
            num * num / denom
        } else {
            0.0
        };
        if variance >= best_variance {
            best_variance = variance;
            best = k;
        }
    }
    Some(best)
}

fn percentile(data: &[f64]) -> Option<usize> {
    let count = total(data);
    let mut best = None;
    let mut closest = 1.0;
    let mut partial = 0.0;
    for (i, &v) in data.iter().enumerate() {
        partial += v;
        let distance = (partial / count - 0.5).abs();
        if distance < closest {
            closest = distance;
            best = Some(i);
        }
    }
    best
}

fn moments(data: &[f64]) -> Option<usize> {
    let histo = normalized(data);

    let (mut m1, mut m2, mut m3) = (0.0, 0.0, 0.0);
    for (i, &p) in histo.iter().enumerate() {
        let x = i as f64;
        m1 += x * p;
        m2 += x * x * p;
        m3 += x * x * x * p;
    }
    let m0 = 1.0;

    let cd = m0 * m2 - m1 * m1;
    let c0 = (-m2 * m2 + m1 * m3) / cd;
    let c1 = (m0 * -m3 + m2 * m1) / cd;
    let z0 = 0.5 * (-c1 - (c1 * c1 - 4.0 * c0).sqrt());
    let z1 = 0.5 * (-c1 + (c1 * c1 - 4.0 * c0).sqrt());
    // Fraction of object voxels in the target binary image
    let p0 = (z1 - m1) / (z1 - z0);

    let mut sum = 0.0;
    for (i, &p) in histo.iter().enumerate() {
        sum += p;
        if sum > p0 {
            return Some(i);
        }
    }
    None
}

fn is_bimodal(y: &[f64]) -> bool {
    let mut modes = 0;
    for k in 1..y.len() - 1 {
        if y[k - 1] < y[k] && y[k + 1] < y[k] {
            modes += 1;
            if modes > 2 {
                return false;
            }
        }
    }
    modes == 2
}

/// Three-point running mean, repeated until exactly two peaks remain.
fn smooth_until_bimodal(data: &[f64]) -> Option<Vec<f64>> {
    let mut h = data.to_vec();
    let last = h.len() - 1;
    let mut iterations = 0;

    while !is_bimodal(&h) {
        let (mut current, mut next) = (0.0, h[0]);
        for i in 0..last {
            let previous = current;
            current = next;
            next = h[i + 1];
            h[i] = (previous + current + next) / 3.0;
        }
        h[last] = (current + next) / 3.0;

        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return None;
        }
    }
    Some(h)
}

fn intermodes(data: &[f64]) -> Option<usize> {
    let h = smooth_until_bimodal(data)?;
    let peaks: usize = (1..h.len() - 1)
        .filter(|&i| h[i - 1] < h[i] && h[i + 1] < h[i])
        .sum();
    Some(peaks / 2)
}

fn minimum(data: &[f64]) -> Option<usize> {
    let h = smooth_until_bimodal(data)?;
    (1..h.len() - 1).find(|&i| h[i - 1] > h[i] && h[i + 1] >= h[i])
}

fn li(data: &[f64]) -> Option<usize> {
    const TOLERANCE: f64 = 0.5;
    let count = total(data);
    let last = data.len() - 1;
    let image_mean = data.iter().enumerate().map(|(i, &v)| i as f64 * v).sum::<f64>() / count;

    let mut new_threshold = image_mean;
    for _ in 0..MAX_ITERATIONS {
        let old_threshold = new_threshold;
        let threshold = ((old_threshold + 0.5).max(0.0) as usize).min(last);

        let (mut sum_back, mut num_back) = (0.0, 0.0);
        for (i, &v) in data.iter().enumerate().take(threshold + 1) {
            sum_back += i as f64 * v;
            num_back += v;
        }
        let mean_back = if num_back == 0.0 { 0.0 } else { sum_back / num_back };

        let (mut sum_obj, mut num_obj) = (0.0, 0.0);
        for (i, &v) in data.iter().enumerate().skip(threshold + 1) {
            sum_obj += i as f64 * v;
            num_obj += v;
        }
        let mean_obj = if num_obj == 0.0 { 0.0 } else { sum_obj / num_obj };

        let temp = (mean_back - mean_obj) / (mean_back.ln() - mean_obj.ln());
        new_threshold = if temp < -f64::EPSILON {
            (temp - 0.5).trunc()
        } else {
            (temp + 0.5).trunc()
        };

        if (new_threshold - old_threshold).abs() <= TOLERANCE {
            return Some(threshold);
        }
    }
    None
}

/// Normalized histogram with its cumulative sums below (`p1`) and above (`p2`)
/// each bin, and the span of bins where both are nonzero.
struct Cumulative {
    norm: Vec<f64>,
    p1: Vec<f64>,
    p2: Vec<f64>,
    first_bin: usize,
    last_bin: usize,
}

impl Cumulative {
    fn new(data: &[f64]) -> Self {
        let len = data.len();
        let norm = normalized(data);

        let mut p1 = vec![0.0; len];
        let mut p2 = vec![0.0; len];
        p1[0] = norm[0];
        p2[0] = 1.0 - p1[0];
        for i in 1..len {
            p1[i] = p1[i - 1] + norm[i];
            p2[i] = 1.0 - p1[i];
        }

        let first_bin = (0..len).find(|&i| p1[i].abs() >= f64::EPSILON).unwrap_or(0);
        let last_bin = (first_bin..len)
            .rev()
            .find(|&i| p2[i].abs() >= f64::EPSILON)
            .unwrap_or(len - 1);

        Cumulative {
            norm,
            p1,
            p2,
            first_bin,
            last_bin,
        }
    }
}

fn max_entropy(data: &[f64]) -> Option<usize> {
    let len = data.len();
    let Cumulative {
        norm,
        p1,
        p2,
        first_bin,
        last_bin,
    } = Cumulative::new(data);

    let mut threshold = None;
    let mut max_entropy = f64::MIN;
    for it in first_bin..=last_bin {
        let mut entropy_back = 0.0;
        for i in 0..=it {
            if data[i] != 0.0 {
                let r = norm[i] / p1[it];
                entropy_back -= r * r.ln();
            }
        }
        let mut entropy_obj = 0.0;
        for i in it + 1..len {
            if data[i] != 0.0 {
                let r = norm[i] / p2[it];
                entropy_obj -= r * r.ln();
            }
        }
        let entropy = entropy_back + entropy_obj;
        if max_entropy < entropy {
            max_entropy = entropy;
            threshold = Some(it);
        }
    }
    threshold
}

/// Fuzzy-entropy minimisation (Huang & Wang).
fn huang(data: &[f64]) -> Option<usize> {
    let len = data.len();
    let first_bin = data.iter().position(|&v| v != 0.0)?;
    let last_bin = (first_bin..len).rev().find(|&i| data[i] != 0.0)?;
    if first_bin == last_bin {
        return None;
    }
    let term = 1.0 / (last_bin - first_bin) as f64;

    // Mean intensity at or below each bin, and above each bin
    let mut mu_0 = vec![0.0; len];
    let (mut sum, mut num) = (0.0, 0.0);
    for ih in first_bin..len {
        sum += ih as f64 * data[ih];
        num += data[ih];
        mu_0[ih] = sum / num;
    }
    let mut mu_1 = vec![0.0; len];
    let (mut sum, mut num) = (0.0, 0.0);
    for ih in (1..=last_bin).rev() {
        sum += ih as f64 * data[ih];
        num += data[ih];
        mu_1[ih - 1] = sum / num;
    }

    let membership_entropy = |ih: usize, mean: f64| {
        let mu = 1.0 / (1.0 + term * (ih as f64 - mean).abs());
        if !(1e-6..=0.999999).contains(&mu) {
            0.0
        } else {
            data[ih] * (-mu * mu.ln() - (1.0 - mu) * (1.0 - mu).ln())
        }
    };

    let mut threshold = None;
    let mut min_entropy = f64::MAX;
    for it in 0..len {
        let entropy: f64 = (0..=it).map(|ih| membership_entropy(ih, mu_0[it])).sum::<f64>()
            + (it + 1..len).map(|ih| membership_entropy(ih, mu_1[it])).sum::<f64>();
        if entropy < min_entropy {
            min_entropy = entropy;
            threshold = Some(it);
        }
    }
    threshold
}

/// Kittler-Illingworth minimum error, iterated from the Mean threshold.
fn min_error(data: &[f64]) -> Option<usize> {
    let len = data.len();
    // Prefix sums of counts, first and second moments
    let (mut a, mut b, mut c) = (vec![0.0; len], vec![0.0; len], vec![0.0; len]);
    let (mut sa, mut sb, mut sc) = (0.0, 0.0, 0.0);
    for (i, &v) in data.iter().enumerate() {
        let x = i as f64;
        sa += v;
        sb += x * v;
        sc += x * x * v;
        a[i] = sa;
        b[i] = sb;
        c[i] = sc;
    }
    let last = len - 1;

    let mut threshold = mean(data)?;
    for _ in 0..MAX_ITERATIONS {
        let t = threshold;
        let mu = b[t] / a[t];
        let nu = (b[last] - b[t]) / (a[last] - a[t]);
        let p = a[t] / a[last];
        let q = (a[last] - a[t]) / a[last];
        let sigma2 = c[t] / a[t] - mu * mu;
        let tau2 = (c[last] - c[t]) / (a[last] - a[t]) - nu * nu;

        let w0 = 1.0 / sigma2 - 1.0 / tau2;
        let w1 = mu / sigma2 - nu / tau2;
        let w2 = mu * mu / sigma2 - nu * nu / tau2 + ((sigma2 * q * q) / (tau2 * p * p)).log10();

        // Imaginary next threshold: keep the current one
        let sqterm = w1 * w1 - w0 * w2;
        if sqterm < 0.0 {
            return Some(t);
        }
        let next = ((w1 + sqterm.sqrt()) / w0).floor();
        if next.is_nan() {
            return Some(t);
        }
        if next < 0.0 || next >= last as f64 {
            return None;
        }
        threshold = next as usize;
        if threshold == t {
            return Some(t);
        }
    }
    None
}

/// Renyi entropies of order 0.5, 1 and 2, blended by their spread.
fn renyi_entropy(data: &[f64]) -> Option<usize> {
    let cumulative = Cumulative::new(data);
    let Cumulative { p1, p2, .. } = &cumulative;

    let order_1 = max_entropy(data).unwrap_or(0);
    let order_half = renyi_order(&cumulative, 0.5);
    let order_2 = renyi_order(&cumulative, 2.0);

    let mut t = [order_half, order_1, order_2];
    t.sort_unstable();
    let [t1, t2, t3] = t;

    let close = |a: usize, b: usize| a.abs_diff(b) <= 5;
    let (beta1, beta2, beta3) = match (close(t1, t2), close(t2, t3)) {
        (true, true) => (1.0, 2.0, 1.0),
        (true, false) => (0.0, 1.0, 3.0),
        (false, true) => (3.0, 1.0, 0.0),
        (false, false) => (1.0, 2.0, 1.0),
    };

    let omega = p1[t3] - p1[t1];
    let optimum = t1 as f64 * (p1[t1] + 0.25 * omega * beta1)
        + 0.25 * t2 as f64 * omega * beta2
        + t3 as f64 * (p2[t3] + 0.25 * omega * beta3);
    Some(optimum as usize)
}

fn renyi_order(cumulative: &Cumulative, alpha: f64) -> usize {
    let Cumulative {
        norm,
        p1,
        p2,
        first_bin,
        last_bin,
    } = cumulative;
    let term = 1.0 / (1.0 - alpha);

    let mut threshold = 0;
    let mut max_entropy = 0.0;
    for it in *first_bin..=*last_bin {
        let back: f64 = norm[..=it].iter().map(|&n| (n / p1[it]).powf(alpha)).sum();
        let obj: f64 = norm[it + 1..].iter().map(|&n| (n / p2[it]).powf(alpha)).sum();
        let product = back * obj;
        let entropy = term * if product > 0.0 { product.ln() } else { 0.0 };
        if entropy > max_entropy {
            max_entropy = entropy;
            threshold = it;
        }
    }
    threshold
}

/// Fuzzy membership entropy balance (Shanbhag).
fn shanbhag(data: &[f64]) -> Option<usize> {
    let Cumulative {
        norm,
        p1,
        p2,
        first_bin,
        last_bin,
    } = Cumulative::new(data);
    let len = data.len();

    let mut threshold = None;
    let mut min_entropy = f64::MAX;
    for it in first_bin..=last_bin {
        let term = 0.5 / p1[it];
        let back = term * -(1..=it).map(|ih| norm[ih] * (1.0 - term * p1[ih - 1]).ln()).sum::<f64>();

        let term = 0.5 / p2[it];
        let obj = term * -(it + 1..len).map(|ih| norm[ih] * (1.0 - term * p2[ih]).ln()).sum::<f64>();

        let entropy = (back - obj).abs();
        if entropy < min_entropy {
            min_entropy = entropy;
            threshold = Some(it);
        }
    }
    threshold
}

fn triangle(data: &[f64]) -> Option<usize> {
    let len = data.len();
    let mut data = data.to_vec();

    // Bin just below the first populated one
    let mut min = data.iter().position(|&v| v > 0.0).unwrap_or(0);
    min = min.saturating_sub(1);
    // Bin just above the last populated one
    let mut min2 = (1..len).rev().find(|&i| data[i] > 0.0).unwrap_or(0);
    if min2 < len - 1 {
        min2 += 1;
    }
    let mut max = 0;
    let mut peak = 0.0;
    for (i, &v) in data.iter().enumerate() {
        if v > peak {
            max = i;
            peak = v;
        }
    }

    // Work on the longer tail
    let inverted = (max as isize - min as isize) < (min2 as isize - max as isize);
    if inverted {
        data.reverse();
        min = len - 1 - min2;
        max = len - 1 - max;
    }
    let restore = |bin: usize| if inverted { len - 1 - bin } else { bin };

    if min == max {
        return Some(restore(min));
    }

    let mut nx = data[max];
    let mut ny = min as f64 - max as f64;
    let norm = (nx * nx + ny * ny).sqrt();
    nx /= norm;
    ny /= norm;
    let d = nx * min as f64 + ny * data[min];

    let mut split = min;
    let mut split_distance = 0.0;
    for (i, &v) in data.iter().enumerate().take(max + 1).skip(min + 1) {
        let distance = nx * i as f64 + ny * v - d;
        if distance > split_distance {
            split = i;
            split_distance = distance;
        }
    }

    Some(restore(split.saturating_sub(1)))
}

fn yen(data: &[f64]) -> Option<usize> {
    let len = data.len();
    let norm = normalized(data);

    let mut p1 = vec![0.0; len];
    let mut p1_sq = vec![0.0; len];
    let mut p2_sq = vec![0.0; len];
    p1[0] = norm[0];
    p1_sq[0] = norm[0] * norm[0];
    for i in 1..len {
        p1[i] = p1[i - 1] + norm[i];
        p1_sq[i] = p1_sq[i - 1] + norm[i] * norm[i];
    }
    for i in (0..len - 1).rev() {
        p2_sq[i] = p2_sq[i + 1] + norm[i + 1] * norm[i + 1];
    }

    let mut threshold = None;
    let mut max_criterion = f64::MIN;
    for it in 0..len {
        let a = p1_sq[it] * p2_sq[it];
        let b = p1[it] * (1.0 - p1[it]);
        let criterion = -(if a > 0.0 { a.ln() } else { 0.0 }) + 2.0 * if b > 0.0 { b.ln() } else { 0.0 };
        if criterion > max_criterion {
            max_criterion = criterion;
            threshold = Some(it);
        }
    }
    threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn bimodal() -> Histogram {
        let counts = (0..256)
            .map(|i| {
                let x = i as f64;
                let a = 1000.0 * (-(x - 60.0).powi(2) / (2.0 * 15.0 * 15.0)).exp();
                let b = 1000.0 * (-(x - 180.0).powi(2) / (2.0 * 15.0 * 15.0)).exp();
                (a + b).round() as u64
            })
            .collect();
        Histogram::from_counts(counts)
    }

    /// Narrow tall mode at 60, wide low mode at 170.
    fn skewed_bimodal() -> Histogram {
        let counts = (0..256)
            .map(|i| {
                let x = i as f64;
                let a = 1000.0 * (-(x - 60.0).powi(2) / (2.0 * 12.0 * 12.0)).exp();
                let b = 600.0 * (-(x - 170.0).powi(2) / (2.0 * 20.0 * 20.0)).exp();
                (a + b).round() as u64
            })
            .collect();
        Histogram::from_counts(counts)
    }

    #[test]
    fn test_methods_split_between_modes() {
        let histogram = bimodal();
        for method in [
            AutoThresholdMethod::Default,
            AutoThresholdMethod::Intermodes,
            AutoThresholdMethod::IsoData,
            AutoThresholdMethod::Li,
            AutoThresholdMethod::Mean,
            AutoThresholdMethod::Minimum,
            AutoThresholdMethod::Moments,
            AutoThresholdMethod::Otsu,
            AutoThresholdMethod::Percentile,
        ] {
            let bin = method.select(&histogram).unwrap();
            assert!(bin > 60 && bin < 180, "{method} picked {bin}");
        }
    }

    #[test]
    fn test_entropy_and_error_methods_split_skewed_modes() {
        let histogram = skewed_bimodal();
        for method in [
            AutoThresholdMethod::Huang,
            AutoThresholdMethod::MinError,
            AutoThresholdMethod::RenyiEntropy,
            AutoThresholdMethod::Shanbhag,
        ] {
            let bin = method.select(&histogram).unwrap();
            assert!(bin > 60 && bin < 170, "{method} picked {bin}");
        }
    }

    #[test]
    fn test_every_method_answers_on_bimodal() {
        let histogram = skewed_bimodal();
        for method in AutoThresholdMethod::iter() {
            assert!(method.select(&histogram).is_ok(), "{method} failed");
        }
    }

    #[test]
    fn test_intermodes_is_midpoint_of_peaks() {
        assert_eq!(AutoThresholdMethod::Intermodes.select(&bimodal()).unwrap(), 120);
    }

    #[test]
    fn test_mean_of_two_values() {
        let mut counts = vec![0u64; 256];
        counts[20] = 1;
        counts[100] = 1;
        let histogram = Histogram::from_counts(counts);
        assert_eq!(AutoThresholdMethod::Mean.select(&histogram).unwrap(), 60);
    }

    #[test]
    fn test_empty_histogram_is_an_error() {
        let histogram = Histogram::from_counts(vec![0; 256]);
        assert!(matches!(
            AutoThresholdMethod::Otsu.select(&histogram),
            Err(SegmentationError::EmptyHistogram)
        ));
    }

    #[test]
    fn test_undecidable_histogram_reports_method() {
        // No split of a single populated bin leaves voxels on both sides
        let mut counts = vec![0u64; 256];
        counts[10] = 5;
        let histogram = Histogram::from_counts(counts);

        let err = AutoThresholdMethod::IsoData.select(&histogram).unwrap_err();
        assert!(matches!(
            err,
            SegmentationError::ThresholdNotFound {
                method: AutoThresholdMethod::IsoData
            }
        ));
    }

    #[test]
    fn test_otsu_single_bin_falls_back_to_last_interior_bin() {
        let mut counts = vec![0u64; 256];
        counts[255] = 40;
        let histogram = Histogram::from_counts(counts);

        assert_eq!(AutoThresholdMethod::Otsu.select(&histogram).unwrap(), 254);
    }

    #[test]
    fn test_names_parse_and_print() {
        assert_eq!(AutoThresholdMethod::from_name("Otsu").unwrap(), AutoThresholdMethod::Otsu);
        assert_eq!(AutoThresholdMethod::MaxEntropy.to_string(), "MaxEntropy");
        assert_eq!(AutoThresholdMethod::from_name("MinError(I)").unwrap(), AutoThresholdMethod::MinError);
        assert_eq!(AutoThresholdMethod::MinError.to_string(), "MinError");
        assert_eq!(AutoThresholdMethod::iter().count(), 16);
        assert!(matches!(
            AutoThresholdMethod::from_name("Huang2"),
            Err(SegmentationError::UnknownMethod { kind: "threshold", .. })
        ));
    }

    #[test]
    fn test_select_threshold_matches_method() {
        let histogram = bimodal();
        assert_eq!(
            select_threshold(AutoThresholdMethod::Otsu, &histogram).unwrap(),
            AutoThresholdMethod::Otsu.select(&histogram).unwrap()
        );
    }
}
