//! Banded dynamic time warping and nearest-template command recognition.

use log::{debug, warn};

use crate::matrix::Features;
use crate::UNKNOWN_COMMAND;

/// Enrolled reference utterances, kept in insertion order.
///
/// Order matters: on equal distances the earliest command/reference wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateLibrary {
    entries: Vec<(String, Vec<Features>)>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reference; a new label goes to the end of the command order
    pub fn insert(&mut self, command: impl Into<String>, reference: Features) {
        let command = command.into();
        match self.entries.iter_mut().find(|(label, _)| *label == command) {
            Some((_, references)) => references.push(reference),
            None => self.entries.push((command, vec![reference])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Features])> + '_ {
        self.entries
            .iter()
            .map(|(label, references)| (label.as_str(), references.as_slice()))
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reference_count(&self) -> usize {
        self.entries.iter().map(|(_, refs)| refs.len()).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, Features)> for TemplateLibrary {
    fn from_iter<I: IntoIterator<Item = (S, Features)>>(iter: I) -> Self {
        let mut library = Self::new();
        for (command, reference) in iter {
            library.insert(command, reference);
        }
        library
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub command: String,
    pub distance: f64,
}

impl Recognition {
    fn unmatched() -> Self {
        Self {
            command: UNKNOWN_COMMAND.to_string(),
            distance: f64::INFINITY,
        }
    }

    pub fn is_match(&self) -> bool {
        self.distance.is_finite()
    }
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// DTW distance restricted to a Sakoe-Chiba band.
///
/// `band = None` leaves the alignment unconstrained. The band is widened to
/// at least `|n - m|` so the end cell is always reachable; cells outside the
/// band stay at infinity. Rows are compared by Euclidean distance and must
/// share the same dimension.
pub fn dtw_distance(x: &Features, y: &Features, band: Option<usize>) -> f64 {
    let n = x.n_frames();
    let m = y.n_frames();
    debug_assert!(n == 0 || m == 0 || x.dim() == y.dim());

    let band = band.unwrap_or(n.max(m)).max(n.abs_diff(m));
    let width = m + 1;
    let mut cost = vec![f64::INFINITY; (n + 1) * width];
    cost[0] = 0.0;

    for i in 1..=n {
        let j_start = i.saturating_sub(band).max(1);
        let j_end = (i + band).min(m);
        let xi = x.row(i - 1);
        for j in j_start..=j_end {
            let best_prev = cost[(i - 1) * width + j]
                .min(cost[i * width + j - 1])
                .min(cost[(i - 1) * width + j - 1]);
            cost[i * width + j] = euclidean(xi, y.row(j - 1)) + best_prev;
        }
    }

    cost[n * width + m]
}

/// Nearest template by DTW distance.
///
/// Only a strictly smaller distance replaces the current best, so ties keep
/// the earliest command in library order. An empty library (or one where no
/// reference is usable) yields `UNKNOWN_COMMAND` at infinite distance.
pub fn recognize(
    features: &Features,
    templates: &TemplateLibrary,
    band: Option<usize>,
) -> Recognition {
    let mut best = Recognition::unmatched();

    for (command, references) in templates.iter() {
        for (index, reference) in references.iter().enumerate() {
            let comparable =
                features.is_empty() || reference.is_empty() || reference.dim() == features.dim();
            if !comparable {
                warn!(
                    "skipping template {}[{}]: dim {} != {}",
                    command,
                    index,
                    reference.dim(),
                    features.dim()
                );
                continue;
            }
            let distance = dtw_distance(features, reference, band);
            if distance < best.distance {
                best.distance = distance;
                best.command = command.to_string();
            }
        }
    }

    debug!("recognized {} at distance {:.3}", best.command, best.distance);
    best
}
