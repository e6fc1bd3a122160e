//! Named collection of histograms that analysis passes fill into.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::histogram::hist::{Histogram, HistogramError};

/// Anything that accepts fills addressed by histogram name.
pub trait HistogramSink {
    fn fill_weighted(&mut self, name: &str, values: &[f64], weight: f64);

    fn fill(&mut self, name: &str, values: &[f64]) {
        self.fill_weighted(name, values, 1.0);
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistogramRegistry {
    pub name: String,
    pub histograms: BTreeMap<String, Histogram>,
    #[serde(skip)]
    reported: BTreeSet<String>,
}

impl HistogramRegistry {
    pub fn new(name: &str) -> Self {
        HistogramRegistry {
            name: name.to_string(),
            histograms: BTreeMap::new(),
            reported: BTreeSet::new(),
        }
    }

    /// Registers a histogram under its own name, replacing any previous one.
    pub fn add(&mut self, histogram: Histogram) {
        self.histograms.insert(histogram.name.clone(), histogram);
    }

    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Histogram> {
        self.histograms.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.histograms.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Sum of entries over all histograms.
    pub fn total_entries(&self) -> u64 {
        self.histograms.values().map(|h| h.entries).sum()
    }

    /// Adds every histogram of `other`; histograms only present in `other` are copied.
    pub fn merge(&mut self, other: &HistogramRegistry) -> Result<(), HistogramError> {
        for (name, histogram) in &other.histograms {
            match self.histograms.get_mut(name) {
                Some(existing) => existing.merge(histogram)?,
                None => {
                    self.histograms.insert(name.clone(), histogram.clone());
                }
            }
        }
        Ok(())
    }
}

impl HistogramSink for HistogramRegistry {
    fn fill_weighted(&mut self, name: &str, values: &[f64], weight: f64) {
        match self.histograms.get_mut(name) {
            Some(histogram) => {
                if let Err(e) = histogram.fill(values, weight) {
                    log::warn!("{}: {}", self.name, e);
                }
            }
            None => {
                if self.reported.insert(name.to_string()) {
                    log::warn!("{}: fill to undeclared histogram {}", self.name, name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::axis::Axis;

    fn registry() -> HistogramRegistry {
        let mut registry = HistogramRegistry::new("test");
        registry.add(Histogram::new_1d("pt", "", Axis::new(10, 0.0, 10.0, "pt")));
        registry
    }

    #[test]
    fn test_fill_known_and_unknown() {
        let mut r = registry();
        r.fill("pt", &[2.5]);
        r.fill_weighted("pt", &[2.5], 0.5);
        r.fill("missing", &[1.0]);
        assert_eq!(r.get("pt").unwrap().content_at(&[2.5]), 1.5);
        assert!(!r.contains("missing"));
        assert_eq!(r.total_entries(), 2);
    }

    #[test]
    fn test_merge_registries() {
        let mut a = registry();
        let mut b = registry();
        b.add(Histogram::new_1d("eta", "", Axis::new(4, -1.0, 1.0, "eta")));
        a.fill("pt", &[1.0]);
        b.fill("pt", &[1.0]);
        b.fill("eta", &[0.1]);
        a.merge(&b).unwrap();
        assert_eq!(a.get("pt").unwrap().content_at(&[1.0]), 2.0);
        assert_eq!(a.get("eta").unwrap().entries, 1);
    }
}
