//! Parallel driver: splits the events into chunks, runs every enabled mode on
//! each chunk with its own task copy and registries, and merges the results.

use jetcore::histogram::hist::HistogramError;
use jetcore::histogram::registry::HistogramRegistry;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use thiserror::Error;

use crate::analysis::histograms::registries_for;
use crate::analysis::task::{AnalysisTask, Mode};
use crate::data::event::Event;

pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not build the thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("could not merge {registry}: {source}")]
    Merge {
        registry: String,
        #[source]
        source: HistogramError,
    },
}

pub struct Runner {
    task: AnalysisTask,
    modes: Vec<Mode>,
    num_threads: usize,
    chunk_size: usize,
}

impl Runner {
    pub fn new(task: AnalysisTask, modes: Vec<Mode>) -> Self {
        Runner { task, modes, num_threads: 0, chunk_size: DEFAULT_CHUNK_SIZE }
    }

    /// Zero lets the pool pick one thread per core.
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    /// Processes all events; the output holds one registry per registry name in use.
    ///
    /// Results depend on the seed and the chunk size, not on the number of threads.
    pub fn run(&self, events: &[Event]) -> Result<Vec<HistogramRegistry>, RunError> {
        let thread_pool = ThreadPoolBuilder::new().num_threads(self.num_threads).build()?;
        log::info!(
            "processing {} events in {} modes ({}) with seed {}",
            events.len(),
            self.modes.len(),
            self.modes.iter().map(Mode::switch_name).collect::<Vec<_>>().join(", "),
            self.task.seed()
        );

        let partials: Vec<Vec<HistogramRegistry>> = thread_pool.install(|| {
            events
                .par_chunks(self.chunk_size)
                .enumerate()
                .map(|(index, chunk)| self.process_chunk(index, chunk))
                .collect()
        });

        let mut merged = registries_for(&self.modes);
        for registry in partials.iter().flatten() {
            let Some(target) = merged.iter_mut().find(|r| r.name == registry.name) else {
                continue;
            };
            target.merge(registry).map_err(|source| RunError::Merge {
                registry: registry.name.clone(),
                source,
            })?;
        }

        for registry in &merged {
            log::info!("{}: {} histograms, {} entries", registry.name, registry.len(), registry.total_entries());
        }
        Ok(merged)
    }

    fn process_chunk(&self, index: usize, events: &[Event]) -> Vec<HistogramRegistry> {
        let mut task = self.task.fork(index);
        let mut registries = registries_for(&self.modes);

        for &mode in &self.modes {
            let Some(registry) = registries.iter_mut().find(|r| r.name == mode.registry_name()) else {
                continue;
            };
            for event in events {
                task.process(mode, event, &mut *registry);
            }
        }

        log::debug!("chunk {} done ({} events)", index, events.len());
        registries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::config::AnalysisConfig;
    use crate::calib::lookup::Calibrations;
    use crate::data::event::Collision;
    use crate::data::track::Track;
    use std::sync::Arc;

    fn events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|i| {
                let phi = 0.1 * i as f64;
                let tracks = vec![
                    Track::from_pt_eta_phi(6.0, 0.0, phi, 1),
                    Track::from_pt_eta_phi(5.0, 0.1, phi + 0.05, -1),
                ];
                Event::new(Collision::new(0.0, true), tracks, Vec::new())
            })
            .collect()
    }

    fn runner(threads: usize) -> Runner {
        let mut config = AnalysisConfig::default();
        config.seed = Some(5);
        config.events.reject_events = true;
        config.events.rejection_percentage = 40;
        config.modes.process_qc = true;
        let task = AnalysisTask::new(&config, Arc::new(Calibrations::none()));
        Runner::new(task, Mode::enabled(&config.modes)).with_threads(threads).with_chunk_size(4)
    }

    #[test]
    fn test_counts_survive_merging() {
        let merged = runner(2).run(&events(10)).unwrap();
        assert_eq!(merged.len(), 2);
        let data = merged.iter().find(|r| r.name == "registryData").unwrap();
        let rejected = data.get("number_of_rejected_events").unwrap();
        assert_eq!(rejected.content_at(&[0.5]), 10.0);
        let kept = rejected.content_at(&[1.5]);
        assert_eq!(data.get("number_of_events_data").unwrap().content_at(&[0.5]), kept);
    }

    #[test]
    fn test_thread_count_does_not_change_results() {
        let one = runner(1).run(&events(13)).unwrap();
        let four = runner(4).run(&events(13)).unwrap();
        for (a, b) in one.iter().zip(&four) {
            assert_eq!(a.name, b.name);
            for (name, histogram) in &a.histograms {
                assert_eq!(histogram.contents, b.get(name).unwrap().contents, "{}", name);
            }
        }
    }
}
