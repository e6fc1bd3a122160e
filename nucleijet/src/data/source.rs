//! Event ingestion.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::data::event::Event;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read events: {0}")]
    Io(#[from] io::Error),
    #[error("malformed event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that yields events one at a time.
pub trait EventSource {
    fn next_event(&mut self) -> Option<Result<Event, SourceError>>;

    /// Drains the source, stopping at the first malformed event.
    fn read_all(&mut self) -> Result<Vec<Event>, SourceError> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event() {
            events.push(event?);
        }
        Ok(events)
    }
}

/// Reads one JSON-encoded [`Event`] per line; blank lines are skipped.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    line: usize,
    buffer: String,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(JsonLinesSource::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        JsonLinesSource { reader, line: 0, buffer: String::new() }
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<Event, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let text = self.buffer.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str(text).map_err(|source| SourceError::Parse { line: self.line, source }),
                    );
                }
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
        }
    }
}

impl<R: BufRead> EventSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> Option<Result<Event, SourceError>> {
        self.next()
    }
}

/// Reads every event of a JSON-lines file.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<Event>, SourceError> {
    JsonLinesSource::open(path)?.read_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_events_and_skips_blank_lines() {
        let input = concat!(
            r#"{"collision": {"pos_z": 1.5, "sel8": true}, "tracks": [{"px": 1.0, "py": 0.0, "pz": 0.0, "sign": -1}]}"#,
            "\n\n",
            r#"{"collision": {"pos_z": -3.0, "sel8": false}}"#,
            "\n",
        );
        let events: Vec<Event> = JsonLinesSource::new(input.as_bytes()).collect::<Result<_, _>>().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tracks.len(), 1);
        assert_eq!(events[0].tracks[0].sign, -1);
        assert!(events[1].tracks.is_empty());
    }

    /// Events held in memory, as a generator would hand them over.
    struct Replay(std::vec::IntoIter<Event>);

    impl EventSource for Replay {
        fn next_event(&mut self) -> Option<Result<Event, SourceError>> {
            self.0.next().map(Ok)
        }
    }

    #[test]
    fn test_read_all_through_the_trait() {
        let events = vec![Event::default(), Event::default()];
        let mut replay = Replay(events.clone().into_iter());
        assert_eq!(replay.read_all().unwrap(), events);
        assert!(replay.next_event().is_none());

        let input = "{\"collision\": {\"pos_z\": 4.0, \"sel8\": true}}\nnot json\n{\"collision\": {\"pos_z\": 0.0, \"sel8\": true}}\n";
        let mut source: Box<dyn EventSource> = Box::new(JsonLinesSource::new(input.as_bytes()));
        assert!(matches!(source.read_all(), Err(SourceError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_reports_line_of_malformed_event() {
        let input = "{\"collision\": {\"pos_z\": 0.0, \"sel8\": true}}\nnot json\n";
        let result: Result<Vec<Event>, _> = JsonLinesSource::new(input.as_bytes()).collect();
        assert!(matches!(result, Err(SourceError::Parse { line: 2, .. })));
    }
}
