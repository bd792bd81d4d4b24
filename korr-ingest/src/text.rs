use crate::error::IngestError;
use crate::record::RecordBuilder;
use crate::source::{AlertBuffer, AlertSource};
use chrono::Datelike;
use korr_core::flow::FlowKey;
use korr_core::Alert;
use korr_stream::StreamTracker;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct State {
    file: Option<File>,
    partial_line: String,
    pending: Option<RecordBuilder>,
}

/// Tails a Snort-style text alert log (spec.md §4.2), reopening the file
/// if it does not exist yet and seeking to its current end on first open
/// so only alerts written after startup are ingested.
pub struct TextTailSource {
    path: PathBuf,
    tracker: Option<Arc<StreamTracker>>,
    buffer: AlertBuffer,
    state: Mutex<State>,
}

impl TextTailSource {
    pub fn new(path: impl Into<PathBuf>, tracker: Option<Arc<StreamTracker>>) -> Result<Self, IngestError> {
        let path = path.into();
        let file = Self::open_and_seek_to_end(&path)?;
        Ok(Self {
            path,
            tracker,
            buffer: AlertBuffer::new(),
            state: Mutex::new(State {
                file,
                partial_line: String::new(),
                pending: None,
            }),
        })
    }

    fn open_and_seek_to_end(path: &Path) -> Result<Option<File>, IngestError> {
        match File::open(path) {
            Ok(mut file) => {
                file.seek(SeekFrom::End(0)).map_err(|source| IngestError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Ok(Some(file))
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IngestError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn attach_flow(&self, alert: &mut Alert) {
        let Some(tracker) = &self.tracker else { return };
        if !alert.is_tcp() {
            return;
        }
        let Some(dst_port) = alert.dst_port() else { return };
        let key = FlowKey::new(alert.ip.src, dst_port);
        if tracker.lookup(&key).is_some() {
            tracker.mark_observed(&key);
            alert.flow = Some(key);
        }
    }

    fn finalize_pending(&self, state: &mut State) -> bool {
        match state.pending.take() {
            Some(builder) => {
                let year = chrono::Local::now().year();
                let mut alert = builder.finish(year);
                self.attach_flow(&mut alert);
                self.buffer.push(alert);
                true
            }
            None => false,
        }
    }
}

impl AlertSource for TextTailSource {
    fn poll(&self) -> Result<usize, IngestError> {
        let mut state = self.state.lock().unwrap();
        if state.file.is_none() {
            state.file = Self::open_and_seek_to_end(&self.path)?;
        }
        let Some(file) = state.file.as_mut() else {
            return Ok(0);
        };

        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(|source| IngestError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        if raw.is_empty() {
            return Ok(0);
        }

        state.partial_line.push_str(&String::from_utf8_lossy(&raw));
        let mut lines: Vec<String> = state.partial_line.split('\n').map(String::from).collect();
        state.partial_line = lines.pop().unwrap_or_default();

        let mut produced = 0;
        for line in &lines {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                if self.finalize_pending(&mut state) {
                    produced += 1;
                }
                continue;
            }
            if state.pending.is_none() {
                match RecordBuilder::start(line) {
                    Ok(builder) => state.pending = Some(builder),
                    Err(_) => tracing::warn!(line, "line does not open a new alert record, skipping"),
                }
            } else if let Some(builder) = state.pending.as_mut() {
                builder.feed(line);
            }
        }
        Ok(produced)
    }

    fn list(&self) -> Vec<Alert> {
        self.buffer.drain_sorted()
    }
}
