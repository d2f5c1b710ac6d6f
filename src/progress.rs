//! Package-manager progress relay
//!
//! The package manager client reports downloads in bytes and repository
//! metadata parsing as a fraction, through separate start/update/finish
//! callbacks. [`ProgressRelay`] turns all of them into one [`ProgressEvent`]
//! shape and hands each event to a single user callback.
//!
//! # Start suppression
//!
//! Each `(kind, name)` pair moves `Idle -> Started -> Progressing* -> Finished
//! -> Idle`. A second start for a pair that is already started is dropped
//! until its finish arrives. Metadata parsing is keyed only by file name,
//! and the same file name comes back for every shard of a repository.
//!
//! # Download to parse handoff
//!
//! Parse callbacks do not say which file they are about. When a download
//! finishes, its name is handed to the parse tracker, and subsequent parse
//! events are reported under that name.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use strum::{Display, EnumString};
use tracing::debug;

/// What is being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProgressKind {
    Download,
    MetadataParsing,
}

/// Operation tag of an event, e.g. `download-start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    DownloadStart,
    Download,
    DownloadFinish,
    MetadataParsingStart,
    MetadataParsing,
    MetadataParsingFinish,
}

impl Operation {
    pub const fn start(kind: ProgressKind) -> Self {
        match kind {
            ProgressKind::Download => Self::DownloadStart,
            ProgressKind::MetadataParsing => Self::MetadataParsingStart,
        }
    }

    pub const fn progress(kind: ProgressKind) -> Self {
        match kind {
            ProgressKind::Download => Self::Download,
            ProgressKind::MetadataParsing => Self::MetadataParsing,
        }
    }

    pub const fn finish(kind: ProgressKind) -> Self {
        match kind {
            ProgressKind::Download => Self::DownloadFinish,
            ProgressKind::MetadataParsing => Self::MetadataParsingFinish,
        }
    }

    pub const fn kind(self) -> ProgressKind {
        match self {
            Self::DownloadStart | Self::Download | Self::DownloadFinish => ProgressKind::Download,
            Self::MetadataParsingStart | Self::MetadataParsing | Self::MetadataParsingFinish => {
                ProgressKind::MetadataParsing
            }
        }
    }
}

/// Normalized progress message delivered to the user callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub operation: Operation,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    /// Empty when the source did not report one.
    pub url: String,
    pub total_pkgs: usize,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent {
            Some(p) => write!(f, "{} {} {}%", self.operation, self.package, p),
            None => write!(f, "{} {}", self.operation, self.package),
        }
    }
}

/// Percentage of `read` out of `total`. A zero total is 0%, not an error.
pub fn percent(read: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (u128::from(read) * 100) / u128::from(total);
    pct.min(100) as u8
}

/// Percentage of a 0.0..=1.0 fraction. NaN and negatives are 0%.
pub fn fraction_percent(fraction: f64) -> u8 {
    if fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    (fraction * 100.0).min(100.0) as u8
}

/// Receives every relayed event.
pub type ProgressCallback = Box<dyn FnMut(&ProgressEvent)>;

/// Correlates parse callbacks with the last downloaded file.
#[derive(Debug, Default)]
struct ParseTracker {
    file: Option<String>,
    url: String,
}

impl ParseTracker {
    fn hand_off(&mut self, file: &str) {
        self.file = Some(file.to_string());
    }

    fn name(&self) -> String {
        self.file.clone().unwrap_or_else(|| self.url.clone())
    }
}

/// Adapts download/parse callbacks to [`ProgressEvent`]s.
pub struct ProgressRelay {
    callback: ProgressCallback,
    in_progress: HashSet<(ProgressKind, String)>,
    parse: ParseTracker,
    total_pkgs: usize,
}

impl ProgressRelay {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback,
            in_progress: HashSet::new(),
            parse: ParseTracker::default(),
            total_pkgs: 0,
        }
    }

    /// Total package count stamped on every event.
    pub fn set_total_packages(&mut self, total: usize) {
        self.total_pkgs = total;
    }

    pub fn is_in_progress(&self, kind: ProgressKind, name: &str) -> bool {
        self.in_progress.contains(&(kind, name.to_string()))
    }

    /// A download begins. Returns false when the start was suppressed.
    pub fn download_start(&mut self, name: &str, url: &str) -> bool {
        self.start(ProgressKind::Download, name, url)
    }

    pub fn download_update(&mut self, name: &str, url: &str, read_bytes: u64, total_bytes: u64) {
        self.emit(
            Operation::Download,
            name,
            Some(percent(read_bytes, total_bytes)),
            url,
        );
    }

    /// A download ended; its name becomes the file for following parse events.
    pub fn download_finish(&mut self, name: &str, url: &str) {
        self.finish(ProgressKind::Download, name, url);
        self.parse.hand_off(name);
    }

    /// Metadata parsing begins. Returns false when the start was suppressed.
    pub fn metadata_start(&mut self, url: &str) -> bool {
        self.parse.url = url.to_string();
        let name = self.parse.name();
        self.start(ProgressKind::MetadataParsing, &name, url)
    }

    pub fn metadata_update(&mut self, fraction: f64) {
        let name = self.parse.name();
        let url = self.parse.url.clone();
        self.emit(
            Operation::MetadataParsing,
            &name,
            Some(fraction_percent(fraction)),
            &url,
        );
    }

    pub fn metadata_finish(&mut self) {
        let name = self.parse.name();
        let url = self.parse.url.clone();
        self.finish(ProgressKind::MetadataParsing, &name, &url);
    }

    fn start(&mut self, kind: ProgressKind, name: &str, url: &str) -> bool {
        if !self.in_progress.insert((kind, name.to_string())) {
            debug!(%kind, package = name, "suppressing duplicate start");
            return false;
        }
        // Sources rarely know a fraction yet; start is always 0%
        self.emit(Operation::start(kind), name, Some(0), url);
        true
    }

    fn finish(&mut self, kind: ProgressKind, name: &str, url: &str) {
        self.in_progress.remove(&(kind, name.to_string()));
        self.emit(Operation::finish(kind), name, None, url);
    }

    fn emit(&mut self, operation: Operation, name: &str, percent: Option<u8>, url: &str) {
        let event = ProgressEvent {
            operation,
            package: name.to_string(),
            percent,
            url: url.to_string(),
            total_pkgs: self.total_pkgs,
        };
        (self.callback)(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_relay() -> (ProgressRelay, Rc<RefCell<Vec<ProgressEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let relay = ProgressRelay::new(Box::new(move |e: &ProgressEvent| {
            sink.borrow_mut().push(e.clone());
        }));
        (relay, events)
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(50, 0), 0);
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(300, 200), 100);
        assert_eq!(percent(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn test_fraction_percent() {
        assert_eq!(fraction_percent(f64::NAN), 0);
        assert_eq!(fraction_percent(-0.5), 0);
        assert_eq!(fraction_percent(0.42), 42);
        assert_eq!(fraction_percent(7.0), 100);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::DownloadStart.to_string(), "download-start");
        assert_eq!(
            Operation::MetadataParsingFinish.to_string(),
            "metadata-parsing-finish"
        );
        assert_eq!(Operation::start(ProgressKind::MetadataParsing).kind(), ProgressKind::MetadataParsing);
    }

    #[test]
    fn test_download_lifecycle() {
        let (mut relay, events) = recording_relay();
        relay.set_total_packages(3);

        assert!(relay.download_start("bash.rpm", "http://repo/bash.rpm"));
        assert!(!relay.download_start("bash.rpm", "http://repo/bash.rpm"));
        relay.download_update("bash.rpm", "http://repo/bash.rpm", 512, 1024);
        relay.download_finish("bash.rpm", "http://repo/bash.rpm");
        assert!(!relay.is_in_progress(ProgressKind::Download, "bash.rpm"));

        let events = events.borrow();
        let ops: Vec<Operation> = events.iter().map(|e| e.operation).collect();
        assert_eq!(
            ops,
            vec![Operation::DownloadStart, Operation::Download, Operation::DownloadFinish]
        );
        assert_eq!(events[0].percent, Some(0));
        assert_eq!(events[1].percent, Some(50));
        assert_eq!(events[2].percent, None);
        assert!(events.iter().all(|e| e.total_pkgs == 3));
    }

    #[test]
    fn test_parse_events_use_handed_off_file() {
        let (mut relay, events) = recording_relay();

        relay.metadata_start("http://repo/a");
        relay.metadata_finish();
        relay.download_start("primary.xml.gz", "http://repo/repodata/primary.xml.gz");
        relay.download_finish("primary.xml.gz", "http://repo/repodata/primary.xml.gz");
        relay.metadata_start("http://repo/repodata");
        relay.metadata_update(0.5);
        // Second shard of the same file
        assert!(!relay.metadata_start("http://repo/repodata"));
        relay.metadata_finish();

        let events = events.borrow();
        assert_eq!(events[0].package, "http://repo/a");
        let parse: Vec<&ProgressEvent> = events
            .iter()
            .skip(2)
            .filter(|e| e.operation.kind() == ProgressKind::MetadataParsing)
            .collect();
        assert_eq!(parse.len(), 3);
        assert!(parse.iter().all(|e| e.package == "primary.xml.gz"));
        assert_eq!(parse[1].percent, Some(50));
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent {
            operation: Operation::MetadataParsing,
            package: "filelists.xml.gz".to_string(),
            percent: Some(10),
            url: "http://repo".to_string(),
            total_pkgs: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "operation": "metadata-parsing",
                "package": "filelists.xml.gz",
                "percent": 10,
                "url": "http://repo",
                "total_pkgs": 0
            })
        );

        let finish = ProgressEvent { percent: None, ..event };
        let json = serde_json::to_value(&finish).unwrap();
        assert!(json.get("percent").is_none());
    }
}
