use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use assetra_core::capture::{
    record_scan, ScanCallback, ScanProvider, ScanResult, KEYBOARD_WEDGE_SOURCE,
};
use assetra_core::LocalMirror;
use parking_lot::Mutex;

use crate::commands::common::open_mirror;
use crate::error::CliError;

/// Keyboard wedge scanners type each decode followed by Enter.
///
/// `start` reads lines until EOF or `stop`, one scan per non-blank line.
pub struct KeyboardWedgeProvider<R> {
    reader: Mutex<Option<R>>,
    symbology: String,
    source_type: String,
    stopped: AtomicBool,
}

impl<R: BufRead + Send> KeyboardWedgeProvider<R> {
    pub fn new(reader: R, symbology: &str, source_type: &str) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            symbology: symbology.to_string(),
            source_type: source_type.to_string(),
            stopped: AtomicBool::new(false),
        }
    }
}

impl<R: BufRead + Send> ScanProvider for KeyboardWedgeProvider<R> {
    fn name(&self) -> &str {
        "keyboard-wedge"
    }

    fn start(&self, on_result: ScanCallback) -> assetra_core::Result<()> {
        let Some(reader) = self.reader.lock().take() else {
            return Ok(());
        };

        for line in reader.lines() {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            let line = line?;
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            match ScanResult::new(self.symbology.as_str(), value, self.source_type.as_str()) {
                Ok(result) => on_result(result),
                Err(error) => tracing::warn!("Skipping scan line: {}", error),
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub fn run_scan(
    raw_value: Option<&str>,
    from_stdin: bool,
    symbology: Option<&str>,
    source: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let symbology = symbology.unwrap_or_default();
    let source = source.unwrap_or(KEYBOARD_WEDGE_SOURCE);
    let mirror = open_mirror(db_path)?;

    if from_stdin {
        let provider = KeyboardWedgeProvider::new(BufReader::new(io::stdin()), symbology, source);
        let recorded = capture_from_provider(&provider, &mirror)?;
        if recorded.is_empty() {
            return Err(CliError::NoScansRead);
        }
        for id in &recorded {
            println!("{id}");
        }
        return Ok(());
    }

    let raw_value = raw_value
        .filter(|value| !value.trim().is_empty())
        .ok_or(CliError::EmptyScanValue)?;
    let result = ScanResult::new(symbology, raw_value, source)?;
    let event = record_scan(&mirror, result)?;
    println!("{}", event.client_event_id);
    Ok(())
}

/// Run `provider` to completion, recording every decode it delivers.
///
/// Returns the new client event ids in capture order.
pub fn capture_from_provider<P, M>(provider: &P, mirror: &M) -> Result<Vec<String>, CliError>
where
    P: ScanProvider + ?Sized,
    M: LocalMirror + ?Sized,
{
    let (sender, receiver) = mpsc::channel::<ScanResult>();
    let on_result: ScanCallback = std::sync::Arc::new(move |result| {
        let _ = sender.send(result);
    });

    tracing::debug!("Reading scans from {}", provider.name());
    let started = provider.start(on_result);
    provider.stop();
    started?;

    let mut recorded = Vec::new();
    for result in receiver.try_iter() {
        recorded.push(record_scan(mirror, result)?.client_event_id);
    }
    Ok(recorded)
}
