//! Capture boundary: scanners produce [`ScanResult`]s, the mirror stores them.
//!
//! Hardware SDKs stay outside this crate. A device integration implements
//! [`ScanProvider`] and forwards each decode to a callback; [`record_scan`]
//! turns the result into a fresh [`ScanEvent`] in the mirror.

use std::collections::HashMap;
use std::sync::Arc;

use crate::mirror::LocalMirror;
use crate::models::ScanEvent;
use crate::{Error, Result};

pub const CAMERA_SOURCE: &str = "camera";
pub const RFID_SOURCE: &str = "rfid";
pub const ENTERPRISE_SOURCE: &str = "enterprise_scanner";
pub const KEYBOARD_WEDGE_SOURCE: &str = "keyboard_wedge";

pub const EPC_SYMBOLOGY: &str = "epc";
pub const UNKNOWN_SYMBOLOGY: &str = "unknown";

const ENTERPRISE_DATA_KEYS: [&str; 2] = ["com.symbol.datawedge.data_string", "data_string"];
const ENTERPRISE_LABEL_KEYS: [&str; 2] = ["com.symbol.datawedge.label_type", "label_type"];

/// One decode from any capture channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub symbology: String,
    pub raw_value: String,
    pub source_type: String,
}

impl ScanResult {
    /// Normalize a decode. Blank symbology reads as `unknown`; a blank raw
    /// value is not a scan.
    pub fn new(
        symbology: impl Into<String>,
        raw_value: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Result<Self> {
        let raw_value = raw_value.into();
        if raw_value.trim().is_empty() {
            return Err(Error::InvalidInput("Scan value must not be empty".into()));
        }

        let symbology = symbology.into().trim().to_string();
        let source_type = source_type.into().trim().to_string();
        if source_type.is_empty() {
            return Err(Error::InvalidInput("Scan source must not be empty".into()));
        }

        Ok(Self {
            symbology: if symbology.is_empty() {
                UNKNOWN_SYMBOLOGY.to_string()
            } else {
                symbology
            },
            raw_value,
            source_type,
        })
    }

    /// A new unsynced event captured now.
    #[must_use]
    pub fn into_event(self) -> ScanEvent {
        ScanEvent::new(self.symbology, self.raw_value, self.source_type)
    }
}

/// Callback a provider invokes for every decode.
pub type ScanCallback = Arc<dyn Fn(ScanResult) + Send + Sync>;

/// A capture channel: camera, RFID reader, enterprise scanner, keyboard wedge.
pub trait ScanProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backing hardware or SDK is present.
    fn is_available(&self) -> bool {
        true
    }

    /// Begin delivering decodes to `on_result`.
    fn start(&self, on_result: ScanCallback) -> Result<()>;

    fn stop(&self);
}

/// Pick the first available provider, else the first one listed.
pub fn select_provider(providers: &[Box<dyn ScanProvider>]) -> Option<&dyn ScanProvider> {
    providers
        .iter()
        .find(|provider| provider.is_available())
        .or_else(|| providers.first())
        .map(|provider| provider.as_ref())
}

/// Append a capture to the mirror under a fresh client event id.
///
/// Returns the stored event.
pub fn record_scan<M: LocalMirror + ?Sized>(mirror: &M, result: ScanResult) -> Result<ScanEvent> {
    let event = result.into_event();
    mirror.add_local_scan_event(event.clone())?;
    tracing::debug!(
        symbology = %event.symbology,
        source = %event.source_type,
        "Recorded scan {}",
        event.client_event_id
    );
    Ok(event)
}

/// Decode an enterprise scanner intent payload.
///
/// Returns `None` when the payload carries no data string.
pub fn parse_enterprise_payload(payload: &HashMap<String, String>) -> Option<ScanResult> {
    let lookup = |keys: &[&str]| keys.iter().find_map(|key| payload.get(*key));

    let raw_value = lookup(&ENTERPRISE_DATA_KEYS)?;
    let label_type = lookup(&ENTERPRISE_LABEL_KEYS).map_or(UNKNOWN_SYMBOLOGY, String::as_str);

    ScanResult::new(label_type, raw_value.as_str(), ENTERPRISE_SOURCE).ok()
}

/// Build the result for an RFID tag read; the peak RSSI rides along in the raw value.
pub fn rfid_scan_result(epc: &str, peak_rssi: Option<&str>) -> Option<ScanResult> {
    let epc = epc.trim();
    if epc.is_empty() {
        return None;
    }
    let raw_value = match peak_rssi.map(str::trim).filter(|rssi| !rssi.is_empty()) {
        Some(rssi) => format!("{epc};rssi={rssi}"),
        None => epc.to_string(),
    };
    ScanResult::new(EPC_SYMBOLOGY, raw_value, RFID_SOURCE).ok()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::mirror::MemoryMirror;

    struct FakeProvider {
        name: &'static str,
        available: bool,
        running: AtomicBool,
    }

    impl FakeProvider {
        fn boxed(name: &'static str, available: bool) -> Box<dyn ScanProvider> {
            Box::new(Self {
                name,
                available,
                running: AtomicBool::new(false),
            })
        }
    }

    impl ScanProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn start(&self, on_result: ScanCallback) -> Result<()> {
            self.running.store(true, Ordering::SeqCst);
            on_result(ScanResult::new("qr", "QR-100", CAMERA_SOURCE)?);
            Ok(())
        }

        fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn selects_first_available_then_first_listed() {
        let providers = vec![
            FakeProvider::boxed("mlkit", false),
            FakeProvider::boxed("camera_fallback", true),
        ];
        assert_eq!(select_provider(&providers).unwrap().name(), "camera_fallback");

        let providers = vec![
            FakeProvider::boxed("datawedge", false),
            FakeProvider::boxed("intent_stub", false),
        ];
        assert_eq!(select_provider(&providers).unwrap().name(), "datawedge");

        assert!(select_provider(&[]).is_none());
    }

    #[test]
    fn provider_results_land_in_the_mirror() {
        let mirror = Arc::new(MemoryMirror::new());
        let provider = FakeProvider::boxed("camera", true);

        let sink = Arc::clone(&mirror);
        provider
            .start(Arc::new(move |result| {
                record_scan(sink.as_ref(), result).unwrap();
            }))
            .unwrap();
        provider.stop();

        let pending = mirror.pending_scan_events().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].raw_value, "QR-100");
        assert_eq!(pending[0].source_type, "camera");
        assert!(!pending[0].client_event_id.is_empty());
    }

    #[test]
    fn scan_result_normalizes_symbology_and_rejects_blank_values() {
        let result = ScanResult::new("  ", "A-1", "camera").unwrap();
        assert_eq!(result.symbology, "unknown");
        assert!(ScanResult::new("qr", "  ", "camera").is_err());
    }

    #[test]
    fn enterprise_payload_prefers_namespaced_keys() {
        let payload = HashMap::from([
            (
                "com.symbol.datawedge.data_string".to_string(),
                "0012345".to_string(),
            ),
            ("data_string".to_string(), "ignored".to_string()),
            ("label_type".to_string(), "LABEL-TYPE-EAN13".to_string()),
        ]);
        let result = parse_enterprise_payload(&payload).unwrap();
        assert_eq!(result.raw_value, "0012345");
        assert_eq!(result.symbology, "LABEL-TYPE-EAN13");
        assert_eq!(result.source_type, "enterprise_scanner");

        let bare = HashMap::from([("data_string".to_string(), "X".to_string())]);
        assert_eq!(parse_enterprise_payload(&bare).unwrap().symbology, "unknown");

        assert!(parse_enterprise_payload(&HashMap::new()).is_none());
    }

    #[test]
    fn rfid_raw_value_carries_rssi() {
        let result = rfid_scan_result("E200341201", Some("-52")).unwrap();
        assert_eq!(result.raw_value, "E200341201;rssi=-52");
        assert_eq!(result.symbology, "epc");
        assert_eq!(result.source_type, "rfid");

        assert_eq!(
            rfid_scan_result("E200341201", Some(" ")).unwrap().raw_value,
            "E200341201"
        );
        assert!(rfid_scan_result("", None).is_none());
    }
}
