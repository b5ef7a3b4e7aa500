/// Wire message models for the node's datagram schemas
///
/// Two outbound encodings of the same averaged reading: the self-describing
/// probe report sent to the primary destination, and the fixed-schema
/// rendezvous datagram consumed by the secondary protocol. The rendezvous
/// schema also carries the startup handshake (synchronize/acknowledge).
use serde::{Deserialize, Serialize};

use crate::models::{AveragedWindow, Diagnostics};
use crate::utils::round2;

// Rendezvous protocol constants
pub const RP_VERSION: &str = "1.1";
pub const EVENT_SYNCHRONIZE: &str = "synchronize";
pub const EVENT_ACKNOWLEDGE: &str = "acknowledge";
pub const EVENT_TEMPERATURE: &str = "temperature";
pub const TEMPERATURE_CHANNEL: u8 = 1;
pub const META_TYPE_CELSIUS: &str = "C";

// Scale label for the self-describing report
pub const SCALE_CELSIUS: &str = "C";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub readings: Vec<ReadingRecord>,
    #[serde(rename = "systemInformation")]
    pub system_information: SystemInformation,
    #[serde(
        rename = "debugData",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub debug_data: Option<DebugData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub reading: f64,
    pub scale: String,
    pub probe_name: String,
    pub probe_type: u32,
    pub probe_sub_type: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInformation {
    #[serde(rename = "VCC")]
    pub vcc: f64,
}

/// Accumulator internals, attached to the report only when debug is enabled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugData {
    pub min_internal: f64,
    pub max_internal: f64,
    pub rolled_over: bool,
    pub position: usize,
    pub buffer: Vec<f64>,
    pub capacity: usize,
    pub read_errors: u32,
}

impl From<&Diagnostics> for DebugData {
    fn from(diagnostics: &Diagnostics) -> Self {
        DebugData {
            min_internal: diagnostics.min_internal,
            max_internal: diagnostics.max_internal,
            rolled_over: diagnostics.rolled_over,
            position: diagnostics.position,
            buffer: diagnostics.buffer.clone(),
            capacity: diagnostics.capacity,
            read_errors: diagnostics.read_errors,
        }
    }
}

impl ProbeReport {
    /// Build the self-describing report for an averaged window
    pub fn from_window(
        window: &AveragedWindow,
        probe_name: &str,
        probe_type: u32,
        probe_sub_type: u32,
        include_debug: bool,
    ) -> Self {
        ProbeReport {
            readings: vec![ReadingRecord {
                reading: round2(window.average),
                scale: SCALE_CELSIUS.to_string(),
                probe_name: probe_name.to_string(),
                probe_type,
                probe_sub_type,
            }],
            system_information: SystemInformation {
                vcc: window.supply_voltage,
            },
            debug_data: include_debug.then(|| DebugData::from(&window.diagnostics)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendezvousMessage {
    #[serde(rename = "RPVersion")]
    pub version: String,
    #[serde(rename = "RPSerial")]
    pub serial: String,
    #[serde(rename = "RPEpoch")]
    pub epoch: u64,
    #[serde(rename = "RPPayload")]
    pub payload: Vec<RendezvousEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendezvousEvent {
    #[serde(
        rename = "RPChannel",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub channel: Option<u8>,
    #[serde(rename = "RPEventType")]
    pub event_type: String,
    #[serde(rename = "RPValue", skip_serializing_if = "Option::is_none", default)]
    pub value: Option<f64>,
    #[serde(
        rename = "RPMetaType",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub meta_type: Option<String>,
}

impl RendezvousMessage {
    /// Handshake synchronize message; the event record carries only its kind
    pub fn synchronize(serial: &str, epoch: u64) -> Self {
        RendezvousMessage {
            version: RP_VERSION.to_string(),
            serial: serial.to_string(),
            epoch,
            payload: vec![RendezvousEvent {
                channel: None,
                event_type: EVENT_SYNCHRONIZE.to_string(),
                value: None,
                meta_type: None,
            }],
        }
    }

    /// Single-channel temperature event record for an averaged reading
    pub fn temperature(serial: &str, epoch: u64, value: f64) -> Self {
        RendezvousMessage {
            version: RP_VERSION.to_string(),
            serial: serial.to_string(),
            epoch,
            payload: vec![RendezvousEvent {
                channel: Some(TEMPERATURE_CHANNEL),
                event_type: EVENT_TEMPERATURE.to_string(),
                value: Some(round2(value)),
                meta_type: Some(META_TYPE_CELSIUS.to_string()),
            }],
        }
    }

    pub fn is_acknowledge(&self) -> bool {
        self.payload
            .first()
            .map(|event| event.event_type == EVENT_ACKNOWLEDGE)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> AveragedWindow {
        AveragedWindow {
            average: 22.004,
            samples: 3,
            supply_voltage: 3.3,
            diagnostics: Diagnostics {
                min_internal: 21.0,
                max_internal: 26.0,
                rolled_over: false,
                position: 3,
                buffer: vec![20.0, 22.0, 24.0, 0.0],
                capacity: 4,
                read_errors: 1,
            },
        }
    }

    #[test]
    fn probe_report_uses_exact_field_names() {
        let report = ProbeReport::from_window(&window(), "smoker-pit", 2, 4, false);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["readings"][0]["reading"], 22.0);
        assert_eq!(value["readings"][0]["scale"], "C");
        assert_eq!(value["readings"][0]["probeName"], "smoker-pit");
        assert_eq!(value["readings"][0]["probeType"], 2);
        assert_eq!(value["readings"][0]["probeSubType"], 4);
        assert_eq!(value["systemInformation"]["VCC"], 3.3);
        assert!(value.get("debugData").is_none());
    }

    #[test]
    fn debug_data_is_attached_only_on_request() {
        let report = ProbeReport::from_window(&window(), "smoker-pit", 2, 4, true);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["debugData"]["minInternal"], 21.0);
        assert_eq!(value["debugData"]["maxInternal"], 26.0);
        assert_eq!(value["debugData"]["rolledOver"], false);
        assert_eq!(value["debugData"]["position"], 3);
        assert_eq!(value["debugData"]["capacity"], 4);
        assert_eq!(value["debugData"]["readErrors"], 1);
        assert_eq!(
            value["debugData"]["buffer"],
            serde_json::json!([20.0, 22.0, 24.0, 0.0])
        );
    }

    #[test]
    fn synchronize_message_carries_only_the_event_kind() {
        let message = RendezvousMessage::synchronize("probe-01", 0);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["RPVersion"], RP_VERSION);
        assert_eq!(value["RPSerial"], "probe-01");
        assert_eq!(value["RPEpoch"], 0);
        assert_eq!(value["RPPayload"][0]["RPEventType"], EVENT_SYNCHRONIZE);
        assert!(value["RPPayload"][0].get("RPChannel").is_none());
        assert!(value["RPPayload"][0].get("RPValue").is_none());
        assert!(value["RPPayload"][0].get("RPMetaType").is_none());
    }

    #[test]
    fn temperature_message_is_a_full_event_record() {
        let message = RendezvousMessage::temperature("probe-01", 9, 104.267);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["RPEpoch"], 9);
        assert_eq!(value["RPPayload"][0]["RPChannel"], 1);
        assert_eq!(value["RPPayload"][0]["RPEventType"], EVENT_TEMPERATURE);
        assert_eq!(value["RPPayload"][0]["RPValue"], 104.27);
        assert_eq!(value["RPPayload"][0]["RPMetaType"], "C");
    }

    #[test]
    fn acknowledge_detection_matches_the_event_kind_only() {
        let ack: RendezvousMessage = serde_json::from_str(
            r#"{"RPVersion":"1.1","RPSerial":"hub","RPEpoch":7,"RPPayload":[{"RPEventType":"acknowledge"}]}"#,
        )
        .unwrap();
        assert!(ack.is_acknowledge());

        let sync = RendezvousMessage::synchronize("hub", 0);
        assert!(!sync.is_acknowledge());

        let empty: RendezvousMessage = serde_json::from_str(
            r#"{"RPVersion":"1.1","RPSerial":"hub","RPEpoch":7,"RPPayload":[]}"#,
        )
        .unwrap();
        assert!(!empty.is_acknowledge());
    }
}
