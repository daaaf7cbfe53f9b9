//! Outbound payload encoding.

use crate::config::PayloadFormat;

/// Value sent on the alarm topic when the latch fires.
pub const ALARM_VALUE: i32 = 1;

/// Encode one integer for the weight or alarm topic.
///
/// `Plain` gives a bare decimal (`"123"`), `Json` gives `{"value":123}`.
pub fn encode_value(format: PayloadFormat, value: i32) -> String {
    match format {
        PayloadFormat::Plain => value.to_string(),
        PayloadFormat::Json => serde_json::json!({ "value": value }).to_string(),
    }
}
