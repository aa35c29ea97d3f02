//! Line protocol encoding.

use influxdb_line_protocol::LineProtocolBuilder;
use runstats::{FieldValue, Point};

/// Encode one point as a single line-protocol line.
///
/// Fields are written in name order. Non-finite floats and empty tag values
/// cannot be represented and are skipped. Returns `None` when no field
/// survives, since a line without fields is invalid.
pub fn encode_point(point: &Point) -> Option<Vec<u8>> {
    let fields: Vec<(&str, FieldValue)> = point
        .fields
        .iter()
        .filter(|(_, value)| is_representable(value))
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    let ((first_name, first_value), rest) = fields.split_first()?;

    let mut builder = LineProtocolBuilder::new().measurement(&point.measurement);
    for (key, value) in &point.tags {
        if !key.is_empty() && !value.is_empty() {
            builder = builder.tag(key, value);
        }
    }

    let mut line = match *first_value {
        FieldValue::Unsigned(u) => builder.field(first_name, u),
        FieldValue::Integer(i) => builder.field(first_name, i),
        FieldValue::Float(f) => builder.field(first_name, f),
    };
    for (name, value) in rest {
        line = match *value {
            FieldValue::Unsigned(u) => line.field(name, u),
            FieldValue::Integer(i) => line.field(name, i),
            FieldValue::Float(f) => line.field(name, f),
        };
    }

    Some(line.timestamp(point.timestamp_nanos()).close_line().build())
}

fn is_representable(value: &FieldValue) -> bool {
    match value {
        FieldValue::Float(f) => f.is_finite(),
        _ => true,
    }
}
