//! Hive-style partition directory names
//!
//! Partitioned outputs are laid out as `key=value/key=value/file`. Values
//! are escaped so that they always form a single path component.

use std::path::Path;

use smallvec::SmallVec;

/// Directory name used for a null partition value
pub const NULL_PARTITION_VALUE: &str = "NULL";

/// Partition columns recovered from a path, in directory order
pub type PartitionValues = SmallVec<[(String, Option<String>); 4]>;

fn needs_escape(c: char) -> bool {
    matches!(c, '/' | '\\' | '=' | '%' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Escape a partition value for use in a directory name
#[must_use]
pub fn escape_partition_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("%{byte:02X}"));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Reverse [`escape_partition_value`]
///
/// Malformed escapes are kept verbatim.
#[must_use]
pub fn unescape_partition_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = [bytes[i + 1], bytes[i + 2]];
            if let Some(byte) = std::str::from_utf8(&hex)
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Directory name for one partition column
#[must_use]
pub fn partition_dir_name(column: &str, value: Option<&str>) -> String {
    format!(
        "{}={}",
        escape_partition_value(column),
        value.map_or_else(|| NULL_PARTITION_VALUE.to_string(), escape_partition_value)
    )
}

/// Extract `key=value` components from the directories of a file path
#[must_use]
pub fn partition_values(path: &Path) -> PartitionValues {
    let Some(parent) = path.parent() else {
        return PartitionValues::new();
    };

    parent
        .components()
        .filter_map(|component| {
            let component = component.as_os_str().to_str()?;
            let (key, value) = component.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            let value = (value != NULL_PARTITION_VALUE).then(|| unescape_partition_value(value));
            Some((unescape_partition_value(key), value))
        })
        .collect()
}
