//! Reading records and resolver options from the command line.

use reconcile_protocol::{ConflictCopyRule, Record};
use std::fs;
use std::path::Path;

/// A `--preserve` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRuleArg {
    /// Record type to preserve.
    pub record_type: String,
    /// How to build its conflict copies.
    pub rule: ConflictCopyRule,
}

/// Parses `TYPE:CONTENT_FIELD[:IDENTITY_FIELD]`.
pub fn parse_copy_rule(arg: &str) -> Result<CopyRuleArg, String> {
    let parts: Vec<&str> = arg.split(':').collect();
    let (record_type, content, identity) = match parts.as_slice() {
        [record_type, content] => (*record_type, *content, None),
        [record_type, content, identity] => (*record_type, *content, Some(*identity)),
        _ => {
            return Err(format!(
                "expected TYPE:CONTENT_FIELD[:IDENTITY_FIELD], got {arg:?}"
            ))
        }
    };

    if record_type.is_empty() || content.is_empty() || identity.is_some_and(str::is_empty) {
        return Err(format!("empty component in {arg:?}"));
    }

    let mut rule = ConflictCopyRule::new(content);
    if let Some(identity) = identity {
        rule = rule.with_identity_field(identity);
    }

    Ok(CopyRuleArg {
        record_type: record_type.to_string(),
        rule,
    })
}

/// Reads one record from a JSON file.
pub fn read_record(path: &Path) -> Result<Record, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let record = serde_json::from_str(&text)
        .map_err(|e| format!("invalid record in {}: {e}", path.display()))?;
    Ok(record)
}

/// Reads a JSON array of records.
pub fn read_records(path: &Path) -> Result<Vec<Record>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let records = serde_json::from_str(&text)
        .map_err(|e| format!("invalid records in {}: {e}", path.display()))?;
    Ok(records)
}
