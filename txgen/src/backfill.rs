//! Pre-recorded actions replayed ahead of the generated stream.

use std::io::BufRead;
use std::path::Path;

use forge_types::{Command, RecordedAction};

use crate::TxgenError;

/// Parse JSON Lines of `[command, args]`. Blank lines are skipped; line
/// numbers in errors are 1-based.
pub fn parse_backfill(reader: impl BufRead) -> Result<Vec<RecordedAction>, TxgenError> {
    let mut actions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let action: RecordedAction =
            serde_json::from_str(&line).map_err(|e| TxgenError::InvalidBackfill {
                line: index + 1,
                reason: e.to_string(),
            })?;
        if action.command == Command::WaitBlocks && recorded_wait(&action).is_none() {
            return Err(TxgenError::InvalidBackfill {
                line: index + 1,
                reason: "wait_blocks without a positive count".into(),
            });
        }
        actions.push(action);
    }
    Ok(actions)
}

pub fn load_backfill(path: impl AsRef<Path>) -> Result<Vec<RecordedAction>, TxgenError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let actions = parse_backfill(std::io::BufReader::new(file))?;
    tracing::info!(path = %path.display(), actions = actions.len(), "loaded backfill");
    Ok(actions)
}

/// Block count of a recorded `wait_blocks`.
pub fn recorded_wait(action: &RecordedAction) -> Option<u64> {
    if action.command != Command::WaitBlocks {
        return None;
    }
    action
        .args
        .get("count")
        .and_then(serde_json::Value::as_u64)
        .filter(|count| *count > 0)
}
