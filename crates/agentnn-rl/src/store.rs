//! Durable Q-table persistence
//!
//! One entry per line: `<task_type>|<action>=<value>`, where a team action is
//! its agent ids joined with `,`. Files are replaced atomically on save.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use agentnn_core::{DispatchError, Result};

use crate::algorithm::QTable;
use crate::state::ActionKey;

/// Separator between the task type and the action in a key
pub const KEY_DELIMITER: char = '|';

/// Separator between a key and its value
pub const VALUE_SEPARATOR: char = '=';

/// File-backed policy store
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write `table` to the store, replacing any previous snapshot.
    ///
    /// Readers observe either the old file or the complete new one.
    pub fn save<A: ActionKey>(&self, table: &QTable<A>) -> Result<()> {
        let contents = render_policy(table)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        info!(path = ?self.path, entries = table.len(), "Policy saved");
        Ok(())
    }

    /// Read the stored table. A missing file is an empty table.
    pub fn load<A: ActionKey>(&self) -> Result<QTable<A>> {
        self.load_checked(|_: &A| Ok(()))
    }

    /// Read the stored table, rejecting any action `check` refuses
    pub fn load_checked<A, F>(&self, check: F) -> Result<QTable<A>>
    where
        A: ActionKey,
        F: Fn(&A) -> std::result::Result<(), String>,
    {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = ?self.path, "No stored policy, starting with an empty table");
                return Ok(QTable::new());
            }
            Err(e) => return Err(e.into()),
        };

        let contents = String::from_utf8(bytes).map_err(|e| {
            let valid = e.utf8_error().valid_up_to();
            let line = e.as_bytes()[..valid].iter().filter(|b| **b == b'\n').count() + 1;
            DispatchError::CorruptPolicy {
                line,
                reason: format!("invalid UTF-8 at byte {valid}"),
            }
        })?;

        let table = parse_policy(&contents, check)?;
        info!(path = ?self.path, entries = table.len(), "Policy loaded");
        Ok(table)
    }
}

/// Render a table as sorted `key=value` lines
pub fn render_policy<A: ActionKey>(table: &QTable<A>) -> Result<String> {
    let mut lines = Vec::with_capacity(table.len());

    for (state, action, value) in table.iter() {
        check_component("task type", state)?;
        for agent in action.agent_ids() {
            check_component("agent id", agent)?;
        }
        let encoded = action.encode();
        if A::decode(&encoded).as_ref() != Some(action) {
            return Err(DispatchError::InvalidArgument(format!(
                "action {action:?} cannot be encoded unambiguously"
            )));
        }
        lines.push(format!("{state}{KEY_DELIMITER}{encoded}{VALUE_SEPARATOR}{value}"));
    }

    lines.sort();
    let mut contents = lines.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    Ok(contents)
}

fn check_component(kind: &str, value: &str) -> Result<()> {
    if value.contains(KEY_DELIMITER) || value.contains('\n') || value.contains('\r') {
        return Err(DispatchError::InvalidArgument(format!(
            "{kind} '{value}' contains a reserved character"
        )));
    }
    Ok(())
}

/// Parse `key=value` lines back into a table
pub fn parse_policy<A, F>(contents: &str, check: F) -> Result<QTable<A>>
where
    A: ActionKey,
    F: Fn(&A) -> std::result::Result<(), String>,
{
    let mut entries: Vec<(String, A, f64)> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = idx + 1;
        let corrupt = |reason: String| DispatchError::CorruptPolicy { line, reason };

        if raw.trim().is_empty() {
            continue;
        }

        let (key, value) = raw
            .rsplit_once(VALUE_SEPARATOR)
            .ok_or_else(|| corrupt(format!("missing '{VALUE_SEPARATOR}'")))?;
        let (state, action) = key
            .split_once(KEY_DELIMITER)
            .ok_or_else(|| corrupt(format!("missing '{KEY_DELIMITER}' in key '{key}'")))?;

        let action =
            A::decode(action).ok_or_else(|| corrupt(format!("malformed action '{action}'")))?;
        check(&action).map_err(corrupt)?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| corrupt(format!("invalid value '{value}'")))?;

        if !seen.insert((state.to_string(), action.clone())) {
            return Err(corrupt(format!("duplicate entry for '{key}'")));
        }
        entries.push((state.to_string(), action, value));
    }

    debug!(entries = entries.len(), "Parsed policy");
    Ok(QTable::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AgentId, Team};

    fn no_check<A>(_: &A) -> std::result::Result<(), String> {
        Ok(())
    }

    fn team(names: &[&str]) -> Team {
        names.iter().copied().collect()
    }

    #[test]
    fn test_render_sorted() {
        let table = QTable::from_entries([
            ("docs".to_string(), "B".to_string(), 0.5),
            ("code_review".to_string(), "A".to_string(), 0.1),
        ]);
        let rendered = render_policy(&table).unwrap();
        assert_eq!(rendered, "code_review|A=0.1\ndocs|B=0.5\n");
    }

    #[test]
    fn test_render_team_keys() {
        let table = QTable::from_entries([("docker".to_string(), team(&["a1", "a3"]), 0.8)]);
        assert_eq!(render_policy(&table).unwrap(), "docker|a1,a3=0.8\n");
    }

    #[test]
    fn test_render_empty() {
        let table: QTable<AgentId> = QTable::new();
        assert_eq!(render_policy(&table).unwrap(), "");
    }

    #[test]
    fn test_render_rejects_delimiter() {
        let table = QTable::from_entries([("a|b".to_string(), "A".to_string(), 1.0)]);
        assert!(matches!(
            render_policy(&table),
            Err(DispatchError::InvalidArgument(_))
        ));
        let table = QTable::from_entries([("s".to_string(), team(&["x,y", "z"]), 1.0)]);
        assert!(render_policy(&table).is_err());
    }

    #[test]
    fn test_parse_single() {
        let table: QTable<AgentId> =
            parse_policy("code_review|A=0.1\n\ncode_review|B=-2.5\n", no_check).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("code_review", &"B".to_string()), Some(-2.5));
    }

    #[test]
    fn test_parse_value_split_on_last_separator() {
        let table: QTable<AgentId> = parse_policy("k=v|agent=x=0.25\n", no_check).unwrap();
        assert_eq!(table.get("k=v", &"agent=x".to_string()), Some(0.25));
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let cases = [
            ("a|A=0.1\nbroken\n", 2),
            ("noDelimiter=0.3\n", 1),
            ("a|A=abc\n", 1),
            ("a|A=0.1\na|A=0.2\n", 2),
        ];
        for (contents, expected_line) in cases {
            match parse_policy::<AgentId, _>(contents, no_check) {
                Err(DispatchError::CorruptPolicy { line, .. }) => {
                    assert_eq!(line, expected_line, "{contents:?}");
                }
                other => panic!("expected corrupt policy for {contents:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_check_rejects() {
        let result = parse_policy::<Team, _>("x|a,b,c=1\n", |t: &Team| {
            if t.len() == 2 {
                Ok(())
            } else {
                Err("wrong size".to_string())
            }
        });
        assert!(matches!(
            result,
            Err(DispatchError::CorruptPolicy { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join("absent.policy"));
        assert!(!store.exists());
        let table = store.load::<AgentId>().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join("nested").join("q.policy"));
        let table = QTable::from_entries([
            ("code_review".to_string(), "A".to_string(), 0.1),
            ("code_review".to_string(), "B".to_string(), 0.190_000_000_000_000_03),
            ("docs".to_string(), "C".to_string(), -1.0 / 3.0),
        ]);

        store.save(&table).unwrap();
        assert!(store.exists());
        let loaded = store.load::<AgentId>().unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join("q.policy"));

        let first = QTable::from_entries([("a".to_string(), "X".to_string(), 1.0)]);
        store.save(&first).unwrap();
        let second = QTable::from_entries([("b".to_string(), "Y".to_string(), 2.0)]);
        store.save(&second).unwrap();

        assert_eq!(store.load::<AgentId>().unwrap(), second);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join("q.policy"));
        let good = QTable::from_entries([("a".to_string(), "X".to_string(), 1.0)]);
        store.save(&good).unwrap();

        let bad = QTable::from_entries([("a|b".to_string(), "X".to_string(), 1.0)]);
        assert!(store.save(&bad).is_err());
        assert_eq!(store.load::<AgentId>().unwrap(), good);
    }

    #[test]
    fn test_empty_components_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join("q.policy"));
        let table = QTable::from_entries([
            (String::new(), "A".to_string(), 0.1),
            ("docs".to_string(), String::new(), 0.5),
        ]);

        store.save(&table).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "docs|=0.5\n|A=0.1\n");
        assert_eq!(store.load::<AgentId>().unwrap(), table);
    }

    #[test]
    fn test_empty_team_not_storable() {
        let table = QTable::from_entries([("x".to_string(), Team::new(Vec::new()), 1.0)]);
        assert!(matches!(
            render_policy(&table),
            Err(DispatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_invalid_utf8_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.policy");
        fs::write(&path, b"a|X=0.1\nb|\xC3=0.2\n").unwrap();
        let store = PolicyStore::new(&path);
        assert!(matches!(
            store.load::<AgentId>(),
            Err(DispatchError::CorruptPolicy { line: 2, .. })
        ));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.policy");
        fs::write(&path, "a|X=1.0\na|Y=").unwrap();
        let store = PolicyStore::new(&path);
        assert!(matches!(
            store.load::<AgentId>(),
            Err(DispatchError::CorruptPolicy { line: 2, .. })
        ));
    }
}
