//! The host table: the shared, read-only-after-startup description of every
//! process in the deployment. Replaces the teacher's TOML-based
//! `configurations.rs` (see DESIGN.md) with a parser for the plain-text
//! format spec.md §6 actually specifies.

use std::fs;
use std::str::FromStr;

use crate::error::ConfigError;

/// A host table entry's kind: a consensus participant or a client.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HostKind {
    Con,
    Cli,
}

impl FromStr for HostKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "con" => Ok(HostKind::Con),
            "cli" => Ok(HostKind::Cli),
            _ => Err(()),
        }
    }
}

/// One line of the host table. `uid` is this entry's index into the table,
/// which doubles as its UID (spec.md §3).
#[derive(Debug, Clone)]
pub struct HostEntry {
    pub uid: usize,
    pub host: String,
    pub port: u16,
    pub kind: HostKind,
}

/// The full, read-only host table shared by every process in a run.
#[derive(Debug, Clone)]
pub struct HostTable {
    pub entries: Vec<HostEntry>,
    pub num_proposers: usize,
    pub num_acceptors: usize,
    pub num_learners: usize,
}

impl HostTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, uid: usize) -> &HostEntry {
        &self.entries[uid]
    }

    /// Consensus nodes, in ascending UID order.
    pub fn con_nodes(&self) -> Vec<&HostEntry> {
        self.entries.iter().filter(|e| e.kind == HostKind::Con).collect()
    }

    /// Client nodes, in ascending UID order.
    pub fn cli_nodes(&self) -> Vec<&HostEntry> {
        self.entries.iter().filter(|e| e.kind == HostKind::Cli).collect()
    }
}

/// Parses a host table file in the format from spec.md §6:
///
/// ```text
/// proposers N
/// acceptors N
/// learners N
/// host port kind
/// host port kind
/// ...
/// ```
///
/// where `kind` is `con` or `cli`, and the UID of each `host port kind` line
/// is its index among those lines (0-based).
pub fn parse_host_table(path: &str) -> Result<HostTable, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;

    let mut lines = contents.lines().enumerate();

    let num_proposers = parse_header_line(&mut lines, "proposers")?;
    let num_acceptors = parse_header_line(&mut lines, "acceptors")?;
    let num_learners = parse_header_line(&mut lines, "learners")?;

    let mut entries = Vec::new();
    for (line_no, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ConfigError::BadHostLine {
                line: line_no + 1,
                found: line.to_string(),
            });
        }

        let port = fields[1].parse().map_err(|_| ConfigError::BadPort {
            line: line_no + 1,
            found: fields[1].to_string(),
        })?;

        let kind = fields[2].parse().map_err(|_| ConfigError::BadKind {
            line: line_no + 1,
            found: fields[2].to_string(),
        })?;

        entries.push(HostEntry {
            uid: entries.len(),
            host: fields[0].to_string(),
            port,
            kind,
        });
    }

    Ok(HostTable {
        entries,
        num_proposers,
        num_acceptors,
        num_learners,
    })
}

fn parse_header_line<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    expected: &'static str,
) -> Result<usize, ConfigError> {
    let (line_no, line) = lines.next().ok_or(ConfigError::BadHeader {
        line: 0,
        expected,
        found: String::new(),
    })?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 || fields[0] != expected {
        return Err(ConfigError::BadHeader {
            line: line_no + 1,
            expected,
            found: line.to_string(),
        });
    }

    fields[1].parse().map_err(|_| ConfigError::BadCount {
        line: line_no + 1,
        found: fields[1].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> String {
        let path = std::env::temp_dir().join(format!(
            "paxos-ring-hosts-{}-{}.txt",
            std::process::id(),
            contents.len()
        ));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn parses_a_well_formed_table() {
        let path = write_temp(
            "proposers 1\n\
             acceptors 3\n\
             learners 1\n\
             127.0.0.1 9000 con\n\
             127.0.0.1 9001 con\n\
             127.0.0.1 9002 con\n\
             127.0.0.1 9003 con\n\
             127.0.0.1 9004 con\n\
             127.0.0.1 9005 cli\n",
        );

        let table = parse_host_table(&path).unwrap();
        assert_eq!(table.num_proposers, 1);
        assert_eq!(table.num_acceptors, 3);
        assert_eq!(table.num_learners, 1);
        assert_eq!(table.len(), 6);
        assert_eq!(table.con_nodes().len(), 5);
        assert_eq!(table.cli_nodes().len(), 1);
        assert_eq!(table.get(5).kind, HostKind::Cli);
        assert_eq!(table.get(0).uid, 0);
        assert_eq!(table.get(5).uid, 5);
    }

    #[test]
    fn rejects_bad_header() {
        let path = write_temp("not-a-header\n");
        assert!(matches!(
            parse_host_table(&path),
            Err(ConfigError::BadHeader { .. })
        ));
    }

    #[test]
    fn rejects_bad_kind() {
        let path = write_temp(
            "proposers 0\nacceptors 0\nlearners 0\n127.0.0.1 9000 bogus\n",
        );
        assert!(matches!(
            parse_host_table(&path),
            Err(ConfigError::BadKind { .. })
        ));
    }

    #[test]
    fn skips_trailing_blank_lines() {
        let path = write_temp(
            "proposers 0\nacceptors 0\nlearners 0\n127.0.0.1 9000 con\n\n\n",
        );
        let table = parse_host_table(&path).unwrap();
        assert_eq!(table.len(), 1);
    }
}
