//! Batched remote facts
//!
//! Several guest facts are collected in one `vagrant ssh` round trip. Each
//! fact's command is preceded by a marker line; the combined output is split
//! back into per-fact blocks by a small line grammar:
//!
//! ```text
//! line   := marker | noise | data
//! marker := "@@vmdoctor:" key "@@"
//! noise  := ssh/motd banner lines, blank lines
//! data   := anything else, appended to the current block
//! ```

use std::collections::BTreeMap;

const MARKER_PREFIX: &str = "@@vmdoctor:";
const MARKER_SUFFIX: &str = "@@";

/// Banner lines emitted by ssh, PAM/motd or the VM tool itself
const NOISE_PREFIXES: &[&str] = &[
    "Warning: Permanently added",
    "Welcome to ",
    "Last login:",
    "mesg: ",
    " * Documentation:",
    " * Management:",
    " * Support:",
    "This system is built by the Bento project",
    "==> ",
];

/// Classification of one output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Marker(&'a str),
    Noise,
    Data(&'a str),
}

/// Key of a marker line, if `line` is one
pub fn parse_marker(line: &str) -> Option<&str> {
    let key = line
        .trim()
        .strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)?;
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Whether `line` is banner/noise output to be dropped
pub fn is_noise(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.trim().is_empty() {
        return true;
    }
    if trimmed.starts_with("Connection to ") && trimmed.ends_with(" closed.") {
        return true;
    }
    if trimmed.contains("is not a tty") {
        return true;
    }
    NOISE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
}

pub fn classify(line: &str) -> Line<'_> {
    if let Some(key) = parse_marker(line) {
        Line::Marker(key)
    } else if is_noise(line) {
        Line::Noise
    } else {
        Line::Data(line.trim_end())
    }
}

/// Per-fact output blocks
pub type FactBlocks = BTreeMap<String, Vec<String>>;

/// Split batched output into blocks keyed by marker. Data before the first marker is dropped.
pub fn parse_blocks(output: &str) -> FactBlocks {
    let mut blocks = FactBlocks::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        match classify(line) {
            Line::Marker(key) => {
                blocks.entry(key.to_string()).or_default();
                current = Some(key.to_string());
            }
            Line::Noise => {}
            Line::Data(data) => {
                if let Some(key) = &current {
                    blocks.entry(key.clone()).or_default().push(data.to_string());
                }
            }
        }
    }

    blocks
}

/// Builder for one batched remote script
#[derive(Debug, Clone, Default)]
pub struct RemoteBatch {
    facts: Vec<(String, String)>,
}

impl RemoteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fact; its command's stdout and stderr land in the block for `key`
    pub fn fact(mut self, key: impl Into<String>, command: impl Into<String>) -> Self {
        self.facts.push((key.into(), command.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.facts.iter().map(|(key, _)| key.as_str())
    }

    /// Single-line shell script emitting a marker before each fact
    pub fn script(&self) -> String {
        self.facts
            .iter()
            .map(|(key, command)| {
                format!(
                    "echo '{}{}{}'; {{ {}; }} 2>&1",
                    MARKER_PREFIX, key, MARKER_SUFFIX, command
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_marker() {
        assert_eq!(parse_marker("@@vmdoctor:disk@@"), Some("disk"));
        assert_eq!(parse_marker("  @@vmdoctor:service:redis@@\r"), Some("service:redis"));
        assert_eq!(parse_marker("@@vmdoctor:@@"), None);
        assert_eq!(parse_marker("@@vmdoctor:disk"), None);
        assert_eq!(parse_marker("disk"), None);
    }

    #[test]
    fn test_is_noise() {
        assert!(is_noise("Connection to 127.0.0.1 closed."));
        assert!(is_noise("Warning: Permanently added '[127.0.0.1]:2222' (ED25519) to the list of known hosts."));
        assert!(is_noise("Welcome to Ubuntu 22.04.3 LTS (GNU/Linux 5.15.0-88-generic x86_64)"));
        assert!(is_noise("stdin: is not a tty"));
        assert!(is_noise("mesg: ttyname failed: Inappropriate ioctl for device"));
        assert!(is_noise("   "));
        assert!(!is_noise("active"));
        assert!(!is_noise("/dev/sda1 40581564 20290782 20290782 50% /"));
    }

    #[test]
    fn test_parse_blocks_strips_banner_and_noise() {
        let output = "\
Welcome to Ubuntu 22.04.3 LTS
Last login: Mon Oct 19 10:00:00 2026 from 10.0.2.2
stray line before any marker
@@vmdoctor:disk@@
/dev/sda1 40581564 20290782 20290782 50% /
@@vmdoctor:service:redis@@
stdin: is not a tty
inactive

@@vmdoctor:empty@@
Connection to 127.0.0.1 closed.
";
        let blocks = parse_blocks(output);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks["disk"], vec!["/dev/sda1 40581564 20290782 20290782 50% /"]);
        assert_eq!(blocks["service:redis"], vec!["inactive"]);
        assert!(blocks["empty"].is_empty());
    }

    #[test]
    fn test_script_tags_every_fact() {
        let batch = RemoteBatch::new()
            .fact("disk", "df -P /")
            .fact("dns", "getent hosts example.com");

        let script = batch.script();

        assert_eq!(batch.len(), 2);
        assert_eq!(
            script,
            "echo '@@vmdoctor:disk@@'; { df -P /; } 2>&1; echo '@@vmdoctor:dns@@'; { getent hosts example.com; } 2>&1"
        );
        assert_eq!(batch.keys().collect::<Vec<_>>(), vec!["disk", "dns"]);
    }
}
