// Dotted version numbers ("2.4.1")

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    /// Parse "2.4.1", "v2.4.1" or "2.4.1.dev"; trailing non-numeric segments are ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_start_matches('v');
        let parts: Vec<u64> = trimmed
            .split('.')
            .map_while(|segment| segment.parse::<u64>().ok())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(Self { parts })
        }
    }

    /// Pull a version out of tool banners like "Vagrant 2.4.1"
    pub fn extract(text: &str) -> Option<Self> {
        text.split_whitespace()
            .filter(|word| word.chars().next().is_some_and(|c| c.is_ascii_digit() || c == 'v'))
            .find_map(Self::parse)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        f.write_str(&text.join("."))
    }
}
