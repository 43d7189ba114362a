use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a peer's listener can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub ip: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)
        } else {
            write!(f, "{}:{}", self.ip, self.port)
        }
    }
}

/// One peer's sharing state as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub owner: String,
    pub paths: Vec<String>,
    pub address: PeerAddress,
}

impl FileRecord {
    pub fn new(owner: impl Into<String>, address: PeerAddress) -> Self {
        Self {
            owner: owner.into(),
            paths: Vec::new(),
            address,
        }
    }

    /// Appends paths not already present, keeping first-insertion order.
    pub fn merge<I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.paths.len();
        for path in paths {
            if !self.paths.contains(&path) {
                self.paths.push(path);
            }
        }
        self.paths.len() - before
    }

    pub fn remove(&mut self, paths: &[String]) -> usize {
        let before = self.paths.len();
        self.paths.retain(|p| !paths.contains(p));
        before - self.paths.len()
    }

    pub fn shares(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(PeerAddress::new("127.0.0.1", 4040).to_string(), "127.0.0.1:4040");
        assert_eq!(PeerAddress::new("::1", 4040).to_string(), "[::1]:4040");
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut record = FileRecord::new("alice", PeerAddress::new("127.0.0.1", 4040));
        assert_eq!(record.merge(vec!["/a".to_string(), "/b".to_string()]), 2);
        assert_eq!(record.merge(vec!["/b".to_string(), "/c".to_string(), "/a".to_string()]), 1);
        assert_eq!(record.paths, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_remove_reports_count() {
        let mut record = FileRecord::new("alice", PeerAddress::new("127.0.0.1", 4040));
        record.merge(vec!["/a".to_string(), "/b".to_string()]);
        assert_eq!(record.remove(&["/a".to_string(), "/zzz".to_string()]), 1);
        assert!(!record.shares("/a"));
        assert!(record.shares("/b"));
    }
}
