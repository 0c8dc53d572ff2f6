use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, VordrError};

/// A DNS name held in canonical (lowercase) form.
///
/// Labels are stored leftmost first; the root name has no labels.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    /// The root name `.`
    pub fn root() -> Self {
        Name { labels: Vec::new() }
    }

    /// Parse a presentation-format name ("example.com" or "example.com.").
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut labels = Vec::new();
        let mut total = 1usize;
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(VordrError::InvalidName(s.to_string()));
            }
            if label.len() > 63 {
                return Err(VordrError::InvalidName(s.to_string()));
            }
            total += label.len() + 1;
            labels.push(label.bytes().map(|b| b.to_ascii_lowercase()).collect());
        }
        if total > 255 {
            return Err(VordrError::InvalidName(s.to_string()));
        }

        Ok(Name { labels })
    }

    /// Build a name from raw labels (already split, any case).
    pub fn from_labels(labels: Vec<Vec<u8>>) -> Self {
        let labels = labels
            .into_iter()
            .map(|l| l.iter().map(|b| b.to_ascii_lowercase()).collect())
            .collect();
        Name { labels }
    }

    /// Parse a name out of uncompressed wire format, returning the name and
    /// the number of bytes consumed.
    pub fn from_wire(data: &[u8]) -> Result<(Self, usize)> {
        let mut labels = Vec::new();
        let mut pos = 0usize;

        loop {
            let Some(&len) = data.get(pos) else {
                return Err(VordrError::MalformedRdata("name"));
            };
            pos += 1;
            if len == 0 {
                break;
            }
            // Compression pointers never appear in rdata we canonicalize
            if len > 63 {
                return Err(VordrError::MalformedRdata("name"));
            }
            let len = len as usize;
            let Some(label) = data.get(pos..pos + len) else {
                return Err(VordrError::MalformedRdata("name"));
            };
            labels.push(label.iter().map(|b| b.to_ascii_lowercase()).collect());
            pos += len;
        }

        Ok((Name { labels }, pos))
    }

    /// Wire encoding: length-prefixed lowercase labels, terminated by the
    /// root label.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        for label in &self.labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        out.push(0);
        out
    }

    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// Number of labels, not counting the root.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_wildcard(&self) -> bool {
        self.labels.first().map(|l| l.as_slice()) == Some(b"*")
    }

    /// The name with the leftmost label removed.
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            return None;
        }
        Some(Name {
            labels: self.labels[1..].to_vec(),
        })
    }

    /// Keep only the rightmost `count` labels.
    pub fn trim_to(&self, count: usize) -> Name {
        if count >= self.labels.len() {
            return self.clone();
        }
        Name {
            labels: self.labels[self.labels.len() - count..].to_vec(),
        }
    }

    /// `*.<self>`
    pub fn to_wildcard(&self) -> Name {
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.push(b"*".to_vec());
        labels.extend(self.labels.iter().cloned());
        Name { labels }
    }

    /// True if `self` equals `other` or lies below it.
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        let offset = self.labels.len() - other.labels.len();
        self.labels[offset..] == other.labels[..]
    }

    /// True if `self` lies strictly below `other`.
    pub fn is_strict_subdomain_of(&self, other: &Name) -> bool {
        self.labels.len() > other.labels.len() && self.is_subdomain_of(other)
    }

    /// Longest common suffix of the two names.
    pub fn common_ancestor(&self, other: &Name) -> Name {
        let mut shared = 0usize;
        let max = self.labels.len().min(other.labels.len());
        while shared < max {
            let a = &self.labels[self.labels.len() - 1 - shared];
            let b = &other.labels[other.labels.len() - 1 - shared];
            if a != b {
                break;
            }
            shared += 1;
        }
        self.trim_to(shared)
    }

    /// The name one label closer to `target`, walking down from `self`.
    /// `None` unless `target` is strictly below `self`.
    pub fn descend_towards(&self, target: &Name) -> Option<Name> {
        if !target.is_strict_subdomain_of(self) {
            return None;
        }
        Some(target.trim_to(self.label_count() + 1))
    }

    /// Rewrite `self` by swapping the suffix `old` for `new` (DNAME
    /// synthesis). `None` if `self` is not below `old`.
    pub fn replace_suffix(&self, old: &Name, new: &Name) -> Option<Name> {
        if !self.is_strict_subdomain_of(old) {
            return None;
        }
        let keep = self.labels.len() - old.labels.len();
        let mut labels = self.labels[..keep].to_vec();
        labels.extend(new.labels.iter().cloned());
        Some(Name { labels })
    }

    /// Canonical ordering per RFC 4034 §6.1: compare labels right to left,
    /// bytewise on the lowercase form, with missing labels sorting first.
    pub fn canonical_cmp(&self, other: &Name) -> Ordering {
        let max = self.labels.len().min(other.labels.len());
        for i in 0..max {
            let a = &self.labels[self.labels.len() - 1 - i];
            let b = &other.labels[other.labels.len() - 1 - i];
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        let mut first = true;
        for label in &self.labels {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            for &b in label {
                if b.is_ascii_graphic() && b != b'.' {
                    write!(f, "{}", b as char)?;
                } else {
                    write!(f, "\\{:03}", b)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}
