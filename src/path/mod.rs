use std::fmt;

/// Absolute location of a group inside a backing store.
///
/// A path is an ordered sequence of segment names. The root location is the
/// empty sequence and renders as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root location.
    pub fn root() -> Self {
        StorePath {
            segments: Vec::new(),
        }
    }

    /// Build a path from segment names.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StorePath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `/`-separated rendering. Empty segments are ignored, so
    /// `"/"`, `""` and `"//"` all parse to the root.
    pub fn parse(text: &str) -> Self {
        StorePath::from_segments(text.split('/').filter(|s| !s.is_empty()))
    }

    /// The path one segment deeper.
    pub fn join(&self, segment: &str) -> StorePath {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        StorePath { segments }
    }

    /// The containing location, or `None` for the root.
    pub fn parent(&self) -> Option<StorePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(StorePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The final segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; the root has length 0.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Longest common leading subsequence of segments. Walks both paths
    /// segment-by-segment while equal and stops at the first mismatch;
    /// reflexive on itself, and the root when the paths diverge immediately.
    pub fn shared_path(&self, other: &StorePath) -> StorePath {
        let mut shared = Vec::new();
        for (a, b) in self.segments.iter().zip(other.segments.iter()) {
            if a != b {
                break;
            }
            shared.push(a.clone());
        }
        StorePath { segments: shared }
    }

    /// Whether `prefix` is a leading subsequence of this path.
    pub fn starts_with(&self, prefix: &StorePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
