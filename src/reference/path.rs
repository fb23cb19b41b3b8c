// ABOUTME: Dotted reference path parsing and lookup
// ABOUTME: Segments are keys with optional [integer] array subscripts

use serde_json::Value;

/// One dotted segment: a key plus zero or more array subscripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: String,
    pub indices: Vec<usize>,
}

/// A parsed `$[path]` body, e.g. `tasks.a.parameters.y[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePath {
    pub segments: Vec<Segment>,
}

impl ReferencePath {
    /// Parse a dotted path. Returns `None` when the path is malformed
    /// (empty segment, unterminated subscript, non-numeric index).
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (key, rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if key.is_empty() {
                return None;
            }

            let mut indices = Vec::new();
            let mut remaining = rest;
            while !remaining.is_empty() {
                let inner = remaining.strip_prefix('[')?;
                let close = inner.find(']')?;
                indices.push(inner[..close].parse::<usize>().ok()?);
                remaining = &inner[close + 1..];
            }

            segments.push(Segment {
                key: key.to_string(),
                indices,
            });
        }

        Some(Self { segments })
    }

    /// Resolve this path against a root value.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = current.get(&segment.key)?;
            for index in &segment.indices {
                current = current.get(index)?;
            }
        }
        Some(current)
    }
}
