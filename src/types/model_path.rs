//! Dotted identifier of a location in the model graph.

use std::fmt;

use serde::{Serialize, Serializer};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Immutable dotted identifier of a model graph location (e.g. `tasks.build`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelPath {
  segments: Vec<String>,
}

impl ModelPath {
  /// Parses a dotted path string.
  pub fn path(path: &str) -> Self {
    Self {
      segments: path.split(SEPARATOR).map(str::to_string).collect(),
    }
  }

  pub fn from_segments<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      segments: segments.into_iter().map(Into::into).collect(),
    }
  }

  pub fn segments(&self) -> &[String] {
    &self.segments
  }

  pub fn depth(&self) -> usize {
    self.segments.len()
  }

  pub fn is_top_level(&self) -> bool {
    self.depth() == 1
  }

  /// Last segment.
  pub fn name(&self) -> &str {
    self.segments.last().map(String::as_str).unwrap_or("")
  }

  pub fn child(&self, name: &str) -> ModelPath {
    let mut segments = self.segments.clone();
    segments.push(name.to_string());
    Self { segments }
  }

  /// Parent path, or `None` for top-level paths.
  pub fn parent(&self) -> Option<ModelPath> {
    if self.depth() <= 1 {
      return None;
    }
    Some(Self {
      segments: self.segments[..self.segments.len() - 1].to_vec(),
    })
  }

  /// Top-level ancestor, or `None` when this path is itself top-level.
  pub fn root_parent(&self) -> Option<ModelPath> {
    if self.depth() <= 1 {
      return None;
    }
    Some(Self {
      segments: vec![self.segments[0].clone()],
    })
  }

  /// True if `self` lies strictly below `ancestor`.
  pub fn is_descendant_of(&self, ancestor: &ModelPath) -> bool {
    self.depth() > ancestor.depth() && self.segments.starts_with(&ancestor.segments)
  }

  /// True if `self` is `other` or lies below it.
  pub fn is_within(&self, other: &ModelPath) -> bool {
    self == other || self.is_descendant_of(other)
  }
}

impl fmt::Display for ModelPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, segment) in self.segments.iter().enumerate() {
      if i > 0 {
        write!(f, "{}", SEPARATOR)?;
      }
      f.write_str(segment)?;
    }
    Ok(())
  }
}

impl From<&str> for ModelPath {
  fn from(path: &str) -> Self {
    ModelPath::path(path)
  }
}

impl Serialize for ModelPath {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}
