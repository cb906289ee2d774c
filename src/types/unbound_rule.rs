//! Report of rules whose references never bound.

use std::fmt;

use serde::Serialize;

use super::{ModelPath, ModelRuleDescriptor, ModelType};

/// One reference slot of an unbound rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnboundRuleInput {
  /// Requested path, or the bound path once bound; `None` for unbound type-only references.
  pub path: Option<ModelPath>,
  #[serde(rename = "type")]
  pub ty: ModelType,
  pub bound: bool,
  /// Near-miss paths for an unbound path reference.
  pub suggestions: Vec<ModelPath>,
}

/// A rule that could not be fully bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnboundRule {
  pub descriptor: ModelRuleDescriptor,
  /// The subject slot (mutators only).
  pub mutable: Vec<UnboundRuleInput>,
  pub immutable: Vec<UnboundRuleInput>,
}

/// All rules left unbound after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnboundRulesReport {
  pub rules: Vec<UnboundRule>,
}

impl UnboundRulesReport {
  pub fn new(rules: Vec<UnboundRule>) -> Self {
    Self { rules }
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

fn write_input(
  f: &mut fmt::Formatter<'_>,
  input: &UnboundRuleInput,
  parameter: Option<usize>,
) -> fmt::Result {
  let marker = if input.bound { '+' } else { '-' };
  write!(f, "      {} ", marker)?;
  match &input.path {
    Some(path) => write!(f, "{}", path)?,
    None => write!(f, "<unspecified>")?,
  }
  write!(f, " ({})", input.ty)?;
  if let Some(index) = parameter {
    write!(f, " parameter {}", index + 1)?;
  }
  if !input.suggestions.is_empty() {
    let suggestions: Vec<String> = input.suggestions.iter().map(ToString::to_string).collect();
    write!(f, " - suggestions: {}", suggestions.join(", "))?;
  }
  writeln!(f)
}

impl fmt::Display for UnboundRulesReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "The following model rules are unbound:")?;
    for rule in &self.rules {
      writeln!(f, "  {}", rule.descriptor)?;
      if !rule.mutable.is_empty() {
        writeln!(f, "    Mutable:")?;
        for input in &rule.mutable {
          write_input(f, input, None)?;
        }
      }
      if !rule.immutable.is_empty() {
        writeln!(f, "    Immutable:")?;
        for (i, input) in rule.immutable.iter().enumerate() {
          write_input(f, input, Some(i))?;
        }
      }
    }
    Ok(())
  }
}
