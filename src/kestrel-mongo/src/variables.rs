use std::collections::HashMap;

/// Step configuration values may reference variables (`${NAME}` or `%%NAME%%`) that are resolved
/// by the host pipeline. Implementors provide that resolution; it is passed into every operation
/// that reads configuration values.
pub trait VariableSpace {
  /// Returns `value` with every known variable reference replaced.
  fn substitute(&self, value: &str) -> String;

  /// Substitutes an optional value, treating empty results as missing.
  fn substitute_opt(&self, value: Option<&str>) -> Option<String> {
    value.map(|inner| self.substitute(inner)).filter(|inner| !inner.is_empty())
  }
}

/// A variable space backed by a simple map.
#[derive(Debug, Clone, Default)]
pub struct Variables {
  values: HashMap<String, String>,
}

impl Variables {
  /// Creates a variable space seeded with the current process environment.
  pub fn from_env() -> Self {
    Self {
      values: std::env::vars().collect(),
    }
  }

  /// Sets (or replaces) a single variable.
  pub fn set<K, V>(&mut self, name: K, value: V)
  where
    K: Into<String>,
    V: Into<String>,
  {
    self.values.insert(name.into(), value.into());
  }

  /// Replaces every `open NAME close` occurrence in `input` with the variable value, leaving
  /// references to unknown names untouched.
  fn replace_delimited(&self, input: &str, open: &str, close: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(open) {
      let after_open = &rest[start + open.len()..];

      let Some(end) = after_open.find(close) else {
        break;
      };

      let name = &after_open[..end];
      output.push_str(&rest[..start]);

      match self.values.get(name) {
        Some(value) => output.push_str(value),
        None => {
          log::trace!("no value for variable '{name}', leaving reference in place");
          output.push_str(&rest[start..start + open.len() + end + close.len()]);
        }
      }

      rest = &after_open[end + close.len()..];
    }

    output.push_str(rest);
    output
  }
}

impl<K, V> FromIterator<(K, V)> for Variables
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    Self {
      values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }
}

impl VariableSpace for Variables {
  fn substitute(&self, value: &str) -> String {
    let unix_style = self.replace_delimited(value, "${", "}");
    self.replace_delimited(&unix_style, "%%", "%%")
  }
}

#[cfg(test)]
mod tests {
  use super::{VariableSpace, Variables};

  fn space() -> Variables {
    Variables::from_iter([("HOST", "db.internal"), ("PORT", "27018")])
  }

  #[test]
  fn test_substitute_both_styles() {
    assert_eq!(space().substitute("${HOST}:%%PORT%%"), "db.internal:27018");
  }

  #[test]
  fn test_substitute_unknown_left_alone() {
    assert_eq!(space().substitute("${NOPE}-%%NOPE%%"), "${NOPE}-%%NOPE%%");
  }

  #[test]
  fn test_substitute_unterminated() {
    assert_eq!(space().substitute("a ${HOST"), "a ${HOST");
  }

  #[test]
  fn test_substitute_opt_empty_is_none() {
    let mut vars = space();
    vars.set("EMPTY", "");
    assert_eq!(vars.substitute_opt(Some("${EMPTY}")), None);
    assert_eq!(vars.substitute_opt(None), None);
    assert_eq!(vars.substitute_opt(Some("${PORT}")), Some("27018".to_string()));
  }
}
