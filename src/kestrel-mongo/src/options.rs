//! Turns the user facing connection settings (timeouts, read preference + tag sets, write concern)
//! into the option types of the `mongodb` driver.

use crate::variables::VariableSpace;
use mongodb::options::{
  Acknowledgment, ClientOptions, ReadPreference, ReadPreferenceOptions, SelectionCriteria, TagSet, WriteConcern,
};
use std::io;
use std::time::Duration;

/// The read preferences that can be selected by name in a step configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedReadPreference {
  Primary,
  PrimaryPreferred,
  Secondary,
  SecondaryPreferred,
  Nearest,
}

impl NamedReadPreference {
  /// All named preferences, in the order they are usually presented.
  pub const ALL: [NamedReadPreference; 5] = [
    NamedReadPreference::Primary,
    NamedReadPreference::PrimaryPreferred,
    NamedReadPreference::Secondary,
    NamedReadPreference::SecondaryPreferred,
    NamedReadPreference::Nearest,
  ];

  /// The name used for this preference in configuration.
  pub fn name(&self) -> &'static str {
    match self {
      NamedReadPreference::Primary => "primary",
      NamedReadPreference::PrimaryPreferred => "primaryPreferred",
      NamedReadPreference::Secondary => "secondary",
      NamedReadPreference::SecondaryPreferred => "secondaryPreferred",
      NamedReadPreference::Nearest => "nearest",
    }
  }

  /// Looks up a preference by name, ignoring case.
  pub fn by_name(name: &str) -> io::Result<Self> {
    let name = name.trim();

    Self::ALL
      .iter()
      .find(|preference| preference.name().eq_ignore_ascii_case(name))
      .copied()
      .ok_or_else(|| {
        log::warn!("unknown read preference '{name}'");
        io::Error::new(io::ErrorKind::InvalidInput, format!("unknown read preference '{name}'"))
      })
  }

  /// Only reads that may be routed away from the primary can be steered by tag sets.
  pub fn is_taggable(&self) -> bool {
    !matches!(self, NamedReadPreference::Primary)
  }

  /// Builds the driver's read preference, attaching the tag sets when this preference supports them.
  pub fn to_read_preference(&self, tag_sets: Vec<TagSet>) -> ReadPreference {
    let mut options = ReadPreferenceOptions::default();

    if !tag_sets.is_empty() && self.is_taggable() {
      options.tag_sets = Some(tag_sets);
    }

    match self {
      NamedReadPreference::Primary => ReadPreference::Primary,
      NamedReadPreference::PrimaryPreferred => ReadPreference::PrimaryPreferred { options },
      NamedReadPreference::Secondary => ReadPreference::Secondary { options },
      NamedReadPreference::SecondaryPreferred => ReadPreference::SecondaryPreferred { options },
      NamedReadPreference::Nearest => ReadPreference::Nearest { options },
    }
  }
}

impl std::fmt::Display for NamedReadPreference {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(formatter, "{}", self.name())
  }
}

/// Parses a tag set written as a JSON object, e.g `{ "dc" : "east", "rack" : 2 }`. Scalar values
/// are kept as their string representation.
pub fn parse_tag_set(source: &str) -> io::Result<TagSet> {
  let parsed = serde_json::from_str::<serde_json::Value>(source.trim()).map_err(|error| {
    log::warn!("unable to parse tag set '{source}' - {error}");
    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid tag set '{source}' - {error}"))
  })?;

  let serde_json::Value::Object(entries) = parsed else {
    return Err(io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("tag set '{source}' is not an object"),
    ));
  };

  entries
    .into_iter()
    .map(|(name, value)| {
      let value = match value {
        serde_json::Value::String(inner) => inner,
        serde_json::Value::Number(inner) => inner.to_string(),
        serde_json::Value::Bool(inner) => inner.to_string(),
        other => {
          return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("tag '{name}' in tag set '{source}' has a non-scalar value ({other})"),
          ))
        }
      };
      Ok((name, value))
    })
    .collect()
}

/// Parses every configured tag set.
pub fn parse_tag_sets<S>(sources: &[S]) -> io::Result<Vec<TagSet>>
where
  S: AsRef<str>,
{
  sources.iter().map(|source| parse_tag_set(source.as_ref())).collect()
}

/// Parses a millisecond timeout. Missing values are unset and values that are not positive are
/// ignored; anything that is not a number is an error.
pub fn parse_timeout(value: Option<&str>) -> io::Result<Option<Duration>> {
  let Some(raw) = value.map(str::trim).filter(|inner| !inner.is_empty()) else {
    return Ok(None);
  };

  let millis = raw.parse::<i64>().map_err(|error| {
    log::warn!("unable to parse timeout '{raw}' - {error}");
    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid timeout '{raw}' - {error}"))
  })?;

  Ok(u64::try_from(millis).ok().filter(|millis| *millis > 0).map(Duration::from_millis))
}

/// Resolves the write concern for a connection.
///
/// With nothing configured (and no journaling) the default concern of `w = 1` is used. Otherwise
/// `w` may be a node count, `majority`, or the name of a custom `getLastErrorModes` entry defined
/// on the replica set; a missing `w` falls back to a single node. A timeout of zero or less means
/// no timeout.
pub fn resolve_write_concern(w: Option<&str>, w_timeout: Option<&str>, journaled: bool) -> io::Result<WriteConcern> {
  let w = w.map(str::trim).filter(|inner| !inner.is_empty());
  let w_timeout = w_timeout.map(str::trim).filter(|inner| !inner.is_empty());

  let mut concern = WriteConcern::default();

  if w.is_none() && w_timeout.is_none() && !journaled {
    log::info!("configuring connection with default write concern");
    concern.w = Some(Acknowledgment::Nodes(1));
    return Ok(concern);
  }

  let timeout_millis = match w_timeout {
    None => 0,
    Some(raw) => raw.parse::<i64>().map_err(|error| {
      log::warn!("unable to parse write concern timeout '{raw}' - {error}");
      io::Error::new(io::ErrorKind::InvalidInput, format!("invalid w timeout '{raw}' - {error}"))
    })?,
  };

  let acknowledgment = match w {
    None => Acknowledgment::Nodes(1),
    Some(raw) => match raw.parse::<i64>() {
      Ok(nodes) => u32::try_from(nodes).map(Acknowledgment::Nodes).map_err(|_| {
        log::warn!("write concern node count '{raw}' out of range");
        io::Error::new(io::ErrorKind::InvalidInput, format!("invalid write concern '{raw}'"))
      })?,
      Err(_) if raw == "majority" => Acknowledgment::Majority,
      Err(_) => Acknowledgment::Custom(raw.to_string()),
    },
  };

  log::info!(
    "configuring connection with write concern w = {}, w timeout = {timeout_millis}, journaled = {journaled}",
    w.unwrap_or("1")
  );

  concern.w = Some(acknowledgment);
  concern.w_timeout = u64::try_from(timeout_millis)
    .ok()
    .filter(|millis| *millis > 0)
    .map(Duration::from_millis);
  concern.journal = Some(journaled);

  Ok(concern)
}

/// Applies the timeouts, read preference and write concern of `request` to `options`, resolving
/// variables on the way. The socket timeout has no driver counterpart and is returned so callers
/// can bound their own operations with it.
pub fn configure_options<V>(
  options: &mut ClientOptions,
  request: &crate::config::ConnectionRequest,
  vars: &V,
) -> io::Result<Option<Duration>>
where
  V: VariableSpace,
{
  if let Some(timeout) = parse_timeout(vars.substitute_opt(request.connect_timeout.as_deref()).as_deref())? {
    options.connect_timeout = Some(timeout);
  }

  let socket_timeout = parse_timeout(vars.substitute_opt(request.socket_timeout.as_deref()).as_deref())?;

  let read_preference = vars.substitute_opt(request.read_preference.as_deref());
  log::info!(
    "using read preference '{}'",
    read_preference.as_deref().unwrap_or(NamedReadPreference::Primary.name())
  );

  let tag_sets = parse_tag_sets(&request.tag_sets)?;

  if let Some(name) = read_preference {
    let preference = NamedReadPreference::by_name(&name)?;

    match (tag_sets.is_empty(), preference.is_taggable()) {
      (true, _) => log::info!("no read preference tag sets defined"),
      (false, true) => log::info!("using read preference tag sets {}", request.tag_sets.join(" ")),
      (false, false) => log::info!("ignoring tag sets for '{preference}' read preference"),
    }

    options.selection_criteria = Some(SelectionCriteria::ReadPreference(
      preference.to_read_preference(tag_sets),
    ));
  } else if !tag_sets.is_empty() {
    log::info!("ignoring tag sets; no read preference configured");
  }

  let w = vars.substitute_opt(request.write_concern.as_deref());
  let w_timeout = vars.substitute_opt(request.w_timeout.as_deref());
  options.write_concern = Some(resolve_write_concern(
    w.as_deref(),
    w_timeout.as_deref(),
    request.journaled,
  )?);

  Ok(socket_timeout)
}

#[cfg(test)]
mod tests {
  use super::{configure_options, parse_tag_set, parse_timeout, resolve_write_concern, NamedReadPreference};
  use crate::config::ConnectionRequest;
  use crate::variables::Variables;
  use mongodb::options::{Acknowledgment, ClientOptions, ReadPreference, SelectionCriteria, TagSet};
  use std::time::Duration;

  #[test]
  fn test_read_preference_by_name() {
    assert_eq!(
      NamedReadPreference::by_name("SecondaryPreferred").expect("failed lookup"),
      NamedReadPreference::SecondaryPreferred
    );
    assert_eq!(
      NamedReadPreference::by_name(" nearest ").expect("failed lookup"),
      NamedReadPreference::Nearest
    );
    assert!(NamedReadPreference::by_name("closest").is_err());
  }

  #[test]
  fn test_primary_drops_tag_sets() {
    let tag_sets = vec![parse_tag_set(r#"{ "dc": "east" }"#).expect("failed parse")];
    assert!(matches!(
      NamedReadPreference::Primary.to_read_preference(tag_sets),
      ReadPreference::Primary
    ));
  }

  #[test]
  fn test_secondary_keeps_tag_sets() {
    let tag_sets = vec![
      parse_tag_set(r#"{ "dc": "east" }"#).expect("failed parse"),
      parse_tag_set(r#"{ "dc": "west" }"#).expect("failed parse"),
    ];

    match NamedReadPreference::Secondary.to_read_preference(tag_sets.clone()) {
      ReadPreference::Secondary { options } => assert_eq!(options.tag_sets, Some(tag_sets)),
      other => panic!("unexpected read preference {other:?}"),
    }
  }

  #[test]
  fn test_parse_tag_set_scalars() {
    let parsed = parse_tag_set(r#" { "dc" : "east", "rack": 2, "ssd": true } "#).expect("failed parse");
    let mut expected = TagSet::new();
    expected.insert("dc".to_string(), "east".to_string());
    expected.insert("rack".to_string(), "2".to_string());
    expected.insert("ssd".to_string(), "true".to_string());
    assert_eq!(parsed, expected);
  }

  #[test]
  fn test_parse_tag_set_empty_object() {
    assert!(parse_tag_set("{}").expect("failed parse").is_empty());
  }

  #[test]
  fn test_parse_tag_set_invalid() {
    assert!(parse_tag_set("dc: east").is_err());
    assert!(parse_tag_set(r#"["dc"]"#).is_err());
    assert!(parse_tag_set(r#"{ "dc": { "nested": 1 } }"#).is_err());
  }

  #[test]
  fn test_parse_timeout() {
    assert_eq!(parse_timeout(None).expect("failed parse"), None);
    assert_eq!(parse_timeout(Some("")).expect("failed parse"), None);
    assert_eq!(parse_timeout(Some("0")).expect("failed parse"), None);
    assert_eq!(parse_timeout(Some("-5")).expect("failed parse"), None);
    assert_eq!(
      parse_timeout(Some("1500")).expect("failed parse"),
      Some(Duration::from_millis(1500))
    );
    assert!(parse_timeout(Some("soon")).is_err());
  }

  #[test]
  fn test_write_concern_defaults() {
    let concern = resolve_write_concern(None, None, false).expect("failed resolve");
    assert_eq!(concern.w, Some(Acknowledgment::Nodes(1)));
    assert_eq!(concern.w_timeout, None);
    assert_eq!(concern.journal, None);
  }

  #[test]
  fn test_write_concern_numeric() {
    let concern = resolve_write_concern(Some("2"), Some("250"), true).expect("failed resolve");
    assert_eq!(concern.w, Some(Acknowledgment::Nodes(2)));
    assert_eq!(concern.w_timeout, Some(Duration::from_millis(250)));
    assert_eq!(concern.journal, Some(true));
  }

  #[test]
  fn test_write_concern_named_modes() {
    let majority = resolve_write_concern(Some("majority"), None, false).expect("failed resolve");
    assert_eq!(majority.w, Some(Acknowledgment::Majority));
    assert_eq!(majority.journal, Some(false));

    let custom = resolve_write_concern(Some("multiDC"), Some("0"), false).expect("failed resolve");
    assert_eq!(custom.w, Some(Acknowledgment::Custom("multiDC".to_string())));
    assert_eq!(custom.w_timeout, None);
  }

  #[test]
  fn test_write_concern_journal_only() {
    let concern = resolve_write_concern(None, None, true).expect("failed resolve");
    assert_eq!(concern.w, Some(Acknowledgment::Nodes(1)));
    assert_eq!(concern.journal, Some(true));
  }

  #[test]
  fn test_write_concern_negative_timeout_means_none() {
    let concern = resolve_write_concern(Some("2"), Some("-5"), false).expect("failed resolve");
    assert_eq!(concern.w, Some(Acknowledgment::Nodes(2)));
    assert_eq!(concern.w_timeout, None);
  }

  #[test]
  fn test_write_concern_invalid() {
    assert!(resolve_write_concern(Some("1"), Some("later"), false).is_err());
    assert!(resolve_write_concern(Some("-1"), None, false).is_err());
  }

  #[test]
  fn test_configure_options() {
    let vars = Variables::from_iter([("RP", "nearest"), ("CT", "2000")]);
    let request = ConnectionRequest {
      hosts: "a".to_string(),
      connect_timeout: Some("${CT}".to_string()),
      socket_timeout: Some("3000".to_string()),
      read_preference: Some("${RP}".to_string()),
      tag_sets: vec![r#"{ "dc": "east" }"#.to_string()],
      ..ConnectionRequest::default()
    };
    let mut options = ClientOptions::builder().build();
    let socket_timeout = configure_options(&mut options, &request, &vars).expect("failed configure");

    assert_eq!(socket_timeout, Some(Duration::from_millis(3000)));
    assert_eq!(options.connect_timeout, Some(Duration::from_millis(2000)));

    match &options.selection_criteria {
      Some(SelectionCriteria::ReadPreference(ReadPreference::Nearest { options })) => {
        assert_eq!(options.tag_sets.as_ref().map(|sets| sets.len()), Some(1))
      }
      _ => panic!("unexpected selection criteria"),
    }

    let concern = options.write_concern.as_ref().expect("missing write concern");
    assert_eq!(concern.w, Some(Acknowledgment::Nodes(1)));
  }

  #[test]
  fn test_configure_options_without_read_preference() {
    let mut options = ClientOptions::builder().build();
    let request = ConnectionRequest::topology("a", None);
    configure_options(&mut options, &request, &Variables::default()).expect("failed configure");
    assert!(options.selection_criteria.is_none());
    assert!(options.connect_timeout.is_none());
  }

  #[test]
  fn test_configure_options_bad_read_preference() {
    let mut options = ClientOptions::builder().build();
    let request = ConnectionRequest {
      read_preference: Some("anywhere".to_string()),
      ..ConnectionRequest::topology("a", None)
    };
    assert!(configure_options(&mut options, &request, &Variables::default()).is_err());
  }
}
