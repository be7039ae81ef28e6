//! Replica set topology metadata: the members described by `local.system.replset`, the tags they
//! carry, and the custom write concern modes defined in the replica set settings.

use bson::{Bson, Document};
use mongodb::options::{ServerAddress, TagSet};
use std::collections::HashSet;
use std::io;

/// A single replica set node, as described by the `members` array of the replica set
/// configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  /// The `host[:port]` address of this member.
  pub host: String,

  /// The tags of this member, in the order they were defined. Members without a `tags` document
  /// have `None` here.
  pub tags: Option<Vec<(String, String)>>,
}

/// Converts a tag value into its natural string representation; anything other than a scalar is
/// rejected. Doubles are written the way json tag sets are, so integral values keep their `.0`.
fn tag_value_string(value: &Bson) -> Option<String> {
  match value {
    Bson::String(inner) => Some(inner.clone()),
    Bson::Int32(inner) => Some(inner.to_string()),
    Bson::Int64(inner) => Some(inner.to_string()),
    Bson::Double(inner) => Some(
      serde_json::Number::from_f64(*inner)
        .map(|number| number.to_string())
        .unwrap_or_else(|| inner.to_string()),
    ),
    Bson::Boolean(inner) => Some(inner.to_string()),
    _ => None,
  }
}

impl Member {
  /// Creates a member from an address and its tags.
  pub fn new<S>(host: S, tags: Option<Vec<(String, String)>>) -> Self
  where
    S: Into<String>,
  {
    Self {
      host: host.into(),
      tags,
    }
  }

  /// Builds a member from one entry of the replica set configuration's `members` array. Tag values
  /// that cannot be represented as a string fail the whole conversion; skipping them would produce
  /// a plausible looking but incomplete view of the replica set.
  pub fn from_document(document: &Document) -> io::Result<Self> {
    let host = match document.get(crate::constants::MEMBER_HOST) {
      Some(Bson::String(host)) => host.clone(),
      other => {
        log::warn!("replica set member without a usable host - {other:?}");
        return Err(io::Error::new(
          io::ErrorKind::InvalidData,
          format!("replica set member is missing a host string ({document})"),
        ));
      }
    };

    let tags = match document.get(crate::constants::MEMBER_TAGS) {
      None | Some(Bson::Null) => None,
      Some(Bson::Document(tags)) => {
        let mut pairs = Vec::with_capacity(tags.len());

        for (name, value) in tags {
          let value = tag_value_string(value).ok_or_else(|| {
            log::warn!("member '{host}' has non-scalar tag '{name}' - {value:?}");
            io::Error::new(
              io::ErrorKind::InvalidData,
              format!("member '{host}' has tag '{name}' with a value that is not a string ({value})"),
            )
          })?;

          pairs.push((name.clone(), value));
        }

        Some(pairs)
      }
      Some(other) => {
        log::warn!("member '{host}' has a tags field that is not a document - {other:?}");
        return Err(io::Error::new(
          io::ErrorKind::InvalidData,
          format!("member '{host}' has a tags field that is not a document ({other})"),
        ));
      }
    };

    Ok(Self { host, tags })
  }

  /// Returns the value of the tag named `name`, if this member carries it.
  pub fn tag(&self, name: &str) -> Option<&str> {
    self
      .tags
      .as_ref()?
      .iter()
      .find(|(tag_name, _)| tag_name == name)
      .map(|(_, value)| value.as_str())
  }

  /// A member satisfies a tag set when every tag in the set is present on the member with exactly
  /// the required value. An empty tag set is satisfied by every member.
  pub fn satisfies(&self, tag_set: &TagSet) -> bool {
    tag_set
      .iter()
      .all(|(name, required)| self.tag(name) == Some(required.as_str()))
  }

  /// Parses the host string of this member into an address the driver understands.
  pub fn server_address(&self) -> io::Result<ServerAddress> {
    crate::hosts::parse_host_entry(&self.host, crate::constants::MONGO_DEFAULT_PORT)
  }
}

impl std::fmt::Display for Member {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    match &self.tags {
      Some(tags) if !tags.is_empty() => {
        let rendered = tags
          .iter()
          .map(|(name, value)| format!("{} : {}", quote(name), quote(value)))
          .collect::<Vec<String>>()
          .join(", ");
        write!(formatter, "{} {{ {} }}", self.host, rendered)
      }
      _ => write!(formatter, "{}", self.host),
    }
  }
}

/// Wraps a string in double quotes, escaping any double quotes it already contains.
pub fn quote(value: &str) -> String {
  format!("\"{}\"", value.replace('"', "\\\""))
}

/// Returns every distinct `"name" : "value"` tag pair found across the members. Two members sharing
/// a tag name with different values contribute two entries.
pub fn collect_all_tags(members: &[Member]) -> HashSet<String> {
  members
    .iter()
    .filter_map(|member| member.tags.as_ref())
    .flatten()
    .map(|(name, value)| format!("{} : {}", quote(name), quote(value)))
    .collect()
}

/// Returns the members that satisfy at least one of the tag sets, in member order and without
/// duplicates.
pub fn match_members(tag_sets: &[TagSet], members: &[Member]) -> Vec<Member> {
  let mut satisfied: Vec<Member> = Vec::with_capacity(members.len());

  for member in members {
    if satisfied.contains(member) {
      continue;
    }

    if tag_sets.iter().any(|tag_set| member.satisfies(tag_set)) {
      satisfied.push(member.clone());
    }
  }

  satisfied
}

/// Reads the members out of a replica set configuration document. A configuration without members
/// yields an empty list.
pub fn members_from_config(config: &Document) -> io::Result<Vec<Member>> {
  let members = match config.get(crate::constants::REPL_SET_MEMBERS) {
    Some(Bson::Array(members)) => members,
    _ => {
      log::info!("no replica set members defined");
      return Ok(Vec::new());
    }
  };

  if members.is_empty() {
    log::info!("no replica set members defined");
  }

  members
    .iter()
    .filter_map(|member| match member {
      Bson::Document(inner) => Some(Member::from_document(inner)),
      Bson::Null => None,
      other => Some(Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("replica set member entry is not a document ({other})"),
      ))),
    })
    .collect()
}

/// Returns the names of any custom `getLastErrorModes` in the replica set settings. These can be
/// used as the `w` value of a write concern.
pub fn last_error_modes(config: &Document) -> Vec<String> {
  config
    .get_document(crate::constants::REPL_SET_SETTINGS)
    .ok()
    .and_then(|settings| settings.get_document(crate::constants::REPL_SET_LAST_ERROR_MODES).ok())
    .map(|modes| modes.keys().cloned().collect())
    .unwrap_or_default()
}
