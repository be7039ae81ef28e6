use mongodb::options::ServerAddress;
use std::io;

/// Parses a single `host[:port]` entry, falling back to `default_port` when the entry does not name
/// a port of its own.
pub fn parse_host_entry(entry: &str, default_port: u16) -> io::Result<ServerAddress> {
  let mut parts = entry.split(':');
  let host = parts.next().map(str::trim).unwrap_or_default();
  let port = parts.next();

  if parts.next().is_some() {
    log::warn!("malformed host entry '{entry}'");
    return Err(io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("malformed host entry '{entry}'"),
    ));
  }

  if host.is_empty() {
    log::warn!("empty host name in entry '{entry}'");
    return Err(io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("empty host name in entry '{entry}'"),
    ));
  }

  let port = match port {
    None => default_port,
    Some(raw) => raw.trim().parse::<u16>().map_err(|error| {
      log::warn!("unable to parse port '{raw}' - {error}");
      io::Error::new(io::ErrorKind::InvalidInput, format!("unable to parse port number '{raw}'"))
    })?,
  };

  Ok(ServerAddress::Tcp {
    host: host.to_string(),
    port: Some(port),
  })
}

/// Parses the comma separated host string of a step configuration. Entries without a port use
/// `default_port`; when that is missing or not a number the standard mongo port is used instead.
pub fn parse_hosts(hosts: &str, default_port: Option<&str>) -> io::Result<Vec<ServerAddress>> {
  let hosts = hosts.trim();

  if hosts.is_empty() {
    log::warn!("attempted to parse empty host string");
    return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty hosts string"));
  }

  let default_port = default_port
    .and_then(|port| port.trim().parse::<u16>().ok())
    .unwrap_or(crate::constants::MONGO_DEFAULT_PORT);

  // Trailing separators ("a,b,") are tolerated; empty entries anywhere else are not.
  let mut entries = hosts.split(',').collect::<Vec<&str>>();
  while entries.last().map_or(false, |entry| entry.trim().is_empty()) {
    entries.pop();
  }

  if entries.is_empty() {
    log::warn!("host string '{hosts}' contains no hosts");
    return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty hosts string"));
  }

  entries
    .into_iter()
    .map(|entry| parse_host_entry(entry, default_port))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::{parse_host_entry, parse_hosts};
  use mongodb::options::ServerAddress;

  fn tcp(host: &str, port: u16) -> ServerAddress {
    ServerAddress::Tcp {
      host: host.to_string(),
      port: Some(port),
    }
  }

  #[test]
  fn test_parse_hosts_mixed_ports() {
    let parsed = parse_hosts(" a:27018,b , c:1 ", None).expect("failed parse");
    assert_eq!(parsed, vec![tcp("a", 27018), tcp("b", 27017), tcp("c", 1)]);
  }

  #[test]
  fn test_parse_hosts_default_port() {
    let parsed = parse_hosts("a,b:2", Some("3000")).expect("failed parse");
    assert_eq!(parsed, vec![tcp("a", 3000), tcp("b", 2)]);
  }

  #[test]
  fn test_parse_hosts_bad_default_port_ignored() {
    let parsed = parse_hosts("a", Some("nope")).expect("failed parse");
    assert_eq!(parsed, vec![tcp("a", 27017)]);
  }

  #[test]
  fn test_parse_hosts_empty() {
    let error = parse_hosts("   ", None).expect_err("empty hosts should fail");
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
  }

  #[test]
  fn test_parse_hosts_trailing_separator() {
    let parsed = parse_hosts("a:27017,b:27017,", None).expect("failed parse");
    assert_eq!(parsed, vec![tcp("a", 27017), tcp("b", 27017)]);

    let parsed = parse_hosts("a,,", Some("2")).expect("failed parse");
    assert_eq!(parsed, vec![tcp("a", 2)]);
  }

  #[test]
  fn test_parse_hosts_inner_empty_entry() {
    let error = parse_hosts("a,,b", None).expect_err("empty entry should fail");
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
    assert!(parse_hosts(",a", None).is_err());
    assert!(parse_hosts(",", None).is_err());
  }

  #[test]
  fn test_parse_host_entry_malformed() {
    assert!(parse_host_entry("a:1:2", 27017).is_err());
    assert!(parse_host_entry("a:port", 27017).is_err());
    assert!(parse_host_entry(":27017", 27017).is_err());
  }
}
