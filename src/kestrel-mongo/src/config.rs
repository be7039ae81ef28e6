use serde::Deserialize;

/// The connection settings shared by the mongo input and output steps. Most values are kept as the
/// raw strings a user entered so that variable references can be resolved at connection time.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct MongoConfiguration {
  /// Comma separated `host[:port]` list.
  pub hosts: String,
  /// The port used for host entries that do not carry their own.
  pub port: Option<String>,
  /// The database steps read from or write to, also the authentication source.
  pub database: Option<String>,
  /// The collection steps read from or write to.
  pub collection: Option<String>,
  /// Username used for authentication (or the kerberos principal).
  pub username: Option<String>,
  /// Password used for standard authentication.
  pub password: Option<String>,
  /// Authenticate with kerberos (GSSAPI) instead of username/password.
  #[serde(default)]
  pub use_kerberos: bool,
  /// Let the driver discover the rest of the replica set even when given a single host.
  #[serde(default)]
  pub use_all_replica_set_members: bool,
  /// Connection timeout, in milliseconds.
  pub connect_timeout: Option<String>,
  /// Socket timeout, in milliseconds.
  pub socket_timeout: Option<String>,
  /// One of `primary`, `primaryPreferred`, `secondary`, `secondaryPreferred` or `nearest`.
  pub read_preference: Option<String>,
}

/// The configuration of a mongo input step.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct InputConfiguration {
  /// Connection settings.
  pub mongo: MongoConfiguration,
  /// Tag sets, each a JSON object (e.g `{ "dc" : "east" }`), used with the read preference.
  pub read_preference_tag_sets: Option<Vec<String>>,
}

/// The configuration of a mongo output step.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfiguration {
  /// Connection settings.
  pub mongo: MongoConfiguration,
  /// The `w` value: a number, `majority`, or a custom `getLastErrorModes` name.
  pub write_concern: Option<String>,
  /// Write concern timeout, in milliseconds.
  pub w_timeout: Option<String>,
  /// Wait for the journal on writes.
  #[serde(default)]
  pub journaled: bool,
}

/// Everything needed to open a client. Built from either step configuration, or directly when
/// only topology metadata is wanted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionRequest {
  pub hosts: String,
  pub port: Option<String>,
  pub use_all_replica_set_members: bool,
  pub connect_timeout: Option<String>,
  pub socket_timeout: Option<String>,
  pub read_preference: Option<String>,
  pub write_concern: Option<String>,
  pub w_timeout: Option<String>,
  pub journaled: bool,
  pub tag_sets: Vec<String>,
}

impl ConnectionRequest {
  /// A bare request against the given hosts: no timeouts, no read or write tuning and no member
  /// discovery. Used when reading the replica set configuration.
  pub fn topology<S>(hosts: S, port: Option<String>) -> Self
  where
    S: Into<String>,
  {
    Self {
      hosts: hosts.into(),
      port,
      ..Self::default()
    }
  }
}

impl From<&InputConfiguration> for ConnectionRequest {
  fn from(config: &InputConfiguration) -> Self {
    let mongo = &config.mongo;

    // Input steps only read; the write concern stays at its defaults.
    Self {
      hosts: mongo.hosts.clone(),
      port: mongo.port.clone(),
      use_all_replica_set_members: mongo.use_all_replica_set_members,
      connect_timeout: mongo.connect_timeout.clone(),
      socket_timeout: mongo.socket_timeout.clone(),
      read_preference: mongo.read_preference.clone(),
      write_concern: None,
      w_timeout: None,
      journaled: false,
      tag_sets: config.read_preference_tag_sets.clone().unwrap_or_default(),
    }
  }
}

impl From<&OutputConfiguration> for ConnectionRequest {
  fn from(config: &OutputConfiguration) -> Self {
    let mongo = &config.mongo;

    // No read preference tag sets in the output step.
    Self {
      hosts: mongo.hosts.clone(),
      port: mongo.port.clone(),
      use_all_replica_set_members: mongo.use_all_replica_set_members,
      connect_timeout: mongo.connect_timeout.clone(),
      socket_timeout: mongo.socket_timeout.clone(),
      read_preference: mongo.read_preference.clone(),
      write_concern: config.write_concern.clone(),
      w_timeout: config.w_timeout.clone(),
      journaled: config.journaled,
      tag_sets: Vec::new(),
    }
  }
}
