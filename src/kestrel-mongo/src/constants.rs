/// The port used for any host entry that does not name its own.
pub const MONGO_DEFAULT_PORT: u16 = 27017;

/// DATABASE: holds the replica set configuration collection.
pub const LOCAL_DB: &str = "local";

/// COLLECTION: a single document describing the replica set.
pub const REPL_SET_COLLECTION: &str = "system.replset";

/// The sub-document of the replica set configuration holding its settings.
pub const REPL_SET_SETTINGS: &str = "settings";

/// Custom write concern names, keyed by name, inside the settings document.
pub const REPL_SET_LAST_ERROR_MODES: &str = "getLastErrorModes";

/// The array of member documents in the replica set configuration.
pub const REPL_SET_MEMBERS: &str = "members";

/// The field of a member document holding its `host[:port]` address.
pub const MEMBER_HOST: &str = "host";

/// The field of a member document holding its tag mapping.
pub const MEMBER_TAGS: &str = "tags";

/// The authentication source used by kerberos (GSSAPI) credentials.
pub const EXTERNAL_AUTH_SOURCE: &str = "$external";
