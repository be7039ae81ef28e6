//! Connection management for the mongo input and output steps of the pipeline engine, plus the
//! replica set metadata (member tags, custom write concern modes) used to steer reads and writes.

/// Constants shared by the connection and topology code.
pub mod constants;

/// The toml-deserializable step configuration.
pub mod config;

/// Variable resolution for configuration values.
pub mod variables;

/// Parsing of `host[:port]` lists.
pub mod hosts;

/// Building driver credentials from step configuration.
pub mod credentials;

/// Read preference, tag set and write concern resolution.
pub mod options;

/// Kerberos login delegation.
pub mod auth;

/// Replica set members, tag aggregation and tag set matching.
pub mod topology;

/// Opening clients and querying replica set metadata.
pub mod connection;
