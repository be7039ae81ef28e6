//! Opening clients for the mongo steps, and the handful of metadata lookups (replica set tags,
//! members, custom write concern modes, database + collection names) used when configuring them.

use crate::auth::{AuthContext, KerberosLogin};
use crate::config::{ConnectionRequest, InputConfiguration, MongoConfiguration, OutputConfiguration};
use crate::topology::Member;
use crate::variables::VariableSpace;
use bson::Document;
use mongodb::options::{ClientOptions, Credential, ServerAddress, TagSet};
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::time::Duration;

/// Wraps driver failures in the error type used throughout this crate.
fn driver_error(error: mongodb::error::Error) -> io::Error {
  io::Error::new(io::ErrorKind::Other, format!("failed mongodb operation - {error}"))
}

/// Awaits a driver operation, giving up after `limit` when one is configured.
async fn bounded<F, T>(limit: Option<Duration>, action: F) -> io::Result<T>
where
  F: Future<Output = mongodb::error::Result<T>>,
{
  let result = match limit {
    Some(limit) => async_std::future::timeout(limit, action).await.map_err(|_| {
      log::warn!("mongodb operation exceeded {}ms", limit.as_millis());
      io::Error::new(
        io::ErrorKind::TimedOut,
        format!("mongodb operation exceeded {}ms", limit.as_millis()),
      )
    })?,
    None => action.await,
  };

  result.map_err(|error| {
    log::warn!("failed mongodb operation - {error}");
    driver_error(error)
  })
}

/// Resolves `request` into driver options, returning them alongside the socket timeout which
/// callers use to bound their own operations.
pub fn client_options<V>(
  request: &ConnectionRequest,
  credential: Option<Credential>,
  vars: &V,
) -> io::Result<(ClientOptions, Option<Duration>)>
where
  V: VariableSpace,
{
  let hosts = vars.substitute(&request.hosts);
  let port = vars.substitute_opt(request.port.as_deref());
  let addresses = crate::hosts::parse_hosts(&hosts, port.as_deref())?;

  let mut options = ClientOptions::builder().build();
  let socket_timeout = crate::options::configure_options(&mut options, request, vars)?;

  // A single host without member discovery is treated as a stand-alone server; anything else lets
  // the driver discover the rest of the replica set (or the mongos routers).
  let direct = addresses.len() == 1 && !request.use_all_replica_set_members;
  log::debug!("resolved mongodb options for '{hosts}' (direct = {direct})");

  options.direct_connection = Some(direct);
  options.hosts = addresses;
  options.credential = credential;

  Ok((options, socket_timeout))
}

/// Builds the client and returns it alongside the socket timeout.
async fn open<V>(
  request: &ConnectionRequest,
  credential: Option<Credential>,
  vars: &V,
) -> io::Result<(mongodb::Client, Option<Duration>)>
where
  V: VariableSpace,
{
  let (options, socket_timeout) = client_options(request, credential, vars)?;

  let client = mongodb::Client::with_options(options).map_err(|error| {
    log::warn!("failed mongodb connection - {error}");
    io::Error::new(io::ErrorKind::Other, format!("failed mongodb connection - {error}"))
  })?;

  Ok((client, socket_timeout))
}

/// Creates a client configured from `request`. `credential` is used as-is; see
/// [`crate::credentials`] for building one.
pub async fn init_connection<V>(
  request: &ConnectionRequest,
  credential: Option<Credential>,
  vars: &V,
) -> io::Result<mongodb::Client>
where
  V: VariableSpace,
{
  open(request, credential, vars).await.map(|(client, _)| client)
}

/// Creates a client for a mongo input step.
pub async fn connect_input<V>(config: &InputConfiguration, vars: &V) -> io::Result<mongodb::Client>
where
  V: VariableSpace,
{
  let credential = crate::credentials::credential_for(&config.mongo, vars);
  init_connection(&ConnectionRequest::from(config), credential, vars).await
}

/// Creates a client for a mongo output step.
pub async fn connect_output<V>(config: &OutputConfiguration, vars: &V) -> io::Result<mongodb::Client>
where
  V: VariableSpace,
{
  let credential = crate::credentials::credential_for(&config.mongo, vars);
  init_connection(&ConnectionRequest::from(config), credential, vars).await
}

/// Reads the replica set configuration document from `local.system.replset`. A server that is not
/// part of a replica set has no such document and produces `None`; failing to reach the server is
/// an error.
pub async fn replica_set_config<V>(config: &MongoConfiguration, vars: &V) -> io::Result<Option<Document>>
where
  V: VariableSpace,
{
  let credential = crate::credentials::for_local_database(crate::credentials::credential_for(config, vars));
  let request = ConnectionRequest::topology(config.hosts.clone(), config.port.clone());
  let (client, _) = open(&request, credential, vars).await?;

  let document = bounded(
    None,
    client
      .database(crate::constants::LOCAL_DB)
      .collection::<Document>(crate::constants::REPL_SET_COLLECTION)
      .find_one(None, None),
  )
  .await?;

  if document.is_none() {
    log::info!("no replica set configuration available on '{}'", config.hosts);
  }

  Ok(document)
}

/// Fetches the members of the replica set. Servers without a replica set yield an empty list.
pub async fn replica_set_member_records<V>(config: &MongoConfiguration, vars: &V) -> io::Result<Vec<Member>>
where
  V: VariableSpace,
{
  match replica_set_config(config, vars).await? {
    Some(document) => crate::topology::members_from_config(&document),
    None => Ok(Vec::new()),
  }
}

/// Every distinct `"name" : "value"` tag pair defined across the replica set.
pub async fn all_tags<V>(config: &MongoConfiguration, vars: &V) -> io::Result<HashSet<String>>
where
  V: VariableSpace,
{
  let members = replica_set_member_records(config, vars).await?;
  Ok(crate::topology::collect_all_tags(&members))
}

/// The replica set members whose tags satisfy at least one of `tag_sets`.
pub async fn members_satisfying_tag_sets<V>(
  tag_sets: &[TagSet],
  config: &MongoConfiguration,
  vars: &V,
) -> io::Result<Vec<Member>>
where
  V: VariableSpace,
{
  let members = replica_set_member_records(config, vars).await?;
  Ok(crate::topology::match_members(tag_sets, &members))
}

/// The addresses of the replica set members. The driver discovers these on its own when connecting;
/// this is meant for display.
pub async fn replica_set_members<V>(config: &MongoConfiguration, vars: &V) -> io::Result<Vec<ServerAddress>>
where
  V: VariableSpace,
{
  log::info!("querying for replica set members of '{}'", config.hosts);

  replica_set_member_records(config, vars)
    .await?
    .iter()
    .filter(|member| !member.host.trim().is_empty())
    .map(Member::server_address)
    .collect()
}

/// The names of custom `getLastErrorModes` defined on the replica set; these can be used as the `w`
/// value of a write concern alongside numbers and `majority`.
pub async fn last_error_modes<V>(config: &MongoConfiguration, vars: &V) -> io::Result<Vec<String>>
where
  V: VariableSpace,
{
  Ok(
    replica_set_config(config, vars)
      .await?
      .map(|document| crate::topology::last_error_modes(&document))
      .unwrap_or_default(),
  )
}

/// Lists the databases visible to the configured user.
pub async fn database_names<V>(
  config: &InputConfiguration,
  vars: &V,
  login: &dyn KerberosLogin,
) -> io::Result<Vec<String>>
where
  V: VariableSpace,
{
  let principal = vars.substitute_opt(config.mongo.username.as_deref());
  let context = AuthContext::create(config.mongo.use_kerberos, principal.as_deref(), login)?;

  context
    .run("retrieve database names", async {
      let credential = crate::credentials::credential_for(&config.mongo, vars);
      let (client, socket_timeout) = open(&ConnectionRequest::from(config), credential, vars).await?;
      bounded(socket_timeout, client.list_database_names(None, None)).await
    })
    .await
}

/// Lists the collections of `database`. Password credentials are sourced on that database.
pub async fn collection_names<V>(
  config: &InputConfiguration,
  vars: &V,
  login: &dyn KerberosLogin,
  database: &str,
) -> io::Result<Vec<String>>
where
  V: VariableSpace,
{
  let principal = vars.substitute_opt(config.mongo.username.as_deref());
  let context = AuthContext::create(config.mongo.use_kerberos, principal.as_deref(), login)?;
  let description = format!("retrieve collection names for database '{database}'");

  context
    .run(&description, async {
      let username = vars.substitute_opt(config.mongo.username.as_deref());
      let password = vars.substitute_opt(config.mongo.password.as_deref());
      let credential = crate::credentials::create_credential(
        username.as_deref(),
        password.as_deref(),
        Some(database),
        config.mongo.use_kerberos,
      );

      let (client, socket_timeout) = open(&ConnectionRequest::from(config), credential, vars).await?;
      bounded(socket_timeout, client.database(database).list_collection_names(None)).await
    })
    .await
}
