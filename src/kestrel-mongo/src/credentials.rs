use crate::variables::VariableSpace;
use mongodb::options::{AuthMechanism, Credential};

/// Creates the credential used to authenticate a client, if any. Kerberos only needs a principal;
/// standard authentication is sourced on `database` and leaves the mechanism to driver
/// negotiation.
pub fn create_credential(
  username: Option<&str>,
  password: Option<&str>,
  database: Option<&str>,
  kerberos: bool,
) -> Option<Credential> {
  let username = username.filter(|inner| !inner.is_empty());
  let password = password.filter(|inner| !inner.is_empty());

  if kerberos {
    let principal = username?;
    let mut credential = Credential::default();
    credential.username = Some(principal.to_string());
    credential.source = Some(crate::constants::EXTERNAL_AUTH_SOURCE.to_string());
    credential.mechanism = Some(AuthMechanism::Gssapi);
    return Some(credential);
  }

  if username.is_none() && password.is_none() {
    return None;
  }

  let mut credential = Credential::default();
  credential.username = username.map(String::from);
  credential.password = Some(password.unwrap_or_default().to_string());
  credential.source = database.filter(|inner| !inner.is_empty()).map(String::from);
  Some(credential)
}

/// Creates the credential for a step configuration, resolving variables in the username and
/// password first.
pub fn credential_for<V>(config: &crate::config::MongoConfiguration, vars: &V) -> Option<Credential>
where
  V: VariableSpace,
{
  let username = vars.substitute_opt(config.username.as_deref());
  let password = vars.substitute_opt(config.password.as_deref());
  let database = vars.substitute_opt(config.database.as_deref());

  create_credential(
    username.as_deref(),
    password.as_deref(),
    database.as_deref(),
    config.use_kerberos,
  )
}

/// The replica set configuration lives in the `local` database; password based credentials need to
/// be sourced there when reading it. Kerberos credentials are returned untouched.
pub fn for_local_database(credential: Option<Credential>) -> Option<Credential> {
  credential.map(|mut inner| {
    if !matches!(inner.mechanism, Some(AuthMechanism::Gssapi)) {
      inner.source = Some(crate::constants::LOCAL_DB.to_string());
    }
    inner
  })
}
