use kestrel::variables::VariableSpace;
use serde::Deserialize;
use std::io;

/// The cli tool's configuration schema: the same step configuration the pipeline engine uses for
/// its mongo input step, plus optional variables.
#[derive(Deserialize, Debug)]
pub struct CommandLineConfig {
  /// The mongo input step configuration.
  pub input: kestrel::config::InputConfiguration,
  /// Extra variables, layered over the process environment.
  pub variables: Option<std::collections::HashMap<String, String>>,
}

impl CommandLineConfig {
  /// Builds the variable space used to resolve configuration values.
  pub fn variables(&self) -> kestrel::variables::Variables {
    let mut vars = kestrel::variables::Variables::from_env();

    for (name, value) in self.variables.iter().flatten() {
      vars.set(name.as_str(), value.as_str());
    }

    vars
  }
}

/// Prints every tag pair defined across the replica set.
pub async fn print_tags(config: &CommandLineConfig) -> io::Result<()> {
  let vars = config.variables();
  let mut tags = kestrel::connection::all_tags(&config.input.mongo, &vars)
    .await?
    .into_iter()
    .collect::<Vec<String>>();
  tags.sort();

  println!("number of tags: {}", tags.len());
  for tag in tags {
    println!("{tag}");
  }

  Ok(())
}

/// Prints the replica set members.
pub async fn print_members(config: &CommandLineConfig) -> io::Result<()> {
  let vars = config.variables();
  let members = kestrel::connection::replica_set_member_records(&config.input.mongo, &vars).await?;

  println!("number of replica set members: {}", members.len());
  for member in members {
    println!("- {member}");
  }

  Ok(())
}

/// Prints the custom write concern modes of the replica set.
pub async fn print_error_modes(config: &CommandLineConfig) -> io::Result<()> {
  let vars = config.variables();
  let modes = kestrel::connection::last_error_modes(&config.input.mongo, &vars).await?;

  if modes.is_empty() {
    println!("no custom write concern modes defined");
  }

  for mode in modes {
    println!("{mode}");
  }

  Ok(())
}

/// Prints the members matching at least one of the given tag sets.
pub async fn print_matching(config: &CommandLineConfig, tag_sets: &[String]) -> io::Result<()> {
  let vars = config.variables();
  let tag_sets = kestrel::options::parse_tag_sets(tag_sets)?;
  let members = kestrel::connection::members_satisfying_tag_sets(&tag_sets, &config.input.mongo, &vars).await?;

  if members.is_empty() {
    println!("no replica set members satisfy the tag sets");
  }

  for member in members {
    println!("- {member}");
  }

  Ok(())
}

/// Prints the databases visible to the configured user.
pub async fn print_databases(config: &CommandLineConfig) -> io::Result<()> {
  let vars = config.variables();
  let names = kestrel::connection::database_names(&config.input, &vars, &kestrel::auth::TicketCache).await?;

  for name in names {
    println!("{name}");
  }

  Ok(())
}

/// Prints the collections of a database, defaulting to the configured one.
pub async fn print_collections(config: &CommandLineConfig, database: Option<String>) -> io::Result<()> {
  let vars = config.variables();
  let database = database
    .or_else(|| vars.substitute_opt(config.input.mongo.database.as_deref()))
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no database given or configured"))?;

  let names =
    kestrel::connection::collection_names(&config.input, &vars, &kestrel::auth::TicketCache, &database).await?;

  for name in names {
    println!("{name}");
  }

  Ok(())
}
