use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(author, version = option_env!("KESTREL_VERSION").unwrap_or("dev"), about, long_about = None)]
struct CommandLineArguments {
  #[clap(short, long, default_value = "env.toml")]
  config: String,

  #[command(subcommand)]
  command: CommandLineCommand,
}

#[derive(clap::Subcommand)]
enum CommandLineCommand {
  /// Prints every tag pair defined across the replica set.
  Tags,
  /// Prints the replica set members and their tags.
  Members,
  /// Prints custom write concern modes defined on the replica set.
  ErrorModes,
  /// Prints the replica set members satisfying at least one tag set.
  Matching {
    /// A tag set as a JSON object, e.g '{ "dc" : "east" }'. May be repeated.
    #[clap(short, long = "tag-set", required = true)]
    tag_sets: Vec<String>,
  },
  /// Prints the databases visible to the configured user.
  Databases,
  /// Prints the collections of a database.
  Collections {
    /// The database to list; defaults to the configured one.
    #[clap(short, long)]
    database: Option<String>,
  },
}

async fn run(args: CommandLineArguments) -> anyhow::Result<()> {
  log::info!("attempting to load '{}'", args.config);

  let contents = async_std::fs::read_to_string(&args.config).await?;
  let config = toml::from_str::<cli::CommandLineConfig>(&contents).map_err(|error| {
    log::warn!("invalid toml config file - {error}");
    anyhow::anyhow!("bad-config: {error}")
  })?;

  match args.command {
    CommandLineCommand::Tags => cli::print_tags(&config).await?,
    CommandLineCommand::Members => cli::print_members(&config).await?,
    CommandLineCommand::ErrorModes => cli::print_error_modes(&config).await?,
    CommandLineCommand::Matching { tag_sets } => cli::print_matching(&config, &tag_sets).await?,
    CommandLineCommand::Databases => cli::print_databases(&config).await?,
    CommandLineCommand::Collections { database } => cli::print_collections(&config, database).await?,
  }

  Ok(())
}

fn main() -> anyhow::Result<()> {
  let load_env = std::fs::metadata(".env").map(|meta| meta.is_file()).unwrap_or(false);

  if load_env {
    let env_result = dotenv::dotenv();
    println!(".env loaded? {:?}", env_result.is_ok());
  }

  env_logger::init();
  log::info!("environment + logger ready.");
  let args = CommandLineArguments::parse();

  async_std::task::block_on(run(args))
}
