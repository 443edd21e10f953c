use anyhow::Result;
use clap::Parser;
use modstrap::config::Config;
use modstrap::package::PackageSpec;
use std::path::PathBuf;

/// modstrap - package bootstrap and environment-module registration
///
/// Fetches and builds the packages listed in a manifest exactly once, then
/// writes a modulefile for each so `module load name/version` exposes it.
///
/// Examples:
///   modstrap install              # Install and register every package in ./modstrap.toml
///   modstrap install toolA@1.1.0  # Install one package at an overridden version
///   modstrap avail                # List registered modules
#[derive(Parser, Debug)]
#[command(author, version = env!("MODSTRAP_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (also via MODSTRAP_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "MODSTRAP_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// Directory that receives modulefiles (also via MODSTRAP_MODULE_ROOT)
    #[arg(
        long = "module-root",
        short = 'm',
        env = "MODSTRAP_MODULE_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub module_root: Option<PathBuf>,

    /// Package manifest (defaults to ./modstrap.toml; also via MODSTRAP_MANIFEST)
    #[arg(
        long = "manifest",
        short = 'f',
        env = "MODSTRAP_MANIFEST",
        value_name = "FILE",
        global = true
    )]
    pub manifest: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch, build and register packages (all manifest packages if none are named)
    Install(PackagesArgs),

    /// Register modules for packages that are already installed
    Register(PackagesArgs),

    /// Show install and registration state
    Status(PackagesArgs),

    /// List modules registered under the module root
    Avail,

    /// Print the modulefile for a package without writing it
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct PackagesArgs {
    /// Packages in the format "name" or "name@version"
    #[arg(value_name = "NAME[@VERSION]")]
    pub packages: Vec<PackageSpec>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Package in the format "name" or "name@version"
    #[arg(value_name = "NAME[@VERSION]")]
    pub package: PackageSpec,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let runtime = modstrap::runtime::RealRuntime;
    let config = Config::resolve(&runtime, cli.install_root, cli.module_root, cli.manifest)?;

    match cli.command {
        Commands::Install(args) => {
            modstrap::commands::install(&runtime, &config, &args.packages).await?
        }
        Commands::Register(args) => modstrap::commands::register(&runtime, &config, &args.packages)?,
        Commands::Status(args) => modstrap::commands::status(&runtime, &config, &args.packages)?,
        Commands::Avail => modstrap::commands::avail(&runtime, &config)?,
        Commands::Show(args) => modstrap::commands::show(&runtime, &config, &args.package)?,
    }
    Ok(())
}
