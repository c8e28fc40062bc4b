use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use depot::archive::ZipExtractor;
use depot::catalog::{CatalogPackage, RemoteCatalog};
use depot::cleanup;
use depot::config::EngineConfig;
use depot::engine::{
    Engine, InstallOutcome, SelfUpdateOutcome, UninstallOutcome, UpdateOutcome,
};
use depot::hooks::ProcessHookRunner;
use depot::http::HttpClient;
use depot::package::PackageId;
use depot::runtime::RealRuntime;

type CliEngine = Engine<RealRuntime, RemoteCatalog, ZipExtractor, ProcessHookRunner>;

/// depot - a catalog-driven package manager
///
/// Installs, updates and removes packages published in a remote catalog,
/// keeping a local registry of what is installed and which packages
/// depend on each other.
///
/// Examples:
///   depot install Acme@tool          # Install the latest version
///   depot install Acme@tool 1.2.0    # Install a specific version
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (overrides defaults; also via DEPOT_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "DEPOT_ROOT",
        value_name = "PATH",
        global = true
    )]
    install_root: Option<PathBuf>,

    /// Catalog index URL (defaults to the public index)
    #[arg(long = "catalog-url", value_name = "URL", global = true)]
    catalog_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a package, optionally at a specific version
    Install {
        /// The package identity in the format "author@name"
        #[arg(value_name = "AUTHOR@NAME")]
        id: String,
        /// Exact version name; the catalog's latest when omitted
        #[arg(value_name = "VERSION")]
        version: Option<String>,
    },

    /// Uninstall a package
    #[command(alias = "remove")]
    Uninstall {
        #[arg(value_name = "AUTHOR@NAME")]
        id: String,
    },

    /// Update a package to the latest catalog version
    Update {
        #[arg(value_name = "AUTHOR@NAME")]
        id: String,
    },

    /// Update every installed package
    UpdateAll,

    /// Reinstall the currently-installed version of a package
    Repair {
        #[arg(value_name = "AUTHOR@NAME")]
        id: String,
    },

    /// Remove packages whose former dependents are all gone
    Autoremove,

    /// Show which installed packages depend on the given one
    WhoDepends {
        #[arg(value_name = "AUTHOR@NAME")]
        id: String,
    },

    /// List installed packages
    List,

    /// List every package in the catalog
    ListAll,

    /// Search the catalog by name
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// List the available versions of a package
    Versions {
        #[arg(value_name = "AUTHOR@NAME")]
        id: String,
    },

    /// Update depot itself
    SelfUpdate,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let runtime = RealRuntime;
    let config = EngineConfig::resolve(&runtime, cli.install_root, cli.catalog_url)?;
    let http = HttpClient::new(reqwest::Client::new());
    let catalog = RemoteCatalog::new(http.clone(), Some(config.catalog_url.clone()));

    // interrupts turn into a clean abort: temp artifacts are released and
    // the process exits with the conventional status
    let cleanup_ctx = cleanup::new_shared();
    let cleanup_for_signal = Arc::clone(&cleanup_ctx);
    let ctrl_c_handler = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cleaning up...");
            cleanup_for_signal.lock().unwrap().cleanup();
            std::process::exit(130);
        }
    });

    let engine = Engine::new(
        runtime,
        catalog,
        ZipExtractor,
        ProcessHookRunner,
        http,
        config,
        cleanup_ctx,
    );
    let result = dispatch(&engine, cli.command).await;

    ctrl_c_handler.abort();
    result
}

async fn dispatch(engine: &CliEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Install { id, version } => {
            let id: PackageId = id.parse()?;
            match engine.install(&id, version.as_deref()).await? {
                InstallOutcome::Installed { version } => {
                    println!("   installed {} {}", id, version);
                }
                InstallOutcome::AlreadyInstalled => {
                    println!("   {} is already installed", id);
                }
            }
        }

        Commands::Uninstall { id } => {
            let id: PackageId = id.parse()?;
            match engine.uninstall(&id)? {
                UninstallOutcome::Uninstalled { version } => {
                    println!("   removed {} {}", id, version);
                }
                UninstallOutcome::NotFound => {
                    println!("   {} is not installed", id);
                }
            }
        }

        Commands::Update { id } => {
            let id: PackageId = id.parse()?;
            match engine.update(&id).await? {
                UpdateOutcome::Installed { version } => {
                    println!("   installed {} {}", id, version);
                }
                UpdateOutcome::Updated { from, to } => {
                    println!("   updated {} {} -> {}", id, from, to);
                }
                UpdateOutcome::UpToDate { version } => {
                    println!("   {} is already at {}", id, version);
                }
            }
        }

        Commands::UpdateAll => {
            let report = engine.update_all().await?;
            for (id, from, to) in &report.updated {
                println!("   updated {} {} -> {}", id, from, to);
            }
            for id in &report.skipped {
                println!("   skipped {} (not in the catalog)", id);
            }
            if report.updated.is_empty() && report.failed.is_empty() {
                println!("   everything is up to date");
            }
            if !report.failed.is_empty() {
                for (id, error) in &report.failed {
                    eprintln!("   failed {}: {}", id, error);
                }
                anyhow::bail!("{} package(s) failed to update", report.failed.len());
            }
        }

        Commands::Repair { id } => {
            let id: PackageId = id.parse()?;
            if let InstallOutcome::Installed { version } = engine.repair(&id).await? {
                println!("   repaired {} {}", id, version);
            }
        }

        Commands::Autoremove => {
            let removed = engine.autoremove()?;
            println!("   removed {} orphaned package(s)", removed);
        }

        Commands::WhoDepends { id } => {
            let id: PackageId = id.parse()?;
            let dependents = engine.who_depends_on(&id)?;
            if dependents.is_empty() {
                println!("   no installed package depends on {}", id);
            } else {
                for dependent in dependents {
                    println!("   {}", dependent);
                }
            }
        }

        Commands::List => {
            let installed = engine.installed()?;
            if installed.is_empty() {
                println!("   no packages installed");
            } else {
                for manifest in installed {
                    println!(
                        "   {} ({}): {}",
                        manifest.id_string(),
                        manifest.version,
                        manifest.description
                    );
                }
            }
        }

        Commands::ListAll => {
            for package in engine.available().await? {
                print_catalog_line(&package);
            }
        }

        Commands::Search { query } => {
            let matches = engine.search(&query).await?;
            if matches.is_empty() {
                println!("   no packages match '{}'", query);
            } else {
                for package in matches {
                    print_catalog_line(&package);
                }
            }
        }

        Commands::Versions { id } => {
            let id: PackageId = id.parse()?;
            let entry = engine.versions_of(&id).await?;
            for record in &entry.versions {
                let tag = if record.latest { " (latest)" } else { "" };
                println!("   {}{}", record.version, tag);
            }
        }

        Commands::SelfUpdate => {
            match engine.self_update(env!("CARGO_PKG_VERSION")).await? {
                SelfUpdateOutcome::Updated { from, to } => {
                    println!("   updated depot {} -> {}", from, to);
                }
                SelfUpdateOutcome::UpToDate { version } => {
                    println!("   depot {} is up to date", version);
                }
            }
        }
    }

    Ok(())
}

fn print_catalog_line(package: &CatalogPackage) {
    let description = if package.description.is_empty() {
        "(no description)"
    } else {
        &package.description
    };
    println!("   {}: {}", package.id_string(), description);
}
