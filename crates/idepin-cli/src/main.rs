//! IDE-Pin - IDE image pinning CLI
//!
//! The `idepin` command keeps the IDE configmap pointed at the latest build
//! and records the installed IDE version in the product's pin history.
//!
//! ## Commands
//!
//! - `update`: Rewrite the default references and pin the new version
//! - `check`: Show which build slots differ from the latest build
//! - `resolve`: Print the IDE version an image installs
//! - `doctor`: Report availability of the external tools

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use idepin_core::{
    compare_builds, run_reconcile_pass, BuildSlots, PassOptions, ReconcileOutcome, ReconcilePass,
};
use idepin_image::{
    is_command_available, split_command, InspectConfig, InstallerVersionsSource,
    LabelVersionResolver, VersionsOrigin, DEFAULT_INSPECT_COMMAND, DEFAULT_REPOSITORY,
    DEFAULT_VERSION_LABEL,
};
use idepin_state::{
    BuildInfoSource, ConfigurationStore, JsonFileConfigurationStore, SlotSpec, VersionResolver,
    YamlDefaultVersionSource, DEFAULT_MARKER, DEFAULT_PRODUCT, DEFAULT_VERSION_KEY,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{info, Level};

const DEFAULT_CONFIGMAP: &str = "install/installer/pkg/components/ide-service/ide-configmap.json";
const DEFAULT_WORKSPACE_YAML: &str = "WORKSPACE.yaml";

#[derive(Parser)]
#[command(name = "idepin")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pin IDE image versions in the IDE configmap", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

/// Paths and collaborator settings shared by every command.
#[derive(Args, Debug, Clone)]
struct Settings {
    /// IDE configmap JSON to reconcile
    #[arg(long, global = true, env = "IDEPIN_CONFIGMAP", default_value = DEFAULT_CONFIGMAP)]
    configmap: PathBuf,

    /// Workspace YAML holding the default IDE version under `defaultArgs`
    #[arg(long, global = true, env = "IDEPIN_WORKSPACE_YAML", default_value = DEFAULT_WORKSPACE_YAML)]
    workspace_yaml: PathBuf,

    /// Product key under `ideOptions.options`
    #[arg(long, global = true, env = "IDEPIN_PRODUCT", default_value = DEFAULT_PRODUCT)]
    product: String,

    /// Key of the default version under `defaultArgs`
    #[arg(long, global = true, env = "IDEPIN_DEFAULT_VERSION_KEY", default_value = DEFAULT_VERSION_KEY)]
    default_version_key: String,

    /// Token preceding the build identifier in image references
    #[arg(long, global = true, env = "IDEPIN_MARKER", default_value = DEFAULT_MARKER)]
    marker: String,

    /// Read the installer versions manifest from a file
    #[arg(long, global = true, env = "IDEPIN_VERSIONS_FILE")]
    versions_file: Option<PathBuf>,

    /// Read the installer versions manifest from a command's stdout
    #[arg(long, global = true, env = "IDEPIN_VERSIONS_COMMAND")]
    versions_command: Option<String>,

    /// Fetch the installer versions manifest over HTTP(S)
    #[arg(long, global = true, env = "IDEPIN_VERSIONS_URL")]
    versions_url: Option<String>,

    /// Command printing an image's config JSON; the image reference is appended
    #[arg(long, global = true, env = "IDEPIN_INSPECT_COMMAND", default_value = DEFAULT_INSPECT_COMMAND)]
    inspect_command: String,

    /// Registry repository substituted for `{{.Repository}}`
    #[arg(long, global = true, env = "IDEPIN_REPOSITORY", default_value = DEFAULT_REPOSITORY)]
    repository: String,

    /// Image label carrying the installed IDE version
    #[arg(long, global = true, env = "IDEPIN_VERSION_LABEL", default_value = DEFAULT_VERSION_LABEL)]
    version_label: String,

    /// Installer component feeding the primary image
    #[arg(long, global = true, env = "IDEPIN_IMAGE_COMPONENT")]
    image_component: Option<String>,

    /// Installer component feeding an auxiliary layer, in layer order
    /// (`name=component` sets the slot name used in reports)
    #[arg(long, global = true, env = "IDEPIN_LAYER_COMPONENTS", value_delimiter = ',')]
    layer_component: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Point the default references at the latest build and pin its version
    Update {
        /// Reconcile and log the result without writing the configmap
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare the configured references with the latest build
    Check,

    /// Print the IDE version installed by an image
    Resolve {
        /// Image reference, may contain `{{.Repository}}`
        image: String,
    },

    /// Report whether the external tools are available
    Doctor,
}

impl Settings {
    /// Exactly one versions origin must be given.
    fn versions_origin(&self) -> Result<VersionsOrigin> {
        match (&self.versions_file, &self.versions_command, &self.versions_url) {
            (Some(path), None, None) => Ok(VersionsOrigin::File(path.clone())),
            (None, Some(command), None) => {
                let argv = split_command(command);
                if argv.is_empty() {
                    anyhow::bail!("--versions-command is empty");
                }
                Ok(VersionsOrigin::Command(argv))
            }
            (None, None, Some(url)) => Ok(VersionsOrigin::Url(url.clone())),
            (None, None, None) => anyhow::bail!(
                "No installer versions source: pass --versions-file, --versions-command or --versions-url"
            ),
            _ => anyhow::bail!(
                "Only one of --versions-file, --versions-command and --versions-url may be given"
            ),
        }
    }

    fn slots(&self) -> BuildSlots {
        let mut slots = BuildSlots::code();
        if let Some(component) = &self.image_component {
            slots.image = SlotSpec::new("image", component);
        }
        if !self.layer_component.is_empty() {
            let defaults = slots.layers.clone();
            slots.layers = self
                .layer_component
                .iter()
                .map(|value| layer_slot(value, &defaults))
                .collect();
        }
        slots
    }

    fn inspect_config(&self) -> InspectConfig {
        InspectConfig::new(&self.inspect_command)
            .with_repository(&self.repository)
            .with_label(&self.version_label)
    }

    fn build_source(&self) -> Result<InstallerVersionsSource> {
        let source = InstallerVersionsSource::new(self.versions_origin()?)
            .context("Failed to set up installer versions source")?;
        Ok(source.with_slots(self.slots()).with_marker(&self.marker))
    }

    fn configuration_store(&self) -> JsonFileConfigurationStore {
        JsonFileConfigurationStore::new(&self.configmap, &self.product)
    }
}

/// Parse a `--layer-component` value, `name=component` or a bare component.
///
/// A bare component keeps the name of the default slot it feeds, falling back
/// to the component itself.
fn layer_slot(value: &str, defaults: &[SlotSpec]) -> SlotSpec {
    if let Some((name, component)) = value.split_once('=') {
        return SlotSpec::new(name.trim(), component.trim());
    }
    let name = defaults
        .iter()
        .find(|slot| slot.component == value)
        .map(|slot| slot.name.as_str())
        .unwrap_or(value);
    SlotSpec::new(name, value)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    idepin_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Update { dry_run } => cmd_update(&cli.settings, dry_run).await,
        Commands::Check => cmd_check(&cli.settings).await,
        Commands::Resolve { image } => cmd_resolve(&cli.settings, &image).await,
        Commands::Doctor => cmd_doctor(&cli.settings),
    }
}

/// Run one reconcile pass against the configured files.
async fn run_update(settings: &Settings, dry_run: bool) -> Result<ReconcileOutcome> {
    let builds = settings.build_source()?;
    let resolver = LabelVersionResolver::new(settings.inspect_config());
    let store = settings.configuration_store();
    let defaults =
        YamlDefaultVersionSource::new(&settings.workspace_yaml, &settings.default_version_key);

    let pass = ReconcilePass {
        builds: &builds,
        resolver: &resolver,
        store: &store,
        defaults: &defaults,
    };
    let options = PassOptions {
        marker: settings.marker.clone(),
        slots: settings.slots(),
        dry_run,
    };

    run_reconcile_pass(pass, &options)
        .await
        .with_context(|| format!("Failed to update {}", settings.configmap.display()))
}

/// Update the configmap and print the default version.
async fn cmd_update(settings: &Settings, dry_run: bool) -> Result<()> {
    let outcome = run_update(settings, dry_run).await?;

    info!(
        "{} {} (pin: {})",
        if dry_run { "Checked" } else { "Updated" },
        settings.configmap.display(),
        outcome.pin
    );
    println!("{}", outcome.default_version);

    Ok(())
}

/// Per-slot change map of the configured references against the latest build.
async fn check_report(settings: &Settings) -> Result<Value> {
    let builds = settings.build_source()?;
    let store = settings.configuration_store();

    let configuration = store
        .load()
        .await
        .with_context(|| format!("Failed to load {}", settings.configmap.display()))?;
    let current = configuration.references()?;
    let latest = builds
        .fetch_latest()
        .await
        .context("Failed to fetch latest build info")?;

    let changes = compare_builds(&current, &latest);
    let mut slots = Map::new();
    for (slot, changed) in changes.named(builds.slots()) {
        slots.insert(slot, Value::Bool(changed));
    }

    Ok(json!({
        "product": configuration.product(),
        "installerVersion": latest.installer_version,
        "changed": changes.any_changed(),
        "slots": slots,
    }))
}

/// Print the change map as JSON. Never writes.
async fn cmd_check(settings: &Settings) -> Result<()> {
    let report = check_report(settings).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn resolve_version(settings: &Settings, image: &str) -> Result<String> {
    let resolver = LabelVersionResolver::new(settings.inspect_config());
    let version = resolver
        .resolve_installed_version(image)
        .await
        .with_context(|| format!("Failed to inspect {}", resolver.expand_reference(image)))?;

    if version.trim().is_empty() {
        anyhow::bail!(
            "Image {} has no {} label",
            resolver.expand_reference(image),
            settings.version_label
        );
    }
    Ok(version)
}

async fn cmd_resolve(settings: &Settings, image: &str) -> Result<()> {
    println!("{}", resolve_version(settings, image).await?);
    Ok(())
}

/// Show external tool availability
fn cmd_doctor(settings: &Settings) -> Result<()> {
    println!("idepin {}", idepin_core::VERSION);
    println!("==========");
    println!();

    let mut programs = Vec::new();
    if let Some(program) = split_command(&settings.inspect_command).into_iter().next() {
        programs.push(("Inspect command", program));
    }
    if let Some(command) = &settings.versions_command {
        if let Some(program) = split_command(command).into_iter().next() {
            programs.push(("Versions command", program));
        }
    }

    for (role, program) in &programs {
        let found = is_command_available(program);
        println!(
            "{} ({}): {}",
            role,
            program,
            if found { "available" } else { "NOT found" }
        );
    }

    println!(
        "Configmap ({}): {}",
        settings.configmap.display(),
        if settings.configmap.is_file() {
            "present"
        } else {
            "missing"
        }
    );
    println!(
        "Workspace YAML ({}): {}",
        settings.workspace_yaml.display(),
        if settings.workspace_yaml.is_file() {
            "present"
        } else {
            "missing"
        }
    );

    Ok(())
}
