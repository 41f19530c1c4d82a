//! # qdev CLI entry point
//!
//! Parses CLI arguments with clap and routes verbs to the library modules.
//! Every verb accepts the same build-directory/build-type/generator/Qt-prefix
//! overrides; whatever the command line omits is filled in from the persisted
//! settings file.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use inquire::Select;

use qdev::process::run_command;
use qdev::project;
use qdev::qt;
use qdev::settings::{KNOWN_KEYS, SettingsStore};
use qdev::toolchain::ToolchainProbe;
use qdev::updates;
use qdev::verify;

#[derive(Parser)]
#[command(name = "qdev")]
#[command(about = "CMake/Qt development workflow helper", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Shared overrides, available to every verb. Anything left unset falls back
/// to the settings file, then to the built-in defaults.
#[derive(Args, Debug, Clone)]
struct Overrides {
    /// Build directory (default: settings file or ./build)
    #[arg(long, global = true)]
    build_dir: Option<PathBuf>,

    /// CMAKE_BUILD_TYPE for single-config generators (default: settings file or Debug)
    #[arg(long, global = true)]
    build_type: Option<String>,

    /// --config value for multi-config generators
    #[arg(long, global = true)]
    config: Option<String>,

    /// Path to the Qt installation root
    #[arg(long, global = true)]
    qt_prefix: Option<String>,

    /// CMake generator to use
    #[arg(long, global = true)]
    generator: Option<String>,

    /// Automatically run download_qt6.py when Qt is not found
    #[arg(long, global = true)]
    download_qt_if_missing: bool,

    /// Qt version to fetch when auto-downloading
    #[arg(long, global = true)]
    download_qt_version: Option<String>,

    /// Qt compiler flavor/arch for auto-download (e.g. win64_mingw)
    #[arg(long, global = true)]
    download_qt_compiler: Option<String>,

    /// Where to place auto-downloaded Qt (default: settings file or third_party/qt6)
    #[arg(long, global = true)]
    download_qt_output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure (if needed) and build the project
    Build {
        /// Specific targets to build (default: all)
        #[arg(long = "target")]
        targets: Vec<String>,
    },
    /// Build and run tests via ctest
    Test {
        /// Arguments passed through to ctest
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        ctest_args: Vec<String>,
    },
    /// Build (unless --skip-build) and run a built target
    Run {
        /// Executable target to run (omit to pick from the detected list)
        target: Option<String>,
        /// Run without rebuilding first
        #[arg(long)]
        skip_build: bool,
        /// Arguments passed to the executable after '--'
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        program_args: Vec<String>,
    },
    /// Check the environment (compiler, cmake, generator, Qt prefix) and suggest fixes
    Verify,
    /// Check Qt and vendored libraries for newer upstream releases
    CheckUpdates,
    /// Fetch Qt using the bundled download_qt6.py helper
    DownloadQt {
        /// Qt version to download
        #[arg(long)]
        qt_version: Option<String>,
        /// Qt compiler flavor/arch (e.g. win64_mingw, win64_msvc2022_64)
        #[arg(long)]
        compiler: Option<String>,
        /// Destination directory (default: settings file or third_party/qt6)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Mirror base URL to pass through to download_qt6.py
        #[arg(long)]
        base_url: Option<String>,
        /// Also download Ninja and CMake via the Qt maintenance archives
        #[arg(long)]
        with_tools: bool,
    },
    /// View or edit persisted defaults
    Settings {
        /// Update a setting (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Reset a setting back to its built-in default (repeatable)
        #[arg(long = "unset", value_name = "KEY")]
        unset: Vec<String>,
    },
}

/// CLI overrides merged with the settings file, paths anchored at the
/// project root.
struct ResolvedOptions {
    build_dir: PathBuf,
    build_type: String,
    config: Option<String>,
    qt_prefix: Option<String>,
    generator: Option<String>,
    download_qt_if_missing: bool,
    download_qt_version: Option<String>,
    download_qt_compiler: Option<String>,
    download_qt_output_dir: PathBuf,
}

fn resolve_options(root: &Path, overrides: &Overrides, store: &SettingsStore) -> ResolvedOptions {
    let settings = store.settings();
    let anchored = |path: PathBuf| {
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    };

    ResolvedOptions {
        build_dir: anchored(
            overrides
                .build_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.build_dir)),
        ),
        build_type: overrides
            .build_type
            .clone()
            .unwrap_or_else(|| settings.build_type.clone()),
        config: overrides.config.clone(),
        qt_prefix: overrides
            .qt_prefix
            .clone()
            .or_else(|| settings.qt_prefix.clone()),
        generator: overrides
            .generator
            .clone()
            .or_else(|| settings.generator.clone()),
        download_qt_if_missing: overrides.download_qt_if_missing,
        download_qt_version: overrides
            .download_qt_version
            .clone()
            .or_else(|| settings.download_qt_version.clone()),
        download_qt_compiler: overrides
            .download_qt_compiler
            .clone()
            .or_else(|| settings.download_qt_compiler.clone()),
        download_qt_output_dir: anchored(
            overrides
                .download_qt_output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.download_qt_output_dir)),
        ),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("cannot determine the current directory")?;
    let mut store = SettingsStore::load_default();
    let opts = resolve_options(&root, &cli.overrides, &store);
    let mut probe = ToolchainProbe::new();

    let command = cli
        .command
        .unwrap_or(Commands::Build { targets: Vec::new() });

    match command {
        Commands::Settings { set, unset } => handle_settings(&mut store, &set, &unset),

        Commands::DownloadQt {
            qt_version,
            compiler,
            output_dir,
            base_url,
            with_tools,
        } => {
            // Match the downloaded binaries to the active toolchain when the
            // caller did not say otherwise.
            let mut compiler = compiler.or(opts.download_qt_compiler);
            if compiler.is_none()
                && cfg!(windows)
                && probe.detect_compiler_flavor(None)
                    == Some(qdev::toolchain::ToolchainFlavor::Mingw)
            {
                compiler = Some("win64_mingw".to_string());
            }
            let output_dir = output_dir
                .map(|dir| if dir.is_absolute() { dir } else { root.join(dir) })
                .unwrap_or(opts.download_qt_output_dir);
            qt::download_qt_with_helper(
                &root,
                &qt::QtDownloadRequest {
                    version: qt_version.or(opts.download_qt_version).as_deref(),
                    compiler: compiler.as_deref(),
                    output_dir: &output_dir,
                    base_url: base_url.as_deref(),
                    with_tools,
                },
            )
        }

        Commands::Verify => {
            let ok = verify::verify_environment(
                &root,
                opts.qt_prefix.as_deref(),
                opts.generator.as_deref(),
                &opts.build_dir,
                &mut probe,
            );
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::CheckUpdates => {
            let ok = updates::check_library_updates(&root, opts.qt_prefix.as_deref(), &mut probe);
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Build { targets } => {
            let (generator, _) = prepare_build(&root, &opts, &mut probe)?;
            project::build_targets(
                &opts.build_dir,
                generator.as_deref(),
                &opts.build_type,
                &targets,
                opts.config.as_deref(),
            )
        }

        Commands::Test { ctest_args } => {
            let (generator, _) = prepare_build(&root, &opts, &mut probe)?;
            project::build_targets(
                &opts.build_dir,
                generator.as_deref(),
                &opts.build_type,
                &[],
                opts.config.as_deref(),
            )?;
            project::run_ctest(
                &opts.build_dir,
                generator.as_deref(),
                &opts.build_type,
                opts.config.as_deref(),
                &ctest_args,
            )
        }

        Commands::Run {
            target,
            skip_build,
            program_args,
        } => {
            let (generator, _) = prepare_build(&root, &opts, &mut probe)?;
            let available = project::list_runnable_targets(
                &opts.build_dir,
                generator.as_deref(),
                &opts.build_type,
                opts.config.as_deref(),
                &store.settings().default_run_targets,
            );

            let target = match target {
                Some(target) => target,
                None => {
                    if available.is_empty() {
                        bail!("no runnable targets detected in {}", opts.build_dir.display());
                    }
                    if !std::io::stdin().is_terminal() {
                        bail!("No target provided and input is not interactive.");
                    }
                    Select::new("Select target to run", available).prompt()?
                }
            };

            if !skip_build {
                project::build_targets(
                    &opts.build_dir,
                    generator.as_deref(),
                    &opts.build_type,
                    std::slice::from_ref(&target),
                    opts.config.as_deref(),
                )?;
            }
            let exe_path = project::find_built_binary(
                &opts.build_dir,
                &target,
                generator.as_deref(),
                &opts.build_type,
                opts.config.as_deref(),
            )?;

            let mut argv = vec![exe_path.to_string_lossy().into_owned()];
            argv.extend(program_args);
            run_command(&argv, None)
        }
    }
}

/// The shared front half of build/test/run: detect the generator, resolve
/// (and optionally fetch) Qt, enforce the toolchain match, and configure.
fn prepare_build(
    root: &Path,
    opts: &ResolvedOptions,
    probe: &mut ToolchainProbe,
) -> Result<(Option<String>, Option<PathBuf>)> {
    let generator = probe.detect_generator(opts.generator.as_deref());
    // An explicit generator (CLI, settings, or env) must not be silently
    // swapped for a cached one; auto-detected ones may.
    let generator_is_strict =
        opts.generator.is_some() || std::env::var_os("CMAKE_GENERATOR").is_some();

    let auto = qt::QtAutoDownload {
        enabled: opts.download_qt_if_missing,
        version: opts.download_qt_version.as_deref(),
        compiler: opts.download_qt_compiler.as_deref(),
        output_dir: &opts.download_qt_output_dir,
    };
    let qt_prefix = qt::ensure_qt_prefix(
        root,
        opts.qt_prefix.as_deref(),
        generator.as_deref(),
        &auto,
        probe,
    )?;
    qt::enforce_qt_toolchain_match(probe, qt_prefix.as_deref(), generator.as_deref())?;

    let generator = project::configure_project(
        root,
        &opts.build_dir,
        generator,
        &opts.build_type,
        qt_prefix.as_deref(),
        generator_is_strict,
    )?;
    Ok((generator, qt_prefix))
}

fn handle_settings(store: &mut SettingsStore, set: &[String], unset: &[String]) -> Result<()> {
    let updates: Vec<(String, String)> = set
        .iter()
        .map(|item| parse_setting_arg(item))
        .collect::<Result<_>>()?;

    if !updates.is_empty() || !unset.is_empty() {
        store.set(&updates, unset)?;
        println!("Updated settings.");
    }
    print_settings(store);
    Ok(())
}

fn parse_setting_arg(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
        None => bail!(
            "invalid --set '{}': must be KEY=VALUE (valid keys: {})",
            arg,
            KNOWN_KEYS.join(", ")
        ),
    }
}

fn print_settings(store: &SettingsStore) {
    println!("Settings file: {}", store.path().display());
    for (key, value) in store.settings().sorted_entries() {
        println!("  {}: {}", key, value);
    }
}
