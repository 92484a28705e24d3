use clap::Parser;
use geo_manifest::{Cli, GeoManifest, GeoManifestError, OutputFormatter, OutputMode, UserFriendlyError};
use std::path::PathBuf;
use std::process;

const DEFAULT_CONFIG_PATH: &str = "geo-manifest.toml";

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let geo_manifest = match GeoManifest::from_cli(&cli) {
        Ok(geo_manifest) => geo_manifest,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    if cli.dry_run {
        return handle_dry_run(&geo_manifest);
    }

    match geo_manifest.run() {
        Ok(report) => {
            geo_manifest.output_formatter().print_run_report(&report);
            0
        }
        Err(e) => {
            log::error!("Manifest update failed: {}", e);
            geo_manifest.handle_error(&e);
            1
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    match GeoManifest::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!("  geo-manifest --config {}", config_path.display());
            println!("\nEdit the [[sources]] tables to point at other upstreams.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(geo_manifest: &GeoManifest) -> i32 {
    let formatter = geo_manifest.output_formatter();
    let config = geo_manifest.config();

    formatter.warning("DRY RUN MODE - nothing will be cloned or written");
    formatter.print_separator();

    println!("Base directory: {}", config.base_directory().display());
    println!("Output directory: {}", config.output_directory().display());
    println!(
        "Clone backend: {:?} ({})",
        config.git.backend, config.git.program
    );
    if let Some(depth) = config.git.depth {
        println!("Clone depth: {}", depth);
    }
    println!("Cleanup checkouts: {}", config.workspace.cleanup_checkouts);

    formatter.print_separator();

    for source in &config.sources {
        println!("Source {}:", source.name);
        println!("  Repository: {}", source.url);
        if let Some(ref branch) = source.branch {
            println!("  Branch: {}", branch);
        }
        println!("  Checkout: {}", config.checkout_path(source).display());
        println!("  Folder: {}", config.source_folder(source).display());
        println!(
            "  Manifest: {} -> {}",
            config.staging_manifest_path(source).display(),
            config.output_directory().join(&source.manifest).display()
        );
        if !source.suffixes.is_empty() {
            println!(
                "  Suffixes: {} ({:?})",
                source.suffixes.join(", "),
                source.suffix_mode
            );
        }
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    0
}

fn print_startup_error(error: &GeoManifestError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(cli: &Cli) {
    let env = env_logger::Env::default().default_filter_or(cli.log_filter());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init()
        .ok();
}
