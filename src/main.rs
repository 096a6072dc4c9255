use clap::Parser;
use jiradump::{Cli, Config, ExportError, JiraDump, OutputFormatter, OutputMode, Query, UserFriendlyError};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Create JiraDump instance
    let jiradump = match JiraDump::from_cli(&cli) {
        Ok(jiradump) => jiradump,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    // Handle dry run mode
    if cli.dry_run {
        return handle_dry_run(&cli, jiradump.config(), jiradump.output_formatter());
    }

    // Resolve tracker, credentials, and query (may prompt interactively)
    let target = match cli.resolve_target() {
        Ok(target) => target,
        Err(e) => {
            jiradump.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    // Execute main export workflow
    match jiradump.run_export(&target) {
        Ok(report) => {
            jiradump.output_formatter().print_export_report(&report);

            // Return appropriate exit code
            if report.cell_errors.is_empty() {
                0 // Success
            } else {
                2 // Success with warnings
            }
        }
        Err(e) => {
            jiradump.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

// Map error types to appropriate exit codes
fn exit_code_for(error: &ExportError) -> i32 {
    match error {
        ExportError::Cancelled => 130, // Interrupted (SIGINT)
        ExportError::InvalidUrl { .. } | ExportError::Config { .. } => 2,
        ExportError::MissingOrderClause { .. } => 3,
        ExportError::Authentication { .. } => 4,
        ExportError::Fetch { .. } | ExportError::Network { .. } => 5,
        ExportError::Markup { .. } => 6,
        _ => 1, // General error
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "jiradump.toml".to_string());

    match JiraDump::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  jiradump --project <KEY> --config {}", config_path);
            println!("\nEdit the file to customize user renames and output settings.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(cli: &Cli, config: &Config, formatter: &OutputFormatter) -> i32 {
    formatter.info("DRY RUN MODE - The tracker will not be contacted");
    formatter.print_separator();

    // Validate the tracker URL if one is already known
    match &cli.jira_url {
        Some(url) => formatter.success(&format!("✓ Tracker URL is valid: {}", url)),
        None => formatter.warning("No tracker URL given yet; a real run would ask for it"),
    }

    // Display configuration that would be used
    formatter.info("Configuration that would be used:");

    println!("  Max issues per search: {}", config.tracker.max_issues);
    println!(
        "  Nested columns: {}",
        config.tracker.nested_columns.join(", ")
    );
    println!(
        "  Destination base URL: {}",
        config.export.destination_base_url
    );
    println!(
        "  Output directory: {}",
        config.output.base_directory.display()
    );
    println!("  User renames: {}", config.mapping.users.len());
    println!("  Request timeout: {} seconds", config.tracker.timeout);

    formatter.print_separator();

    // Show the query a real run would partition
    let plan = match (&cli.filter, &cli.project) {
        (Some(filter), _) => match Query::new(filter) {
            Ok(query) => Some(("custom".to_string(), query)),
            Err(e) => {
                formatter.error(&format!("✗ {}", e.user_message()));
                return exit_code_for(&e);
            }
        },
        (None, Some(project)) => Some((project.clone(), Query::for_project(project))),
        (None, None) => None,
    };

    formatter.info("Export plan:");
    match plan {
        Some((label, query)) => {
            println!("  Artifact label: {}", label.to_lowercase());
            println!("  Filter: {}", query);
        }
        None => {
            println!("  No project or filter given yet; a real run would ask for one");
        }
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to perform the actual export");

    0
}

fn print_startup_error(error: &ExportError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
