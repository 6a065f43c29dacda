//! SceneLint command line
//!
//! Lists, validates and runs pre-render checklists.

use anyhow::{Context, Result};
use clap::Parser;
use scenelint::config::ResolverConfig;
use scenelint::resolver::{CommandResolver, PropertyResolver, SnapshotResolver};
use scenelint::rules::NodeKind;
use scenelint::{ChecklistRunner, Config, RuleTree, document, presets};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scenelint")]
#[command(author, version, about = "Pre-render checklist for 3D scenes")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rule document to use
    #[arg(short, long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the rule tree (default)
    List,

    /// Validate a rule document
    Check {
        /// Rule document to validate
        file: Option<PathBuf>,
    },

    /// Run all enabled checks
    Run {
        /// Attempt the fix action of every failed rule
        #[arg(long)]
        fix: bool,

        /// Resolve properties from a JSON scene snapshot
        #[arg(short, long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },

    /// List preset property paths
    Presets,

    /// Write a default config file and an empty rule document
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("SCENELINT_LOG").unwrap_or(log_level),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let rules_path = cli.rules.clone().or_else(|| config.rules_path());

    match cli.command {
        None | Some(Commands::List) => {
            let tree = load_rules(rules_path.as_deref())?;
            print_tree(&tree);
        }
        Some(Commands::Check { file }) => {
            let path = file
                .or(rules_path)
                .context("No rule document given and no default location available")?;
            match document::load(&path) {
                Ok(tree) => {
                    let rules = tree
                        .walk()
                        .iter()
                        .filter(|(_, id)| tree.get(*id).is_some_and(|n| !n.is_folder()))
                        .count();
                    println!("✓ Rule document is valid");
                    println!("  {} folders", tree.len() - rules);
                    println!("  {} rules", rules);
                }
                Err(e) => {
                    eprintln!("✗ Rule document error: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Run { fix, snapshot }) => {
            let tree = load_rules(rules_path.as_deref())?;
            let resolver = match snapshot {
                Some(path) => ResolverConfig::Snapshot { path: Some(path) },
                None => config.resolver.clone(),
            };

            let passed = match resolver {
                ResolverConfig::Snapshot { path } => {
                    let mut resolver = match path {
                        Some(path) => SnapshotResolver::from_file(&path)?,
                        None => anyhow::bail!(
                            "No scene snapshot configured; pass --snapshot or set resolver.path"
                        ),
                    };
                    run_checks(&tree, &mut resolver, fix)?
                }
                ResolverConfig::Command(command) => {
                    let mut resolver = CommandResolver::new(command);
                    run_checks(&tree, &mut resolver, fix)?
                }
            };

            if !passed && !fix {
                std::process::exit(1);
            }
        }
        Some(Commands::Presets) => {
            for (label, path) in presets::presets() {
                println!("  {:<22} {}", label, path);
            }
        }
        Some(Commands::Init { force }) => {
            let config_path = cli
                .config
                .clone()
                .or_else(Config::default_path)
                .context("Could not determine config path")?;
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {}; pass --force to overwrite",
                    config_path.display()
                );
            }
            config.save(Some(&config_path))?;
            println!("✓ Wrote config to {}", config_path.display());

            if let Some(path) = rules_path.filter(|p| !p.exists()) {
                document::save(&path, &mut RuleTree::new())?;
                println!("✓ Created empty rule document at {}", path.display());
            }
        }
    }

    Ok(())
}

/// Load the rule document, or start empty when it does not exist yet
fn load_rules(path: Option<&Path>) -> Result<RuleTree> {
    match path {
        Some(path) if path.exists() => document::load(path),
        Some(path) => {
            debug!("No rule document at {}, starting empty", path.display());
            Ok(RuleTree::new())
        }
        None => Ok(RuleTree::new()),
    }
}

fn print_tree(tree: &RuleTree) {
    if tree.is_empty() {
        println!("No rules defined");
        return;
    }

    println!("Rules:");
    for (depth, id) in tree.walk() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let status = if node.is_enabled() { "✓" } else { "✗" };
        let indent = "  ".repeat(depth + 1);
        match node.kind() {
            NodeKind::Folder { .. } => println!("{}{} {}/", indent, status, node.name()),
            NodeKind::Rule(body) => {
                let target = body.condition.target();
                let target = presets::preset_label(target).unwrap_or(target);
                println!(
                    "{}{} {} [{}: {}]",
                    indent,
                    status,
                    node.name(),
                    body.condition.kind(),
                    target
                );
            }
        }
    }
}

/// Run the checklist, optionally followed by a fix pass. Returns true when
/// every check passed.
fn run_checks<R: PropertyResolver>(tree: &RuleTree, resolver: &mut R, fix: bool) -> Result<bool> {
    println!(
        "Running checks at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let result = ChecklistRunner::new(tree).run(&*resolver)?;

    if result.passed() {
        println!("✓ All checks passed! ({} evaluated)", result.evaluated);
        return Ok(true);
    }

    println!("✗ The following scene checks failed:");
    println!();
    for failure in &result.failures {
        let hint = if failure.fix_action.is_empty() {
            ""
        } else {
            " (fix available)"
        };
        println!("  - {}{}", failure.message, hint);
    }

    if fix {
        let report = ChecklistRunner::apply_fixes(&result.failures, resolver);
        println!();
        println!(
            "Fixes attempted: {} ({} succeeded, {} failed)",
            report.attempted,
            report.succeeded(),
            report.failed()
        );
        for outcome in report.outcomes.iter().filter(|o| !o.succeeded) {
            println!(
                "  ✗ {}: {}",
                outcome.rule_name,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        println!("Please run checks again to verify.");
    } else if result.fixable().next().is_some() {
        println!();
        println!("Run again with --fix to attempt the available fixes.");
    }

    Ok(false)
}
