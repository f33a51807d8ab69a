use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for ps2rx")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks (fmt, clippy, build, test)
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Quick checks before commit (fmt, clippy)
    Check {
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Build the project
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Run tests
    Test {
        #[arg(long)]
        doc: bool,
        #[arg(long)]
        ignored: bool,
        #[command(flatten)]
        modules: ModuleFilter,
    },
    /// Run benchmarks
    Bench,
    /// Inspect a memory card image through the emulated bus
    Inspect {
        /// Path to the memory card image
        card: String,
        /// Sector to dump
        #[arg(short = 'n', long, default_value = "0")]
        sector: u32,
        /// Print JSON instead of a hex dump
        #[arg(long)]
        json: bool,
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },
    /// Pre-commit hook (fmt, clippy, test)
    PreCommit,
    /// Install git hooks
    InstallHooks,
}

/// Restrict `x test` to some modules
#[derive(Args, Default, Clone, Copy)]
struct ModuleFilter {
    /// Run only SIO0 tests
    #[arg(long)]
    sio0: bool,
    /// Run only SIO2 tests
    #[arg(long)]
    sio2: bool,
    /// Run only PS2 memory card protocol tests
    #[arg(long)]
    memcard: bool,
    /// Run only PS1 memory card protocol tests
    #[arg(long)]
    ps1: bool,
    /// Run only multitap tests
    #[arg(long)]
    multitap: bool,
    /// Run only pad tests
    #[arg(long)]
    pad: bool,
}

impl ModuleFilter {
    fn selected(&self) -> Vec<(&'static str, &'static str)> {
        [
            (self.sio0, "core::sio::tests::sio0", "SIO0"),
            (self.sio2, "core::sio::tests::sio2", "SIO2"),
            (self.memcard, "core::sio::tests::mcd_protocol", "Memory card"),
            (self.ps1, "core::sio::tests::ps1", "PS1 memory card"),
            (self.multitap, "core::sio::tests::multitap", "Multitap"),
            (self.pad, "core::pad", "Pad"),
        ]
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .map(|(_, path, name)| (path, name))
        .collect()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { verbose } => run_ci(verbose),
        Commands::Check { verbose } => run_check(verbose),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Build { release } => run_build(release),
        Commands::Test {
            doc,
            ignored,
            modules,
        } => run_test(doc, ignored, modules),
        Commands::Bench => run_bench(),
        Commands::Inspect {
            card,
            sector,
            json,
            release,
        } => run_inspect(&card, sector, json, release),
        Commands::PreCommit => run_pre_commit(),
        Commands::InstallHooks => install_hooks(),
    }
}

fn run_ci(verbose: bool) -> Result<()> {
    println!("{}", "=== Running CI Pipeline ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;
    run_task("Build", || run_build(false), verbose)?;
    run_task(
        "Test",
        || run_test(false, false, ModuleFilter::default()),
        verbose,
    )?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_check(verbose: bool) -> Result<()> {
    println!("{}", "=== Running Quick Checks ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ Checks passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("fmt").arg("--all");

    if check {
        cmd.arg("--").arg("--check");
    }

    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy").arg("--all-targets").arg("--all-features");

    if fix {
        cmd.arg("--fix");
    } else {
        cmd.arg("--").arg("-D").arg("warnings");
    }

    execute_command(&mut cmd)
}

fn run_build(release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("build");

    if release {
        cmd.arg("--release");
    }

    execute_command(&mut cmd)
}

fn run_test(doc: bool, ignored: bool, modules: ModuleFilter) -> Result<()> {
    if doc {
        // Run doc tests
        let mut cmd = Command::new("cargo");
        cmd.arg("test").arg("--all-features").arg("--doc");

        if ignored {
            cmd.arg("--").arg("--ignored");
        }

        return execute_command(&mut cmd);
    }

    let selected = modules.selected();

    if selected.is_empty() {
        // Run all tests
        let mut cmd = Command::new("cargo");
        cmd.arg("test").arg("--all-features");

        if ignored {
            cmd.arg("--").arg("--ignored");
        }

        return execute_command(&mut cmd);
    }

    let mut all_success = true;

    for &(module_path, module_name) in &selected {
        println!("{} Running {} tests...", "→".blue(), module_name.bold());

        let mut cmd = Command::new("cargo");
        cmd.arg("test")
            .arg("--all-features")
            .arg("--lib")
            .arg(module_path);

        if ignored {
            cmd.arg("--").arg("--ignored");
        }

        match execute_command(&mut cmd) {
            Ok(_) => {
                println!("{} {} tests passed\n", "✓".green(), module_name);
            }
            Err(e) => {
                println!("{} {} tests failed\n", "✗".red(), module_name);
                all_success = false;
                if selected.len() == 1 {
                    // If only one module was requested, return the error immediately
                    return Err(e);
                }
            }
        }
    }

    if all_success {
        Ok(())
    } else {
        anyhow::bail!("Some module tests failed")
    }
}

fn run_bench() -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("bench");

    execute_command(&mut cmd)
}

fn run_inspect(card: &str, sector: u32, json: bool, release: bool) -> Result<()> {
    use std::path::Path;

    println!("{}", "=== Memory Card Inspect ===".bold().blue());

    if !Path::new(card).exists() {
        println!("{} Card image not found: {}", "✗".red().bold(), card.yellow());
        anyhow::bail!("Card image not found");
    }

    println!("{} Card image: {}", "✓".green(), card.cyan());
    println!("{} Sector: {}", "→".blue(), sector.to_string().bold());
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("run").arg("--bin").arg("ps2rx-sio");

    if release {
        cmd.arg("--release");
    }

    cmd.arg("--").arg(card).arg("-n").arg(sector.to_string());
    if json {
        cmd.arg("--json");
    }

    execute_command(&mut cmd)?;

    let elapsed = start.elapsed();
    println!(
        "\n{} Inspect completed in {}",
        "✓".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_pre_commit() -> Result<()> {
    println!("{}", "=== Pre-commit Checks ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), false)?;
    run_task("Clippy", || run_clippy(false), false)?;
    run_task(
        "Test",
        || run_test(false, false, ModuleFilter::default()),
        false,
    )?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ Pre-commit checks passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn install_hooks() -> Result<()> {
    use std::fs;

    println!("{}", "Installing git hooks...".bold());

    let hook_content = r#"#!/bin/sh
# Auto-generated by cargo x install-hooks
set -e

echo "Running pre-commit checks..."
cargo x pre-commit
"#;

    let hook_path = ".git/hooks/pre-commit";
    fs::write(hook_path, hook_content)?;

    // Make executable (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(hook_path, perms)?;
    }

    println!("{}", "✓ Git hooks installed".green());
    println!("  Pre-commit hook will run: fmt, clippy, test");

    Ok(())
}

fn run_task<F>(name: &str, task: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    print!("{} {} ... ", "→".blue(), name);

    let start = Instant::now();

    match task() {
        Ok(_) => {
            let elapsed = start.elapsed();
            println!(
                "{} {}",
                "✓".green().bold(),
                if verbose {
                    format!("({:.2}s)", elapsed.as_secs_f64())
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗".red().bold());
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("Command failed with exit code: {}", status);
    }

    Ok(())
}
