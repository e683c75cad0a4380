//! ctxlint CLI - checks that typed-context variables request exactly the
//! capability interfaces they use.
//!
//! Input is one or more program dumps (JSON written by a front end) or
//! directories containing them. Every dump is one package; packages are
//! analyzed in parallel.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use ctxlint_core::{
    analyze_paths, gather_program_files, init_compact_logging, init_structured_logging,
    load_config, load_config_file, print_json, print_plain, AnalyzerSettings, CtxlintConfig,
    Diagnostic,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Checks capability interfaces requested by typed contexts")]
pub struct Cli {
    /// Program dumps or directories containing them
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to ./ctxlint.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also report variables declared in test files
    #[arg(long)]
    include_tests: bool,

    /// Human-readable debug logging on stderr
    #[arg(long, short)]
    verbose: bool,
}

/// What a run produced, before it is turned into an exit code.
#[derive(Debug)]
struct Outcome {
    diagnostics: Vec<Diagnostic>,
    failures: usize,
}

impl Outcome {
    fn exit_code(&self) -> i32 {
        if self.failures > 0 {
            2
        } else if self.diagnostics.is_empty() {
            0
        } else {
            1
        }
    }
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] ctxlint internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 2.");
    }));

    let cli = Cli::parse();

    if cli.verbose {
        init_compact_logging("debug");
    } else {
        init_structured_logging("warn");
    }

    let config = match resolve_config(cli.config.as_deref(), Path::new(".")) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "configuration failed");
            eprintln!("[ERROR] {:#}", e);
            std::process::exit(2);
        }
    };

    let json = cli.json || wants_json(config.as_ref().map(|(cfg, _)| cfg));

    match run(&cli, config.as_ref()) {
        Ok(outcome) => {
            if json {
                print_json(&outcome.diagnostics);
            } else {
                print_plain(&outcome.diagnostics);
            }
            std::process::exit(outcome.exit_code());
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "analysis failed");
            eprintln!("[ERROR] {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Loads the configuration named on the command line, or `ctxlint.toml`
/// in `cwd` when none was given. Returns the config with its source path.
fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<Option<(CtxlintConfig, PathBuf)>> {
    if let Some(path) = explicit {
        let cfg = load_config_file(path)?;
        return Ok(Some((cfg, path.to_path_buf())));
    }
    Ok(load_config(cwd)?.map(|cfg| (cfg, cwd.join("ctxlint.toml"))))
}

fn wants_json(cfg: Option<&CtxlintConfig>) -> bool {
    cfg.and_then(|c| c.output.as_ref())
        .and_then(|o| o.format.as_deref())
        .is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

fn run(cli: &Cli, config: Option<&(CtxlintConfig, PathBuf)>) -> Result<Outcome> {
    let settings = match config {
        Some((cfg, source)) => AnalyzerSettings::from_config(cfg, source)
            .with_context(|| format!("Invalid configuration in {}", source.display()))?,
        None => AnalyzerSettings::default(),
    };

    let mut files = Vec::new();
    for path in &cli.paths {
        let found = gather_program_files(path)
            .with_context(|| format!("Failed to collect program dumps from {}", path.display()))?;
        if found.is_empty() {
            tracing::warn!(path = %path.display(), "no program dumps found");
        }
        files.extend(found);
    }
    files.sort();
    files.dedup();

    if files.is_empty() {
        return Err(anyhow!("no program dumps to analyze"));
    }

    let mut outcome = Outcome {
        diagnostics: Vec::new(),
        failures: 0,
    };

    for (path, result) in analyze_paths(&files, &settings, cli.include_tests) {
        match result {
            Ok(analysis) => outcome.diagnostics.extend(analysis.diagnostics),
            Err(e) if e.is_recoverable() => {
                tracing::error!(path = %path.display(), error = %e, "package failed");
                eprintln!("[ERROR] {}: {}", path.display(), e);
                outcome.failures += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxlint_core::{ProblemKind, ProgramBuilder};
    use ctxlint_core::program::Stmt;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_temp_dir(name: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir()
            .join("ctxlint_cli_test")
            .join(format!("{}_{}_{}", name, std::process::id(), id));
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir).ok();
        }
        fs::create_dir_all(&temp_dir).unwrap();
        temp_dir
    }

    fn cli_for(paths: Vec<PathBuf>) -> Cli {
        Cli {
            paths,
            json: false,
            config: None,
            include_tests: false,
            verbose: false,
        }
    }

    /// One package whose `ctx` requests a logger it never uses.
    fn write_dump(dir: &Path, name: &str) -> PathBuf {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        b.file("thing.go");
        let app = b.current_package();
        let ctx_pkg = b.package("context", "context");
        let unit = b.signature(&[], &[], false);
        let base = b.named_interface(ctx_pkg, "Context", &[("Done", unit)], &[]);
        let logger = b.named_interface(app, "LoggerContext", &[("Logger", unit)], &[base]);
        let secrets = b.named_interface(app, "SecretsContext", &[("Secrets", unit)], &[base]);
        let both = b.interface(&[], &[base, logger, secrets]);
        let ctx = b.var("ctx", both);
        let call = b.method_call(b.use_ident(ctx), "Secrets", unit, vec![]);
        b.func_decl("F", &[ctx], &[], vec![Stmt::Expr { expr: call }]);

        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(&b.finish()).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "ctxlint",
            "a.json",
            "dumps",
            "--json",
            "--include-tests",
            "--config",
            "lint.toml",
        ])
        .unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("a.json"), PathBuf::from("dumps")]);
        assert!(cli.json);
        assert!(cli.include_tests);
        assert_eq!(cli.config, Some(PathBuf::from("lint.toml")));
    }

    #[test]
    fn test_cli_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["ctxlint"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from(".")]);
        assert!(!cli.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_reports_problems_with_exit_one() {
        let dir = create_temp_dir("problems");
        write_dump(&dir, "app.json");

        let outcome = run(&cli_for(vec![dir.clone()]), None).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, ProblemKind::Unused);
        assert_eq!(outcome.exit_code(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_counts_broken_dumps_as_failures() {
        let dir = create_temp_dir("broken");
        write_dump(&dir, "app.json");
        fs::write(dir.join("broken.json"), "{").unwrap();

        let outcome = run(&cli_for(vec![dir.clone()]), None).unwrap();
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.exit_code(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_same_file_twice_is_analyzed_once() {
        let dir = create_temp_dir("dedup");
        let dump = write_dump(&dir, "app.json");

        let outcome = run(&cli_for(vec![dump.clone(), dir.clone()]), None).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_empty_directory_is_an_error() {
        let dir = create_temp_dir("empty");
        assert!(run(&cli_for(vec![dir.clone()]), None).is_err());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clean_outcome_exits_zero() {
        let outcome = Outcome {
            diagnostics: Vec::new(),
            failures: 0,
        };
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_resolve_config_from_directory_and_format() {
        let dir = create_temp_dir("config");
        assert!(resolve_config(None, &dir).unwrap().is_none());

        fs::write(dir.join("ctxlint.toml"), "[output]\nformat = \"json\"\n").unwrap();
        let (cfg, source) = resolve_config(None, &dir).unwrap().unwrap();
        assert_eq!(source, dir.join("ctxlint.toml"));
        assert!(wants_json(Some(&cfg)));
        assert!(!wants_json(None));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_base_context_fails_run() {
        let dir = create_temp_dir("bad_config");
        write_dump(&dir, "app.json");
        let cfg_path = dir.join("lint.toml");
        fs::write(&cfg_path, "base_context = \"Context\"\n").unwrap();

        let config = resolve_config(Some(&cfg_path), Path::new(".")).unwrap();
        assert!(run(&cli_for(vec![dir.clone()]), config.as_ref()).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
