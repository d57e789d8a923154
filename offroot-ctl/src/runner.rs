use console::style;
use log::{debug, info};
use offroot::{OfflineRootRunner, ProcessSpec, RunnerConfig, TrustVerifier};
use offroot_core::PrivilegeMode;
use std::path::{Path, PathBuf};

/// Configuration for one `run` invocation
pub struct RunConfig {
    pub config_file: Option<PathBuf>,
    pub offline_root: Option<PathBuf>,
    pub privilege: Option<PrivilegeMode>,
    pub program: String,
    pub args: Vec<String>,
}

/// Merge the config file (if any) with command-line overrides
pub fn load_config(
    config_file: Option<&Path>,
    offline_root: Option<PathBuf>,
    privilege: Option<PrivilegeMode>,
) -> offroot::Result<RunnerConfig> {
    let mut config = match config_file {
        Some(path) => {
            debug!("Loading runner config from {}", path.display());
            RunnerConfig::from_file(path)?
        }
        None => RunnerConfig::default(),
    };

    if let Some(root) = offline_root {
        debug!("Overriding offline root: {}", root.display());
        config = config.with_offline_root(root);
    }

    if let Some(mode) = privilege {
        debug!("Overriding privilege mode: {:?}", mode);
        config = config.with_privilege_mode(mode);
    }

    Ok(config)
}

/// Run the program and return the exit code to leave with
pub fn run_program(run: RunConfig) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_config(run.config_file.as_deref(), run.offline_root, run.privilege)?;
    let runner = OfflineRootRunner::from_config(&config)?;

    let spec = ProcessSpec::new(std::iter::once(&run.program).chain(run.args.iter()))?;

    match config.offline_root() {
        Some(root) => info!("Executing in {}: {}", root.display(), spec),
        None => info!("Executing: {}", spec),
    }

    let result = runner.run(&spec, config.offline_root());

    if let Some(code) = result.exit_code() {
        return Ok(i32::from(code));
    }

    if let Err(e) = result.into_result(&run.program) {
        eprintln!("{} {}", style("error:").red().bold(), e);
    }
    Ok(1)
}

/// Verify a signature; exit code 0 only when trusted
pub fn verify_signature(file: &Path, sigfile: &Path) -> i32 {
    let verdict = TrustVerifier::new().verify(file, sigfile);

    match verdict.into_result(file) {
        Ok(()) => {
            println!("{} {}", style("trusted:").green().bold(), file.display());
            0
        }
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            1
        }
    }
}
