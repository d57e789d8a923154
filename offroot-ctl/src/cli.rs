use clap::{Parser, Subcommand, ValueEnum};
use offroot_core::PrivilegeMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "offroot-ctl")]
#[command(version, about = "Run helper programs inside an offline root", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Run a maintainer script against a target image as a normal user
    offroot-ctl run --offline-root /srv/image /usr/lib/opkg/info/busybox.postinst configure

    # Same, with settings from a file
    offroot-ctl --config runner.json run /bin/true

    # Check a package index signature
    offroot-ctl verify Packages Packages.sig

    # Can this user enter an offline root?
    offroot-ctl check
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON runner configuration
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program, optionally chrooted into an offline root
    Run {
        /// Directory to use as the program's root
        #[arg(short = 'o', long, value_name = "DIR")]
        offline_root: Option<PathBuf>,

        /// When to enter a user namespace before chroot
        #[arg(short, long, value_name = "MODE")]
        privilege: Option<PrivilegeArg>,

        /// Program to run
        program: String,

        /// Program arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Verify a detached usign signature
    Verify {
        /// Signed file
        file: PathBuf,

        /// Signature file
        sigfile: PathBuf,
    },

    /// Check offline-root requirements
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrivilegeArg {
    Auto,
    Unprivileged,
    Privileged,
}

impl From<PrivilegeArg> for PrivilegeMode {
    fn from(arg: PrivilegeArg) -> Self {
        match arg {
            PrivilegeArg::Auto => PrivilegeMode::Auto,
            PrivilegeArg::Unprivileged => PrivilegeMode::Unprivileged,
            PrivilegeArg::Privileged => PrivilegeMode::Privileged,
        }
    }
}
