//! Command-line surface: a thin `getopts` parse, matching
//! `rustc_session`'s own choice of `getopts` over a heavier argument-parsing
//! framework. The driver's own flags are conventionally written single-dash
//! (`-incremental`); `getopts` treats a single dash as a cluster of short
//! options, so every flag here is the long (`--incremental`) form instead —
//! same name, GNU-style prefix.

use std::path::PathBuf;

const USAGE: &str = "Usage: fgdep_driver [options] <input-file>...";

#[derive(Debug, Default)]
pub struct Flags {
    pub incremental: bool,
    pub emit_dependencies: bool,
    pub show_incremental: bool,
    pub show_job_lifecycle: bool,
    pub output_file_map: Option<PathBuf>,
    pub verify_incremental_dependencies: bool,
    pub cross_module_incremental: bool,
    pub apply_fixits: bool,
    pub inputs: Vec<String>,
}

#[derive(Debug)]
pub enum CliError {
    Getopts(getopts::Fail),
    /// `-output-file-map` is required whenever `-incremental` is passed:
    /// the map is how the driver learns each file's artifact paths.
    MissingOutputFileMap,
    Help(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Getopts(e) => write!(f, "{e}"),
            CliError::MissingOutputFileMap => write!(f, "-incremental requires -output-file-map <path>"),
            CliError::Help(usage) => write!(f, "{usage}"),
        }
    }
}

fn options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.optflag("", "incremental", "enable the incremental build loop");
    opts.optflag("", "emit-dependencies", "write a dependency artifact for each successful job");
    opts.optflag("", "driver-show-incremental", "log, per job, its queueing reason");
    opts.optflag("", "driver-show-job-lifecycle", "log job start/finish events");
    opts.optopt("", "output-file-map", "path to the output file map", "PATH");
    opts.optflag("", "verify-incremental-dependencies", "run the dependency verifier instead of a build");
    opts.optflag(
        "",
        "enable-experimental-cross-module-incremental-build",
        "enable external incremental dependencies",
    );
    opts.optflag("", "apply-fixits", "apply verifier fix-it hints back to the source");
    opts.optflag("h", "help", "print this help menu");
    opts
}

pub fn parse(args: &[String]) -> Result<Flags, CliError> {
    let opts = options();
    let matches = opts.parse(args).map_err(CliError::Getopts)?;

    if matches.opt_present("help") {
        return Err(CliError::Help(opts.usage(USAGE)));
    }

    let incremental = matches.opt_present("incremental");
    let output_file_map = matches.opt_str("output-file-map").map(PathBuf::from);
    if incremental && output_file_map.is_none() {
        return Err(CliError::MissingOutputFileMap);
    }

    Ok(Flags {
        incremental,
        emit_dependencies: matches.opt_present("emit-dependencies"),
        show_incremental: matches.opt_present("driver-show-incremental"),
        show_job_lifecycle: matches.opt_present("driver-show-job-lifecycle"),
        output_file_map,
        verify_incremental_dependencies: matches.opt_present("verify-incremental-dependencies"),
        cross_module_incremental: matches.opt_present("enable-experimental-cross-module-incremental-build"),
        apply_fixits: matches.opt_present("apply-fixits"),
        inputs: matches.free,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_build_flags_and_positional_inputs() {
        let flags = parse(&args(&[
            "--incremental",
            "--emit-dependencies",
            "--output-file-map",
            "map.json",
            "a.swift",
            "b.swift",
        ]))
        .unwrap();
        assert!(flags.incremental);
        assert!(flags.emit_dependencies);
        assert_eq!(flags.output_file_map, Some(PathBuf::from("map.json")));
        assert_eq!(flags.inputs, vec!["a.swift", "b.swift"]);
    }

    #[test]
    fn incremental_without_output_file_map_is_rejected() {
        assert!(matches!(parse(&args(&["--incremental"])), Err(CliError::MissingOutputFileMap)));
    }

    #[test]
    fn verify_mode_does_not_require_an_output_file_map() {
        let flags = parse(&args(&["--verify-incremental-dependencies", "a.swift"])).unwrap();
        assert!(flags.verify_incremental_dependencies);
    }

    #[test]
    fn help_flag_short_circuits_with_usage_text() {
        assert!(matches!(parse(&args(&["-h"])), Err(CliError::Help(_))));
    }
}
