//! Command-line front end: `zipflate <zipfile> [destination_directory]`.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use zipflate::extract::extract_all;
use zipflate::mem::Arena;
use zipflate::read::ZipArchive;

/// Address space reserved for the extraction arena. Only a fraction is
/// ever committed; reserving generously is close to free.
const ARENA_RESERVE: usize = 256 << 20;
/// Pages committed up front and the granularity of later commits.
const ARENA_COMMIT: usize = 1 << 20;

#[repr(i32)]
enum ExitCode {
    Success = 0,
    InvalidArg = 1,
    InvalidFile = 2,
}

/// Writes `[level] (scope): message` lines to stderr.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = record.level().as_str().to_ascii_lowercase();
        let scope = record.target();
        let _ = writeln!(
            std::io::stderr(),
            "[{level}] ({scope}): {}",
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Info);

    let mut argv: Vec<OsString> = std::env::args_os().collect();
    let this = if argv.is_empty() {
        "zipflate".into()
    } else {
        argv.remove(0).to_string_lossy().into_owned()
    };

    if argv.iter().any(|a| a == "-h" || a == "--help") {
        println!("{this} <zipfile> [destination_directory]");
        process::exit(ExitCode::Success as i32)
    }
    if argv.is_empty() || argv.len() > 2 {
        eprintln!("{this} <zipfile> [destination_directory]");
        process::exit(ExitCode::InvalidArg as i32)
    }

    let zipfile = PathBuf::from(argv.remove(0));
    let dest = argv.pop().map(PathBuf::from);

    let data = match fs::read(&zipfile) {
        Ok(data) => data,
        Err(err) => {
            log::error!("{}: {}", zipfile.display(), err);
            process::exit(ExitCode::InvalidFile as i32)
        }
    };

    let archive = match ZipArchive::new(&data) {
        Ok(archive) => archive,
        Err(err) => {
            log::error!("{}: {}", zipfile.display(), err);
            process::exit(ExitCode::InvalidFile as i32)
        }
    };

    let dest = match dest {
        Some(dest) => dest,
        // No destination: the parse above is the whole job.
        None => process::exit(ExitCode::Success as i32),
    };

    let mut arena = match Arena::with_capacity(ARENA_RESERVE, ARENA_COMMIT) {
        Ok(arena) => arena,
        Err(err) => {
            log::error!("{}", err);
            process::exit(ExitCode::InvalidFile as i32)
        }
    };

    match extract_all(&archive, &mut arena, &dest) {
        Ok(summary) => {
            log::info!(
                "extracted {} files and {} directories into {}",
                summary.files,
                summary.dirs,
                dest.display()
            );
            if summary.failed > 0 {
                log::error!("{} entries failed", summary.failed);
                process::exit(ExitCode::InvalidFile as i32)
            }
            process::exit(ExitCode::Success as i32)
        }
        Err(err) => {
            log::error!("{}: {}", dest.display(), err);
            process::exit(ExitCode::InvalidFile as i32)
        }
    }
}
