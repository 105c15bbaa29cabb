pub mod caller;
pub mod cli;
pub mod clip;
pub mod cluster;
pub mod discordant;
pub mod errors;
pub mod insert_stats;
pub mod merge;
pub mod orchestrator;
pub mod output;
pub mod overlap;

use cli::{Command, OutputFormat};
use errors::Result;
use orchestrator::{CallParams, Orchestrator};

use log::info;
use std::fs::File;
use std::io::{self, Write};

/// Top-level pipeline: parse already-validated CLI args into a call plan,
/// run the orchestrator, and write the merged calls in the requested
/// format.
///
/// # Examples
///
/// ```no_run
/// use clipdel::cli::Command;
/// use clap::Parser;
///
/// let args = Command::parse_from(["clipdel", "-o", "out.bedpe", "in.bam"]);
/// clipdel::run(args).unwrap();
/// ```
pub fn run(args: Command) -> Result<u8> {
    info!("reading from alignment file: {}", args.in_bam);
    info!("writing to: {}", args.out);
    info!(
        "thresholds: minClip={} meanInsert={} stdInsert={} minOverlapLen={} maxMismatches={} enhanced={}",
        args.min_clip, args.mean_insert, args.std_insert, args.min_overlap_len, args.max_mismatches, args.enhanced
    );

    let params = CallParams {
        min_clip: args.min_clip,
        enhanced: args.enhanced == 1,
        discordant_k: args.discordant_k,
        min_overlap_len: args.min_overlap_len,
        max_mismatch_rate: args.max_mismatches as f64 / args.min_overlap_len.max(1) as f64,
        mean_insert: args.mean_insert as f64,
        std_insert: args.std_insert as f64,
    };

    let orchestrator = Orchestrator::new(args.in_bam.clone(), params, args.threads);
    let calls = orchestrator.run()?;
    info!("called {} deletion(s) after merging", calls.len());

    let mut out: Box<dyn Write> = if args.out == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(File::create(&args.out)?)
    };

    match args.output_format() {
        OutputFormat::Bedpe => output::write_bedpe(&mut out, &calls)?,
        OutputFormat::Vcf => output::write_vcf(&mut out, &calls)?,
    }

    Ok(0)
}

/// Wrapper function to read command line arguments and pass them to
/// [`run`], translating errors into the exit codes of §7's error table.
pub fn wrapper() -> u8 {
    use clap::Parser;
    let args = Command::parse();
    match run(args) {
        Ok(code) => code,
        Err(errors::Error::Cancelled) => 130,
        Err(err) => {
            eprintln!("{}", err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_run_surfaces_open_failed_for_missing_bam() {
        let args = Command::parse_from(["clipdel", "-o", "/tmp/clipdel-missing.out", "/no/such/file.bam"]);
        assert!(run(args).is_err());
    }
}
