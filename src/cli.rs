pub use clap::Parser;
use std::string::String;

/// Output format for emitted deletion calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Bedpe,
    Vcf,
}

/// Detect deletion structural variants from soft-clipped reads in a
/// coordinate-sorted, indexed BAM file.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Command {
    /// mean of the template-length (insert size) distribution
    #[clap(short = 'm', long, default_value_t = 200)]
    pub mean_insert: i64,

    /// standard deviation of the template-length distribution
    #[clap(short = 's', long, default_value_t = 10)]
    pub std_insert: i64,

    /// minimum length of a gapless overlap between two consensuses
    #[clap(short = 'l', long, default_value_t = 10)]
    pub min_overlap_len: i64,

    /// maximum number of mismatches tolerated in an overlap
    #[clap(short = 'x', long, default_value_t = 2)]
    pub max_mismatches: i64,

    /// relax the proper-pair requirement for the clip reader
    #[clap(short = 'e', long, value_parser=check_bool_flag, default_value_t = 0)]
    pub enhanced: u8,

    /// minimum soft-clip length to keep a clip, must be at least 1
    #[clap(short = 'c', long, value_parser=check_min_clip, default_value_t = 5)]
    pub min_clip: i64,

    /// multiplier k applied to sigma when flagging discordant pairs and
    /// bounding candidate deletion lengths (the `discordant` parameter of
    /// the original implementation)
    #[clap(short = 'k', long, default_value_t = 3.0)]
    pub discordant_k: f64,

    /// optional indexed FASTA reference, reserved for future gapped overlap
    #[clap(short = 'f', long, value_parser)]
    pub fasta: Option<String>,

    /// output format
    #[clap(long, value_parser=check_format, default_value = "bedpe")]
    pub format: String,

    /// number of worker threads, default: logical CPU count capped at the
    /// number of references in the BAM header
    #[clap(short = 't', long, default_value_t = 0)]
    pub threads: usize,

    /// output file path, required
    #[clap(short, long, value_parser)]
    pub out: String,

    /// input BAM file path
    #[clap(value_parser)]
    pub in_bam: String,
}

impl Command {
    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_str() {
            "vcf" => OutputFormat::Vcf,
            _ => OutputFormat::Bedpe,
        }
    }
}

/// check that a min-clip value is at least 1, per spec boundary behavior
/// "minClip = 0 is rejected"
///
/// # Example
/// ```
/// use clipdel::cli::check_min_clip;
/// assert_eq!(check_min_clip("5").unwrap(), 5);
/// assert!(check_min_clip("0").is_err());
/// ```
pub fn check_min_clip(val: &str) -> Result<i64, String> {
    let parsed: i64 = val.parse::<i64>().map_err(|e| e.to_string())?;
    if parsed >= 1 {
        Ok(parsed)
    } else {
        Err(format!("minClip must be >= 1, got {}", parsed))
    }
}

/// check that the enhanced-mode flag is 0 or 1
pub fn check_bool_flag(val: &str) -> Result<u8, String> {
    let parsed: u8 = val.parse::<u8>().map_err(|e| e.to_string())?;
    if parsed == 0 || parsed == 1 {
        Ok(parsed)
    } else {
        Err(format!("expected 0 or 1, got {}", parsed))
    }
}

/// check that the output format is one of the two supported formats
pub fn check_format(val: &str) -> Result<String, String> {
    match val {
        "bedpe" | "vcf" => Ok(val.to_string()),
        _ => Err(format!("unsupported format {}, expected bedpe or vcf", val)),
    }
}
