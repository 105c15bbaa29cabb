use crate::caller::{Deletion, DeletionCaller};
use crate::clip::{ClipReader, Side};
use crate::cluster::Clusterer;
use crate::discordant::{DiscordantPair, DiscordantScanner};
use crate::errors::{Error, Result};
use crate::insert_stats::InsertStats;
use crate::merge::CallMerger;
use crate::overlap::OverlapEngine;

use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Parameters threaded through to every per-reference worker; built once
/// from the parsed [`crate::cli::Command`].
#[derive(Debug, Clone, Copy)]
pub struct CallParams {
    pub min_clip: i64,
    pub enhanced: bool,
    pub discordant_k: f64,
    pub min_overlap_len: i64,
    pub max_mismatch_rate: f64,
    /// fallback mean/std-dev used when too few properly paired alignments
    /// are found to estimate the insert-size distribution (§4.B), and the
    /// user-facing defaults for `-m`/`-s`.
    pub mean_insert: f64,
    pub std_insert: f64,
}

/// Drives the full per-reference pipeline: open an independent BAM handle
/// per worker, scan clips and discordant pairs, cluster, call, then merge
/// across all references at the end.
pub struct Orchestrator {
    bam_path: String,
    params: CallParams,
    threads: usize,
    cancel: AtomicBool,
}

impl Orchestrator {
    pub fn new(bam_path: String, params: CallParams, threads: usize) -> Self {
        Self {
            bam_path,
            params,
            threads,
            cancel: AtomicBool::new(false),
        }
    }

    /// Cooperative cancellation: polled between references and between
    /// target regions within a reference (§5 Concurrency).
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run the pipeline end to end and return the merged, sorted deletion
    /// calls (§4.G/§5 Ordering guarantees).
    pub fn run(&self) -> Result<Vec<Deletion>> {
        let n_references = {
            let probe = ClipReader::from_path(&self.bam_path, self.params.min_clip, self.params.enhanced)?;
            probe.n_references()
        };
        if n_references == 0 {
            return Ok(Vec::new());
        }

        let worker_count = if self.threads == 0 {
            num_cpus::get().min(n_references)
        } else {
            self.threads.min(n_references)
        };
        info!("running {} worker(s) across {} reference(s)", worker_count, n_references);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .map_err(|e| Error::RegionInvalid {
                region: format!("failed to build thread pool: {e}"),
            })?;

        let raw_calls: Mutex<Vec<Deletion>> = Mutex::new(Vec::new());

        pool.install(|| {
            (0..n_references as i32).into_par_iter().for_each(|reference_id| {
                if self.is_cancelled() {
                    return;
                }
                match self.process_reference(reference_id) {
                    Ok(mut calls) => {
                        if !calls.is_empty() {
                            raw_calls.lock().unwrap().append(&mut calls);
                        }
                    }
                    Err(err) => warn!("reference {}: {}", reference_id, err),
                }
            });
        });

        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let calls = raw_calls.into_inner().unwrap();
        Ok(CallMerger::merge(calls))
    }

    /// Process a single reference: independent [`ClipReader`] handle,
    /// scanned once for clips and once for discordant-pair evidence, per
    /// §5's "runs are independent and may be parallelized" guarantee.
    fn process_reference(&self, reference_id: i32) -> Result<Vec<Deletion>> {
        let mut clip_reader =
            ClipReader::from_path(&self.bam_path, self.params.min_clip, self.params.enhanced)?;
        let reference_name = clip_reader
            .reference_name(reference_id)
            .ok_or_else(|| Error::RegionInvalid {
                region: format!("reference id {}", reference_id),
            })?;

        clip_reader.set_region(reference_id)?;
        let clips = clip_reader.collect_clips();
        debug!(
            "{}: scanned={} malformed={} emitted={}",
            reference_name, clip_reader.stats.scanned, clip_reader.stats.malformed, clip_reader.stats.emitted
        );

        let (left_clips, right_clips): (Vec<_>, Vec<_>) =
            clips.into_iter().partition(|c| c.side == Side::Left);
        let left_consensuses = Clusterer::consensuses(left_clips);
        let right_consensuses = Clusterer::consensuses(right_clips);

        let mut stats_reader =
            ClipReader::from_path(&self.bam_path, self.params.min_clip, self.params.enhanced)?;
        stats_reader.set_region(reference_id)?;
        let insert_sizes = collect_properly_paired_insert_sizes(
            &mut stats_reader,
            reference_id,
            InsertStats::DEFAULT_LIMIT,
        )?;
        let stats = InsertStats::from_insert_sizes(
            insert_sizes.into_iter(),
            InsertStats::DEFAULT_LIMIT,
            self.params.mean_insert,
            self.params.std_insert,
        );

        let mut pair_reader =
            ClipReader::from_path(&self.bam_path, self.params.min_clip, self.params.enhanced)?;
        pair_reader.set_region(reference_id)?;
        let pairs = collect_discordant_pairs(&mut pair_reader, reference_id)?;
        let scanner = DiscordantScanner::new(stats, self.params.discordant_k);
        let regions = scanner.target_regions(reference_id, &pairs);
        if regions.is_empty() {
            info!("{}: no discordant evidence, skipping", reference_name);
            return Ok(Vec::new());
        }

        let engine = OverlapEngine::new(self.params.min_overlap_len, self.params.max_mismatch_rate);
        let caller = DeletionCaller::new(engine, &reference_name);

        let mut calls = Vec::new();
        for region in &regions {
            if self.is_cancelled() {
                break;
            }
            if let Some(deletion) = caller.call(region, &right_consensuses, &left_consensuses) {
                calls.push(deletion);
            }
        }
        Ok(calls)
    }
}

/// Scan a leading prefix of up to `limit` properly paired alignments,
/// independent of and prior to the discordant screen, per §4.B's
/// requirement that InsertStats be estimated from proper pairs rather
/// than from the (biased) discordant-candidate set.
fn collect_properly_paired_insert_sizes(
    reader: &mut ClipReader,
    reference_id: i32,
    limit: usize,
) -> Result<Vec<i64>> {
    use rust_htslib::bam::{self, Read};

    const PAIRED: u16 = 0x1;
    const PROPER_PAIR: u16 = 0x2;
    const UNMAPPED: u16 = 0x4;
    const MATE_UNMAPPED: u16 = 0x8;
    const SECONDARY: u16 = 0x100;
    const QC_FAIL: u16 = 0x200;
    const DUPLICATE: u16 = 0x400;

    let mut record = bam::Record::new();
    let mut sizes = Vec::new();
    loop {
        if sizes.len() >= limit {
            break;
        }
        match reader.inner_mut().read(&mut record) {
            None => break,
            Some(Err(_)) => continue,
            Some(Ok(())) => {}
        }
        let flags = record.flags();
        if flags & (UNMAPPED | MATE_UNMAPPED | DUPLICATE | QC_FAIL | SECONDARY) != 0 {
            continue;
        }
        if flags & PAIRED == 0 || flags & PROPER_PAIR == 0 {
            continue;
        }
        if record.tid() != reference_id || record.tid() != record.mtid() {
            continue;
        }
        let insert_size = record.insert_size();
        if insert_size == 0 {
            continue;
        }
        sizes.push(insert_size);
    }
    Ok(sizes)
}

/// Re-scan the reference's alignments for proper-pair, same-tid read
/// pairs, yielding one [`DiscordantPair`] per forward-mapped first mate
/// (so each physical pair contributes exactly once).
fn collect_discordant_pairs(reader: &mut ClipReader, reference_id: i32) -> Result<Vec<DiscordantPair>> {
    use rust_htslib::bam::{self, Read};

    let mut record = bam::Record::new();
    let mut pairs = Vec::new();
    loop {
        match reader.inner_mut().read(&mut record) {
            None => break,
            Some(Err(_)) => continue,
            Some(Ok(())) => {}
        }
        let flags = record.flags();
        const PAIRED: u16 = 0x1;
        const PROPER_PAIR: u16 = 0x2;
        const UNMAPPED: u16 = 0x4;
        const MATE_UNMAPPED: u16 = 0x8;
        const REVERSE: u16 = 0x10;
        const MATE_REVERSE: u16 = 0x20;
        const FIRST_IN_PAIR: u16 = 0x40;
        const SECONDARY: u16 = 0x100;
        const QC_FAIL: u16 = 0x200;
        const DUPLICATE: u16 = 0x400;
        // spec.md §6 BAM flag handling: paired=1, mapped=1, mate-mapped=1,
        // properPair=0, duplicate=0, QCfail=0, secondary=0
        if flags & (UNMAPPED | MATE_UNMAPPED | PROPER_PAIR | DUPLICATE | QC_FAIL | SECONDARY) != 0 {
            continue;
        }
        if flags & PAIRED == 0 || flags & FIRST_IN_PAIR == 0 {
            continue;
        }
        // correct F/R orientation: this (first) mate forward, mate reverse
        if flags & REVERSE != 0 || flags & MATE_REVERSE == 0 {
            continue;
        }
        if record.tid() != reference_id || record.tid() != record.mtid() {
            continue;
        }
        let insert_size = record.insert_size().abs();
        if insert_size == 0 {
            continue;
        }
        pairs.push(DiscordantPair {
            reference_id,
            position: record.pos() + 1,
            mate_position: record.mpos() + 1,
            insert_size,
        });
    }
    Ok(pairs)
}
