//! Calibration task: runs every `(data model, c)` experiment and packs the
//! results.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use emdcal_core::{
    compute_bconf, compute_bemd, CValue, CalibrationDistribution, CalibrationError,
    CandidatePair, DataModel, EmdSampler, Result,
};

use crate::codec::{self, CalibrateOutput};
use crate::config::EngineConfig;
use crate::enumerator::{model_c_gen, KnownResults, WorkItem};
use crate::interfaces::ProgressReporter;
use crate::pool::{chunk_size, worker_count, OrderedPool};
use crate::results::{CalibrateResult, CalibrationResults};

type DatasetOf<D> = <<D as CalibrationDistribution>::Model as DataModel>::Dataset;

/// State shared with workers evaluating `Bemd`.
struct BemdContext<T> {
    candidates: CandidatePair<T>,
    sampler: Arc<dyn EmdSampler>,
    ldata: usize,
}

/// A calibration experiment: candidate models, the distribution of data
/// models to test them against, and the `c` values to sweep.
pub struct CalibrationTask<D: CalibrationDistribution> {
    /// Sensitivity values, in the order curves are reported.
    pub c_list: Vec<CValue>,
    pub data_models: D,
    pub candidates: CandidatePair<DatasetOf<D>>,
    pub sampler: Arc<dyn EmdSampler>,
    /// Dataset size used to estimate `Bemd`.
    pub ldata: usize,
    /// Dataset size standing in for infinity when computing `Bconf`.
    pub linf: usize,
}

impl<D: CalibrationDistribution> CalibrationTask<D> {
    /// Check the experiment parameters.
    pub fn validate(&self) -> Result<()> {
        if self.ldata == 0 {
            return Err(CalibrationError::Config("ldata must be positive".into()));
        }
        if self.linf == 0 {
            return Err(CalibrationError::Config("linf must be positive".into()));
        }
        if let Some(c) = self.c_list.iter().find(|c| !c.get().is_finite() || c.get() < 0.0) {
            return Err(CalibrationError::Config(format!(
                "c values must be finite and non-negative, got {c}"
            )));
        }
        let mut seen = HashSet::with_capacity(self.c_list.len());
        if let Some(c) = self.c_list.iter().find(|&&c| !seen.insert(c)) {
            return Err(CalibrationError::Config(format!(
                "c = {c} appears more than once in the c list"
            )));
        }
        Ok(())
    }

    /// Pairs still to compute given `known`, in dispatch order.
    pub fn model_c_gen<'a>(
        &'a self,
        known: &'a KnownResults,
    ) -> impl Iterator<Item = Result<WorkItem<D::Model>>> + 'a {
        model_c_gen(&self.data_models, &self.c_list, known)
    }

    /// Digest identifying this task's distribution and `c_list`.
    pub fn fingerprint(&self) -> Result<String> {
        codec::fingerprint(&self.data_models, &self.c_list)
    }

    /// Run every experiment and return the packed results.
    pub fn run(
        &self,
        config: &EngineConfig,
        reporter: &dyn ProgressReporter,
    ) -> Result<CalibrateOutput> {
        let results = self.run_with_known(CalibrationResults::default(), config, reporter)?;
        self.pack(&results)
    }

    /// Run the experiments missing from `results` and return the completed
    /// accumulators.
    ///
    /// `Bemd` estimates are computed on a worker pool, or inline when at
    /// most one worker would be used. Results are consumed in enumeration
    /// order; `Bconf` is computed on the calling thread the first time each
    /// model is seen. The first error aborts the run.
    pub fn run_with_known(
        &self,
        mut results: CalibrationResults,
        config: &EngineConfig,
        reporter: &dyn ProgressReporter,
    ) -> Result<CalibrationResults> {
        self.validate()?;
        let start = Instant::now();
        let known = results.known();

        let n_models = self.data_models.size().finite();
        let total = n_models.map(|n| n * self.c_list.len());
        if total.is_none() {
            info!(
                "Data model iterable has no length: it will not be possible to estimate the \
                 remaining computation time."
            );
        }
        let pending = total.map(|t| t.saturating_sub(known.bemd_len()));
        let workers = worker_count(pending, config.max_cores);
        info!(
            models = ?n_models,
            c_values = self.c_list.len(),
            already_known = known.bemd_len(),
            workers,
            "Starting calibration experiments"
        );
        reporter.start(total.and_then(|t| u64::try_from(t).ok()));

        let ctx = Arc::new(BemdContext {
            candidates: self.candidates.clone(),
            sampler: Arc::clone(&self.sampler),
            ldata: self.ldata,
        });
        let work = move |item: WorkItem<D::Model>| {
            compute_bemd(
                &item.model,
                item.c.get(),
                &ctx.candidates,
                ctx.sampler.as_ref(),
                ctx.ldata,
            )
        };

        // Inputs stop at the first enumeration error; the key stream below
        // reports it at the same position.
        let inputs = self.model_c_gen(&known).map_while(Result::ok);
        let pool;
        let mut bemd_values: Box<dyn Iterator<Item = Result<f64>> + '_> = if workers > 1 {
            pool = OrderedPool::new(workers)?;
            let chunk = chunk_size(n_models, workers);
            debug!(workers, chunk, "Dispatching Bemd estimates to worker pool");
            Box::new(pool.imap(inputs, chunk, work))
        } else {
            debug!("Computing Bemd estimates sequentially");
            Box::new(inputs.map(work))
        };

        let mut recorded = 0usize;
        for key in self.model_c_gen(&known) {
            let key = key?;
            let bemd = bemd_values.next().unwrap_or_else(|| {
                Err(CalibrationError::Worker(
                    "result stream ended before the work stream".into(),
                ))
            })?;
            reporter.tick();
            results.bemd.insert((key.index, key.c), bemd);
            recorded += 1;

            if !results.bconf.contains(&key.index) {
                let bconf = compute_bconf(
                    &key.model,
                    self.candidates.risk_a.as_ref(),
                    self.candidates.risk_b.as_ref(),
                    self.linf,
                )?;
                results.bconf.insert(key.index, bconf);
            }
        }

        reporter.complete();
        info!(
            recorded,
            elapsed = format!("{:.2} s", start.elapsed().as_secs_f64()),
            "Calibration experiments complete"
        );
        Ok(results)
    }

    /// Pack results and stamp them with this task's fingerprint.
    pub fn pack(&self, results: &CalibrationResults) -> Result<CalibrateOutput> {
        let mut output = codec::pack(&self.c_list, results)?;
        output.fingerprint = Some(self.fingerprint()?);
        Ok(output)
    }

    /// Reattach model keys to packed results.
    ///
    /// Fails with [`CalibrationError::FingerprintMismatch`] when the output
    /// was produced by a different distribution or `c_list`.
    pub fn unpack(&self, output: &CalibrateOutput) -> Result<CalibrationResults> {
        codec::verify_fingerprint(output, &self.fingerprint()?)?;
        codec::unpack_results(output, &self.data_models, &self.c_list)
    }

    /// Unpack and group into one calibration curve per `c`.
    pub fn unpack_curves(&self, output: &CalibrateOutput) -> Result<CalibrateResult> {
        self.unpack(output)?.curves(&self.c_list)
    }
}
