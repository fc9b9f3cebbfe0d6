//! Batch scheduling across claims.
//!
//! Partitions pending examples into contiguous chunks and drives one session
//! per example, in input order. Backends advertising a batched call get the
//! transposed path: the same role's same-round turns across all chunk
//! members become one batched call. The batched call is atomic, so a failure
//! there poisons the whole chunk; the scheduler falls back to per-claim
//! sequential execution of that chunk, where a failing claim is a gap in the
//! results rather than a crash.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::CompletionBackend;
use crate::checkpoint::Checkpoint;
use crate::dataset::Example;
use crate::debate_format::{DebateFormat, RoleSpec, get_format};
use crate::error::{DebateError, Result};
use crate::intent::{INTENT_MAX_TOKENS, REFORMULATE_MAX_TOKENS, Reformulation};
use crate::orchestrator::{
    self, DOMAIN_MAX_TOKENS, DebateOrchestrator, JUDGE_MAX_TOKENS, TURN_MAX_TOKENS,
};
use crate::prompts::{PromptCatalog, Transcript};
use crate::record::{FINAL_VERDICT, SessionRecord};

pub const DEFAULT_CHUNK_SIZE: usize = 8;

/// How each claim is processed: one fact-checker call, or a full debate.
#[derive(Debug, Clone)]
pub enum RunMode {
    Single,
    Debate(DebateFormat),
}

impl RunMode {
    /// Resolve a CLI selector ("single" or a debate format name), applying
    /// the intent-stage toggle to debate formats.
    pub fn resolve(name: &str, intent: bool) -> Result<Self> {
        if name.eq_ignore_ascii_case("single") {
            return Ok(RunMode::Single);
        }
        let format = get_format(name).ok_or_else(|| DebateError::UnknownFormat(name.to_string()))?;
        Ok(RunMode::Debate(format.with_intent(intent)))
    }
}

/// Totals reported after a run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Claims completed this run.
    pub processed: usize,
    /// Claims already present in the checkpoint, untouched.
    pub skipped: usize,
    /// Claims that failed and were left as gaps.
    pub failed: Vec<String>,
}

enum Runner {
    Single,
    Debate(DebateOrchestrator),
}

/// Drives sessions over an example collection with checkpointed resume.
pub struct BatchScheduler {
    backend: Arc<dyn CompletionBackend>,
    catalog: Arc<dyn PromptCatalog>,
    runner: Runner,
    chunk_size: usize,
}

impl BatchScheduler {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        catalog: Arc<dyn PromptCatalog>,
        mode: RunMode,
        chunk_size: usize,
    ) -> Result<Self> {
        let runner = match mode {
            RunMode::Single => Runner::Single,
            RunMode::Debate(format) => Runner::Debate(DebateOrchestrator::new(
                backend.clone(),
                catalog.clone(),
                format,
            )?),
        };
        Ok(Self {
            backend,
            catalog,
            runner,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Hand the debate orchestrator an event callback (no-op in single mode).
    pub fn with_callback(mut self, callback: orchestrator::DebateCallback) -> Self {
        self.runner = match self.runner {
            Runner::Debate(orchestrator) => {
                Runner::Debate(orchestrator.with_callback(callback))
            }
            single => single,
        };
        self
    }

    /// Process every example not yet in the checkpoint, saving after each
    /// completed claim (sequential path) or chunk (batched path).
    pub async fn run(
        &self,
        examples: &[Example],
        checkpoint: &mut Checkpoint,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let pending: Vec<&Example> = examples
            .iter()
            .filter(|example| !checkpoint.contains(&example.id))
            .collect();
        summary.skipped = examples.len() - pending.len();
        if summary.skipped > 0 {
            tracing::info!(skipped = summary.skipped, "resuming: checkpointed claims left untouched");
        }

        for chunk in pending.chunks(self.chunk_size) {
            if self.backend.supports_batch() {
                match self.run_chunk_batched(chunk).await {
                    Ok(records) => {
                        for (example, record) in chunk.iter().zip(records) {
                            checkpoint.insert(example.id.clone(), record);
                            summary.processed += 1;
                        }
                        checkpoint.save()?;
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "batched chunk failed; retrying claims sequentially");
                    }
                }
            }
            self.run_chunk_sequential(chunk, checkpoint, &mut summary)
                .await?;
        }
        Ok(summary)
    }

    async fn run_chunk_sequential(
        &self,
        chunk: &[&Example],
        checkpoint: &mut Checkpoint,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for example in chunk {
            match self.run_one(example).await {
                Ok(record) => {
                    checkpoint.insert(example.id.clone(), record);
                    summary.processed += 1;
                }
                Err(err) => {
                    tracing::error!(id = %example.id, error = %err, "claim failed; leaving a gap");
                    summary.failed.push(example.id.clone());
                }
            }
            checkpoint.save()?;
        }
        Ok(())
    }

    async fn run_one(&self, example: &Example) -> Result<SessionRecord> {
        match &self.runner {
            Runner::Single => {
                orchestrator::verify_single(
                    self.backend.as_ref(),
                    self.catalog.as_ref(),
                    &example.claim,
                    &example.evidence,
                )
                .await
            }
            Runner::Debate(orchestrator) => {
                orchestrator.run_session(&example.claim, &example.evidence).await
            }
        }
    }

    async fn run_chunk_batched(&self, chunk: &[&Example]) -> Result<Vec<SessionRecord>> {
        match &self.runner {
            Runner::Single => self.run_single_chunk_batched(chunk).await,
            Runner::Debate(orchestrator) => {
                self.run_debate_chunk_batched(chunk, orchestrator.format()).await
            }
        }
    }

    async fn run_single_chunk_batched(&self, chunk: &[&Example]) -> Result<Vec<SessionRecord>> {
        let system = self.catalog.persona_prompt("fact_checker", None);
        let systems = vec![system; chunk.len()];
        let users: Vec<String> = chunk
            .iter()
            .map(|e| self.catalog.single_verdict(&e.claim, &e.evidence.joined()))
            .collect();
        let outputs = self.batch_call(systems, users, TURN_MAX_TOKENS).await?;
        Ok(outputs
            .into_iter()
            .map(|output| SessionRecord::Single(vec![output]))
            .collect())
    }

    /// The transposed loop: per stage, per role, one batched call across all
    /// chunk members. Unlike the sequential path there is no empty-response
    /// retry here; the batch primitive is atomic.
    async fn run_debate_chunk_batched(
        &self,
        chunk: &[&Example],
        format: &DebateFormat,
    ) -> Result<Vec<SessionRecord>> {
        let n = chunk.len();
        let catalog = self.catalog.as_ref();
        let evidence: Vec<String> = chunk.iter().map(|e| e.evidence.joined()).collect();
        let mut turns: Vec<BTreeMap<String, String>> = vec![BTreeMap::new(); n];

        let reformulations: Option<Vec<Reformulation>> = if format.intent_stage {
            let fact_checker = catalog.persona_prompt("fact_checker", None);
            let intents = self
                .batch_call(
                    vec![fact_checker; n],
                    chunk.iter().map(|e| catalog.intent_inference(&e.claim)).collect(),
                    INTENT_MAX_TOKENS,
                )
                .await?;
            let debater = catalog.persona_prompt("debater", None);
            let pros = self
                .batch_call(
                    vec![debater.clone(); n],
                    chunk
                        .iter()
                        .zip(&intents)
                        .map(|(e, intent)| catalog.reformulate_pro(&e.claim, intent))
                        .collect(),
                    REFORMULATE_MAX_TOKENS,
                )
                .await?;
            let cons = self
                .batch_call(
                    vec![debater; n],
                    chunk
                        .iter()
                        .zip(&intents)
                        .map(|(e, intent)| catalog.reformulate_con(&e.claim, intent))
                        .collect(),
                    REFORMULATE_MAX_TOKENS,
                )
                .await?;
            let reformulations: Vec<Reformulation> = intents
                .into_iter()
                .zip(pros)
                .zip(cons)
                .map(|((intent, pro), con)| Reformulation { intent, pro, con })
                .collect();
            for (i, reformulation) in reformulations.iter().enumerate() {
                turns[i].insert("original_claim".to_string(), chunk[i].claim.clone());
                turns[i].insert("intent".to_string(), reformulation.intent.clone());
                turns[i].insert("reformulated_pro".to_string(), reformulation.pro.clone());
                turns[i].insert("reformulated_con".to_string(), reformulation.con.clone());
            }
            Some(reformulations)
        } else {
            None
        };

        let domains: Option<Vec<String>> = if format.domain_inference {
            let fact_checker = catalog.persona_prompt("fact_checker", None);
            let outputs = self
                .batch_call(
                    vec![fact_checker; n],
                    chunk.iter().map(|e| catalog.domain_inference(&e.claim)).collect(),
                    DOMAIN_MAX_TOKENS,
                )
                .await?;
            let labels: Vec<String> =
                outputs.iter().map(|o| orchestrator::parse_domain(o)).collect();
            for (i, label) in labels.iter().enumerate() {
                turns[i].insert("domain_specialist".to_string(), label.clone());
            }
            Some(labels)
        } else {
            None
        };

        let view = |i: usize, role: &RoleSpec| -> String {
            orchestrator::claim_view(&chunk[i].claim, reformulations.as_ref().map(|r| &r[i]), role)
                .to_string()
        };
        let system_for = |role: &RoleSpec, i: usize| -> String {
            let domain = if role.domain_parameterized {
                domains.as_ref().map(|d| d[i].as_str())
            } else {
                None
            };
            catalog.persona_prompt(&role.persona, domain)
        };

        // OPENING
        let mut openings: Vec<BTreeMap<String, String>> = vec![BTreeMap::new(); n];
        for role in format.first_wave() {
            let systems = (0..n).map(|i| system_for(role, i)).collect();
            let users = (0..n)
                .map(|i| catalog.opening(role, &view(i, role), &evidence[i], &[]))
                .collect();
            let outputs = self.batch_call(systems, users, TURN_MAX_TOKENS).await?;
            for (i, text) in outputs.into_iter().enumerate() {
                openings[i].insert(role.id.clone(), text);
            }
        }
        for role in format.second_wave() {
            let systems = (0..n).map(|i| system_for(role, i)).collect();
            let users = (0..n)
                .map(|i| {
                    let seen =
                        orchestrator::collect_statements(format, &openings[i], &role.opening_sees);
                    catalog.opening(role, &view(i, role), &evidence[i], &seen)
                })
                .collect();
            let outputs = self.batch_call(systems, users, TURN_MAX_TOKENS).await?;
            for (i, text) in outputs.into_iter().enumerate() {
                openings[i].insert(role.id.clone(), text);
            }
        }
        for i in 0..n {
            for (id, text) in &openings[i] {
                turns[i].insert(format!("{id}_opening"), text.clone());
            }
        }

        // REBUTTAL
        let mut rebuttals: Vec<BTreeMap<String, String>> = vec![BTreeMap::new(); n];
        for role in &format.roles {
            let systems = (0..n).map(|i| system_for(role, i)).collect();
            let users = (0..n)
                .map(|i| {
                    let opponents =
                        orchestrator::collect_statements(format, &openings[i], &role.rebuttal_sees);
                    catalog.rebuttal(role, &view(i, role), &evidence[i], &opponents)
                })
                .collect();
            let outputs = self.batch_call(systems, users, TURN_MAX_TOKENS).await?;
            for (i, text) in outputs.into_iter().enumerate() {
                rebuttals[i].insert(role.id.clone(), text);
            }
        }
        for i in 0..n {
            for (id, text) in &rebuttals[i] {
                turns[i].insert(format!("{id}_rebuttal"), text.clone());
            }
        }

        // CLOSING
        let mut closings: Vec<BTreeMap<String, String>> = vec![BTreeMap::new(); n];
        if format.closing_round {
            for role in &format.roles {
                let systems = (0..n).map(|i| system_for(role, i)).collect();
                let users = (0..n)
                    .map(|i| {
                        let seen = orchestrator::collect_statements(
                            format,
                            &rebuttals[i],
                            &role.closing_sees,
                        );
                        catalog.closing(role, &view(i, role), &evidence[i], &seen)
                    })
                    .collect();
                let outputs = self.batch_call(systems, users, TURN_MAX_TOKENS).await?;
                for (i, text) in outputs.into_iter().enumerate() {
                    closings[i].insert(role.id.clone(), text);
                }
            }
            for i in 0..n {
                for (id, text) in &closings[i] {
                    turns[i].insert(format!("{id}_closing"), text.clone());
                }
            }
        }

        // JUDGE: one batched call, original claims only.
        let judge_system = catalog.persona_prompt("judge", None);
        let users = (0..n)
            .map(|i| {
                let transcript = Transcript {
                    openings: orchestrator::ordered_statements(format, &openings[i]),
                    rebuttals: orchestrator::ordered_statements(format, &rebuttals[i]),
                    closings: orchestrator::ordered_statements(format, &closings[i]),
                };
                let domain = domains.as_ref().map(|d| d[i].as_str());
                catalog.judge(&chunk[i].claim, &evidence[i], &transcript, domain)
            })
            .collect();
        let verdicts = self
            .batch_call(vec![judge_system; n], users, JUDGE_MAX_TOKENS)
            .await?;
        for (i, verdict) in verdicts.into_iter().enumerate() {
            turns[i].insert(FINAL_VERDICT.to_string(), verdict);
        }

        Ok(turns.into_iter().map(SessionRecord::Debate).collect())
    }

    async fn batch_call(
        &self,
        systems: Vec<String>,
        users: Vec<String>,
        max_tokens: u32,
    ) -> Result<Vec<String>> {
        let expected = users.len();
        let outputs = self
            .backend
            .generate_batch(&systems, &users, max_tokens)
            .await?;
        if outputs.len() != expected {
            return Err(DebateError::BatchShape {
                expected,
                got: outputs.len(),
            });
        }
        Ok(outputs)
    }
}
