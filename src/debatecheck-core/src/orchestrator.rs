//! Debate orchestration logic.
//!
//! Drives the per-claim turn-taking state machine: optional claim
//! reformulation and domain inference, then opening, rebuttal and closing
//! rounds with declared visibility, then the judge. Turns with no data
//! dependency on each other within a round are dispatched concurrently;
//! rounds are strictly ordered. A failed turn aborts the whole session.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::backend::CompletionBackend;
use crate::dataset::Evidence;
use crate::debate_format::{DebateFormat, RoleSpec, Stance};
use crate::error::{DebateError, Result};
use crate::intent::{self, Reformulation};
use crate::prompts::{PromptCatalog, Statement, Transcript};
use crate::record::{FINAL_VERDICT, SessionRecord};

pub const TURN_MAX_TOKENS: u32 = 300;
pub const JUDGE_MAX_TOKENS: u32 = 400;
pub const DOMAIN_MAX_TOKENS: u32 = 100;

const MAX_EMPTY_RETRIES: u32 = 3;

/// Stages of a debate session, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reformulation,
    Domain,
    Opening,
    Rebuttal,
    Closing,
    Judge,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Reformulation => "reformulation",
            Stage::Domain => "domain inference",
            Stage::Opening => "opening statements",
            Stage::Rebuttal => "rebuttals",
            Stage::Closing => "closing statements",
            Stage::Judge => "judge verdict",
        }
    }
}

/// Events emitted while a session runs.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    StageStart { stage: Stage },
    TurnComplete { role: String, stage: Stage, content: String },
    SessionEnd,
}

/// Callback for session events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Orchestrates one debate session per claim.
pub struct DebateOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    catalog: Arc<dyn PromptCatalog>,
    format: DebateFormat,
    callback: Option<DebateCallback>,
}

impl DebateOrchestrator {
    /// Create an orchestrator for the given format. The format is validated
    /// here so misdeclared visibility fails at startup, not mid-run.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        catalog: Arc<dyn PromptCatalog>,
        format: DebateFormat,
    ) -> Result<Self> {
        format.validate()?;
        Ok(Self {
            backend,
            catalog,
            format,
            callback: None,
        })
    }

    /// Set a callback for session events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn format(&self) -> &DebateFormat {
        &self.format
    }

    pub fn backend(&self) -> &Arc<dyn CompletionBackend> {
        &self.backend
    }

    pub fn catalog(&self) -> &Arc<dyn PromptCatalog> {
        &self.catalog
    }

    /// Run the full debate for one claim and return its session record.
    pub async fn run_session(&self, claim: &str, evidence: &Evidence) -> Result<SessionRecord> {
        let evidence_text = evidence.joined();
        let mut turns: BTreeMap<String, String> = BTreeMap::new();

        let reformulation = if self.format.intent_stage {
            self.emit(DebateEvent::StageStart {
                stage: Stage::Reformulation,
            });
            let reformulation =
                intent::reformulate_claim(self.backend.as_ref(), self.catalog.as_ref(), claim)
                    .await?;
            turns.insert("original_claim".to_string(), claim.to_string());
            turns.insert("intent".to_string(), reformulation.intent.clone());
            turns.insert("reformulated_pro".to_string(), reformulation.pro.clone());
            turns.insert("reformulated_con".to_string(), reformulation.con.clone());
            Some(reformulation)
        } else {
            None
        };

        let domain_label = if self.format.domain_inference {
            self.emit(DebateEvent::StageStart {
                stage: Stage::Domain,
            });
            let label = self.infer_domain(claim).await?;
            turns.insert("domain_specialist".to_string(), label.clone());
            Some(label)
        } else {
            None
        };
        let domain = domain_label.as_deref();

        // OPENING: first-wave roles concurrently, then roles that consume
        // the first wave's statements.
        self.emit(DebateEvent::StageStart {
            stage: Stage::Opening,
        });
        let mut openings: BTreeMap<String, String> = BTreeMap::new();
        let outputs = try_join_all(self.format.first_wave().map(|role| {
            let system = self.system_for(role, domain);
            let user = self.catalog.opening(
                role,
                claim_view(claim, reformulation.as_ref(), role),
                &evidence_text,
                &[],
            );
            let id = role.id.clone();
            async move {
                Ok::<_, DebateError>((id, self.call(&system, &user, TURN_MAX_TOKENS).await?))
            }
        }))
        .await?;
        for (id, text) in outputs {
            self.emit_turn(&id, Stage::Opening, &text);
            openings.insert(id, text);
        }
        for role in self.format.second_wave() {
            let seen = collect_statements(&self.format, &openings, &role.opening_sees);
            let system = self.system_for(role, domain);
            let user = self.catalog.opening(
                role,
                claim_view(claim, reformulation.as_ref(), role),
                &evidence_text,
                &seen,
            );
            let text = self.call(&system, &user, TURN_MAX_TOKENS).await?;
            self.emit_turn(&role.id, Stage::Opening, &text);
            openings.insert(role.id.clone(), text);
        }
        for (id, text) in &openings {
            turns.insert(format!("{id}_opening"), text.clone());
        }

        // REBUTTAL: all roles concurrently; each reads exactly the declared
        // opponents' openings.
        self.emit(DebateEvent::StageStart {
            stage: Stage::Rebuttal,
        });
        let mut rebuttals: BTreeMap<String, String> = BTreeMap::new();
        let outputs = try_join_all(self.format.roles.iter().map(|role| {
            let opponents = collect_statements(&self.format, &openings, &role.rebuttal_sees);
            let system = self.system_for(role, domain);
            let user = self.catalog.rebuttal(
                role,
                claim_view(claim, reformulation.as_ref(), role),
                &evidence_text,
                &opponents,
            );
            let id = role.id.clone();
            async move {
                Ok::<_, DebateError>((id, self.call(&system, &user, TURN_MAX_TOKENS).await?))
            }
        }))
        .await?;
        for (id, text) in outputs {
            self.emit_turn(&id, Stage::Rebuttal, &text);
            rebuttals.insert(id, text);
        }
        for (id, text) in &rebuttals {
            turns.insert(format!("{id}_rebuttal"), text.clone());
        }

        // CLOSING: absent in two-round formats.
        let mut closings: BTreeMap<String, String> = BTreeMap::new();
        if self.format.closing_round {
            self.emit(DebateEvent::StageStart {
                stage: Stage::Closing,
            });
            let outputs = try_join_all(self.format.roles.iter().map(|role| {
                let seen = collect_statements(&self.format, &rebuttals, &role.closing_sees);
                let system = self.system_for(role, domain);
                let user = self.catalog.closing(
                    role,
                    claim_view(claim, reformulation.as_ref(), role),
                    &evidence_text,
                    &seen,
                );
                let id = role.id.clone();
                async move {
                    Ok::<_, DebateError>((id, self.call(&system, &user, TURN_MAX_TOKENS).await?))
                }
            }))
            .await?;
            for (id, text) in outputs {
                self.emit_turn(&id, Stage::Closing, &text);
                closings.insert(id, text);
            }
            for (id, text) in &closings {
                turns.insert(format!("{id}_closing"), text.clone());
            }
        }

        // JUDGE: always last, always over the original claim.
        self.emit(DebateEvent::StageStart {
            stage: Stage::Judge,
        });
        let transcript = Transcript {
            openings: ordered_statements(&self.format, &openings),
            rebuttals: ordered_statements(&self.format, &rebuttals),
            closings: ordered_statements(&self.format, &closings),
        };
        let judge_user = self.catalog.judge(claim, &evidence_text, &transcript, domain);
        let verdict = self
            .call(
                &self.catalog.persona_prompt("judge", None),
                &judge_user,
                JUDGE_MAX_TOKENS,
            )
            .await?;
        self.emit_turn("judge", Stage::Judge, &verdict);
        turns.insert(FINAL_VERDICT.to_string(), verdict);

        self.emit(DebateEvent::SessionEnd);
        Ok(SessionRecord::Debate(turns))
    }

    /// Infer which domain specialist should sit on the panel for this claim.
    async fn infer_domain(&self, claim: &str) -> Result<String> {
        let output = self
            .call(
                &self.catalog.persona_prompt("fact_checker", None),
                &self.catalog.domain_inference(claim),
                DOMAIN_MAX_TOKENS,
            )
            .await?;
        Ok(parse_domain(&output))
    }

    fn system_for(&self, role: &RoleSpec, domain: Option<&str>) -> String {
        let domain = if role.domain_parameterized { domain } else { None };
        self.catalog.persona_prompt(&role.persona, domain)
    }

    /// One backend call, retrying empty completions before giving up.
    async fn call(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        for attempt in 0..MAX_EMPTY_RETRIES {
            let text = self.backend.generate(system, user, max_tokens).await?;
            if !text.trim().is_empty() {
                return Ok(text);
            }
            if attempt < MAX_EMPTY_RETRIES - 1 {
                tracing::warn!(attempt = attempt + 1, "empty completion, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            }
        }
        Err(DebateError::EmptyResponse {
            attempts: MAX_EMPTY_RETRIES,
        })
    }

    fn emit(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    fn emit_turn(&self, role: &str, stage: Stage, content: &str) {
        self.emit(DebateEvent::TurnComplete {
            role: role.to_string(),
            stage,
            content: content.to_string(),
        });
    }
}

/// One fact-checker call instead of a debate (single-agent mode).
pub async fn verify_single(
    backend: &dyn CompletionBackend,
    catalog: &dyn PromptCatalog,
    claim: &str,
    evidence: &Evidence,
) -> Result<SessionRecord> {
    let output = backend
        .generate(
            &catalog.persona_prompt("fact_checker", None),
            &catalog.single_verdict(claim, &evidence.joined()),
            TURN_MAX_TOKENS,
        )
        .await?;
    Ok(SessionRecord::Single(vec![output]))
}

/// The claim text a role argues over: the stance-matching reformulation when
/// the intent stage ran, the original claim otherwise. Neutral roles and the
/// judge always get the original.
pub(crate) fn claim_view<'a>(
    original: &'a str,
    reformulation: Option<&'a Reformulation>,
    role: &RoleSpec,
) -> &'a str {
    match (reformulation, role.stance) {
        (Some(r), Stance::Pro) => &r.pro,
        (Some(r), Stance::Con) => &r.con,
        _ => original,
    }
}

pub(crate) fn collect_statements(
    format: &DebateFormat,
    outputs: &BTreeMap<String, String>,
    ids: &[String],
) -> Vec<Statement> {
    ids.iter()
        .filter_map(|id| {
            let text = outputs.get(id)?;
            let speaker = format
                .role(id)
                .map(|r| r.title.clone())
                .unwrap_or_else(|| id.clone());
            Some(Statement::new(speaker, text.clone()))
        })
        .collect()
}

pub(crate) fn ordered_statements(
    format: &DebateFormat,
    outputs: &BTreeMap<String, String>,
) -> Vec<Statement> {
    format
        .roles
        .iter()
        .filter_map(|role| {
            outputs
                .get(&role.id)
                .map(|text| Statement::new(role.title.clone(), text.clone()))
        })
        .collect()
}

pub(crate) fn parse_domain(output: &str) -> String {
    for line in output.lines() {
        if let Some(rest) = line.trim().strip_prefix("DOMAIN:") {
            let field = rest.trim();
            if !field.is_empty() {
                return field.to_string();
            }
        }
    }
    "Domain Expert".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate_format::get_format;
    use crate::mock::{MockBackend, RecordedCall};
    use crate::prompts::StockCatalog;
    use crate::verdict::{Verdict, extract_verdict};

    fn orchestrator(format_name: &str, backend: Arc<MockBackend>) -> DebateOrchestrator {
        DebateOrchestrator::new(
            backend,
            Arc::new(StockCatalog),
            get_format(format_name).unwrap(),
        )
        .unwrap()
    }

    fn debate_turns(record: &SessionRecord) -> &BTreeMap<String, String> {
        match record {
            SessionRecord::Debate(turns) => turns,
            SessionRecord::Single(_) => panic!("expected a debate record"),
        }
    }

    #[tokio::test]
    async fn pro_con_session_produces_all_turn_labels() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = orchestrator("pro-con", backend.clone());
        let record = orchestrator
            .run_session("the claim", &Evidence::Text("the evidence".to_string()))
            .await
            .unwrap();

        let turns = debate_turns(&record);
        for label in [
            "pro_opening",
            "con_opening",
            "pro_rebuttal",
            "con_rebuttal",
            "pro_closing",
            "con_closing",
            FINAL_VERDICT,
        ] {
            assert!(turns.contains_key(label), "missing {label}");
        }
        // 2 openings + 2 rebuttals + 2 closings + judge
        assert_eq!(backend.call_count(), 7);
    }

    #[tokio::test]
    async fn judge_is_last_and_uses_judge_budget() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = orchestrator("pro-con", backend.clone());
        orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await
            .unwrap();

        let calls = backend.calls();
        let last = calls.last().unwrap();
        assert!(last.system.contains("neutral judge"));
        assert_eq!(last.max_tokens, JUDGE_MAX_TOKENS);
    }

    #[tokio::test]
    async fn judge_always_receives_the_original_claim() {
        let backend = Arc::new(MockBackend::with_script(vec![
            "INFERRED-INTENT".to_string(),
            "PRO-REWRITE".to_string(),
            "CON-REWRITE".to_string(),
        ]));
        let orchestrator = DebateOrchestrator::new(
            backend.clone(),
            Arc::new(StockCatalog),
            get_format("pro-con").unwrap().with_intent(true),
        )
        .unwrap();
        let record = orchestrator
            .run_session(
                "Vaccines cause autism",
                &Evidence::Text("studies".to_string()),
            )
            .await
            .unwrap();

        let calls = backend.calls();
        let judge_call = calls.last().unwrap();
        assert!(judge_call.user.contains("Claim: Vaccines cause autism"));
        assert!(!judge_call.user.contains("PRO-REWRITE"));
        assert!(!judge_call.user.contains("CON-REWRITE"));
        assert!(!judge_call.user.contains("INFERRED-INTENT"));

        // debaters argued the reformulated claims
        let pro_opening = calls
            .iter()
            .find(|c| c.user.contains("Present your opening argument") && c.user.contains("Highlight facts"))
            .unwrap();
        assert!(pro_opening.user.contains("PRO-REWRITE"));

        // the record keeps the reformulation metadata
        let turns = debate_turns(&record);
        assert_eq!(
            turns.get("original_claim").unwrap(),
            "Vaccines cause autism"
        );
        assert_eq!(turns.get("reformulated_pro").unwrap(), "PRO-REWRITE");
        assert_eq!(turns.get("reformulated_con").unwrap(), "CON-REWRITE");
    }

    #[tokio::test]
    async fn rebuttals_only_see_declared_openings() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = orchestrator("four-stance", backend.clone());
        orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await
            .unwrap();

        // openings in declared order: pro1=resp-0, pro2=resp-1,
        // con1=resp-2, con2=resp-3
        let calls = backend.calls();
        let pro_rebuttals: Vec<&RecordedCall> = calls
            .iter()
            .filter(|c| {
                c.user
                    .contains("explaining why the opposing arguments are wrong")
            })
            .collect();
        assert_eq!(pro_rebuttals.len(), 2);
        for call in pro_rebuttals {
            assert!(call.user.contains("resp-2"));
            assert!(call.user.contains("resp-3"));
            assert!(!call.user.contains("resp-0"));
            assert!(!call.user.contains("resp-1"));
        }
    }

    #[tokio::test]
    async fn second_wave_openings_consume_the_first_wave() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = orchestrator("people-moderated", backend.clone());
        let record = orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await
            .unwrap();

        // journalist opens first (resp-0); both debater openings quote it
        let calls = backend.calls();
        let debater_openings: Vec<&RecordedCall> = calls
            .iter()
            .filter(|c| c.user.contains("Statements made so far"))
            .collect();
        assert_eq!(debater_openings.len(), 2);
        for call in debater_openings {
            assert!(call.user.contains("resp-0"));
        }
        assert!(debate_turns(&record).contains_key("journalist_opening"));
    }

    #[tokio::test]
    async fn domain_label_parameterizes_specialist_turns() {
        let backend = Arc::new(MockBackend::with_script(vec![
            "DOMAIN: Climate".to_string(),
        ]));
        let orchestrator = orchestrator("people-panel", backend.clone());
        let record = orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await
            .unwrap();

        assert_eq!(
            debate_turns(&record).get("domain_specialist").unwrap(),
            "Climate"
        );
        let specialist_turns: Vec<RecordedCall> = backend
            .calls()
            .into_iter()
            .filter(|c| c.system.contains("specialist in Climate"))
            .collect();
        // opening, rebuttal, closing
        assert_eq!(specialist_turns.len(), 3);
    }

    #[tokio::test]
    async fn two_round_format_skips_closings() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = orchestrator("people-2r", backend.clone());
        let record = orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await
            .unwrap();

        let turns = debate_turns(&record);
        assert!(turns.keys().all(|k| !k.ends_with("_closing")));
        let calls = backend.calls();
        let judge_call = calls.last().unwrap();
        assert!(!judge_call.user.contains("Closing Statements"));
        // 2 openings + 2 rebuttals + judge
        assert_eq!(backend.call_count(), 5);
    }

    #[tokio::test]
    async fn turn_failure_aborts_the_session() {
        let backend = Arc::new(MockBackend::new().fail_when_user_contains("rebuttal"));
        let orchestrator = orchestrator("pro-con", backend.clone());
        let result = orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn persistently_empty_completions_error_out() {
        // enough empties for both concurrent opening turns to exhaust their
        // three attempts
        let backend = Arc::new(MockBackend::with_script(vec![String::new(); 6]));
        let orchestrator = orchestrator("pro-con", backend.clone());
        let result = orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await;
        match result {
            Err(DebateError::EmptyResponse { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected EmptyResponse, got {other:?}"),
        }
    }

    #[test]
    fn invalid_format_is_rejected_at_construction() {
        let mut format = get_format("pro-con").unwrap();
        format.roles[0].rebuttal_sees.clear();
        let result = DebateOrchestrator::new(
            Arc::new(MockBackend::new()),
            Arc::new(StockCatalog),
            format,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn single_mode_returns_a_list_record() {
        let backend = MockBackend::constant("[VERDICT]: FALSE\n[REASON]: contradicted.");
        let record = verify_single(
            &backend,
            &StockCatalog,
            "Vaccines cause autism",
            &Evidence::Text(
                "Multiple peer-reviewed studies found no causal link between vaccines and autism."
                    .to_string(),
            ),
        )
        .await
        .unwrap();
        match &record {
            SessionRecord::Single(outputs) => {
                assert_eq!(outputs.len(), 1);
                assert!(outputs[0].contains("[VERDICT]: FALSE"));
            }
            SessionRecord::Debate(_) => panic!("expected single record"),
        }
        assert_eq!(extract_verdict(&record), Verdict::False);
    }

    #[test]
    fn parse_domain_reads_the_tagged_line() {
        assert_eq!(parse_domain("DOMAIN: Economy"), "Economy");
        assert_eq!(
            parse_domain("Some preamble\nDOMAIN: Public Health\n"),
            "Public Health"
        );
        assert_eq!(parse_domain("no tag at all"), "Domain Expert");
        assert_eq!(parse_domain("DOMAIN:"), "Domain Expert");
    }

    #[tokio::test]
    async fn events_fire_in_stage_order() {
        use std::sync::Mutex;
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let backend = Arc::new(MockBackend::new());
        let orchestrator =
            orchestrator("pro-con", backend).with_callback(Box::new(move |event| {
                let tag = match event {
                    DebateEvent::StageStart { stage } => format!("stage:{}", stage.label()),
                    DebateEvent::TurnComplete { role, .. } => format!("turn:{role}"),
                    DebateEvent::SessionEnd => "end".to_string(),
                };
                sink.lock().unwrap().push(tag);
            }));
        orchestrator
            .run_session("c", &Evidence::Text("e".to_string()))
            .await
            .unwrap();

        let seen = events.lock().unwrap().clone();
        let stages: Vec<String> = seen
            .iter()
            .filter(|t| t.starts_with("stage:"))
            .cloned()
            .collect();
        assert_eq!(
            stages,
            vec![
                "stage:opening statements",
                "stage:rebuttals",
                "stage:closing statements",
                "stage:judge verdict",
            ]
        );
        assert_eq!(seen.last().unwrap(), "end");
    }
}
