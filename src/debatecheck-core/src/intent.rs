//! Intent inference and claim reformulation.
//!
//! A claim can be literally true while implying a misleading conclusion.
//! This stage infers the implied conclusion, then rewrites the claim once
//! reinforcing it and once undermining it, so pro- and con-aligned debaters
//! argue the implication rather than talking past each other. Reformulation
//! quality is not validated; a drifting rewrite is a known limitation.

use crate::backend::CompletionBackend;
use crate::error::Result;
use crate::prompts::PromptCatalog;

pub const INTENT_MAX_TOKENS: u32 = 100;
pub const REFORMULATE_MAX_TOKENS: u32 = 150;

/// Output of the reformulation stage. The original claim is not carried
/// here; callers keep it separately and the judge only ever sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reformulation {
    pub intent: String,
    pub pro: String,
    pub con: String,
}

/// Infer the intended message of a claim. One call, fail-fast.
pub async fn infer_intent(
    backend: &dyn CompletionBackend,
    catalog: &dyn PromptCatalog,
    claim: &str,
) -> Result<String> {
    backend
        .generate(
            &catalog.persona_prompt("fact_checker", None),
            &catalog.intent_inference(claim),
            INTENT_MAX_TOKENS,
        )
        .await
}

/// Restate the claim so the inferred intent becomes explicit, from the
/// supporting perspective.
pub async fn reformulate_pro(
    backend: &dyn CompletionBackend,
    catalog: &dyn PromptCatalog,
    claim: &str,
    intent: &str,
) -> Result<String> {
    backend
        .generate(
            &catalog.persona_prompt("debater", None),
            &catalog.reformulate_pro(claim, intent),
            REFORMULATE_MAX_TOKENS,
        )
        .await
}

/// Restate the claim emphasizing its problems, from the opposing
/// perspective.
pub async fn reformulate_con(
    backend: &dyn CompletionBackend,
    catalog: &dyn PromptCatalog,
    claim: &str,
    intent: &str,
) -> Result<String> {
    backend
        .generate(
            &catalog.persona_prompt("debater", None),
            &catalog.reformulate_con(claim, intent),
            REFORMULATE_MAX_TOKENS,
        )
        .await
}

/// Run the full stage: intent, then the pro and con rewrites.
pub async fn reformulate_claim(
    backend: &dyn CompletionBackend,
    catalog: &dyn PromptCatalog,
    claim: &str,
) -> Result<Reformulation> {
    let intent = infer_intent(backend, catalog, claim).await?;
    let pro = reformulate_pro(backend, catalog, claim, &intent).await?;
    let con = reformulate_con(backend, catalog, claim, &intent).await?;
    Ok(Reformulation { intent, pro, con })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::prompts::StockCatalog;

    #[tokio::test]
    async fn stage_runs_three_calls_in_order() {
        let backend = MockBackend::with_script(vec![
            "implied conclusion".to_string(),
            "pro rewrite".to_string(),
            "con rewrite".to_string(),
        ]);
        let result = reformulate_claim(&backend, &StockCatalog, "the claim")
            .await
            .unwrap();
        assert_eq!(result.intent, "implied conclusion");
        assert_eq!(result.pro, "pro rewrite");
        assert_eq!(result.con, "con rewrite");

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].system.contains("fact checker"));
        assert_eq!(calls[0].max_tokens, INTENT_MAX_TOKENS);
        assert!(calls[1].user.contains("implied conclusion"));
        assert!(calls[1].user.contains("Reformulated (Pro) Claim"));
        assert!(calls[2].user.contains("Reformulated (Con) Claim"));
        assert_eq!(calls[1].max_tokens, REFORMULATE_MAX_TOKENS);
    }

    #[tokio::test]
    async fn intent_failure_propagates() {
        let backend = MockBackend::new().fail_when_user_contains("poisoned");
        let result = reformulate_claim(&backend, &StockCatalog, "poisoned claim").await;
        assert!(result.is_err());
        // fail-fast: no reformulation calls were attempted
        assert_eq!(backend.call_count(), 1);
    }
}
