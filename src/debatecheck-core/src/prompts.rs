//! Prompt catalog.
//!
//! Pure string formatting: given a role and a turn's arguments, produce the
//! system and user prompt text. The orchestrator never hardcodes prompt
//! wording; swap the catalog to change it.

use crate::debate_format::{RoleSpec, Stance};

/// One role's statement, as shown to other roles and the judge.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Display name of the speaker.
    pub speaker: String,
    pub text: String,
}

impl Statement {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// The full debate transcript handed to the judge, each round in declared
/// role order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub openings: Vec<Statement>,
    pub rebuttals: Vec<Statement>,
    pub closings: Vec<Statement>,
}

/// Builds system and user prompts for every turn kind.
pub trait PromptCatalog: Send + Sync {
    /// System prompt for a persona key ("debater", "judge", ...). The domain
    /// label parameterizes the domain-specialist persona.
    fn persona_prompt(&self, persona: &str, domain: Option<&str>) -> String;

    fn opening(&self, role: &RoleSpec, claim: &str, evidence: &str, seen: &[Statement]) -> String;

    fn rebuttal(
        &self,
        role: &RoleSpec,
        claim: &str,
        evidence: &str,
        opponents: &[Statement],
    ) -> String;

    fn closing(
        &self,
        role: &RoleSpec,
        claim: &str,
        evidence: &str,
        rebuttals: &[Statement],
    ) -> String;

    fn judge(
        &self,
        claim: &str,
        evidence: &str,
        transcript: &Transcript,
        domain: Option<&str>,
    ) -> String;

    fn single_verdict(&self, claim: &str, evidence: &str) -> String;

    fn intent_inference(&self, claim: &str) -> String;

    fn reformulate_pro(&self, claim: &str, intent: &str) -> String;

    fn reformulate_con(&self, claim: &str, intent: &str) -> String;

    fn domain_inference(&self, claim: &str) -> String;
}

/// The stock templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockCatalog;

fn statements_block(heading: &str, statements: &[Statement]) -> String {
    let mut block = String::new();
    for statement in statements {
        block.push_str(&format!(
            "\n{heading} {}:\n{}\n",
            statement.speaker, statement.text
        ));
    }
    block
}

impl PromptCatalog for StockCatalog {
    fn persona_prompt(&self, persona: &str, domain: Option<&str>) -> String {
        match persona {
            "fact_checker" => "You are a precise and critical fact checker.".to_string(),
            "debater" => "You are a critical thinker participating in a factual debate.".to_string(),
            "judge" => "You are a neutral judge who evaluates factual debates.".to_string(),
            "politician" => {
                "You are a seasoned politician debating the truth of public claims, persuasive and rhetorical.".to_string()
            }
            "scientist" => {
                "You are a scientist who weighs claims strictly against empirical evidence.".to_string()
            }
            "journalist" => {
                "You are an investigative journalist examining both sides of a factual dispute.".to_string()
            }
            "domain_scientist" => {
                let field = domain.unwrap_or("Domain Expert");
                format!("You are a specialist in {field}, evaluating claims within your field.")
            }
            _ => "You are a helpful assistant.".to_string(),
        }
    }

    fn opening(&self, role: &RoleSpec, claim: &str, evidence: &str, seen: &[Statement]) -> String {
        let context = if seen.is_empty() {
            String::new()
        } else {
            format!(
                "\nStatements made so far:\n{}",
                statements_block("Statement by", seen)
            )
        };
        match role.stance {
            Stance::Pro => format!(
                "You support the following claim. Present your opening argument using the evidence.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{context}\n\
                 Begin your argument with your position. Highlight facts that support the claim as TRUE."
            ),
            Stance::Con => format!(
                "You oppose the following claim. Present your opening argument using the evidence.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{context}\n\
                 Begin your argument by explaining why the claim is FALSE or misleading, referencing specific points in the evidence."
            ),
            Stance::Neutral => format!(
                "You are the {title}, offering an independent analysis of the claim below.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{context}\n\
                 Present your opening assessment of how well the evidence supports or undermines the claim.",
                title = role.title
            ),
        }
    }

    fn rebuttal(
        &self,
        role: &RoleSpec,
        claim: &str,
        evidence: &str,
        opponents: &[Statement],
    ) -> String {
        let arguments = statements_block("Argument by", opponents);
        match role.stance {
            Stance::Pro => format!(
                "You are the supporting agent in a debate about the claim below. Your opponents have argued against the claim.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{arguments}\n\
                 Write your rebuttal, explaining why the opposing arguments are wrong and defending the claim."
            ),
            Stance::Con => format!(
                "You are the opposing agent in a debate about the claim below. Your opponents have argued in support of the claim.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{arguments}\n\
                 Write your rebuttal, explaining why the opposing arguments are incorrect and the claim is still FALSE or HALF-TRUE."
            ),
            Stance::Neutral => format!(
                "You are the {title} in a debate about the claim below. The debaters have made their arguments.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{arguments}\n\
                 Assess the strengths and weaknesses of each argument against the evidence.",
                title = role.title
            ),
        }
    }

    fn closing(
        &self,
        role: &RoleSpec,
        claim: &str,
        evidence: &str,
        rebuttals: &[Statement],
    ) -> String {
        let context = if rebuttals.is_empty() {
            String::new()
        } else {
            statements_block("Rebuttal by", rebuttals)
        };
        match role.stance {
            Stance::Pro => format!(
                "You are the supporting agent in a debate. Summarize your final position.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{context}\n\
                 Provide a closing statement reinforcing why the claim is TRUE."
            ),
            Stance::Con => format!(
                "You are the opposing agent in a debate. Summarize your final position.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{context}\n\
                 Provide a closing statement reinforcing why the claim is FALSE or HALF-TRUE."
            ),
            Stance::Neutral => format!(
                "You are the {title} in a debate. Summarize your final assessment.\n\n\
                 Claim: {claim}\n\n\
                 Evidence:\n{evidence}\n{context}\n\
                 Provide a closing analysis of which side the evidence favors.",
                title = role.title
            ),
        }
    }

    fn judge(
        &self,
        claim: &str,
        evidence: &str,
        transcript: &Transcript,
        domain: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "You are a neutral judge evaluating a factual debate.\n\n\
             Claim: {claim}\n\n\
             Evidence:\n{evidence}\n"
        );
        if let Some(field) = domain {
            prompt.push_str(&format!("\nDomain specialist consulted: {field}\n"));
        }
        prompt.push_str("\n--- Opening Statements ---\n");
        prompt.push_str(&statements_block("Opening by", &transcript.openings));
        prompt.push_str("\n--- Rebuttals ---\n");
        prompt.push_str(&statements_block("Rebuttal by", &transcript.rebuttals));
        if !transcript.closings.is_empty() {
            prompt.push_str("\n--- Closing Statements ---\n");
            prompt.push_str(&statements_block("Closing by", &transcript.closings));
        }
        prompt.push_str(
            "\nBased on the arguments and evidence, decide whether the claim is TRUE, FALSE, or HALF-TRUE.\n\n\
             Answer format:\n\
             [VERDICT]: TRUE / FALSE / HALF-TRUE\n\
             [REASON]: <your justification>\n",
        );
        prompt
    }

    fn single_verdict(&self, claim: &str, evidence: &str) -> String {
        format!(
            "Given a claim and some retrieved evidence, determine whether the claim is TRUE, FALSE, or HALF-TRUE.\n\n\
             Claim: {claim}\n\n\
             Retrieved Evidence:\n{evidence}\n\n\
             Answer format:\n\
             [VERDICT]: TRUE / FALSE / HALF-TRUE\n\
             [REASON]: <your explanation>\n"
        )
    }

    fn intent_inference(&self, claim: &str) -> String {
        format!(
            "A claim may be literally accurate but still misleading due to the message it implies.\n\n\
             Your task is to infer the intended message or implied conclusion of the following claim.\n\n\
             Claim: \"{claim}\"\n\n\
             What is the intended conclusion of this claim?\n\n\
             Respond with one clear and concise sentence."
        )
    }

    fn reformulate_pro(&self, claim: &str, intent: &str) -> String {
        format!(
            "You support the following claim and aim to reinforce its implied message.\n\n\
             Claim: \"{claim}\"\n\n\
             Inferred Intent: \"{intent}\"\n\n\
             Your task is to reformulate the claim in a way that makes the implied conclusion more explicit and persuasive.\n\n\
             Only output the reformulated claim directly, without any introductory phrases or explanations.\n\n\
             Reformulated (Pro) Claim:"
        )
    }

    fn reformulate_con(&self, claim: &str, intent: &str) -> String {
        format!(
            "You oppose the following claim and aim to highlight any issues with its implied message.\n\n\
             Claim: \"{claim}\"\n\n\
             Inferred Intent: \"{intent}\"\n\n\
             Your task is to reformulate the claim in a way that emphasizes its potential problems, uncertainties, or misleading assumptions.\n\n\
             Only output the reformulated claim directly, without any introductory phrases or explanations.\n\n\
             Reformulated (Con) Claim:"
        )
    }

    fn domain_inference(&self, claim: &str) -> String {
        format!(
            "A claim is best examined by a specialist in its topical domain (e.g. Climate, Economy, Public Health).\n\n\
             Claim: \"{claim}\"\n\n\
             Name the domain specialist best suited to evaluate this claim.\n\n\
             Respond with a single line in the form:\n\
             DOMAIN: <field>"
        )
    }
}
