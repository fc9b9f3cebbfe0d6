//! Debate format definitions.
//!
//! Every supported debate variant is one declared configuration over the same
//! turn-taking machinery: the set of roles, each role's stance and persona,
//! and the per-round visibility map. The orchestrator reads this
//! configuration; it contains no per-format code paths.

use serde::{Deserialize, Serialize};

use crate::error::{DebateError, Result};

/// Which side of the claim a role argues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    /// Argues the claim is TRUE; receives the pro reformulation when the
    /// intent stage is enabled.
    Pro,
    /// Argues the claim is FALSE or misleading; receives the con
    /// reformulation.
    Con,
    /// Analyzes rather than advocates; always receives the original claim.
    Neutral,
}

/// One debating persona within a format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Turn-label prefix, e.g. `pro1` yields `pro1_opening`.
    pub id: String,
    /// Display name rendered into prompts, e.g. "Source Critic".
    pub title: String,
    pub stance: Stance,
    /// System-prompt key looked up in the prompt catalog.
    pub persona: String,
    /// Roles whose openings this role's own opening consumes. Non-empty
    /// marks a second-wave role, computed after all first-wave openings.
    #[serde(default)]
    pub opening_sees: Vec<String>,
    /// Roles whose openings this role's rebuttal consumes. Must be
    /// non-empty: a rebuttal that reads no opponent is a protocol violation.
    pub rebuttal_sees: Vec<String>,
    /// Roles whose rebuttals this role's closing consumes.
    #[serde(default)]
    pub closing_sees: Vec<String>,
    /// Parameterize this role's system prompt with the inferred domain label.
    #[serde(default)]
    pub domain_parameterized: bool,
}

impl RoleSpec {
    fn new(id: &str, title: &str, stance: Stance, persona: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            stance,
            persona: persona.to_string(),
            opening_sees: Vec::new(),
            rebuttal_sees: Vec::new(),
            closing_sees: Vec::new(),
            domain_parameterized: false,
        }
    }

    fn rebuts(mut self, ids: &[&str]) -> Self {
        self.rebuttal_sees = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn opens_after(mut self, ids: &[&str]) -> Self {
        self.opening_sees = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn closes_on(mut self, ids: &[&str]) -> Self {
        self.closing_sees = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn with_domain(mut self) -> Self {
        self.domain_parameterized = true;
        self
    }
}

/// A declared debate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateFormat {
    pub name: String,
    pub roles: Vec<RoleSpec>,
    /// Run the intent-inference/reformulation stage before the debate.
    #[serde(default)]
    pub intent_stage: bool,
    /// Infer a domain-specialist label once per claim.
    #[serde(default)]
    pub domain_inference: bool,
    /// Whether the format has a closing round at all.
    #[serde(default = "default_true")]
    pub closing_round: bool,
}

fn default_true() -> bool {
    true
}

impl DebateFormat {
    /// Enable or disable the reformulation stage, producing the `*_intent`
    /// variant of any base format.
    pub fn with_intent(mut self, enabled: bool) -> Self {
        self.intent_stage = enabled;
        self
    }

    pub fn role(&self, id: &str) -> Option<&RoleSpec> {
        self.roles.iter().find(|r| r.id == id)
    }

    /// Roles whose openings have no turn dependencies, in declared order.
    pub fn first_wave(&self) -> impl Iterator<Item = &RoleSpec> {
        self.roles.iter().filter(|r| r.opening_sees.is_empty())
    }

    /// Roles whose openings consume first-wave openings, in declared order.
    pub fn second_wave(&self) -> impl Iterator<Item = &RoleSpec> {
        self.roles.iter().filter(|r| !r.opening_sees.is_empty())
    }

    /// Check the structural invariants of the configuration. Run once at
    /// orchestrator construction; violations are startup errors.
    pub fn validate(&self) -> Result<()> {
        if self.roles.is_empty() {
            return self.fail("no roles declared".to_string());
        }
        for (i, role) in self.roles.iter().enumerate() {
            if self.roles[..i].iter().any(|r| r.id == role.id) {
                return self.fail(format!("duplicate role id '{}'", role.id));
            }
        }
        for role in &self.roles {
            if role.rebuttal_sees.is_empty() {
                return self.fail(format!(
                    "role '{}' rebuts nobody; every rebuttal must consume at least one opponent",
                    role.id
                ));
            }
            for (round, seen) in [
                ("opening", &role.opening_sees),
                ("rebuttal", &role.rebuttal_sees),
                ("closing", &role.closing_sees),
            ] {
                for id in seen {
                    if id == &role.id {
                        return self.fail(format!("role '{}' sees itself in {round}", role.id));
                    }
                    let Some(target) = self.role(id) else {
                        return self.fail(format!(
                            "role '{}' sees unknown role '{id}' in {round}",
                            role.id
                        ));
                    };
                    // no opening chains: a second-wave opening may only
                    // consume first-wave openings
                    if round == "opening" && !target.opening_sees.is_empty() {
                        return self.fail(format!(
                            "role '{}' opening depends on second-wave role '{id}'",
                            role.id
                        ));
                    }
                }
            }
            if role.domain_parameterized && !self.domain_inference {
                return self.fail(format!(
                    "role '{}' is domain-parameterized but the format has no domain inference",
                    role.id
                ));
            }
        }
        Ok(())
    }

    fn fail(&self, reason: String) -> Result<()> {
        Err(DebateError::InvalidFormat {
            name: self.name.clone(),
            reason,
        })
    }
}

/// Look up a debate format by its selector name.
pub fn get_format(name: &str) -> Option<DebateFormat> {
    match name.to_lowercase().as_str() {
        "pro-con" => Some(pro_con()),
        "people" => Some(people()),
        "people-2r" => Some(people_2r()),
        "pro-con-journalist" => Some(pro_con_journalist()),
        "four-stance" => Some(four_stance()),
        "people-panel" => Some(people_panel()),
        "people-moderated" => Some(people_moderated()),
        _ => None,
    }
}

/// All debate format selector names.
pub fn available_formats() -> Vec<&'static str> {
    vec![
        "pro-con",
        "people",
        "people-2r",
        "pro-con-journalist",
        "four-stance",
        "people-panel",
        "people-moderated",
    ]
}

/// Two anonymous debaters arguing opposite sides.
fn pro_con() -> DebateFormat {
    DebateFormat {
        name: "pro-con".to_string(),
        roles: vec![
            RoleSpec::new("pro", "Pro Agent", Stance::Pro, "debater").rebuts(&["con"]),
            RoleSpec::new("con", "Con Agent", Stance::Con, "debater").rebuts(&["pro"]),
        ],
        intent_stage: false,
        domain_inference: false,
        closing_round: true,
    }
}

/// Politician vs scientist, three rounds.
fn people() -> DebateFormat {
    DebateFormat {
        name: "people".to_string(),
        roles: vec![
            RoleSpec::new("politician", "Politician", Stance::Pro, "politician")
                .rebuts(&["scientist"]),
            RoleSpec::new("scientist", "Scientist", Stance::Con, "scientist")
                .rebuts(&["politician"]),
        ],
        intent_stage: false,
        domain_inference: false,
        closing_round: true,
    }
}

/// Politician vs scientist, two rounds: the judge rules straight after the
/// rebuttals.
fn people_2r() -> DebateFormat {
    DebateFormat {
        closing_round: false,
        name: "people-2r".to_string(),
        ..people()
    }
}

/// Pro and con debaters plus a journalist whose rebuttal weighs both
/// openings and whose closing weighs both rebuttals.
fn pro_con_journalist() -> DebateFormat {
    DebateFormat {
        name: "pro-con-journalist".to_string(),
        roles: vec![
            RoleSpec::new("pro", "Pro Agent", Stance::Pro, "debater").rebuts(&["con"]),
            RoleSpec::new("con", "Con Agent", Stance::Con, "debater").rebuts(&["pro"]),
            RoleSpec::new("journalist", "Journalist", Stance::Neutral, "journalist")
                .rebuts(&["pro", "con"])
                .closes_on(&["pro", "con"]),
        ],
        intent_stage: false,
        domain_inference: false,
        closing_round: true,
    }
}

/// Two-a-side format. Each debater rebuts both opposing openings but never
/// sees its ally's.
fn four_stance() -> DebateFormat {
    DebateFormat {
        name: "four-stance".to_string(),
        roles: vec![
            RoleSpec::new("pro1", "Factual Expert", Stance::Pro, "debater")
                .rebuts(&["con1", "con2"]),
            RoleSpec::new("pro2", "Reasoning Expert", Stance::Pro, "debater")
                .rebuts(&["con1", "con2"]),
            RoleSpec::new("con1", "Source Critic", Stance::Con, "debater")
                .rebuts(&["pro1", "pro2"]),
            RoleSpec::new("con2", "Reasoning Critic", Stance::Con, "debater")
                .rebuts(&["pro1", "pro2"]),
        ],
        intent_stage: false,
        domain_inference: false,
        closing_round: true,
    }
}

/// Four-person panel: politician, scientist, journalist and a domain
/// specialist inferred per claim. Every rebuttal weighs the other three
/// openings.
fn people_panel() -> DebateFormat {
    DebateFormat {
        name: "people-panel".to_string(),
        roles: vec![
            RoleSpec::new("politician", "Politician", Stance::Pro, "politician")
                .rebuts(&["scientist", "journalist", "domain_scientist"]),
            RoleSpec::new("scientist", "Scientist", Stance::Con, "scientist")
                .rebuts(&["politician", "journalist", "domain_scientist"]),
            RoleSpec::new("journalist", "Journalist", Stance::Neutral, "journalist")
                .rebuts(&["politician", "scientist", "domain_scientist"]),
            RoleSpec::new(
                "domain_scientist",
                "Domain Specialist",
                Stance::Neutral,
                "domain_scientist",
            )
            .rebuts(&["politician", "scientist", "journalist"])
            .with_domain(),
        ],
        intent_stage: false,
        domain_inference: true,
        closing_round: true,
    }
}

/// Journalist-moderated variant: the journalist opens first and the two
/// debaters' openings respond to that framing; closings answer the
/// journalist's rebuttal.
fn people_moderated() -> DebateFormat {
    DebateFormat {
        name: "people-moderated".to_string(),
        roles: vec![
            RoleSpec::new("journalist", "Journalist", Stance::Neutral, "journalist")
                .rebuts(&["politician", "scientist"]),
            RoleSpec::new("politician", "Politician", Stance::Pro, "politician")
                .opens_after(&["journalist"])
                .rebuts(&["scientist", "journalist"])
                .closes_on(&["journalist"]),
            RoleSpec::new("scientist", "Scientist", Stance::Con, "scientist")
                .opens_after(&["journalist"])
                .rebuts(&["politician", "journalist"])
                .closes_on(&["journalist"]),
        ],
        intent_stage: false,
        domain_inference: false,
        closing_round: true,
    }
}
