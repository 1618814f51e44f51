//! Persona table and tag-based routing
//!
//! Each persona is data: a canonical key plus a fixed system instruction.
//! [`route`] picks the persona that must answer a raw message by looking for
//! `@tags`; the first matching rule in [`ROUTING_RULES`] order wins, so that
//! order is part of the contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named responder with its own system instruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    /// The collective; answers anything without a tag
    #[default]
    #[serde(rename = "THE SWARM")]
    Swarm,
    #[serde(rename = "THE BOSS")]
    Boss,
    #[serde(rename = "THE ENGINEER")]
    Engineer,
    #[serde(rename = "THE ANALYST")]
    Analyst,
    /// Verification and truth, known to the fleet as "AB-"
    #[serde(rename = "THE AB-")]
    Verifier,
    #[serde(rename = "THE CUSTODIAN")]
    Custodian,
    #[serde(rename = "THE DEPLOYER")]
    Deployer,
}

/// Tag rules in priority order
pub const ROUTING_RULES: &[(&[&str], Persona)] = &[
    (&["@boss", "@gov"], Persona::Boss),
    (&["@engineer", "@dev"], Persona::Engineer),
    (&["@analyst"], Persona::Analyst),
    (&["@verifier", "@ab-"], Persona::Verifier),
    (&["@custodian"], Persona::Custodian),
    (&["@deployer"], Persona::Deployer),
];

const SWARM_INSTRUCTION: &str = "\
You are **The Swarm**, the collective intelligence of the agent fleet \
(The Boss, The Engineer, The Analyst, The AB-, The Custodian, The Deployer). \
Act as a unified interface to the Commander: answer by synthesizing the relevant \
agent's perspective and speak as \"we\". Tone: efficient, professional, slightly \
sci-fi. Keep replies under three sentences unless asked for detail.";

const BOSS_INSTRUCTION: &str = "\
You are **The Boss**. Strategic, commanding. Focus: fleet coordination and \
high-level goals. Monitor the inbox, assign tasks and be decisive.";

const ENGINEER_INSTRUCTION: &str = "\
You are **The Engineer**. Technical, precise. Focus: code quality, deployments \
and architecture. Call out technical debt.";

const ANALYST_INSTRUCTION: &str = "\
You are **The Analyst**. Market-aware. Focus: app store trends, competitors and \
user metrics.";

const VERIFIER_INSTRUCTION: &str = "\
You are **The AB-**. Skeptical, exact. Focus: verification and truth. Challenge \
claims, check facts and flag anything unproven.";

const CUSTODIAN_INSTRUCTION: &str = "\
You are **The Custodian**. Protective. Focus: privacy, backups, memory and \
database integrity.";

const DEPLOYER_INSTRUCTION: &str = "\
You are **The Deployer**. Operational. Focus: git status and CI/CD pipeline \
health.";

impl Persona {
    /// Every persona, default first
    pub const ALL: [Persona; 7] = [
        Persona::Swarm,
        Persona::Boss,
        Persona::Engineer,
        Persona::Analyst,
        Persona::Verifier,
        Persona::Custodian,
        Persona::Deployer,
    ];

    /// Canonical uppercase key, also used as the stored `name` of replies
    pub fn key(&self) -> &'static str {
        match self {
            Persona::Swarm => "THE SWARM",
            Persona::Boss => "THE BOSS",
            Persona::Engineer => "THE ENGINEER",
            Persona::Analyst => "THE ANALYST",
            Persona::Verifier => "THE AB-",
            Persona::Custodian => "THE CUSTODIAN",
            Persona::Deployer => "THE DEPLOYER",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Swarm => "The Swarm",
            Persona::Boss => "The Boss",
            Persona::Engineer => "The Engineer",
            Persona::Analyst => "The Analyst",
            Persona::Verifier => "The AB-",
            Persona::Custodian => "The Custodian",
            Persona::Deployer => "The Deployer",
        }
    }

    /// The fixed system instruction sent to the completion oracle
    pub fn system_instruction(&self) -> &'static str {
        match self {
            Persona::Swarm => SWARM_INSTRUCTION,
            Persona::Boss => BOSS_INSTRUCTION,
            Persona::Engineer => ENGINEER_INSTRUCTION,
            Persona::Analyst => ANALYST_INSTRUCTION,
            Persona::Verifier => VERIFIER_INSTRUCTION,
            Persona::Custodian => CUSTODIAN_INSTRUCTION,
            Persona::Deployer => DEPLOYER_INSTRUCTION,
        }
    }

    /// Look up a persona by key, ignoring case and surrounding whitespace
    pub fn from_key(key: &str) -> Option<Persona> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Decide which persona answers `raw_text`.
///
/// Case-insensitive substring match against [`ROUTING_RULES`]; the first
/// rule with any matching tag wins. Untagged text goes to the Swarm.
pub fn route(raw_text: &str) -> Persona {
    let text = raw_text.to_lowercase();
    let persona = ROUTING_RULES
        .iter()
        .find(|(tags, _)| tags.iter().any(|tag| text.contains(tag)))
        .map(|(_, persona)| *persona)
        .unwrap_or_default();
    tracing::debug!("Routed message to {}", persona);
    persona
}

/// System instruction for a persona key; unknown keys get the Swarm's
pub fn instruction_for(key: &str) -> &'static str {
    Persona::from_key(key)
        .unwrap_or_default()
        .system_instruction()
}
