//! Name-based vision capability classification
//!
//! Ollama's listing does not say which models accept images, so models are
//! classified by family name against an ordered rule table. The first
//! matching rule decides; names no rule matches are treated as text-only.
//! A vision model missing from the table therefore sorts with the text
//! models, which is acceptable. Matching is by whole family prefix or whole
//! name segment, never by loose substring.

use serde::{Deserialize, Serialize};

/// What a model accepts as input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Accepts an image alongside the prompt
    Vision,
    /// Text only
    Text,
}

/// How a rule's token is compared against a model name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Family name starts with the token (`llava` matches `llava-phi3`)
    Prefix,
    /// One `-`/`_` separated segment equals the token (`vision` matches
    /// `llama3.2-vision`)
    Segment,
}

/// One row of the classification table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FamilyRule {
    token: String,
    #[serde(rename = "match")]
    kind: MatchKind,
    capability: Capability,
}

impl FamilyRule {
    /// Create a rule; the token is stored case-folded like model names
    pub fn new(token: impl AsRef<str>, kind: MatchKind, capability: Capability) -> Self {
        Self {
            token: fold_case(token.as_ref()),
            kind,
            capability,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    fn matches(&self, name: &ModelName<'_>) -> bool {
        match self.kind {
            MatchKind::Prefix => name.family.starts_with(self.token.as_str()),
            MatchKind::Segment => name.segments().any(|s| s == self.token),
        }
    }
}

/// Built-in rules, evaluated top to bottom
///
/// The `embed` rule comes first so embedding variants of vision families
/// are not offered for image prompts.
const BUILTIN_RULES: &[(&str, MatchKind, Capability)] = &[
    ("embed", MatchKind::Segment, Capability::Text),
    ("llava", MatchKind::Prefix, Capability::Vision),
    ("bakllava", MatchKind::Prefix, Capability::Vision),
    ("moondream", MatchKind::Prefix, Capability::Vision),
    ("qwen2.5vl", MatchKind::Prefix, Capability::Vision),
    ("minicpm-v", MatchKind::Prefix, Capability::Vision),
    ("pixtral", MatchKind::Prefix, Capability::Vision),
    ("llama4", MatchKind::Prefix, Capability::Vision),
    ("vision", MatchKind::Segment, Capability::Vision),
    ("vl", MatchKind::Segment, Capability::Vision),
    ("clip", MatchKind::Segment, Capability::Vision),
];

/// Case fold for matching
///
/// Upper then lower, so names that only agree after uppercasing (such as a
/// dotless `ı`) fold to the same key.
fn fold_case(name: &str) -> String {
    name.trim().to_uppercase().to_lowercase()
}

/// A model name normalized for matching
///
/// `Library/LLaVA-Phi3:3.8b-Q4` → family `llava-phi3`
struct ModelName<'a> {
    family: &'a str,
}

impl<'a> ModelName<'a> {
    fn parse(folded: &'a str) -> Self {
        // Namespace first: registry hosts may carry a `:port`
        let unqualified = folded.rsplit('/').next().unwrap_or(folded);
        let family = unqualified.split(':').next().unwrap_or(unqualified);
        Self { family }
    }

    fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.family
            .split(['-', '_'])
            .filter(|segment| !segment.is_empty())
    }
}

/// Ordered classification table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionTable {
    rules: Vec<FamilyRule>,
}

impl VisionTable {
    /// The built-in table
    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN_RULES
                .iter()
                .map(|(token, kind, capability)| FamilyRule::new(token, *kind, *capability))
                .collect(),
        }
    }

    /// Built-in table with `overrides` evaluated first
    ///
    /// Override tokens are normalized the same way as built-in ones, so rules
    /// deserialized from a config file may use any case.
    pub fn with_overrides(overrides: impl IntoIterator<Item = FamilyRule>) -> Self {
        let mut rules: Vec<FamilyRule> = overrides
            .into_iter()
            .map(|rule| FamilyRule::new(&rule.token, rule.kind, rule.capability))
            .collect();
        rules.extend(Self::builtin().rules);
        Self { rules }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[FamilyRule] {
        &self.rules
    }

    /// Classify a model name
    ///
    /// Pure and case-insensitive.
    pub fn classify(&self, name: &str) -> Capability {
        let folded = fold_case(name);
        let parsed = ModelName::parse(&folded);
        self.rules
            .iter()
            .find(|rule| rule.matches(&parsed))
            .map(FamilyRule::capability)
            .unwrap_or(Capability::Text)
    }

    pub fn is_vision(&self, name: &str) -> bool {
        self.classify(name) == Capability::Vision
    }
}

impl Default for VisionTable {
    fn default() -> Self {
        Self::builtin()
    }
}
