use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Interview,
    Social,
    Business,
    General,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("Unknown scenario: '{0}'")]
    NotFound(String),
}

impl Scenario {
    pub fn id(&self) -> &'static str {
        match self {
            Scenario::Interview => "interview",
            Scenario::Social => "social",
            Scenario::Business => "business",
            Scenario::General => "general",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Scenario {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interview" => Ok(Scenario::Interview),
            "social" => Ok(Scenario::Social),
            "business" => Ok(Scenario::Business),
            "general" => Ok(Scenario::General),
            _ => Err(ScenarioError::NotFound(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioPreset {
    pub id: Scenario,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt_fragment: &'static str,
}

static PRESETS: [ScenarioPreset; 4] = [
    ScenarioPreset {
        id: Scenario::Interview,
        name: "Interview",
        description: "Job interview: professional, confident answers",
        prompt_fragment: "Scenario: job interview\n\
- Highlight strengths and relevant experience\n\
- Use the STAR method (situation, task, action, result)\n\
- Sound confident without being arrogant\n\
- When asking questions, show knowledge of the company",
    },
    ScenarioPreset {
        id: Scenario::Social,
        name: "Social",
        description: "Social occasions: relaxed and friendly",
        prompt_fragment: "Scenario: social gathering\n\
- Keep the tone relaxed and friendly\n\
- Show sincerity and genuine interest\n\
- Use light humour where it fits\n\
- Steer clear of sensitive topics",
    },
    ScenarioPreset {
        id: Scenario::Business,
        name: "Business",
        description: "Business communication: professional and efficient",
        prompt_fragment: "Scenario: business communication\n\
- Be professional and efficient\n\
- Emphasise value and outcomes\n\
- Support points with data and facts\n\
- Stay polite and respectful",
    },
    ScenarioPreset {
        id: Scenario::General,
        name: "General",
        description: "Everyday conversation: natural and sincere",
        prompt_fragment: "Scenario: everyday conversation\n\
- Be natural and sincere\n\
- Match the other person's tone\n\
- Stay friendly and open",
    },
];

/// All presets in display order.
pub fn list_scenarios() -> &'static [ScenarioPreset] {
    &PRESETS
}

pub fn get(id: &str) -> Result<&'static ScenarioPreset, ScenarioError> {
    let scenario: Scenario = id.parse()?;
    Ok(preset_for(scenario))
}

fn preset_for(scenario: Scenario) -> &'static ScenarioPreset {
    match scenario {
        Scenario::Interview => &PRESETS[0],
        Scenario::Social => &PRESETS[1],
        Scenario::Business => &PRESETS[2],
        Scenario::General => &PRESETS[3],
    }
}

/// Resolves a requested scenario id, falling back to `general` for
/// missing or unknown ids.
pub fn resolve(id: Option<&str>) -> &'static ScenarioPreset {
    match id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => get(raw).unwrap_or_else(|_| preset_for(Scenario::General)),
        None => preset_for(Scenario::General),
    }
}
