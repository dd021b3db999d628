use serde::Serialize;

use crate::models::SalaryTier;

/// Knowledge layers a question can target, shallowest first.
pub const LAYERS: [&str; 5] = [
    "Foundational knowledge (definitions, concepts)",
    "Applied knowledge (configuration, methods, usage)",
    "Troubleshooting (log analysis, fault diagnosis)",
    "Design (architecture, technology comparison, scalability)",
    "Strategy (process improvement, technology choice, decision rationale)",
];

/// How deep questions for a salary tier should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DifficultyProfile {
    pub label: &'static str,
    /// Percentage weight per layer, aligned with [`LAYERS`]. Sums to 100.
    pub weights: [u8; 5],
}

impl DifficultyProfile {
    pub fn for_tier(tier: SalaryTier) -> Self {
        match tier {
            SalaryTier::Double => Self {
                label: "mid-level practitioner",
                weights: [40, 35, 20, 5, 0],
            },
            SalaryTier::Triple => Self {
                label: "senior specialist",
                weights: [25, 30, 30, 15, 0],
            },
            SalaryTier::Quadruple => Self {
                label: "team lead / strategic specialist",
                weights: [10, 20, 25, 30, 15],
            },
        }
    }

    /// Bullet list embedded in generation prompts.
    pub fn describe_layers(&self) -> String {
        LAYERS
            .iter()
            .zip(self.weights)
            .map(|(layer, weight)| format!("- {layer}: {weight}%"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_hundred() {
        for tier in [SalaryTier::Double, SalaryTier::Triple, SalaryTier::Quadruple] {
            let profile = DifficultyProfile::for_tier(tier);
            let total: u32 = profile.weights.iter().map(|w| *w as u32).sum();
            assert_eq!(total, 100, "{tier:?}");
        }
    }

    #[test]
    fn test_only_top_tier_asks_strategy() {
        assert_eq!(DifficultyProfile::for_tier(SalaryTier::Triple).weights[4], 0);
        assert!(DifficultyProfile::for_tier(SalaryTier::Quadruple).weights[4] > 0);
    }

    #[test]
    fn test_describe_layers_lists_every_layer() {
        let text = DifficultyProfile::for_tier(SalaryTier::Double).describe_layers();
        assert_eq!(text.lines().count(), 5);
        assert!(text.starts_with("- Foundational knowledge"));
        assert!(text.contains(": 40%"));
    }
}
