//! Catalogue of repair stages.

use crate::core::template::Slot;

const FIX_LINT_TEMPLATE: &str = include_str!("../prompts/fix_lint.md");
const FIX_LOGIC_TEMPLATE: &str = include_str!("../prompts/fix_logic.md");
const POLISH_TEMPLATE: &str = include_str!("../prompts/polish.md");

/// One templated text-to-text step of the repair pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairStage {
    /// Progress label shown before the stage starts.
    pub label: String,
    pub template: String,
    /// Slots the stage consumes. `code` is always bound to the working text.
    pub required_slots: Vec<Slot>,
}

impl RepairStage {
    pub fn new(label: impl Into<String>, template: impl Into<String>, slots: &[Slot]) -> Self {
        Self {
            label: label.into(),
            template: template.into(),
            required_slots: slots.to_vec(),
        }
    }

    pub fn requires(&self, slot: Slot) -> bool {
        self.required_slots.contains(&slot)
    }
}

/// The fixed three-stage pipeline: linter findings, logic errors, style.
pub fn default_stages() -> Vec<RepairStage> {
    vec![
        RepairStage::new(
            "Fixing linter findings",
            FIX_LINT_TEMPLATE,
            &[Slot::Code, Slot::LinterOutput],
        ),
        RepairStage::new("Repairing logic errors", FIX_LOGIC_TEMPLATE, &[Slot::Code]),
        RepairStage::new("Polishing style", POLISH_TEMPLATE, &[Slot::Code]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::OUTPUT_MARKER;

    #[test]
    fn default_pipeline_order_is_stable() {
        let labels: Vec<String> = default_stages().into_iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                "Fixing linter findings",
                "Repairing logic errors",
                "Polishing style"
            ]
        );
    }

    #[test]
    fn templates_declare_their_required_slots() {
        for stage in default_stages() {
            for slot in Slot::ALL {
                assert_eq!(
                    stage.template.contains(slot.placeholder()),
                    stage.requires(slot),
                    "{} / {}",
                    stage.label,
                    slot
                );
            }
            assert!(stage.template.contains(OUTPUT_MARKER), "{}", stage.label);
        }
    }

    #[test]
    fn only_first_stage_reads_linter_output() {
        let stages = default_stages();
        assert!(stages[0].requires(Slot::LinterOutput));
        assert!(stages[1..].iter().all(|s| !s.requires(Slot::LinterOutput)));
    }
}
