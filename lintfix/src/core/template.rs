//! Placeholder substitution for stage prompts.
//!
//! Templates name their inputs with literal `{code}` and `{linterOutput}`
//! tokens. Rendering is a pure text splice: no escaping and no expression
//! language, so source code full of braces passes through untouched.

use std::collections::BTreeMap;
use std::fmt;

/// Named input of a stage template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Code,
    LinterOutput,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Code, Slot::LinterOutput];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Code => "code",
            Slot::LinterOutput => "linterOutput",
        }
    }

    /// Literal token that stands for this slot inside a template.
    pub fn placeholder(self) -> &'static str {
        match self {
            Slot::Code => "{code}",
            Slot::LinterOutput => "{linterOutput}",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Slot values for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<Slot, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.set(slot, value);
        self
    }

    pub fn set(&mut self, slot: Slot, value: impl Into<String>) {
        self.values.insert(slot, value.into());
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}

/// Substitute the first occurrence of each slot placeholder found in `template`.
///
/// Missing bindings render as the empty string. Positions are resolved against
/// the template before any value is spliced in, so a bound value that happens
/// to contain a placeholder token is never substituted again.
pub fn render(template: &str, bindings: &Bindings) -> String {
    let mut hits: Vec<(usize, Slot)> = Slot::ALL
        .iter()
        .filter_map(|slot| template.find(slot.placeholder()).map(|pos| (pos, *slot)))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for (pos, slot) in hits {
        out.push_str(&template[cursor..pos]);
        out.push_str(bindings.get(slot).unwrap_or_default());
        cursor = pos + slot.placeholder().len();
    }
    out.push_str(&template[cursor..]);
    out
}
