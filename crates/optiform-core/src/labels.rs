//! Display text for schema labels.

use crate::definition::Definition;

/// Supplies the display label of a node. Hosts plug in translations here.
pub trait Labels {
    /// `None` means the node has no label and none is rendered.
    fn label(&self, definition: &Definition) -> Option<String>;
}

/// Uses the label declared in the definition, untranslated.
pub struct DeclaredLabels;

impl Labels for DeclaredLabels {
    fn label(&self, definition: &Definition) -> Option<String> {
        definition
            .label
            .as_deref()
            .filter(|label| !label.is_empty())
            .map(str::to_string)
    }
}

impl<F> Labels for F
where
    F: Fn(&Definition) -> Option<String>,
{
    fn label(&self, definition: &Definition) -> Option<String> {
        self(definition)
    }
}
