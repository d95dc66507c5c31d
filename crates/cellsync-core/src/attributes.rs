use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Optional attribute group carried across the host/accelerator boundary.
///
/// A group is either enabled for the whole run or absent from every record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Particle charge, for accelerator-side electrostatics.
    Charge,
    /// Per-component solvation coefficients (2 x K), multi-component fluids.
    Solvation,
    /// Electrohydrodynamic mobility vector.
    Mobility,
    /// Self-propulsion parameters out, center/source velocities back.
    Swimming,
    /// Per-component composition weights (K) written back by the accelerator.
    Composition,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Charge => "charge",
            Attribute::Solvation => "solvation",
            Attribute::Mobility => "mobility",
            Attribute::Swimming => "swimming",
            Attribute::Composition => "composition",
        }
    }
}

/// The set of enabled attribute groups plus the fluid component count K.
///
/// Must be identical on every node of a run; a mismatch silently corrupts
/// record boundaries and is not detected here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSet {
    groups: BTreeSet<Attribute>,
    fluid_components: usize,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `attribute`.
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.groups.insert(attribute);
        self
    }

    /// Set the number of fluid components K.
    pub fn with_fluid_components(mut self, components: usize) -> Self {
        self.fluid_components = components;
        self
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.groups.contains(&attribute)
    }

    pub fn fluid_components(&self) -> usize {
        self.fluid_components
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.groups.iter().copied()
    }

    /// Reject group combinations that cannot produce a layout.
    pub fn validate(&self) -> SyncResult<()> {
        for attribute in [Attribute::Solvation, Attribute::Composition] {
            if self.contains(attribute) && self.fluid_components == 0 {
                return Err(SyncError::config(format!(
                    "`{}` requires at least one fluid component",
                    attribute.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_valid() {
        let attrs = AttributeSet::new();
        assert!(attrs.validate().is_ok());
        assert_eq!(attrs.iter().count(), 0);
    }

    #[test]
    fn test_composition_needs_components() {
        let attrs = AttributeSet::new().with(Attribute::Composition);
        assert!(matches!(attrs.validate(), Err(SyncError::InvalidConfig(_))));

        let attrs = attrs.with_fluid_components(2);
        assert!(attrs.validate().is_ok());
    }

    #[test]
    fn test_with_is_idempotent() {
        let attrs = AttributeSet::new()
            .with(Attribute::Charge)
            .with(Attribute::Charge);
        assert_eq!(attrs.iter().collect::<Vec<_>>(), vec![Attribute::Charge]);
    }
}
