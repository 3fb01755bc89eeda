use anyhow::Result;
use hoh_data::{TemplateSet, TroopType};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::VisionConfig;
use crate::features::DescriptorSet;

/// A reference icon with its descriptors computed once at load time
#[derive(Debug, Clone)]
pub struct ReferenceIcon {
    pub name: String,
    pub descriptors: DescriptorSet,
}

/// Reference icons for every troop type, in `TroopType::ALL` order.
///
/// Read-only after construction, so one library can be shared across workers.
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    entries: Vec<(TroopType, Vec<ReferenceIcon>)>,
}

impl Default for ReferenceLibrary {
    fn default() -> Self {
        Self {
            entries: TroopType::ALL.iter().map(|&t| (t, Vec::new())).collect(),
        }
    }
}

impl ReferenceLibrary {
    /// Describe every template of a loaded template set.
    pub fn build(templates: &TemplateSet, config: &VisionConfig) -> Self {
        let mut library = Self::default();

        for (troop, icons) in templates.iter() {
            for icon in icons {
                let descriptors = DescriptorSet::detect(&icon.image, None, config);
                if descriptors.len() < config.min_matches {
                    warn!(
                        "Reference {}/{} has only {} descriptors and can never win",
                        troop,
                        icon.name,
                        descriptors.len()
                    );
                } else {
                    debug!(
                        "Reference {}/{}: {} descriptors",
                        troop,
                        icon.name,
                        descriptors.len()
                    );
                }
                library.push(
                    troop,
                    ReferenceIcon {
                        name: icon.name.clone(),
                        descriptors,
                    },
                );
            }
        }

        info!("ReferenceLibrary built with {} icons", library.icon_count());
        library
    }

    /// Load templates from `dir/<label>/` and describe them.
    pub fn load(dir: &Path, border: u32, config: &VisionConfig) -> Result<Self> {
        let templates = TemplateSet::load(dir, border)?;
        Ok(Self::build(&templates, config))
    }

    pub fn push(&mut self, troop: TroopType, icon: ReferenceIcon) {
        self.entries[troop.index()].1.push(icon);
    }

    pub fn icons(&self, troop: TroopType) -> &[ReferenceIcon] {
        &self.entries[troop.index()].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (TroopType, &[ReferenceIcon])> {
        self.entries.iter().map(|(t, icons)| (*t, icons.as_slice()))
    }

    pub fn icon_count(&self) -> usize {
        self.entries.iter().map(|(_, icons)| icons.len()).sum()
    }
}
