use tracing::debug;

use crate::model::merger::{MergeContext, MergeFlavor, ModelMerger};
use crate::model::Model;

/// Folds a parent model into its child. The child is dominant, so the parent only fills in what
///  the child leaves unset, and parent entries marked `inherited=false` are left behind.
#[derive(Debug, Clone)]
pub struct InheritanceAssembler {
    merger: ModelMerger,
}

impl Default for InheritanceAssembler {
    fn default() -> Self {
        InheritanceAssembler {
            merger: ModelMerger::new(MergeFlavor::Inheritance),
        }
    }
}

impl InheritanceAssembler {
    pub fn assemble_inheritance(&self, child: &mut Model, parent: &Model) {
        debug!("inheriting from {} into {}", parent.id(), child.id());
        self.merger.merge_model(child, parent, false, &mut MergeContext::default());
    }

    /// `lineage` is ordered from the root ancestor to the model being built. Returns `None` for an
    ///  empty lineage.
    pub fn assemble_lineage(&self, lineage: Vec<Model>) -> Option<Model> {
        let mut lineage = lineage.into_iter();
        let mut effective = lineage.next()?;
        for mut child in lineage {
            self.assemble_inheritance(&mut child, &effective);
            effective = child;
        }
        Some(effective)
    }
}
