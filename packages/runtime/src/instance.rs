use crate::external::ExternalChildren;
use crate::node_key::InstanceId;
use crate::store::VariableStore;

/// One running page: its variables and its pending external children
#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    pub(crate) store: VariableStore,
    pub(crate) external_children: ExternalChildren,
}

impl Instance {
    pub fn new(id: InstanceId, store: VariableStore, external_children: ExternalChildren) -> Self {
        Self {
            id,
            store,
            external_children,
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn external_children(&self) -> &ExternalChildren {
        &self.external_children
    }

    pub fn value(&self, variable: &str) -> Option<&str> {
        self.store.value(variable)
    }
}
