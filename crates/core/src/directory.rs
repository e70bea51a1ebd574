use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::actor::ActorId;
use crate::store::StorageError;

/// Directory record making a manager identity eligible to approve.
/// Maintained by an external directory-management operation; read-only
/// from the engine's perspective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerAssignment {
    pub manager_id: ActorId,
    pub name: String,
    pub department: String,
    pub active: bool,
}

#[async_trait]
pub trait ManagerDirectory: Send + Sync {
    async fn resolve_manager(
        &self,
        manager_id: &ActorId,
    ) -> Result<Option<ManagerAssignment>, StorageError>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryManagerDirectory {
    by_id: HashMap<String, ManagerAssignment>,
}

impl InMemoryManagerDirectory {
    pub fn with_managers(managers: Vec<ManagerAssignment>) -> Self {
        let by_id =
            managers.into_iter().map(|manager| (manager.manager_id.0.clone(), manager)).collect();
        Self { by_id }
    }
}

#[async_trait]
impl ManagerDirectory for InMemoryManagerDirectory {
    async fn resolve_manager(
        &self,
        manager_id: &ActorId,
    ) -> Result<Option<ManagerAssignment>, StorageError> {
        Ok(self.by_id.get(&manager_id.0).filter(|manager| manager.active).cloned())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::actor::ActorId;

    use super::{InMemoryManagerDirectory, ManagerAssignment, ManagerDirectory};

    fn directory() -> InMemoryManagerDirectory {
        InMemoryManagerDirectory::with_managers(vec![
            ManagerAssignment {
                manager_id: ActorId("u-manager".to_string()),
                name: "Dian Wahyudi".to_string(),
                department: "engineering".to_string(),
                active: true,
            },
            ManagerAssignment {
                manager_id: ActorId("u-departed".to_string()),
                name: "Former Manager".to_string(),
                department: "finance".to_string(),
                active: false,
            },
        ])
    }

    #[tokio::test]
    async fn resolves_active_manager() {
        let found = directory()
            .resolve_manager(&ActorId("u-manager".to_string()))
            .await
            .expect("lookup");
        assert_eq!(found.map(|manager| manager.department), Some("engineering".to_string()));
    }

    #[tokio::test]
    async fn inactive_manager_does_not_resolve() {
        let found = directory()
            .resolve_manager(&ActorId("u-departed".to_string()))
            .await
            .expect("lookup");
        assert!(found.is_none());
    }
}
