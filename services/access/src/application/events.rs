//! 领域事件分发
//!
//! 事务提交后调用：记录事件并把事件携带的缓存标签交给失效器。

use std::collections::BTreeSet;
use std::sync::Arc;

use storefront_ports::TagInvalidator;
use tracing::{info, warn};

use crate::domain::rbac::RbacEvent;

pub struct EventDispatcher {
    invalidator: Arc<dyn TagInvalidator>,
}

impl EventDispatcher {
    pub fn new(invalidator: Arc<dyn TagInvalidator>) -> Self {
        Self { invalidator }
    }

    pub async fn dispatch(&self, events: &[RbacEvent]) {
        if events.is_empty() {
            return;
        }

        for event in events {
            info!(event_type = event.event_type(), event = ?event, "RBAC event");
        }

        let tags: BTreeSet<String> = events.iter().flat_map(RbacEvent::cache_tags).collect();
        let tags: Vec<String> = tags.into_iter().collect();
        if let Err(e) = self.invalidator.invalidate_tags(&tags).await {
            warn!(error = %e, tags = ?tags, "Cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rbac::{ResourceId, RoleId};
    use async_trait::async_trait;
    use storefront_errors::AppResult;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingInvalidator {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl TagInvalidator for RecordingInvalidator {
        async fn invalidate_tags(&self, tags: &[String]) -> AppResult<()> {
            self.calls.lock().await.push(tags.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_merges_tags() {
        let recorder = Arc::new(RecordingInvalidator::default());
        let dispatcher = EventDispatcher::new(recorder.clone());
        let role_id = RoleId::new();

        dispatcher
            .dispatch(&[
                RbacEvent::ResourceCreated {
                    resource_id: ResourceId::new(),
                    name: "products".into(),
                },
                RbacEvent::RolePermissionsCleared {
                    role_id,
                    removed: 2,
                },
            ])
            .await;

        let calls = recorder.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let tags = &calls[0];
        assert_eq!(tags.iter().filter(|t| *t == "roles").count(), 1);
        assert!(tags.contains(&format!("role:{}", role_id)));
        assert!(tags.contains(&"resources".to_string()));
    }

    #[tokio::test]
    async fn test_empty_dispatch_skips_invalidation() {
        let recorder = Arc::new(RecordingInvalidator::default());
        EventDispatcher::new(recorder.clone()).dispatch(&[]).await;
        assert!(recorder.calls.lock().await.is_empty());
    }
}
