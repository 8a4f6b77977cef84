use crate::error::Result;
use crate::store::ObjectStore;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

fn sample_name() -> String {
    format!("blob-{}.txt", Uuid::new_v4())
}

fn sample_body(name: &str) -> Vec<u8> {
    format!("This is blob data for {name}").into_bytes()
}

/// Uploads `count` sample objects to `container`, waiting `pace` before each
/// one. Returns the generated names in upload order.
pub async fn seed_objects(
    store: &dyn ObjectStore,
    container: &str,
    count: usize,
    pace: Duration,
) -> Result<Vec<String>> {
    let mut uploaded = Vec::new();
    for iteration in 0..count {
        if !pace.is_zero() {
            info!(iteration, ?pace, "Sleeping before uploading object");
            tokio::time::sleep(pace).await;
        }
        let name = sample_name();
        info!(name = %name, "Uploading object");
        store
            .put_object(container, &name, &sample_body(&name))
            .await?;
        uploaded.push(name);
    }
    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn uploads_named_samples() {
        let store = MemoryStore::new();
        let names = seed_objects(&store, "general", 3, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(names.len(), 3);
        for name in &names {
            assert!(name.starts_with("blob-") && name.ends_with(".txt"));
            let body = store.object("general", name).unwrap();
            assert_eq!(body, format!("This is blob data for {name}").into_bytes());
        }
        assert_eq!(store.object_names("general").len(), 3);
    }

    #[tokio::test]
    async fn zero_count_uploads_nothing() {
        let store = MemoryStore::new();
        let names = seed_objects(&store, "general", 0, Duration::ZERO)
            .await
            .unwrap();
        assert!(names.is_empty());
        assert_eq!(store.put_count(), 0);
    }
}
