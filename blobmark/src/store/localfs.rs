//! Local directory backend: `<root>/<container>/<key>`.

use crate::error::StoreError;
use crate::store::{ObjectDescriptor, ObjectStore, ObjectStream};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

pub struct LocalFsStore {
    root: PathBuf,
}

impl LocalFsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    fn path_for(&self, container: &str, key: &str) -> PathBuf {
        self.container_dir(container).join(key)
    }
}

/// Walks `dir` and returns every regular file as a key relative to it,
/// sorted the way S3 sorts keys.
async fn walk_container(dir: PathBuf) -> Result<Vec<ObjectDescriptor>, StoreError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.clone()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            let path = entry.path();
            if meta.is_dir() {
                pending.push(path);
                continue;
            }
            if !meta.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&dir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
            found.push(ObjectDescriptor::new(name, last_modified));
        }
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn list_objects(&self, container: &str) -> ObjectStream {
        let dir = self.container_dir(container);
        stream::once(walk_container(dir))
            .map_ok(|objects| stream::iter(objects.into_iter().map(Ok::<_, StoreError>)))
            .try_flatten()
            .boxed()
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(container, key);
        match fs::read(path).await {
            Ok(buf) => Ok(buf),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(container, key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let path = self.path_for(container, key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let mut f = fs::File::create(path).await?;
        f.write_all(data).await?;
        f.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        store
            .put_object("checkpoint", "checkpoint.txt", b"blob-42.txt")
            .await
            .unwrap();
        let data = store
            .get_object("checkpoint", "checkpoint.txt")
            .await
            .unwrap();
        assert_eq!(data, b"blob-42.txt");
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        store.put_object("c", "k", b"a much longer value").await.unwrap();
        store.put_object("c", "k", b"short").await.unwrap();
        assert_eq!(store.get_object("c", "k").await.unwrap(), b"short");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        let err = store
            .get_object("checkpoint", "checkpoint.txt")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn lists_nested_keys_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        for key in ["c.txt", "a.txt", "logs/b.txt"] {
            store.put_object("general", key, b"x").await.unwrap();
        }

        let listed: Vec<ObjectDescriptor> = store
            .list_objects("general")
            .try_collect()
            .await
            .unwrap();
        let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt", "logs/b.txt"]);
        assert!(listed.iter().all(|d| d.last_modified.is_some()));
    }

    #[tokio::test]
    async fn listing_missing_container_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        let result: Result<Vec<ObjectDescriptor>, StoreError> =
            store.list_objects("absent").try_collect().await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
