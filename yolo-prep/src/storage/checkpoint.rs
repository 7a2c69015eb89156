//! Checkpoint lookup in object storage.

use crate::common::*;

/// Lists objects in a bucket.
pub trait ObjectStore {
    /// Returns the names of all objects in `bucket` starting with `prefix`.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
}

/// Maps each bucket to a subdirectory of a local root. Object names are the
/// `/`-separated paths of regular files relative to the bucket directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let bucket_dir = self.root.join(bucket);
        ensure!(
            bucket_dir.is_dir(),
            "bucket '{}' does not exist in '{}'",
            bucket,
            self.root.display()
        );

        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&bucket_dir.to_string_lossy())
        );
        let paths: Vec<_> = glob::glob(&pattern)?.try_collect()?;

        let names: Vec<_> = paths
            .into_iter()
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let relative = path.strip_prefix(&bucket_dir).ok()?;
                let name = relative
                    .components()
                    .map(|component| component.as_os_str().to_str())
                    .collect::<Option<Vec<_>>>()?
                    .join("/");
                name.starts_with(prefix).then(|| name)
            })
            .sorted()
            .collect();
        Ok(names)
    }
}

/// Locates the checkpoint to resume training from.
///
/// With `initial_epoch`, returns `gs://bucket/path/NNN` if any object exists
/// under that prefix. Otherwise the object base names under `path` are
/// parsed as epoch numbers after dropping the extension, and the largest
/// positive epoch is returned. Returns `None` if nothing is found.
pub fn checkpoint_uri<S>(
    store: &S,
    bucket: &str,
    path: &str,
    initial_epoch: Option<usize>,
) -> Result<Option<String>>
where
    S: ObjectStore + ?Sized,
{
    if let Some(epoch) = initial_epoch {
        let path = join_object_path(path, &epoch_name(epoch));
        let found = !store.list(bucket, &path)?.is_empty();
        if !found {
            warn!("no checkpoint found for epoch {} in gs://{}/{}", epoch, bucket, path);
        }
        return Ok(found.then(|| gcs_uri(bucket, &path)));
    }

    let max_epoch = store
        .list(bucket, path)?
        .iter()
        .filter_map(|name| {
            let base = name.rsplit('/').next()?;
            if base.is_empty() {
                return None;
            }
            strip_extension(base).parse::<usize>().ok()
        })
        .max()
        .filter(|&epoch| epoch > 0);

    let uri = max_epoch.map(|epoch| gcs_uri(bucket, &join_object_path(path, &epoch_name(epoch))));
    match &uri {
        Some(uri) => info!("found checkpoint {}", uri),
        None => info!("no checkpoint found in gs://{}/{}", bucket, path),
    }
    Ok(uri)
}

fn epoch_name(epoch: usize) -> String {
    format!("{:03}", epoch)
}

fn gcs_uri(bucket: &str, path: &str) -> String {
    join_object_path(&format!("gs://{}", bucket), path)
}

fn join_object_path(base: &str, name: &str) -> String {
    if base.is_empty() || base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Drops the last extension. A leading dot does not start an extension.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if name[..index].chars().any(|c| c != '.') => &name[..index],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, name: &str) -> Result<()> {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, b"")?;
        Ok(())
    }

    fn store_with(files: &[&str]) -> Result<(tempfile::TempDir, LocalObjectStore)> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("bucket"))?;
        for name in files {
            touch(&dir.path().join("bucket"), name)?;
        }
        let store = LocalObjectStore::new(dir.path());
        Ok((dir, store))
    }

    #[test]
    fn local_store_lists_by_prefix() -> Result<()> {
        let (_dir, store) = store_with(&["ckpt/001.index", "ckpt/002/data", "other/x"])?;
        assert_eq!(
            store.list("bucket", "ckpt/")?,
            vec!["ckpt/001.index".to_string(), "ckpt/002/data".to_string()]
        );
        assert_eq!(store.list("bucket", "")?.len(), 3);
        Ok(())
    }

    #[test]
    fn local_store_rejects_missing_bucket() -> Result<()> {
        let (_dir, store) = store_with(&[])?;
        assert!(store.list("missing", "").is_err());
        Ok(())
    }

    #[test]
    fn latest_checkpoint() -> Result<()> {
        let (_dir, store) = store_with(&[
            "run/003.index",
            "run/012.data-00000-of-00001",
            "run/007.index",
            "run/notes.txt",
        ])?;
        assert_eq!(
            checkpoint_uri(&store, "bucket", "run", None)?,
            Some("gs://bucket/run/012".to_string())
        );
        Ok(())
    }

    #[test]
    fn no_positive_epoch() -> Result<()> {
        let (_dir, store) = store_with(&["run/000.index", "run/readme.md"])?;
        assert_eq!(checkpoint_uri(&store, "bucket", "run", None)?, None);

        let (_dir, store) = store_with(&[])?;
        assert_eq!(checkpoint_uri(&store, "bucket", "run", None)?, None);
        Ok(())
    }

    #[test]
    fn checkpoint_of_given_epoch() -> Result<()> {
        let (_dir, store) = store_with(&["run/005.index", "run/005.data"])?;
        assert_eq!(
            checkpoint_uri(&store, "bucket", "run", Some(5))?,
            Some("gs://bucket/run/005".to_string())
        );
        assert_eq!(checkpoint_uri(&store, "bucket", "run", Some(6))?, None);
        Ok(())
    }

    #[test]
    fn strip_extensions() {
        assert_eq!(strip_extension("012.index"), "012");
        assert_eq!(strip_extension("012.data.tmp"), "012.data");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("007"), "007");
    }
}
