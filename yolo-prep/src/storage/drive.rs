//! Path-addressed access to a file-id based drive service.

use crate::common::*;
use std::collections::BTreeMap;

/// The id of the drive root folder.
pub const ROOT_ID: &str = "root";

/// Operations of a drive where files are addressed by opaque ids and a
/// name is only unique within its parent folder.
pub trait DriveService {
    /// Looks up a child of `parent_id` by name. Trashed files are not
    /// visible.
    fn find_child(&self, parent_id: &str, name: &str, folder_only: bool) -> Result<Option<String>>;

    fn create_folder(&mut self, parent_id: &str, name: &str) -> Result<String>;

    fn copy(&mut self, file_id: &str, parent_id: &str, name: &str) -> Result<String>;

    fn upload(&mut self, parent_id: &str, name: &str, data: Vec<u8>) -> Result<String>;

    fn download(&self, file_id: &str) -> Result<Vec<u8>>;

    fn delete(&mut self, file_id: &str) -> Result<()>;
}

pub use drive_cache::*;
mod drive_cache {
    use super::*;

    /// Resolves slash-separated paths to drive file ids and memoizes the
    /// lookups.
    #[derive(Debug)]
    pub struct DriveCache<S>
    where
        S: DriveService,
    {
        service: S,
        root: String,
        cache: HashMap<String, String>,
    }

    impl<S> DriveCache<S>
    where
        S: DriveService,
    {
        /// Creates a cache where every path is relative to `root`.
        pub fn new(service: S, root: &str) -> Self {
            Self {
                service,
                root: root.to_string(),
                cache: Self::initial_cache(),
            }
        }

        pub fn service(&self) -> &S {
            &self.service
        }

        pub fn into_service(self) -> S {
            self.service
        }

        /// Returns the id of the file or folder at `path`, or `None` if any
        /// component does not exist.
        pub fn get_id(&mut self, path: &str) -> Result<Option<String>> {
            self.resolve(path, |service, parent_id, name| {
                service.find_child(parent_id, name, false)
            })
        }

        /// Returns the id of the folder at `path`. Missing folders are
        /// created only if `create_path` is set, otherwise `None` is
        /// returned and nothing is created.
        pub fn create_folder(&mut self, path: &str, create_path: bool) -> Result<Option<String>> {
            let components = self.components(path);

            let mut parent_id = ROOT_ID.to_string();
            for index in 0..components.len() {
                let key = components[..=index].join("/");
                if let Some(id) = self.cache.get(&key) {
                    parent_id = id.clone();
                    continue;
                }

                let name = &components[index];
                let id = match self.service.find_child(&parent_id, name, true)? {
                    Some(id) => id,
                    None if create_path => {
                        debug!("create drive folder '{}'", key);
                        self.service.create_folder(&parent_id, name)?
                    }
                    None => return Ok(None),
                };
                self.cache.insert(key, id.clone());
                parent_id = id;
            }

            Ok(Some(parent_id))
        }

        /// Copies the file at `from` to `to`.
        ///
        /// If `to` exists, its id is returned unless `force` is set, in
        /// which case it is replaced. Returns `None` if the target folder
        /// is missing and `create_path` is not set.
        pub fn copy_file(
            &mut self,
            from: &str,
            to: &str,
            create_path: bool,
            force: bool,
        ) -> Result<Option<String>> {
            let from_id = self
                .get_id(from)?
                .ok_or_else(|| format_err!("drive file '{}' does not exist", from))?;
            let (folder, name) = split_path(to);
            let parent_id = match self.target_folder(folder, create_path)? {
                Some(id) => id,
                None => return Ok(None),
            };

            if let Some(id) = self.get_id(to)? {
                if !force {
                    return Ok(Some(id));
                }
                self.delete(to)?;
            }

            let id = self.service.copy(&from_id, &parent_id, name)?;
            let key = self.key(to);
            self.cache.insert(key, id.clone());
            Ok(Some(id))
        }

        /// Uploads a local file to `to`.
        ///
        /// Returns `None` without uploading if `to` exists and `force` is not
        /// set, or if the target folder is missing and `create_path` is not
        /// set.
        pub fn upload(
            &mut self,
            local_file: impl AsRef<Path>,
            to: &str,
            create_path: bool,
            force: bool,
        ) -> Result<Option<String>> {
            let local_file = local_file.as_ref();
            let (folder, name) = split_path(to);
            let parent_id = match self.target_folder(folder, create_path)? {
                Some(id) => id,
                None => return Ok(None),
            };

            if self.get_id(to)?.is_some() {
                if !force {
                    warn!("drive file '{}' exists, skip uploading", to);
                    return Ok(None);
                }
                self.delete(to)?;
            }

            let data = fs::read(local_file)
                .with_context(|| format!("failed to read '{}'", local_file.display()))?;
            let id = self.service.upload(&parent_id, name, data)?;
            let key = self.key(to);
            self.cache.insert(key, id.clone());
            Ok(Some(id))
        }

        /// Downloads the drive file at `path` to the same path under
        /// `local_dir`. An existing local file is kept unless `force` is set.
        pub fn download(
            &mut self,
            path: &str,
            local_dir: impl AsRef<Path>,
            force: bool,
        ) -> Result<PathBuf> {
            let local_file = local_dir.as_ref().join(path);
            if !force && local_file.is_file() {
                return Ok(local_file);
            }

            let id = self
                .get_id(path)?
                .ok_or_else(|| format_err!("drive file '{}' does not exist", path))?;
            let data = self.service.download(&id)?;

            if let Some(dir) = local_file.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&local_file, data)
                .with_context(|| format!("failed to write '{}'", local_file.display()))?;
            Ok(local_file)
        }

        /// Deletes the file at `path` and forgets every cached id.
        pub fn delete(&mut self, path: &str) -> Result<()> {
            let id = self
                .get_id(path)?
                .ok_or_else(|| format_err!("drive file '{}' does not exist", path))?;
            self.service.delete(&id)?;
            self.cache = Self::initial_cache();
            Ok(())
        }

        fn initial_cache() -> HashMap<String, String> {
            HashMap::from([(String::new(), ROOT_ID.to_string())])
        }

        fn target_folder(&mut self, folder: &str, create_path: bool) -> Result<Option<String>> {
            match self.get_id(folder)? {
                Some(id) => Ok(Some(id)),
                None if create_path => self.create_folder(folder, true),
                None => Ok(None),
            }
        }

        fn resolve<F>(&mut self, path: &str, mut lookup: F) -> Result<Option<String>>
        where
            F: FnMut(&S, &str, &str) -> Result<Option<String>>,
        {
            let components = self.components(path);
            let mut id = ROOT_ID.to_string();

            for index in 0..components.len() {
                let key = components[..=index].join("/");
                if let Some(cached) = self.cache.get(&key) {
                    id = cached.clone();
                    continue;
                }

                id = match lookup(&self.service, &id, &components[index])? {
                    Some(child) => child,
                    None => return Ok(None),
                };
                self.cache.insert(key, id.clone());
            }

            Ok(Some(id))
        }

        fn key(&self, path: &str) -> String {
            self.components(path).join("/")
        }

        /// Normalizes the root-relative path into its components.
        fn components(&self, path: &str) -> Vec<String> {
            let mut components: Vec<String> = vec![];
            for part in self.root.split('/').chain(path.split('/')) {
                match part {
                    "" | "." => {}
                    ".." => {
                        components.pop();
                    }
                    name => components.push(name.to_string()),
                }
            }
            components
        }
    }

    fn split_path(path: &str) -> (&str, &str) {
        let path = path.trim_end_matches('/');
        match path.rsplit_once('/') {
            Some((folder, name)) => (folder, name),
            None => ("", path),
        }
    }
}

pub use memory_drive::*;
mod memory_drive {
    use super::*;

    #[derive(Debug, Clone)]
    struct Entry {
        name: String,
        parent: String,
        data: Option<Vec<u8>>,
    }

    impl Entry {
        fn is_folder(&self) -> bool {
            self.data.is_none()
        }
    }

    /// A drive kept in memory.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryDrive {
        entries: BTreeMap<String, Entry>,
        next_id: usize,
    }

    impl MemoryDrive {
        pub fn new() -> Self {
            Self::default()
        }

        /// The number of files and folders on the drive.
        pub fn len(&self) -> usize {
            self.entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }

        fn insert(&mut self, parent_id: &str, name: &str, data: Option<Vec<u8>>) -> Result<String> {
            ensure!(
                parent_id == ROOT_ID
                    || self.entries.get(parent_id).map(Entry::is_folder) == Some(true),
                "parent folder '{}' does not exist",
                parent_id
            );

            let id = format!("{:08}", self.next_id);
            self.next_id += 1;
            self.entries.insert(
                id.clone(),
                Entry {
                    name: name.to_string(),
                    parent: parent_id.to_string(),
                    data,
                },
            );
            Ok(id)
        }

        fn entry(&self, file_id: &str) -> Result<&Entry> {
            self.entries
                .get(file_id)
                .ok_or_else(|| format_err!("file id '{}' does not exist", file_id))
        }
    }

    impl DriveService for MemoryDrive {
        fn find_child(
            &self,
            parent_id: &str,
            name: &str,
            folder_only: bool,
        ) -> Result<Option<String>> {
            let id = self
                .entries
                .iter()
                .find(|(_, entry)| {
                    entry.parent == parent_id
                        && entry.name == name
                        && (!folder_only || entry.is_folder())
                })
                .map(|(id, _)| id.clone());
            Ok(id)
        }

        fn create_folder(&mut self, parent_id: &str, name: &str) -> Result<String> {
            self.insert(parent_id, name, None)
        }

        fn copy(&mut self, file_id: &str, parent_id: &str, name: &str) -> Result<String> {
            let data = self.entry(file_id)?.data.clone();
            ensure!(data.is_some(), "cannot copy folder '{}'", file_id);
            self.insert(parent_id, name, data)
        }

        fn upload(&mut self, parent_id: &str, name: &str, data: Vec<u8>) -> Result<String> {
            self.insert(parent_id, name, Some(data))
        }

        fn download(&self, file_id: &str) -> Result<Vec<u8>> {
            self.entry(file_id)?
                .data
                .clone()
                .ok_or_else(|| format_err!("cannot download folder '{}'", file_id))
        }

        fn delete(&mut self, file_id: &str) -> Result<()> {
            self.entry(file_id)?;

            // remove the entry along with its descendants
            let mut pending = vec![file_id.to_string()];
            while let Some(id) = pending.pop() {
                self.entries.remove(&id);
                pending.extend(
                    self.entries
                        .iter()
                        .filter(|(_, entry)| entry.parent == id)
                        .map(|(child, _)| child.clone()),
                );
            }
            Ok(())
        }
    }
}
