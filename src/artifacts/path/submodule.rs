use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::path::clean_path;
use crate::errors::GitError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubModule {
    pub name: String,
    pub path: String,
    pub url: String,
    pub branch: Option<String>,
}

impl SubModule {
    /// Parse the content of a `.gitmodules` file
    ///
    /// Sections other than `[submodule "..."]`, comments and unknown keys are
    /// ignored, as are submodules without a path.
    pub fn parse_gitmodules(content: &str) -> Vec<SubModule> {
        let mut submodules = Vec::new();
        let mut current: Option<SubModule> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') {
                submodules.extend(current.take());
                current = section_name(line).map(|name| SubModule {
                    name: name.to_string(),
                    ..SubModule::default()
                });
                continue;
            }

            let Some(submodule) = current.as_mut() else {
                continue;
            };
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "path" => submodule.path = clean_path(&value),
                "url" => submodule.url = value,
                "branch" => submodule.branch = Some(value),
                _ => {}
            }
        }
        submodules.extend(current);

        submodules.retain(|submodule| !submodule.path.is_empty());
        submodules
    }
}

/// Name of a `[submodule "name"]` section header
fn section_name(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let quoted = inner.strip_prefix("submodule")?.trim_start();
    quoted.strip_prefix('"')?.strip_suffix('"')
}

impl Repository {
    /// Submodules declared in `.gitmodules` at `commit`
    ///
    /// A commit without `.gitmodules` has no submodules.
    pub async fn get_submodules(&self, commit: &ObjectId) -> Result<Vec<SubModule>, GitError> {
        let tree = Tree::new(self, *commit);
        let entry = match tree.get_tree_entry_by_path(".gitmodules").await {
            Ok(entry) => entry,
            Err(err) if err.is_not_exist() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        if !entry.is_regular() && !entry.is_executable() {
            return Ok(Vec::new());
        }

        let blob = entry.blob(self);
        let size = blob.size().await?;
        let content = blob.get_blob_content(size).await?;

        Ok(SubModule::parse_gitmodules(&content))
    }

    /// Submodule declared for `path` at `commit`, if any
    pub async fn get_submodule(
        &self,
        commit: &ObjectId,
        path: &str,
    ) -> Result<Option<SubModule>, GitError> {
        let path = clean_path(path);
        Ok(self
            .get_submodules(commit)
            .await?
            .into_iter()
            .find(|submodule| submodule.path == path))
    }
}
