use crate::areas::repository::Repository;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::tree::TreeEntry;
use std::io::Write;
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// `-t`: print the object type
    Type,
    /// `-s`: print the object size
    Size,
    /// `-e`: fail unless the object exists
    Exists,
    /// `-p`: print the object content
    Pretty,
}

impl Repository {
    pub async fn cat_file(&self, object: &str, mode: CatFileMode) -> anyhow::Result<()> {
        let database = self.database();

        match mode {
            CatFileMode::Type => {
                let object_type = database.get_object_type(object).await?;
                writeln!(self.writer(), "{object_type}")?;
            }
            CatFileMode::Size => {
                let header = database.read_header(object).await?;
                writeln!(self.writer(), "{}", header.size)?;
            }
            CatFileMode::Exists => {
                database.read_header(object).await?;
            }
            CatFileMode::Pretty => match database.parse_object(object).await? {
                ObjectBox::Blob(blob) => {
                    let mut data = blob.data_async().await?;
                    let mut chunk = vec![0u8; 8192];
                    loop {
                        let read = data.read(&mut chunk).await?;
                        if read == 0 {
                            break;
                        }
                        self.writer().write_all(&chunk[..read])?;
                    }
                    data.close().await?;
                }
                ObjectBox::Tree(tree) => {
                    for entry in tree.list_entries().await? {
                        self.write_tree_entry(entry, entry.name())?;
                    }
                }
                ObjectBox::Commit(commit) => {
                    let (_, content) = database.read_object_content(&commit.id().to_hex()).await?;
                    self.writer().write_all(&content)?;
                }
                ObjectBox::Tag(tag) => {
                    let (_, content) = database.read_object_content(&tag.id().to_hex()).await?;
                    self.writer().write_all(&content)?;
                }
            },
        }

        Ok(())
    }

    /// Print an entry the way `git ls-tree` does
    pub(crate) fn write_tree_entry(&self, entry: &TreeEntry, path: &str) -> anyhow::Result<()> {
        writeln!(
            self.writer(),
            "{} {} {}\t{}",
            entry.mode(),
            entry.object_type(),
            entry.id(),
            path
        )?;

        Ok(())
    }
}
