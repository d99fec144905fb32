use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;

pub trait Object {
    fn object_id(&self) -> ObjectId;

    fn object_type(&self) -> ObjectType;
}

/// Result of decoding an arbitrary id, discriminated by the reported type
///
/// Commits and tags are fully decoded values; trees and blobs are lazy
/// handles whose content is fetched on demand.
pub enum ObjectBox<'r> {
    Blob(Box<Blob<'r>>),
    Tree(Box<Tree<'r>>),
    Commit(Box<Commit>),
    Tag(Box<Tag>),
}

impl ObjectBox<'_> {
    fn as_object(&self) -> &dyn Object {
        match self {
            ObjectBox::Blob(blob) => blob.as_ref(),
            ObjectBox::Tree(tree) => tree.as_ref(),
            ObjectBox::Commit(commit) => commit.as_ref(),
            ObjectBox::Tag(tag) => tag.as_ref(),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.as_object().object_id()
    }

    pub fn object_type(&self) -> ObjectType {
        self.as_object().object_type()
    }
}
