//! Categories and tags.
//!
//! Both are flat name+slug catalogs. A post belongs to at most one category
//! (stored on the post) and to any number of tags (stored as `PostTag`
//! links and mirrored in `Post::tag_ids`). A term that is still referenced
//! by a post can't be deleted.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateLength;

use crate::db::{derived_key, Collectable, Database, Identifiable, Tx, TxResult};
use crate::error::{ErrorKind, Result};
use crate::post::{Post, PostId};
use crate::util::resolve_slug;

pub type CategoryId = Uuid;
pub type TagId = Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Collectable for Category {
    fn get_collection_name() -> &'static str {
        "category"
    }
}

impl Identifiable for Category {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Collectable for Tag {
    fn get_collection_name() -> &'static str {
        "tag"
    }
}

impl Identifiable for Tag {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

/// Link between a post and one of its tags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostTag {
    pub id: Uuid,
    pub post: PostId,
    pub tag: TagId,
}

impl PostTag {
    pub fn new(post: PostId, tag: TagId) -> Self {
        Self {
            id: Self::key(post, tag),
            post,
            tag,
        }
    }

    pub fn key(post: PostId, tag: TagId) -> Uuid {
        derived_key(&[post.as_bytes(), tag.as_bytes()])
    }
}

impl Collectable for PostTag {
    fn get_collection_name() -> &'static str {
        "post_tag"
    }
}

impl Identifiable for PostTag {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

/// Term paired with the number of posts referencing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WithCount<T> {
    #[serde(flatten)]
    pub term: T,
    pub posts: usize,
}

/// Payload for creating or updating a category or tag. Tags ignore the
/// description.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl TermInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(String, String)> {
        let name = self.name.trim().to_string();
        if !name.validate_length(Some(1), Some(50), None) {
            return Err(ErrorKind::BadInput("name must be 1 to 50 characters".to_string()).into());
        }
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        Ok((name, slug))
    }
}

/// Storage layout shared by categories and tags.
///
/// Each kind keeps a slug index tree (slug to term id) and a reference
/// counter tree (term id to the number of posts using it). Both are only
/// written inside transactions together with the rows they describe.
pub(crate) trait Term: Serialize + DeserializeOwned + Collectable + Identifiable {
    const LABEL: &'static str;
    const SLUG_INDEX: &'static str;
    const REFS: &'static str;
    fn slug(&self) -> &str;
}

impl Term for Category {
    const LABEL: &'static str = "category";
    const SLUG_INDEX: &'static str = "category_slug";
    const REFS: &'static str = "category_refs";
    fn slug(&self) -> &str {
        &self.slug
    }
}

impl Term for Tag {
    const LABEL: &'static str = "tag";
    const SLUG_INDEX: &'static str = "tag_slug";
    const REFS: &'static str = "tag_refs";
    fn slug(&self) -> &str {
        &self.slug
    }
}

fn claim_slug<T: Term>(tx: &Tx, slug: &str, id: Uuid) -> TxResult<()> {
    if tx.claim(T::SLUG_INDEX, slug.as_bytes(), id)? {
        Ok(())
    } else {
        Err(ErrorKind::SlugInUse(slug.to_string()).into())
    }
}

fn insert_term<T: Term>(db: &Database, term: &T) -> Result<()> {
    db.transaction(&[T::get_collection_name(), T::SLUG_INDEX], |tx| {
        claim_slug::<T>(tx, term.slug(), term.get_id())?;
        tx.set(term)
    })
}

/// Loads the term, applies `edit` and stores it again. A changed slug is
/// claimed and the old one released in the same transaction.
fn edit_term<T: Term>(db: &Database, id: Uuid, edit: impl Fn(&mut T)) -> Result<T> {
    db.transaction(&[T::get_collection_name(), T::SLUG_INDEX], |tx| {
        let mut term = tx.get::<T>(id)?;
        let old_slug = term.slug().to_string();
        edit(&mut term);
        if term.slug() != old_slug {
            claim_slug::<T>(tx, term.slug(), id)?;
            tx.remove_raw(T::SLUG_INDEX, old_slug.as_bytes())?;
        }
        tx.set(&term)?;
        Ok(term)
    })
}

/// Removes the term unless a post still references it. The check and the
/// removal share one transaction with the reference counter, which every
/// post write updates, so a post can't be linked to a term mid-delete.
fn remove_term<T: Term>(db: &Database, id: Uuid) -> Result<T> {
    db.transaction(&[T::get_collection_name(), T::SLUG_INDEX, T::REFS], |tx| {
        let term = tx.get::<T>(id)?;
        let count = tx.counter(T::REFS, id.as_bytes())?;
        if count > 0 {
            return Err(ErrorKind::HasAssociatedPosts(
                format!("{} '{}'", T::LABEL, term.slug()),
                count as usize,
            )
            .into());
        }
        tx.remove::<T>(id)?;
        tx.remove_raw(T::SLUG_INDEX, term.slug().as_bytes())?;
        Ok(term)
    })
}

fn get_by_slug<T: Term>(db: &Database, slug: &str) -> Result<T> {
    let id = db
        .get_raw_at(T::SLUG_INDEX, slug.as_bytes())?
        .ok_or_else(|| ErrorKind::not_found(T::LABEL, slug))?;
    db.get::<T>(Uuid::from_slice(&id)?)
}

fn post_count<T: Term>(db: &Database, id: Uuid) -> Result<usize> {
    Ok(db.counter_at(T::REFS, id.as_bytes())? as usize)
}

/// Records that one more post uses the term. Fails if the term is gone.
pub(crate) fn add_ref<T: Term>(tx: &Tx, id: Uuid) -> TxResult<()> {
    if !tx.contains::<T>(id)? {
        return Err(ErrorKind::not_found(T::LABEL, id).into());
    }
    tx.add_to_counter(T::REFS, id.as_bytes(), 1)?;
    Ok(())
}

pub(crate) fn drop_ref<T: Term>(tx: &Tx, id: Uuid) -> TxResult<()> {
    tx.add_to_counter(T::REFS, id.as_bytes(), -1)?;
    Ok(())
}

pub fn create_category(db: &Database, input: TermInput) -> Result<Category> {
    let (name, slug) = input.validate()?;
    let category = Category {
        id: Uuid::new_v4(),
        name,
        slug,
        description: input.description.filter(|d| !d.trim().is_empty()),
        created_at: Utc::now(),
    };
    insert_term(db, &category)?;
    tracing::info!(category = %category.id, "created category {}", category.slug);
    Ok(category)
}

pub fn update_category(db: &Database, id: CategoryId, input: TermInput) -> Result<Category> {
    let (name, slug) = input.validate()?;
    let description = input.description.filter(|d| !d.trim().is_empty());
    edit_term::<Category>(db, id, |category| {
        category.name = name.clone();
        category.slug = slug.clone();
        category.description = description.clone();
    })
}

pub fn category_post_count(db: &Database, id: CategoryId) -> Result<usize> {
    post_count::<Category>(db, id)
}

/// Deletes the category unless some post is still filed under it.
pub fn delete_category(db: &Database, id: CategoryId) -> Result<()> {
    let category = remove_term::<Category>(db, id)?;
    tracing::info!(category = %id, "deleted category {}", category.slug);
    Ok(())
}

pub fn get_category_by_slug(db: &Database, slug: &str) -> Result<Category> {
    get_by_slug(db, slug)
}

/// Lists all categories sorted by name, with post counts.
pub fn list_categories(db: &Database) -> Result<Vec<WithCount<Category>>> {
    let mut out = db
        .get_collection::<Category>()?
        .into_iter()
        .map(|term| {
            let posts = post_count::<Category>(db, term.id)?;
            Ok(WithCount { term, posts })
        })
        .collect::<Result<Vec<_>>>()?;
    out.sort_by(|a, b| a.term.name.to_lowercase().cmp(&b.term.name.to_lowercase()));
    Ok(out)
}

pub fn create_tag(db: &Database, input: TermInput) -> Result<Tag> {
    let (name, slug) = input.validate()?;
    let tag = Tag {
        id: Uuid::new_v4(),
        name,
        slug,
        created_at: Utc::now(),
    };
    insert_term(db, &tag)?;
    tracing::info!(tag = %tag.id, "created tag {}", tag.slug);
    Ok(tag)
}

pub fn update_tag(db: &Database, id: TagId, input: TermInput) -> Result<Tag> {
    let (name, slug) = input.validate()?;
    edit_term::<Tag>(db, id, |tag| {
        tag.name = name.clone();
        tag.slug = slug.clone();
    })
}

pub fn tag_post_count(db: &Database, id: TagId) -> Result<usize> {
    post_count::<Tag>(db, id)
}

/// Deletes the tag unless some post still carries it.
pub fn delete_tag(db: &Database, id: TagId) -> Result<()> {
    let tag = remove_term::<Tag>(db, id)?;
    tracing::info!(tag = %id, "deleted tag {}", tag.slug);
    Ok(())
}

pub fn get_tag_by_slug(db: &Database, slug: &str) -> Result<Tag> {
    get_by_slug(db, slug)
}

/// Lists all tags, most used first and then alphabetically.
pub fn list_tags(db: &Database) -> Result<Vec<WithCount<Tag>>> {
    let mut out = db
        .get_collection::<Tag>()?
        .into_iter()
        .map(|term| {
            let posts = post_count::<Tag>(db, term.id)?;
            Ok(WithCount { term, posts })
        })
        .collect::<Result<Vec<_>>>()?;
    out.sort_by(|a, b| {
        b.posts
            .cmp(&a.posts)
            .then_with(|| a.term.name.to_lowercase().cmp(&b.term.name.to_lowercase()))
    });
    Ok(out)
}

/// Tags of the post, sorted by name.
pub fn post_tags(db: &Database, post: &Post) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    for id in &post.tag_ids {
        if let Some(tag) = db.find::<Tag>(*id)? {
            tags.push(tag);
        }
    }
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tags)
}

/// Moves the post's category from `current` to `next`, keeping the
/// reference counters in step.
pub(crate) fn refile_category(
    tx: &Tx,
    current: Option<CategoryId>,
    next: Option<CategoryId>,
) -> TxResult<()> {
    if current == next {
        return Ok(());
    }
    if let Some(old) = current {
        drop_ref::<Category>(tx, old)?;
    }
    if let Some(new) = next {
        add_ref::<Category>(tx, new)?;
    }
    Ok(())
}

/// Replaces the tag links of a post within a transaction. `current` are the
/// tag ids linked before the change.
pub(crate) fn relink_tags(tx: &Tx, post: PostId, current: &[TagId], next: &[TagId]) -> TxResult<()> {
    for tag in current.iter().filter(|t| !next.contains(t)) {
        tx.remove::<PostTag>(PostTag::key(post, *tag))?;
        drop_ref::<Tag>(tx, *tag)?;
    }
    for tag in next.iter().filter(|t| !current.contains(t)) {
        add_ref::<Tag>(tx, *tag)?;
        tx.set(&PostTag::new(post, *tag))?;
    }
    Ok(())
}
