use async_trait::async_trait;

use crate::domain::{
    Category, Comment, CommentWithAuthor, Id, Location, NewCategory, NewComment, NewLocation,
    NewPost, NewUser, Post, PostWithRelations, User,
};
use crate::error::RepoError;
use crate::pagination::{Page, PageSelector};
use crate::visibility::PostQuery;

/// Generic repository trait defining standard CRUD operations.
///
/// `T` is the stored record, `N` the fields needed to create one.
#[async_trait]
pub trait BaseRepository<T, N>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: Id) -> Result<Option<T>, RepoError>;

    /// Insert a new entity; the store assigns its ID and timestamps.
    async fn create(&self, new: N) -> Result<T, RepoError>;

    /// Overwrite an existing entity. Fails with `NotFound` if it is gone.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID, applying the cascade rules of its relations.
    async fn delete(&self, id: Id) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, NewUser> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, NewCategory> {
    /// Category with this slug, only if it is published.
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;
}

pub trait LocationRepository: BaseRepository<Location, NewLocation> {}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, NewPost> {
    /// Single post joined with its relations and comment count.
    async fn find_with_relations(&self, id: Id) -> Result<Option<PostWithRelations>, RepoError>;

    /// The page of posts matching `query` picked by `selector`, newest first
    /// by creation time, with [`PAGE_SIZE`](crate::PAGE_SIZE) posts per page.
    ///
    /// The total and the window come from one consistent read, so the page
    /// counts always agree with the items. `None` when the selector points
    /// past the last page.
    async fn page_filtered(
        &self,
        query: &PostQuery,
        selector: PageSelector,
    ) -> Result<Option<Page<PostWithRelations>>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, NewComment> {
    /// Comments of a post, newest first, with their authors.
    async fn list_for_post(&self, post_id: Id) -> Result<Vec<CommentWithAuthor>, RepoError>;
}
