//! In-memory repository store - used when no database is configured and in tests.
//!
//! Mirrors the relational rules of the Postgres schema: unique usernames and
//! category slugs, foreign keys checked on write, cascading deletes for
//! authors and posts, and null-on-delete for categories and locations.
//! Note: Data is lost on process restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use blogicum_core::domain::{
    Category, CategoryRef, Comment, CommentWithAuthor, Id, Location, LocationRef, NewCategory,
    NewComment, NewLocation, NewPost, NewUser, Post, PostWithRelations, User, UserRef,
};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{PAGE_SIZE, Page, PageRequest, PageSelector};
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
    UserRepository,
};
use blogicum_core::visibility::PostQuery;

struct Table<T> {
    rows: BTreeMap<Id, T>,
    last_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn contains(&self, id: Id) -> bool {
        self.rows.contains_key(&id)
    }
}

#[derive(Default)]
struct State {
    users: Table<User>,
    categories: Table<Category>,
    locations: Table<Location>,
    posts: Table<Post>,
    comments: Table<Comment>,
}

impl State {
    fn username_taken(&self, username: &str, except: Option<Id>) -> bool {
        self.users
            .rows
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn slug_taken(&self, slug: &str, except: Option<Id>) -> bool {
        self.categories
            .rows
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }

    fn check_post_references(
        &self,
        author_id: Id,
        category_id: Option<Id>,
        location_id: Option<Id>,
    ) -> Result<(), RepoError> {
        if !self.users.contains(author_id) {
            return Err(RepoError::Constraint(format!("user {author_id} does not exist")));
        }
        if let Some(id) = category_id.filter(|id| !self.categories.contains(*id)) {
            return Err(RepoError::Constraint(format!("category {id} does not exist")));
        }
        if let Some(id) = location_id.filter(|id| !self.locations.contains(*id)) {
            return Err(RepoError::Constraint(format!("location {id} does not exist")));
        }
        Ok(())
    }

    fn check_comment_references(&self, post_id: Id, author_id: Id) -> Result<(), RepoError> {
        if !self.posts.contains(post_id) {
            return Err(RepoError::Constraint(format!("post {post_id} does not exist")));
        }
        if !self.users.contains(author_id) {
            return Err(RepoError::Constraint(format!("user {author_id} does not exist")));
        }
        Ok(())
    }

    fn category_of(&self, post: &Post) -> Option<&Category> {
        post.category_id.and_then(|id| self.categories.rows.get(&id))
    }

    fn user_ref(&self, id: Id) -> Result<UserRef, RepoError> {
        self.users
            .rows
            .get(&id)
            .map(UserRef::from)
            .ok_or_else(|| RepoError::Query(format!("dangling author reference {id}")))
    }

    fn with_relations(&self, post: &Post) -> Result<PostWithRelations, RepoError> {
        Ok(PostWithRelations {
            author: self.user_ref(post.author_id)?,
            category: self.category_of(post).map(CategoryRef::from),
            location: post
                .location_id
                .and_then(|id| self.locations.rows.get(&id))
                .map(LocationRef::from),
            comment_count: self
                .comments
                .rows
                .values()
                .filter(|c| c.post_id == post.id)
                .count() as u64,
            post: post.clone(),
        })
    }

    fn matching<'a>(&'a self, query: &'a PostQuery) -> impl Iterator<Item = &'a Post> + 'a {
        self.posts
            .rows
            .values()
            .filter(move |p| query.matches(p, self.category_of(p)))
    }

    fn remove_post(&mut self, id: Id) {
        self.posts.rows.remove(&id);
        self.comments.rows.retain(|_, c| c.post_id != id);
    }
}

/// Thread-safe store implementing every repository port over one shared state.
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<User, NewUser> for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.users.rows.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        if state.username_taken(&new.username, None) {
            return Err(RepoError::Constraint("username already exists".to_string()));
        }
        let user = User {
            id: state.users.next_id(),
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
            date_joined: Utc::now(),
        };
        state.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.contains(user.id) {
            return Err(RepoError::NotFound);
        }
        if state.username_taken(&user.username, Some(user.id)) {
            return Err(RepoError::Constraint("username already exists".to_string()));
        }
        state.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.users.rows.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        let authored: Vec<Id> = state
            .posts
            .rows
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            state.remove_post(post_id);
        }
        state.comments.rows.retain(|_, c| c.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl BaseRepository<Category, NewCategory> for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Category>, RepoError> {
        Ok(self.state.read().await.categories.rows.get(&id).cloned())
    }

    async fn create(&self, new: NewCategory) -> Result<Category, RepoError> {
        let mut state = self.state.write().await;
        if state.slug_taken(&new.slug, None) {
            return Err(RepoError::Constraint("slug already exists".to_string()));
        }
        let category = Category {
            id: state.categories.next_id(),
            title: new.title,
            description: new.description,
            slug: new.slug,
            is_published: new.is_published,
            created_at: Utc::now(),
        };
        state.categories.rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, category: Category) -> Result<Category, RepoError> {
        let mut state = self.state.write().await;
        if !state.categories.contains(category.id) {
            return Err(RepoError::NotFound);
        }
        if state.slug_taken(&category.slug, Some(category.id)) {
            return Err(RepoError::Constraint("slug already exists".to_string()));
        }
        state.categories.rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.categories.rows.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        for post in state.posts.rows.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .rows
            .values()
            .find(|c| c.slug == slug && c.is_published)
            .cloned())
    }
}

#[async_trait]
impl BaseRepository<Location, NewLocation> for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Location>, RepoError> {
        Ok(self.state.read().await.locations.rows.get(&id).cloned())
    }

    async fn create(&self, new: NewLocation) -> Result<Location, RepoError> {
        let mut state = self.state.write().await;
        let location = Location {
            id: state.locations.next_id(),
            name: new.name,
            is_published: new.is_published,
            created_at: Utc::now(),
        };
        state.locations.rows.insert(location.id, location.clone());
        Ok(location)
    }

    async fn update(&self, location: Location) -> Result<Location, RepoError> {
        let mut state = self.state.write().await;
        if !state.locations.contains(location.id) {
            return Err(RepoError::NotFound);
        }
        state.locations.rows.insert(location.id, location.clone());
        Ok(location)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.locations.rows.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        for post in state.posts.rows.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(())
    }
}

impl LocationRepository for InMemoryStore {}

#[async_trait]
impl BaseRepository<Post, NewPost> for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Post>, RepoError> {
        Ok(self.state.read().await.posts.rows.get(&id).cloned())
    }

    async fn create(&self, new: NewPost) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        state.check_post_references(new.author_id, new.category_id, new.location_id)?;
        let post = Post {
            id: state.posts.next_id(),
            title: new.title,
            text: new.text,
            pub_date: new.pub_date,
            created_at: Utc::now(),
            is_published: new.is_published,
            image: new.image,
            author_id: new.author_id,
            category_id: new.category_id,
            location_id: new.location_id,
        };
        state.posts.rows.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains(post.id) {
            return Err(RepoError::NotFound);
        }
        state.check_post_references(post.author_id, post.category_id, post.location_id)?;
        state.posts.rows.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains(id) {
            return Err(RepoError::NotFound);
        }
        state.remove_post(id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_with_relations(&self, id: Id) -> Result<Option<PostWithRelations>, RepoError> {
        let state = self.state.read().await;
        state
            .posts
            .rows
            .get(&id)
            .map(|post| state.with_relations(post))
            .transpose()
    }

    async fn page_filtered(
        &self,
        query: &PostQuery,
        selector: PageSelector,
    ) -> Result<Option<Page<PostWithRelations>>, RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<&Post> = state.matching(query).collect();
        let total = posts.len() as u64;
        let Ok(request) = PageRequest::resolve(selector, total, PAGE_SIZE) else {
            return Ok(None);
        };

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let items = posts
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .map(|post| state.with_relations(post))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Page::new(items, request, total)))
    }
}

#[async_trait]
impl BaseRepository<Comment, NewComment> for InMemoryStore {
    async fn find_by_id(&self, id: Id) -> Result<Option<Comment>, RepoError> {
        Ok(self.state.read().await.comments.rows.get(&id).cloned())
    }

    async fn create(&self, new: NewComment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        state.check_comment_references(new.post_id, new.author_id)?;
        let comment = Comment {
            id: state.comments.next_id(),
            text: new.text,
            post_id: new.post_id,
            author_id: new.author_id,
            created_at: Utc::now(),
        };
        state.comments.rows.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        if !state.comments.contains(comment.id) {
            return Err(RepoError::NotFound);
        }
        state.check_comment_references(comment.post_id, comment.author_id)?;
        state.comments.rows.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Id) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state
            .comments
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn list_for_post(&self, post_id: Id) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let state = self.state.read().await;
        let mut comments: Vec<&Comment> = state
            .comments
            .rows
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        comments
            .into_iter()
            .map(|comment| {
                Ok(CommentWithAuthor {
                    author: state.user_ref(comment.author_id)?,
                    comment: comment.clone(),
                })
            })
            .collect()
    }
}
