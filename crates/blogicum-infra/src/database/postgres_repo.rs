//! PostgreSQL repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    AccessMode, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, IsolationLevel,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
    TransactionTrait,
};

use blogicum_core::domain::{
    Category, CategoryRef, CommentWithAuthor, Id, LocationRef, PostWithRelations, User, UserRef,
};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{PAGE_SIZE, Page, PageRequest, PageSelector};
use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, UserRepository,
};
use blogicum_core::visibility::{PostQuery, Visibility};

use super::entity::category::{self, Entity as CategoryEntity};
use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::location::{self, Entity as LocationEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<CategoryEntity>;

/// PostgreSQL location repository.
pub type PostgresLocationRepository = PostgresBaseRepository<LocationEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = CategoryEntity::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::IsPublished.eq(true))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

impl LocationRepository for PostgresLocationRepository {}

#[derive(Debug, FromQueryResult)]
struct CommentCount {
    post_id: Id,
    comment_count: i64,
}

/// Posts matching `query`. Public visibility joins the category so its
/// publication flag can be checked in the same statement.
fn filtered(query: &PostQuery) -> Select<PostEntity> {
    let mut select = PostEntity::find();

    if let Visibility::Public { now } = query.visibility {
        select = select
            .join(JoinType::InnerJoin, post::Relation::Category.def())
            .filter(post::Column::IsPublished.eq(true))
            .filter(category::Column::IsPublished.eq(true))
            .filter(post::Column::PubDate.lte(now.fixed_offset()));
    }
    if let Some(author_id) = query.author_id {
        select = select.filter(post::Column::AuthorId.eq(author_id));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(post::Column::CategoryId.eq(category_id));
    }

    select
}

/// Batch-load authors, categories, locations and comment counts for a page of
/// posts, one query per relation.
async fn attach_relations<C: ConnectionTrait>(
    db: &C,
    posts: Vec<post::Model>,
) -> Result<Vec<PostWithRelations>, RepoError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<Id> = posts.iter().map(|p| p.id).collect();
    let author_ids: Vec<Id> = posts.iter().map(|p| p.author_id).collect();
    let category_ids: Vec<Id> = posts.iter().filter_map(|p| p.category_id).collect();
    let location_ids: Vec<Id> = posts.iter().filter_map(|p| p.location_id).collect();

    let authors: HashMap<Id, UserRef> = UserEntity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(|u| {
            (
                u.id,
                UserRef {
                    id: u.id,
                    username: u.username,
                },
            )
        })
        .collect();

    let categories: HashMap<Id, CategoryRef> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        CategoryEntity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|c| {
                (
                    c.id,
                    CategoryRef {
                        id: c.id,
                        title: c.title,
                        slug: c.slug,
                    },
                )
            })
            .collect()
    };

    let locations: HashMap<Id, LocationRef> = if location_ids.is_empty() {
        HashMap::new()
    } else {
        LocationEntity::find()
            .filter(location::Column::Id.is_in(location_ids))
            .all(db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|l| {
                (
                    l.id,
                    LocationRef {
                        id: l.id,
                        name: l.name,
                    },
                )
            })
            .collect()
    };

    let counts: HashMap<Id, i64> = CommentEntity::find()
        .select_only()
        .column(comment::Column::PostId)
        .column_as(Expr::col(comment::Column::Id).count(), "comment_count")
        .filter(comment::Column::PostId.is_in(post_ids))
        .group_by(comment::Column::PostId)
        .into_model::<CommentCount>()
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(|c| (c.post_id, c.comment_count))
        .collect();

    posts
        .into_iter()
        .map(|model| {
            let author = authors.get(&model.author_id).cloned().ok_or_else(|| {
                RepoError::Query(format!("dangling author reference {}", model.author_id))
            })?;
            Ok(PostWithRelations {
                author,
                category: model.category_id.and_then(|id| categories.get(&id).cloned()),
                location: model.location_id.and_then(|id| locations.get(&id).cloned()),
                comment_count: counts.get(&model.id).copied().unwrap_or(0).max(0) as u64,
                post: model.into(),
            })
        })
        .collect()
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_with_relations(&self, id: Id) -> Result<Option<PostWithRelations>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(attach_relations(&self.db, vec![model]).await?.pop())
    }

    async fn page_filtered(
        &self,
        query: &PostQuery,
        selector: PageSelector,
    ) -> Result<Option<Page<PostWithRelations>>, RepoError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await
            .map_err(map_db_err)?;

        let total = filtered(query).count(&txn).await.map_err(map_db_err)?;
        let Ok(request) = PageRequest::resolve(selector, total, PAGE_SIZE) else {
            txn.commit().await.map_err(map_db_err)?;
            return Ok(None);
        };
        tracing::debug!(?query, page = request.number, total, "Listing posts");

        let models = filtered(query)
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .offset(request.offset())
            .limit(request.limit())
            .all(&txn)
            .await
            .map_err(map_db_err)?;
        let items = attach_relations(&txn, models).await?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(Some(Page::new(items, request, total)))
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Id) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let rows = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .find_also_related(UserEntity)
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        rows.into_iter()
            .map(|(comment, author)| {
                let author = author.ok_or_else(|| {
                    RepoError::Query(format!("dangling author reference {}", comment.author_id))
                })?;
                Ok(CommentWithAuthor {
                    author: UserRef {
                        id: author.id,
                        username: author.username,
                    },
                    comment: comment.into(),
                })
            })
            .collect()
    }
}
