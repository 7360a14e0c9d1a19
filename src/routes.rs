use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::entity::Relation;
use crate::error::ApiError;
use crate::models::*;
use crate::repo::{RepoResult, SqliteRepo};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()))
        .service(
            web::scope("/api/v1")
                .service(
                    web::resource("/topics")
                        .route(web::get().to(list_topics))
                        .route(web::post().to(create_topic)),
                )
                .service(
                    web::resource("/topics/{topic_id}")
                        .route(web::get().to(get_topic))
                        .route(web::delete().to(delete_topic)),
                )
                .service(
                    web::resource("/topics/{topic_id}/posts")
                        .route(web::get().to(list_posts))
                        .route(web::post().to(create_post)),
                )
                .service(
                    web::resource("/topics/{topic_id}/posts/{post_id}")
                        .route(web::get().to(get_post))
                        .route(web::put().to(replace_post))
                        .route(web::patch().to(update_post))
                        .route(web::delete().to(delete_post)),
                )
                .service(web::resource("/topics/{topic_id}/posts/{post_id}/upvote").route(web::post().to(upvote_post)))
                .service(web::resource("/topics/{topic_id}/posts/{post_id}/downvote").route(web::post().to(downvote_post)))
                .service(
                    web::resource("/topics/{topic_id}/posts/{post_id}/comments")
                        .route(web::get().to(list_comments))
                        .route(web::post().to(create_comment)),
                )
                .service(
                    web::resource("/topics/{topic_id}/posts/{post_id}/comments/{comment_id}")
                        .route(web::get().to(get_comment))
                        .route(web::put().to(replace_comment))
                        .route(web::patch().to(update_comment))
                        .route(web::delete().to(delete_comment)),
                )
                .service(
                    web::resource("/topics/{topic_id}/posts/{post_id}/comments/{comment_id}/upvote")
                        .route(web::post().to(upvote_comment)),
                )
                .service(
                    web::resource("/topics/{topic_id}/posts/{post_id}/comments/{comment_id}/downvote")
                        .route(web::post().to(downvote_comment)),
                ),
        );
}

#[derive(Clone)]
pub struct AppState { pub repo: SqliteRepo }

#[derive(Debug, Deserialize)]
pub struct ExpandQuery {
    pub expand: Option<String>,
}

impl ExpandQuery {
    /// `?expand=` with an empty value turns expansion off; no parameter at all
    /// falls back to the route's default.
    fn relations(&self, default: &[Relation]) -> RepoResult<Vec<Relation>> {
        match &self.expand {
            Some(raw) => Relation::parse_list(raw),
            None => Ok(default.to_vec()),
        }
    }
}

fn voted() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({}))
}

// ---------------- Topics -------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/topics",
    tag = "topics",
    responses((status = 200, description = "List topics", body = [Topic]))
)]
pub async fn list_topics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let topics = data.repo.list::<Topic>(&()).await?;
    Ok(HttpResponse::Ok().json(topics))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics",
    tag = "topics",
    request_body = NewTopic,
    responses(
        (status = 201, description = "Topic created", body = Topic),
        (status = 400, description = "Invalid id"),
        (status = 409, description = "Topic id already taken")
    )
)]
pub async fn create_topic(data: web::Data<AppState>, payload: web::Json<NewTopic>) -> Result<HttpResponse, ApiError> {
    let id = payload.into_inner().id;
    let topic = data.repo.create(Topic::new(id.trim())).await?;
    Ok(HttpResponse::Created().json(topic))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic_id}",
    tag = "topics",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("expand" = Option<String>, Query, description = "Comma separated relations, default `posts`")
    ),
    responses(
        (status = 200, description = "Topic", body = Topic),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn get_topic(data: web::Data<AppState>, path: web::Path<Ids>, query: web::Query<ExpandQuery>) -> Result<HttpResponse, ApiError> {
    let expand = query.relations(&[Relation::Posts])?;
    let topic = data.repo.get::<Topic>(&path.topic_key()?, &expand).await?;
    Ok(HttpResponse::Ok().json(topic))
}

#[utoipa::path(
    delete,
    path = "/api/v1/topics/{topic_id}",
    tag = "topics",
    params(("topic_id" = String, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic and its posts and comments soft-deleted", body = Topic),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn delete_topic(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    let topic = data.repo.delete::<Topic>(&path.topic_key()?).await?;
    Ok(HttpResponse::Ok().json(topic))
}

// ---------------- Posts --------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic_id}/posts",
    tag = "posts",
    params(("topic_id" = String, Path, description = "Topic id")),
    responses((status = 200, description = "Posts of the topic", body = [Post]))
)]
pub async fn list_posts(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    let posts = data.repo.list::<Post>(&path.topic_key()?).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/posts",
    tag = "posts",
    request_body = NewPost,
    params(("topic_id" = String, Path, description = "Topic id")),
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn create_post(data: web::Data<AppState>, path: web::Path<Ids>, payload: web::Json<NewPost>) -> Result<HttpResponse, ApiError> {
    let topic = path.topic_key()?;
    let NewPost { title, content } = payload.into_inner();
    let post = data.repo.create(Post::new(topic.id, title, content)).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}",
    tag = "posts",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("expand" = Option<String>, Query, description = "Comma separated relations, default `comments`")
    ),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(data: web::Data<AppState>, path: web::Path<Ids>, query: web::Query<ExpandQuery>) -> Result<HttpResponse, ApiError> {
    let expand = query.relations(&[Relation::Comments])?;
    let post = data.repo.get::<Post>(&path.post_key()?, &expand).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    patch,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}",
    tag = "posts",
    request_body = PostPatch,
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 400, description = "Unknown field in patch"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post(data: web::Data<AppState>, path: web::Path<Ids>, payload: web::Json<PostPatch>) -> Result<HttpResponse, ApiError> {
    let patch = payload.into_inner();
    let post = data.repo.update::<Post>(&path.post_key()?, &patch).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// PUT takes the same partial body as PATCH.
#[utoipa::path(
    put,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}",
    tag = "posts",
    request_body = PostPatch,
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 400, description = "Unknown field in body"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn replace_post(data: web::Data<AppState>, path: web::Path<Ids>, payload: web::Json<PostPatch>) -> Result<HttpResponse, ApiError> {
    update_post(data, path, payload).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}",
    tag = "posts",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post and its comments soft-deleted", body = Post),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    let post = data.repo.delete::<Post>(&path.post_key()?).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/upvote",
    tag = "posts",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses((status = 200, description = "Vote recorded"), (status = 404, description = "Post not found"))
)]
pub async fn upvote_post(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    data.repo.upvote::<Post>(&path.post_key()?).await?;
    Ok(voted())
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/downvote",
    tag = "posts",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses((status = 200, description = "Vote recorded"), (status = 404, description = "Post not found"))
)]
pub async fn downvote_post(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    data.repo.downvote::<Post>(&path.post_key()?).await?;
    Ok(voted())
}

// ---------------- Comments -----------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments",
    tag = "comments",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses((status = 200, description = "Comments of the post", body = [Comment]))
)]
pub async fn list_comments(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    let comments = data.repo.list::<Comment>(&path.post_key()?).await?;
    Ok(HttpResponse::Ok().json(comments))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments",
    tag = "comments",
    request_body = NewComment,
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(data: web::Data<AppState>, path: web::Path<Ids>, payload: web::Json<NewComment>) -> Result<HttpResponse, ApiError> {
    let post = path.post_key()?;
    let comment = data.repo.create(Comment::new(post.topic_id, post.id, payload.into_inner().content)).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id"),
        ("expand" = Option<String>, Query, description = "Comments have no expandable relations")
    ),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 400, description = "Unknown relation"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn get_comment(data: web::Data<AppState>, path: web::Path<Ids>, query: web::Query<ExpandQuery>) -> Result<HttpResponse, ApiError> {
    let expand = query.relations(&[])?;
    let comment = data.repo.get::<Comment>(&path.comment_key()?, &expand).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    patch,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    request_body = CommentPatch,
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn update_comment(data: web::Data<AppState>, path: web::Path<Ids>, payload: web::Json<CommentPatch>) -> Result<HttpResponse, ApiError> {
    let patch = payload.into_inner();
    let comment = data.repo.update::<Comment>(&path.comment_key()?, &patch).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    put,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    request_body = CommentPatch,
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn replace_comment(data: web::Data<AppState>, path: web::Path<Ids>, payload: web::Json<CommentPatch>) -> Result<HttpResponse, ApiError> {
    update_comment(data, path, payload).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment soft-deleted", body = Comment),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    let comment = data.repo.delete::<Comment>(&path.comment_key()?).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments/{comment_id}/upvote",
    tag = "comments",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses((status = 200, description = "Vote recorded"), (status = 404, description = "Comment not found"))
)]
pub async fn upvote_comment(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    data.repo.upvote::<Comment>(&path.comment_key()?).await?;
    Ok(voted())
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/posts/{post_id}/comments/{comment_id}/downvote",
    tag = "comments",
    params(
        ("topic_id" = String, Path, description = "Topic id"),
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses((status = 200, description = "Vote recorded"), (status = 404, description = "Comment not found"))
)]
pub async fn downvote_comment(data: web::Data<AppState>, path: web::Path<Ids>) -> Result<HttpResponse, ApiError> {
    data.repo.downvote::<Comment>(&path.comment_key()?).await?;
    Ok(voted())
}
