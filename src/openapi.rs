use crate::models::{Comment, CommentPatch, Meta, NewComment, NewPost, NewTopic, Post, PostPatch, Topic};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_topics,
        crate::routes::create_topic,
        crate::routes::get_topic,
        crate::routes::delete_topic,
        crate::routes::list_posts,
        crate::routes::create_post,
        crate::routes::get_post,
        crate::routes::update_post,
        crate::routes::replace_post,
        crate::routes::delete_post,
        crate::routes::upvote_post,
        crate::routes::downvote_post,
        crate::routes::list_comments,
        crate::routes::create_comment,
        crate::routes::get_comment,
        crate::routes::update_comment,
        crate::routes::replace_comment,
        crate::routes::delete_comment,
        crate::routes::upvote_comment,
        crate::routes::downvote_comment,
    ),
    components(schemas(
        Meta, Topic, NewTopic, Post, NewPost, PostPatch, Comment, NewComment, CommentPatch
    )),
    tags(
        (name = "topics", description = "Topic operations"),
        (name = "posts", description = "Post operations"),
        (name = "comments", description = "Comment operations"),
    )
)]
pub struct ApiDoc;
