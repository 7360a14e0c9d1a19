use actix_web::{test, web, App};
use forum::{config, AppState, SqliteRepo};
use serde_json::{json, Value};

async fn state() -> web::Data<AppState> {
    web::Data::new(AppState { repo: SqliteRepo::in_memory().await.unwrap() })
}

#[actix_web::test]
async fn test_topic_post_comment_flow_routes() {
    let app = test::init_service(App::new().app_data(state().await).configure(config)).await;

    // list topics empty
    let req = test::TestRequest::get().uri("/api/v1/topics").to_request();
    let topics: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(topics.as_array().unwrap().len(), 0);

    // create topic with caller-chosen id
    let req = test::TestRequest::post().uri("/api/v1/topics").set_json(json!({"id": "rust"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let topic: Value = test::read_body_json(resp).await;
    assert_eq!(topic["id"], "rust");

    // create post
    let req = test::TestRequest::post()
        .uri("/api/v1/topics/rust/posts")
        .set_json(json!({"title": "Lifetimes", "content": "why 'a?"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post: Value = test::read_body_json(resp).await;
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["topic_id"], "rust");
    assert_eq!(post["votes"], 0);

    // create comment
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/rust/posts/{post_id}/comments"))
        .set_json(json!({"content": "read the book"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let comment: Value = test::read_body_json(resp).await;
    let comment_id = comment["id"].as_str().unwrap().to_string();

    // topic get expands posts by default
    let req = test::TestRequest::get().uri("/api/v1/topics/rust").to_request();
    let topic: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(topic["posts"].as_array().unwrap().len(), 1);

    // explicit empty expansion
    let req = test::TestRequest::get().uri("/api/v1/topics/rust?expand=").to_request();
    let topic: Value = test::call_and_read_body_json(&app, req).await;
    assert!(topic["posts"].as_array().unwrap().is_empty());

    // post get expands comments by default
    let req = test::TestRequest::get().uri(&format!("/api/v1/topics/rust/posts/{post_id}")).to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["comments"][0]["content"], "read the book");

    // list posts / comments
    let req = test::TestRequest::get().uri("/api/v1/topics/rust/posts").to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);
    let req = test::TestRequest::get().uri(&format!("/api/v1/topics/rust/posts/{post_id}/comments")).to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments.as_array().unwrap().len(), 1);

    // partial update keeps the title
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/topics/rust/posts/{post_id}"))
        .set_json(json!({"content": "edited"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let post: Value = test::read_body_json(resp).await;
    assert_eq!(post["title"], "Lifetimes");
    assert_eq!(post["content"], "edited");

    // PUT is accepted too
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/topics/rust/posts/{post_id}/comments/{comment_id}"))
        .set_json(json!({"content": "read the book twice"}))
        .to_request();
    let comment: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comment["content"], "read the book twice");

    // votes
    for _ in 0..3 {
        let req = test::TestRequest::post().uri(&format!("/api/v1/topics/rust/posts/{post_id}/upvote")).to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/topics/rust/posts/{post_id}/comments/{comment_id}/downvote"))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::get().uri(&format!("/api/v1/topics/rust/posts/{post_id}?expand=comments")).to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["votes"], 3);
    assert_eq!(post["comments"][0]["votes"], -1);

    // comments have nothing to expand
    let uri = format!("/api/v1/topics/rust/posts/{post_id}/comments/{comment_id}");
    let req = test::TestRequest::get().uri(&format!("{uri}?expand=posts")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::get().uri(&format!("{uri}?expand=")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // delete topic cascades
    let req = test::TestRequest::delete().uri("/api/v1/topics/rust").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let deleted: Value = test::read_body_json(resp).await;
    assert!(!deleted["deleted_at"].is_null());

    let req = test::TestRequest::get().uri(&format!("/api/v1/topics/rust/posts/{post_id}/comments/{comment_id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_error_status_mapping() {
    let app = test::init_service(App::new().app_data(state().await).configure(config)).await;

    let req = test::TestRequest::post().uri("/api/v1/topics").set_json(json!({"id": "rust"})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    // duplicate topic -> 409
    let req = test::TestRequest::post().uri("/api/v1/topics").set_json(json!({"id": "rust"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "conflict");

    // blank id -> 400
    let req = test::TestRequest::post().uri("/api/v1/topics").set_json(json!({"id": " "})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // unbindable body -> 400
    let req = test::TestRequest::post().uri("/api/v1/topics/rust/posts").set_json(json!({"title": 5})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // missing topic -> 404 on get, create and vote
    let req = test::TestRequest::get().uri("/api/v1/topics/go").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::post()
        .uri("/api/v1/topics/go/posts")
        .set_json(json!({"title": "t", "content": "c"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::post().uri("/api/v1/topics/rust/posts/nope/upvote").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // unknown relation -> 400
    let req = test::TestRequest::get().uri("/api/v1/topics/rust?expand=authors").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // votes are not patchable -> 400
    let req = test::TestRequest::post()
        .uri("/api/v1/topics/rust/posts")
        .set_json(json!({"title": "t", "content": "c"}))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/topics/rust/posts/{}", post["id"].as_str().unwrap()))
        .set_json(json!({"votes": 100}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn test_same_post_id_under_different_topics() {
    let app = test::init_service(App::new().app_data(state().await).configure(config)).await;
    for topic in ["t1", "t2"] {
        let req = test::TestRequest::post().uri("/api/v1/topics").set_json(json!({"id": topic})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }
    let req = test::TestRequest::post()
        .uri("/api/v1/topics/t1/posts")
        .set_json(json!({"title": "only in t1", "content": ""}))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = post["id"].as_str().unwrap();

    let req = test::TestRequest::get().uri(&format!("/api/v1/topics/t2/posts/{post_id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::get().uri("/api/v1/topics/t2/posts").to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    assert!(posts.as_array().unwrap().is_empty());
}
