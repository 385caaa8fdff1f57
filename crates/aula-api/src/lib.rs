//! JSON REST API for Aula.
//!
//! Exposes an axum [`Router`] backed by an [`Allocator`] over any
//! [`SlotStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", aula_api::api_router(allocator.clone()))
//! ```

pub mod availability;
pub mod error;
pub mod etag;
pub mod groups;
pub mod registrations;
pub mod subjects;
pub mod teachers;
pub mod users;

use aula_core::{Allocator, store::SlotStore};
use axum::{
  Router,
  routing::{get, post, put},
};

pub use error::ApiError;

/// Build a fully-materialised API router for `allocator`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(allocator: Allocator<S>) -> Router<()>
where
  S: SlotStore + 'static,
{
  Router::new()
    // Availability
    .route(
      "/programs/{program}/availability",
      get(availability::handler::<S>),
    )
    // Teachers
    .route("/teachers", get(teachers::list::<S>))
    .route("/teachers/{id}", get(teachers::get_one::<S>))
    .route("/teachers/{id}/assignments", put(teachers::replace::<S>))
    .route("/registrations", post(registrations::create::<S>))
    // Catalogs
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .route("/subjects", post(subjects::create::<S>))
    .route("/subjects/{id}", get(subjects::get_one::<S>))
    .route("/groups", post(groups::create::<S>))
    .route("/groups/{id}", get(groups::get_one::<S>))
    .route("/groups/{id}/teachers", get(groups::roster::<S>))
    .with_state(allocator)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use aula_core::catalog::{
    Group, NewGroup, NewSubject, NewUser, Role, Shift, Subject,
  };
  use aula_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  struct Fixture {
    allocator: Allocator<SqliteStore>,
    s1:        Subject,
    s2:        Subject,
    g1:        Group,
    g2:        Group,
    t1:        Uuid,
    t2:        Uuid,
  }

  async fn fixture() -> Fixture {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());

    let mut subjects = Vec::new();
    for name in ["S1", "S2"] {
      subjects.push(
        store
          .add_subject(NewSubject {
            program_id: "P1".into(),
            name:       name.into(),
            term:       1,
            active:     true,
          })
          .await
          .unwrap(),
      );
    }
    let mut groups = Vec::new();
    for name in ["G1", "G2"] {
      groups.push(
        store
          .add_group(NewGroup {
            program_tag: "P1".into(),
            name:        name.into(),
            shift:       Shift::Afternoon,
            cycle:       "2024-3".into(),
            active:      true,
          })
          .await
          .unwrap(),
      );
    }
    let mut teachers = Vec::new();
    for name in ["Ana", "Beto"] {
      teachers.push(
        store
          .add_user(NewUser {
            display_name: name.into(),
            email:        format!("{name}@uni.example"),
            role:         Role::Teacher,
          })
          .await
          .unwrap()
          .user_id,
      );
    }

    let [s1, s2] = <[Subject; 2]>::try_from(subjects).unwrap();
    let [g1, g2] = <[Group; 2]>::try_from(groups).unwrap();
    Fixture {
      allocator: Allocator::new(store),
      s1,
      s2,
      g1,
      g2,
      t1: teachers[0],
      t2: teachers[1],
    }
  }

  async fn send(
    allocator: &Allocator<SqliteStore>,
    method: &str,
    uri: &str,
    headers: Vec<(header::HeaderName, &str)>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(allocator.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn claim(program: &str, subject: &Subject, groups: &[&Group]) -> Value {
    json!({
      "program_id": program,
      "subject_id": subject.subject_id,
      "group_ids": groups.iter().map(|g| g.group_id).collect::<Vec<_>>(),
    })
  }

  fn subject_names(v: &Value) -> Vec<String> {
    v.as_array()
      .unwrap()
      .iter()
      .map(|a| a["subject"]["name"].as_str().unwrap().to_owned())
      .collect()
  }

  // ── Availability ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn availability_lists_every_free_group() {
    let f = fixture().await;
    let resp = send(&f.allocator, "GET", "/programs/P1/availability", vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(subject_names(&v), ["S1", "S2"]);
    assert_eq!(v[0]["free_groups"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn blank_program_is_a_bad_request() {
    let f = fixture().await;
    let resp = send(&f.allocator, "GET", "/programs/%20/availability", vec![], None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["kind"], "validation");
  }

  // ── Replace ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn replace_returns_teacher_with_etag_and_hides_claimed_subject() {
    let f = fixture().await;
    let uri = format!("/teachers/{}/assignments", f.t1);
    let body = json!({ "assignments": [claim("P1", &f.s1, &[&f.g1, &f.g2])] });
    let resp = send(&f.allocator, "PUT", &uri, vec![], Some(body)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::ETAG).unwrap(), "\"r1\"");
    let teacher = json_body(resp).await;
    assert_eq!(teacher["revision"], 1);
    assert_eq!(teacher["assignments"].as_array().unwrap().len(), 1);

    let resp = send(&f.allocator, "GET", "/programs/P1/availability", vec![], None).await;
    assert_eq!(subject_names(&json_body(resp).await), ["S2"]);
  }

  #[tokio::test]
  async fn claiming_a_held_slot_is_a_conflict() {
    let f = fixture().await;
    let body = json!({ "assignments": [claim("P1", &f.s2, &[&f.g1])] });
    let first = send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", f.t1),
      vec![],
      Some(body.clone()),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", f.t2),
      vec![],
      Some(body),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(second).await["kind"], "conflict");
  }

  #[tokio::test]
  async fn if_match_guards_the_revision() {
    let f = fixture().await;
    let uri = format!("/teachers/{}/assignments", f.t1);
    let body = json!({ "assignments": [claim("P1", &f.s1, &[&f.g1])] });

    let ok = send(
      &f.allocator,
      "PUT",
      &uri,
      vec![(header::IF_MATCH, "\"r0\"")],
      Some(body),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let stale = send(
      &f.allocator,
      "PUT",
      &uri,
      vec![(header::IF_MATCH, "\"r0\"")],
      Some(json!({ "assignments": [] })),
    )
    .await;
    assert_eq!(stale.status(), StatusCode::PRECONDITION_FAILED);

    let resp = send(&f.allocator, "GET", &format!("/teachers/{}", f.t1), vec![], None).await;
    assert_eq!(resp.headers().get(header::ETAG).unwrap(), "\"r1\"");
  }

  #[tokio::test]
  async fn malformed_if_match_is_a_bad_request() {
    let f = fixture().await;
    let resp = send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", f.t1),
      vec![(header::IF_MATCH, "\"nope\"")],
      Some(json!({ "assignments": [] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn student_target_is_unprocessable() {
    let f = fixture().await;
    let student = f
      .allocator
      .store()
      .add_user(NewUser {
        display_name: "Eva".into(),
        email:        "eva@uni.example".into(),
        role:         Role::Student,
      })
      .await
      .unwrap();
    let resp = send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", student.user_id),
      vec![],
      Some(json!({ "assignments": [] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[tokio::test]
  async fn unknown_teacher_is_not_found() {
    let f = fixture().await;
    let id = Uuid::new_v4();
    let put = send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{id}/assignments"),
      vec![],
      Some(json!({ "assignments": [] })),
    )
    .await;
    assert_eq!(put.status(), StatusCode::NOT_FOUND);

    let get = send(&f.allocator, "GET", &format!("/teachers/{id}"), vec![], None).await;
    assert_eq!(get.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn duplicate_subject_entries_are_a_bad_request() {
    let f = fixture().await;
    let body = json!({
      "assignments": [claim("P1", &f.s1, &[&f.g1]), claim("P1", &f.s1, &[&f.g2])]
    });
    let resp = send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", f.t1),
      vec![],
      Some(body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Registration ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn registration_creates_a_teacher() {
    let f = fixture().await;
    let body = json!({
      "display_name": "Carla",
      "email": "carla@uni.example",
      "program_id": "P1",
      "subject_id": f.s2.subject_id,
      "group_ids": [f.g2.group_id],
    });
    let resp = send(&f.allocator, "POST", "/registrations", vec![], Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.headers().contains_key(header::ETAG));

    let teacher = json_body(resp).await;
    let resp = send(&f.allocator, "GET", "/teachers", vec![], None).await;
    let names: Vec<String> = json_body(resp)
      .await
      .as_array()
      .unwrap()
      .iter()
      .map(|t| t["display_name"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(names, ["Ana", "Beto", "Carla"]);
    assert_eq!(teacher["assignments"][0]["group_ids"][0], json!(f.g2.group_id));
  }

  #[tokio::test]
  async fn undecodable_registration_is_a_json_bad_request() {
    let f = fixture().await;
    let body = json!({
      "display_name": "Dani",
      "email": "dani@uni.example",
      "program_id": "P1",
      "subject_id": "not-a-uuid",
      "group_ids": [f.g1.group_id],
    });
    let resp = send(&f.allocator, "POST", "/registrations", vec![], Some(body)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["kind"], "validation");
  }

  #[tokio::test]
  async fn non_json_body_is_a_json_bad_request() {
    let f = fixture().await;
    let req = Request::builder()
      .method("PUT")
      .uri(format!("/teachers/{}/assignments", f.t1))
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{ not json"))
      .unwrap();
    let resp = api_router(f.allocator.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["kind"], "validation");
    assert!(v["error"].is_string());
  }

  #[tokio::test]
  async fn registration_for_a_held_slot_creates_no_account() {
    let f = fixture().await;
    send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", f.t1),
      vec![],
      Some(json!({ "assignments": [claim("P1", &f.s1, &[&f.g1])] })),
    )
    .await;

    let body = json!({
      "display_name": "Dani",
      "email": "dani@uni.example",
      "program_id": "P1",
      "subject_id": f.s1.subject_id,
      "group_ids": [f.g1.group_id],
    });
    let resp = send(&f.allocator, "POST", "/registrations", vec![], Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&f.allocator, "GET", "/teachers", vec![], None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);
  }

  // ── Catalogs ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn catalog_entries_can_be_created_and_fetched() {
    let f = fixture().await;
    let resp = send(
      &f.allocator,
      "POST",
      "/groups",
      vec![],
      Some(json!({ "name": "Old", "shift": "evening", "cycle": "2019-1" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let group = json_body(resp).await;
    assert_eq!(group["program_tag"], "");

    let id = group["group_id"].as_str().unwrap();
    let resp = send(&f.allocator, "GET", &format!("/groups/{id}"), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
      &f.allocator,
      "POST",
      "/subjects",
      vec![],
      Some(json!({ "program_id": " P1 ", "name": "Networks", "term": 4 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let subject = json_body(resp).await;
    assert_eq!(subject["program_id"], "P1");
    assert_eq!(subject["active"], true);

    let resp = send(
      &f.allocator,
      "GET",
      &format!("/subjects/{}", Uuid::new_v4()),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn users_round_trip() {
    let f = fixture().await;
    let resp = send(
      &f.allocator,
      "POST",
      "/users",
      vec![],
      Some(json!({ "display_name": "Root", "email": "root@uni.example", "role": "admin" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = json_body(resp).await["user_id"].as_str().unwrap().to_owned();

    let resp = send(&f.allocator, "GET", &format!("/users/{id}"), vec![], None).await;
    assert_eq!(json_body(resp).await["role"], "admin");
  }

  #[tokio::test]
  async fn blank_subject_program_is_rejected() {
    let f = fixture().await;
    let resp = send(
      &f.allocator,
      "POST",
      "/subjects",
      vec![],
      Some(json!({ "program_id": "  ", "name": "Nowhere", "term": 1 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Roster ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn roster_lists_teachers_of_a_group() {
    let f = fixture().await;
    send(
      &f.allocator,
      "PUT",
      &format!("/teachers/{}/assignments", f.t1),
      vec![],
      Some(json!({ "assignments": [claim("P1", &f.s1, &[&f.g1])] })),
    )
    .await;

    let resp = send(
      &f.allocator,
      "GET",
      &format!("/groups/{}/teachers?program_id=P1", f.g1.group_id),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let roster = json_body(resp).await;
    assert_eq!(roster.as_array().unwrap().len(), 1);
    assert_eq!(roster[0]["user_id"], json!(f.t1));

    let resp = send(
      &f.allocator,
      "GET",
      &format!("/groups/{}/teachers?program_id=P2", f.g1.group_id),
      vec![],
      None,
    )
    .await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn roster_of_unknown_group_is_not_found() {
    let f = fixture().await;
    let resp = send(
      &f.allocator,
      "GET",
      &format!("/groups/{}/teachers", Uuid::new_v4()),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn malformed_roster_query_is_a_json_bad_request() {
    let f = fixture().await;
    let resp = send(
      &f.allocator,
      "GET",
      &format!("/groups/{}/teachers?program_id=P1&program_id=P2", f.g1.group_id),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["kind"], "validation");
  }
}
