#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use brrtmock::{MockRequest, MockResponse, Outcome};
use common::fixtures::dispatcher;
use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const REQUESTS_PER_THREAD: usize = 200;

#[test]
fn test_shared_dispatcher_answers_consistently() {
    let dispatcher = Arc::new(dispatcher());
    let expected = dispatcher.handle(&MockRequest::new(Method::GET, "/pets"));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            let expected = expected.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..REQUESTS_PER_THREAD {
                    match (t + i) % 3 {
                        0 => {
                            let outcome = dispatcher.handle(&MockRequest::new(Method::GET, "/pets"));
                            assert_eq!(outcome, expected);
                        }
                        1 => {
                            let uri = format!("/pets?limit={}", 101 + i);
                            let outcome = dispatcher.handle(&MockRequest::new(Method::GET, &uri));
                            assert_eq!(outcome.status(), 400);
                        }
                        _ => {
                            let outcome = dispatcher.handle(&MockRequest::new(Method::PUT, "/pets"));
                            assert!(matches!(outcome, Outcome::MethodNotAllowed(_)));
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_handlers_run_concurrently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = dispatcher();
    let counter = Arc::clone(&calls);
    dispatcher
        .register_handler("getPet", move |_req, route| {
            counter.fetch_add(1, Ordering::Relaxed);
            let id: i64 = route.get_path_param("petId").unwrap().parse().unwrap();
            MockResponse::json(200, json!({ "id": id, "name": "Shared" }))
        })
        .unwrap();
    let dispatcher = Arc::new(dispatcher);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for i in 0..REQUESTS_PER_THREAD {
                    let id = t * REQUESTS_PER_THREAD + i;
                    let request = MockRequest::new(Method::GET, &format!("/pets/{id}"));
                    match dispatcher.handle(&request) {
                        Outcome::Handled(response) => assert_eq!(response.body["id"], json!(id)),
                        other => panic!("unexpected outcome {other:?}"),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(calls.load(Ordering::Relaxed), THREADS * REQUESTS_PER_THREAD);
}
