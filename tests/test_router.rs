use switchboard::http::request::{HttpRequest, Method};
use switchboard::http::response::HttpResponse;
use switchboard::server::router::{pathname, RouteTable};
use switchboard::HttpServer;

async fn reply_with_path(req: HttpRequest, resp: HttpResponse) {
    let _ = resp.send(req.path());
}

#[test]
fn test_pathname_origin_form() {
    assert_eq!(pathname("/users").as_deref(), Some("/users"));
    assert_eq!(pathname("/users?id=1&x=2").as_deref(), Some("/users"));
    assert_eq!(pathname("/users#frag").as_deref(), Some("/users"));
    assert_eq!(pathname("/").as_deref(), Some("/"));
}

#[test]
fn test_pathname_is_not_normalized() {
    assert_eq!(pathname("/users/").as_deref(), Some("/users/"));
    assert_eq!(pathname("/a/../users").as_deref(), Some("/a/../users"));
    assert_eq!(pathname("//users").as_deref(), Some("//users"));
}

#[test]
fn test_pathname_absolute_form() {
    assert_eq!(pathname("http://example.com/users?id=1").as_deref(), Some("/users"));
    assert_eq!(pathname("http://example.com").as_deref(), Some("/"));
}

#[test]
fn test_pathname_unparseable() {
    assert_eq!(pathname("*"), None);
    assert_eq!(pathname("users"), None);
    assert_eq!(pathname(""), None);
}

#[test]
fn test_route_table_lookup() {
    let mut routes = RouteTable::new();
    assert!(routes.is_empty());

    routes.insert(Method::POST, "/users", reply_with_path);

    assert_eq!(routes.len(), 1);
    assert!(routes.contains("/users"));
    assert!(routes.lookup("/users").is_some());
    assert!(routes.lookup("/users/").is_none());
    assert!(routes.lookup("/Users").is_none());
}

#[test]
fn test_route_table_method_does_not_split_paths() {
    let mut routes = RouteTable::new();
    routes.insert(Method::POST, "/users", reply_with_path);
    routes.insert(Method::GET, "/users", reply_with_path);

    assert_eq!(routes.len(), 1);
}

#[tokio::test]
async fn test_route_table_last_registration_wins() {
    let mut routes = RouteTable::new();
    routes.insert(Method::GET, "/users", |_req, resp: HttpResponse| async move {
        let _ = resp.send("first");
    });
    routes.insert(Method::GET, "/users", |_req, resp: HttpResponse| async move {
        let _ = resp.send("second");
    });

    let handler = routes.lookup("/users").unwrap();
    let (resp, rx) = HttpResponse::channel();
    handler(HttpRequest::new(Method::GET, "/users", ""), resp).await;

    let response = rx.await.unwrap();
    assert_eq!(response.body, br#""second""#.to_vec());
}

#[test]
fn test_server_registration_overwrites_by_path() {
    let mut server = HttpServer::new();
    server
        .post("/users", reply_with_path)
        .get("/users", reply_with_path)
        .get("/health", reply_with_path);

    assert_eq!(server.routes().len(), 2);
    assert!(server.routes().contains("/health"));
}
