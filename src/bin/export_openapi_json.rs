use luno_server::api::openapi_json;

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or("openapi.json".to_string());
    std::fs::write(path, openapi_json()).unwrap();
}
