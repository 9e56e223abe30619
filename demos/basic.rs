use apihelper_http::{RequestSession, SessionOptions};

fn main() -> anyhow::Result<()> {
    let base_url = std::env::var("APIHELPER_BASE_URL")?;
    let token = std::env::var("APIHELPER_TOKEN")?;

    let session = RequestSession::new(Some(&base_url))?
        .with_bearer(token)?
        .with_options(SessionOptions {
            timeout_ms: 10_000,
            ..SessionOptions::default()
        })?;

    let users = session.get("/v1/users").query([("page", "1")]).send()?;
    println!("{} {}", users.status, users.text());

    let created = session
        .post("/v1/users")
        .json(&serde_json::json!({ "name": "Kit" }))
        .send()?;
    println!("created after {} retries: {}", created.retries, created.text());

    Ok(())
}
