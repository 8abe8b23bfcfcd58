pub mod chat;
pub mod courses;
pub mod grades;
pub mod preferences;
pub mod status;

#[cfg(test)]
pub(crate) async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
