//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all movie-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 5;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /movies
    pub async fn list_movies(&self) -> Response {
        self.client
            .get(format!("{}/movies", self.base_url))
            .send()
            .await
            .expect("List movies request failed")
    }

    /// POST /movies
    pub async fn create_movie(&self, body: &Value) -> Response {
        self.client
            .post(format!("{}/movies", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Create movie request failed")
    }

    /// GET /movies/{id}
    pub async fn get_movie(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/movies/{}", self.base_url, id))
            .send()
            .await
            .expect("Get movie request failed")
    }

    /// DELETE /movies/{id}
    pub async fn delete_movie(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/movies/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete movie request failed")
    }
}
