// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Mock HTTP servers standing in for the index and APR services.

use serde_json::{json, Value};
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Mock GraphQL index answering `POST /graphql`.
pub struct IndexMockServer {
    server: MockServer,
}

impl IndexMockServer {
    pub async fn new() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("{}/graphql", self.server.uri())).expect("mock server uri is valid")
    }

    /// Answer every query with `data`.
    pub async fn respond_with_data(&self, data: Value) {
        self.respond(ResponseTemplate::new(200).set_body_json(json!({ "data": data }))).await;
    }

    /// Answer every query with GraphQL `errors` and no data.
    pub async fn respond_with_errors(&self, messages: &[&str]) {
        let errors: Vec<Value> = messages.iter().map(|m| json!({ "message": m })).collect();
        self.respond(ResponseTemplate::new(200).set_body_json(json!({ "errors": errors }))).await;
    }

    /// Answer every query with an HTTP `status`.
    pub async fn respond_with_status(&self, status: u16) {
        self.respond(ResponseTemplate::new(status)).await;
    }

    async fn respond(&self, response: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of the queries received so far.
    pub async fn received_queries(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| request.body_json::<Value>().ok())
            .collect()
    }
}

/// Index payload with one stake record per `(id, amount)`.
pub fn index_activity(user: &str, stakes: &[(&str, &str)]) -> Value {
    let stakes: Vec<Value> = stakes
        .iter()
        .map(|(id, amount)| json!({ "id": id, "user": user, "amount": amount, "lockPeriod": "30" }))
        .collect();
    json!({
        "stakes": stakes,
        "delegateds": [],
        "proposals": [],
        "upgradeProposals": [],
    })
}

/// Mock APR feed answering `GET /apr` with `{ "apr": <value> }`.
pub struct AprMockServer {
    server: MockServer,
}

impl AprMockServer {
    pub async fn new(apr: f64) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "apr": apr })))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("{}/apr", self.server.uri())).expect("mock server uri is valid")
    }
}
