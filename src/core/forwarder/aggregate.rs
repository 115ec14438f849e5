//! Cross-node aggregation for `/tags`, `/ps`, and `/pull` (spec §4.7)

use crate::core::pool::PoolManager;
use crate::core::registry::Registry;
use crate::utils::error::{ProxyError, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const TAGS_TIMEOUT: Duration = Duration::from_secs(30);
const PULL_TIMEOUT: Duration = Duration::from_secs(300);
const PULL_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(flatten)]
    pub rest: Value,
}

/// `GET /tags`: fan out to every active node's `/api/tags`, dedup by model
/// name keeping the entry with the lexicographically greatest `modified_at`,
/// return sorted by name.
pub async fn tags(client: &Client, pool: &PoolManager) -> Result<Vec<TagEntry>> {
    let addresses = pool.active_addresses();
    if addresses.is_empty() {
        return Err(ProxyError::NoHealthyNodes);
    }

    let responses = futures::future::join_all(addresses.iter().map(|addr| {
        let client = client.clone();
        let addr = addr.clone();
        async move { fetch_tags(&client, &addr).await }
    }))
    .await;

    let mut by_name: std::collections::HashMap<String, TagEntry> = std::collections::HashMap::new();
    for entries in responses.into_iter().flatten() {
        for entry in entries {
            by_name
                .entry(entry.name.clone())
                .and_modify(|existing| {
                    if entry.modified_at > existing.modified_at {
                        *existing = entry.clone();
                    }
                })
                .or_insert(entry);
        }
    }

    let mut merged: Vec<TagEntry> = by_name.into_values().collect();
    merged.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(merged)
}

async fn fetch_tags(client: &Client, addr: &str) -> Option<Vec<TagEntry>> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(default)]
        models: Vec<TagEntry>,
    }

    let url = format!("{addr}/api/tags");
    let resp = client.get(&url).timeout(TAGS_TIMEOUT).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json::<Response>().await.ok().map(|r| r.models)
}

#[derive(Debug, Clone, Serialize)]
pub struct PsEntry {
    pub model: String,
    pub db_nodes: Vec<String>,
    pub running_on: Vec<String>,
}

/// `GET /ps`: aggregate each active node's `/api/ps` running-model list,
/// joined against the registry's persisted `available_models` per node.
pub async fn ps(client: &Client, pool: &PoolManager, registry: &Registry) -> Result<Vec<PsEntry>> {
    let active_nodes = pool.active_nodes();
    if active_nodes.is_empty() {
        return Err(ProxyError::NoHealthyNodes);
    }

    let registry_nodes = registry.list_all().await?;
    let mut db_nodes_by_model: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();
    for node in &registry_nodes {
        for model in node.models() {
            db_nodes_by_model.entry(model).or_default().push(node.address());
        }
    }

    let running = futures::future::join_all(active_nodes.iter().map(|node| {
        let client = client.clone();
        let addr = node.address.clone();
        async move { (addr.clone(), fetch_ps(&client, &addr).await) }
    }))
    .await;

    let mut running_on_by_model: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();
    for (addr, models) in running {
        for model in models.into_iter().flatten() {
            running_on_by_model.entry(model).or_default().push(addr.clone());
        }
    }

    let mut models: std::collections::HashSet<String> = db_nodes_by_model.keys().cloned().collect();
    models.extend(running_on_by_model.keys().cloned());

    let mut entries: Vec<PsEntry> = models
        .into_iter()
        .map(|model| PsEntry {
            db_nodes: db_nodes_by_model.get(&model).cloned().unwrap_or_default(),
            running_on: running_on_by_model.get(&model).cloned().unwrap_or_default(),
            model,
        })
        .collect();
    entries.sort_by(|a, b| a.model.cmp(&b.model));
    Ok(entries)
}

async fn fetch_ps(client: &Client, addr: &str) -> Option<Vec<String>> {
    #[derive(Deserialize)]
    struct RunningModel {
        name: String,
    }
    #[derive(Deserialize)]
    struct Response {
        #[serde(default)]
        models: Vec<RunningModel>,
    }

    let url = format!("{addr}/api/ps");
    let resp = client.get(&url).timeout(TAGS_TIMEOUT).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json::<Response>()
        .await
        .ok()
        .map(|r| r.models.into_iter().map(|m| m.name).collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct PullResult {
    pub node_id: i32,
    pub node_name: String,
    pub node_address: String,
    pub status: String,
    pub message: String,
}

/// `POST /pull`: dispatch `/api/pull` to one node (`node_id` given) or every
/// active node, bounded to `PULL_CONCURRENCY` in flight at once.
pub async fn pull(
    client: &Client,
    pool: &PoolManager,
    registry: &Registry,
    model: &str,
    node_id: Option<i32>,
    stream: bool,
    insecure: bool,
) -> Result<Vec<PullResult>> {
    let targets = match node_id {
        Some(id) => {
            let node = registry
                .get(id)
                .await?
                .ok_or_else(|| ProxyError::not_found(format!("node {id} not found")))?;
            vec![node]
        }
        None => {
            let active_ids: std::collections::HashSet<i32> =
                pool.active_nodes().into_iter().map(|n| n.id).collect();
            let all = registry.list_all().await?;
            all.into_iter().filter(|n| active_ids.contains(&n.id)).collect()
        }
    };

    if targets.is_empty() {
        return Err(ProxyError::NoHealthyNodes);
    }

    let results = stream::iter(targets.into_iter().map(|node| {
        let client = client.clone();
        let model = model.to_string();
        async move { dispatch_pull(&client, node, &model, stream, insecure).await }
    }))
    .buffer_unordered(PULL_CONCURRENCY)
    .collect::<Vec<_>>()
    .await;

    Ok(results)
}

async fn dispatch_pull(
    client: &Client,
    node: crate::storage::database::entities::node::Model,
    model: &str,
    stream: bool,
    insecure: bool,
) -> PullResult {
    let address = node.address();
    let url = format!("{address}/api/pull");
    let body = serde_json::json!({ "model": model, "stream": stream, "insecure": insecure });

    let outcome = client.post(&url).json(&body).timeout(PULL_TIMEOUT).send().await;

    match outcome {
        Ok(resp) if resp.status().is_success() => PullResult {
            node_id: node.id,
            node_name: node.name,
            node_address: address,
            status: "ok".to_string(),
            message: format!("pull dispatched, upstream status {}", resp.status()),
        },
        Ok(resp) => PullResult {
            node_id: node.id,
            node_name: node.name,
            node_address: address,
            status: "error".to_string(),
            message: format!("upstream returned status {}", resp.status()),
        },
        Err(err) => PullResult {
            node_id: node.id,
            node_name: node.name,
            node_address: address,
            status: "error".to_string(),
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_entry_dedup_keeps_greatest_modified_at() {
        let mut by_name: std::collections::HashMap<String, TagEntry> = std::collections::HashMap::new();
        let older = TagEntry {
            name: "llama3".to_string(),
            modified_at: "2026-01-01T00:00:00Z".to_string(),
            rest: Value::Null,
        };
        let newer = TagEntry {
            name: "llama3".to_string(),
            modified_at: "2026-06-01T00:00:00Z".to_string(),
            rest: Value::Null,
        };
        by_name.insert(older.name.clone(), older);
        by_name
            .entry(newer.name.clone())
            .and_modify(|existing| {
                if newer.modified_at > existing.modified_at {
                    *existing = newer.clone();
                }
            })
            .or_insert(newer);
        assert_eq!(by_name["llama3"].modified_at, "2026-06-01T00:00:00Z");
    }
}
