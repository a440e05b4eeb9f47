//! TXT record lookups over a DNS-over-HTTPS JSON API.
//!
//! A name `example.com` resolves if a TXT query for `example.com.` returns an answer whose data
//! matches [`Patterns::txt`][crate::config::Patterns::txt], by default `datkey=<key>`:
//!
//! ```text
//! example.com. 3600 IN TXT "datkey=40a7f6b6147ae695bcbcff432f684c7bb5291ea339c28c1755896cdeb80bd2f9"
//! ```
//!
//! Providers may return several matching answers in any order, so the greatest key wins. That
//! keeps the result stable for the same answer set.

use crate::config::DohProvider;
use crate::error::Error;
use crate::events::{Event, EventBus, Method};
use crate::probe::{capture_key, clamp_ttl, Resolved};
use crate::transport::{DynTransport, Request};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;

pub struct DnsOverHttps<'a> {
    pub transport: &'a DynTransport,
    pub provider: &'a DohProvider,
    pub txt_pattern: &'a Regex,
    pub events: &'a EventBus,
}

impl DnsOverHttps<'_> {
    /// Look `name` up, publishing a [`Method::DnsOverHttps`] event with the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFQDN`] for a dotless name (no request is made), [`Error::Transport`]
    /// or [`Error::HttpStatus`] if the provider can't be queried, [`Error::InvalidJSON`] for an
    /// unparseable answer and [`Error::RecordNotFound`] if no TXT answer matches.
    pub async fn probe(&self, name: &str) -> Result<Resolved, Error> {
        let result = self.lookup(name).await;
        match &result {
            Ok(resolved) => {
                tracing::info!(
                    "resolved \"{name}\" via DNS-over-HTTPS ({})",
                    self.provider.host
                );
                self.events.emit(Event::Resolved {
                    method: Method::DnsOverHttps,
                    name: name.to_string(),
                    key: resolved.key.clone(),
                });
            }
            Err(err) => self.events.emit(Event::Failed {
                method: Method::DnsOverHttps,
                name: name.to_string(),
                err: err.to_string(),
            }),
        }
        result
    }

    async fn lookup(&self, name: &str) -> Result<Resolved, Error> {
        if !name.contains('.') {
            return Err(Error::NotFQDN(name.to_string()));
        }
        let fqdn = if name.ends_with('.') {
            Cow::Borrowed(name)
        } else {
            Cow::Owned(format!("{name}."))
        };
        let query: String = url::form_urlencoded::byte_serialize(fqdn.as_bytes()).collect();
        let request = Request::new(
            &self.provider.host,
            self.provider.port,
            format!("{}?name={query}&type=TXT", self.provider.path),
        )
        .header("Accept", "application/dns-json");

        let response = self.transport.get(&request).await?;
        if response.status != 200 {
            return Err(Error::HttpStatus(response.status));
        }
        select_answer(name, &response.body, self.txt_pattern)
    }
}

#[derive(Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer")]
    answer: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct DohAnswer {
    data: String,
    #[serde(rename = "TTL")]
    ttl: Option<Value>,
}

/// Pick the greatest matching key out of a DNS JSON response body.
fn select_answer(name: &str, body: &str, txt_pattern: &Regex) -> Result<Resolved, Error> {
    let response: DohResponse = serde_json::from_str(body)?;
    let mut candidates: Vec<Resolved> = response
        .answer
        .unwrap_or_default()
        .into_iter()
        .filter_map(|answer| serde_json::from_value::<DohAnswer>(answer).ok())
        .filter_map(|answer| {
            let key = capture_key(txt_pattern, &answer.data)?;
            // Numbers beyond i64 read as missing, as an overlong `TTL=` line does.
            let ttl = answer.ttl.as_ref().and_then(Value::as_i64);
            Some(Resolved {
                key,
                ttl: clamp_ttl(ttl),
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.key.cmp(&a.key));
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::RecordNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::probe::{DEFAULT_TTL, MAX_TTL};
    use serde_json::json;

    const KEY_A: &str = "1111111111111111111111111111111111111111111111111111111111111111";
    const KEY_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const KEY_C: &str = "5555555555555555555555555555555555555555555555555555555555555555";

    fn select(body: &Value) -> Result<Resolved, Error> {
        let txt = Config::default().patterns().unwrap().txt;
        select_answer("example.com", &body.to_string(), &txt)
    }

    fn answer(data: &str, ttl: Value) -> Value {
        json!({ "name": "example.com.", "type": 16, "TTL": ttl, "data": data })
    }

    #[test]
    fn picks_matching_answer() {
        let body = json!({
            "Status": 0,
            "Answer": [
                answer("\"v=spf1 -all\"", json!(300)),
                answer(&format!("\"datkey={KEY_A}\""), json!(300)),
            ]
        });
        assert_eq!(
            select(&body).unwrap(),
            Resolved {
                key: KEY_A.to_string(),
                ttl: 300
            }
        );
    }

    #[test]
    fn unquoted_and_uppercase_data_matches() {
        let body = json!({ "Answer": [answer(&format!("DATKEY={}", KEY_B.to_uppercase()), json!(60))] });
        assert_eq!(select(&body).unwrap().key, KEY_B);
    }

    #[test]
    fn greatest_key_wins_regardless_of_order() {
        let keys = [KEY_A, KEY_B, KEY_C];
        let orders = [[0, 1, 2], [2, 1, 0], [1, 0, 2], [2, 0, 1]];
        for order in orders {
            let answers: Vec<Value> = order
                .iter()
                .map(|&i| answer(&format!("datkey={}", keys[i]), json!(i * 100)))
                .collect();
            let resolved = select(&json!({ "Answer": answers })).unwrap();
            assert_eq!(resolved.key, KEY_B);
            assert_eq!(resolved.ttl, 100);
        }
    }

    #[test]
    fn malformed_answers_are_skipped() {
        let body = json!({
            "Answer": [
                "not an object",
                { "TTL": 60 },
                { "data": 42, "TTL": 60 },
                answer("datkey=tooshort", json!(60)),
                answer(&format!("datkey={KEY_C}"), json!(60)),
            ]
        });
        assert_eq!(select(&body).unwrap().key, KEY_C);
    }

    #[test]
    fn ttl_policy() {
        let data = format!("datkey={KEY_A}");
        let ttl_of = |ttl: Value| select(&json!({ "Answer": [answer(&data, ttl)] })).unwrap().ttl;
        assert_eq!(ttl_of(json!(100_000_000)), MAX_TTL);
        assert_eq!(ttl_of(json!(9_007_199_254_740_991_i64)), MAX_TTL);
        assert_eq!(ttl_of(json!(9_007_199_254_740_992_i64)), DEFAULT_TTL);
        assert_eq!(ttl_of(json!(u64::MAX)), DEFAULT_TTL);
        assert_eq!(ttl_of(json!(-5)), DEFAULT_TTL);
        assert_eq!(ttl_of(json!("3600x")), DEFAULT_TTL);
        assert_eq!(ttl_of(json!(12.5)), DEFAULT_TTL);
        assert_eq!(ttl_of(Value::Null), DEFAULT_TTL);
        assert_eq!(ttl_of(json!(0)), 0);
    }

    #[test]
    fn no_answer_is_not_found() {
        assert!(matches!(
            select(&json!({ "Status": 3 })),
            Err(Error::RecordNotFound(_))
        ));
        assert!(matches!(
            select(&json!({ "Answer": [answer("\"v=spf1 -all\"", json!(60))] })),
            Err(Error::RecordNotFound(_))
        ));
    }

    #[test]
    fn non_json_body_is_invalid() {
        let txt = Config::default().patterns().unwrap().txt;
        assert!(matches!(
            select_answer("example.com", "<html>", &txt),
            Err(Error::InvalidJSON(_))
        ));
    }
}
