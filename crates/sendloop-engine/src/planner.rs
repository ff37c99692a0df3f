// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job creation: timezone resolution, input normalization, daily-cap fan-out.
//!
//! All of this happens once, at creation time. The schedule dispatcher only
//! ever sees normalized rows with a resolved UTC instant, an integer delay,
//! and a target list already capped to one day's worth of recipients.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use sendloop_config::model::DispatcherConfig;
use sendloop_core::{Channel, JobKind, SendloopError, TenantId};
use sendloop_storage::{NewJob, Store};
use serde::{Deserialize, Serialize};

/// One recipient of a scheduled job. `fields` carries per-row template
/// values for campaigns; bulk sends leave it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTarget {
    pub recipient: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl JobTarget {
    pub fn bulk(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// A request to schedule a deferred send, as received from a controller.
///
/// `local_time` is the caller's wall clock; offsets are in minutes with the
/// sign convention of JavaScript's `getTimezoneOffset` (UTC+3 is `-180`).
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub tenant_id: TenantId,
    pub channel: Channel,
    pub kind: JobKind,
    pub targets: Vec<JobTarget>,
    pub template: String,
    pub media_path: Option<String>,
    pub local_time: NaiveDateTime,
    pub caller_offset_minutes: i32,
    pub server_offset_minutes: i32,
    /// Unset or negative values fall back to the configured default.
    pub per_recipient_delay_ms: Option<i64>,
    /// Unset or non-positive values fall back to the configured default.
    pub daily_cap: Option<i64>,
}

/// Resolves a caller-local wall-clock time to the UTC instant it denotes.
pub fn resolve_utc(
    local: NaiveDateTime,
    caller_offset_minutes: i32,
    server_offset_minutes: i32,
) -> DateTime<Utc> {
    let shift = Duration::minutes(i64::from(caller_offset_minutes - server_offset_minutes));
    Utc.from_utc_datetime(&(local + shift))
}

/// Storage/compare form of a UTC instant. Matches the fractional-seconds
/// format SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` produces, so
/// lexicographic comparison in the due-job query is chronological.
pub fn format_utc(when: DateTime<Utc>) -> String {
    when.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Plans the rows for one request: normalizes delay and cap, resolves the
/// UTC schedule, and fans out across days when the target count exceeds the
/// daily cap. Each chunk lands one calendar day after the previous at the
/// same time of day.
pub fn plan(request: &JobRequest, cfg: &DispatcherConfig) -> Result<Vec<NewJob>, SendloopError> {
    if request.targets.is_empty() {
        return Err(SendloopError::Schedule("empty target list".to_string()));
    }
    if request.template.is_empty() && request.media_path.is_none() {
        return Err(SendloopError::Schedule(
            "nothing to send: empty template and no media".to_string(),
        ));
    }

    let delay_ms = request
        .per_recipient_delay_ms
        .filter(|d| *d >= 0)
        .unwrap_or(cfg.default_per_recipient_delay_ms as i64);
    let cap = request
        .daily_cap
        .filter(|c| *c >= 1)
        .or(cfg.default_daily_cap.map(i64::from));

    let first_at = resolve_utc(
        request.local_time,
        request.caller_offset_minutes,
        request.server_offset_minutes,
    );

    let chunk_size = match cap {
        Some(cap) => cap as usize,
        None => request.targets.len(),
    };

    let mut jobs = Vec::new();
    for (day, chunk) in request.targets.chunks(chunk_size).enumerate() {
        let payload = encode_payload(request.kind, chunk)?;
        jobs.push(NewJob {
            tenant_id: request.tenant_id.clone(),
            channel: request.channel,
            kind: request.kind,
            payload,
            template: request.template.clone(),
            media_path: request.media_path.clone(),
            scheduled_at_utc: format_utc(first_at + Duration::days(day as i64)),
            per_recipient_delay_ms: delay_ms,
            daily_cap: cap,
        });
    }
    Ok(jobs)
}

/// Plans and persists the rows for one request. Returns the job ids in
/// schedule order.
pub async fn schedule_job(
    store: &Store,
    cfg: &DispatcherConfig,
    request: &JobRequest,
) -> Result<Vec<String>, SendloopError> {
    let mut ids = Vec::new();
    for job in plan(request, cfg)? {
        ids.push(store.insert_job(job).await?);
    }
    Ok(ids)
}

fn encode_payload(kind: JobKind, targets: &[JobTarget]) -> Result<String, SendloopError> {
    let value = match kind {
        // Bulk payloads are a flat recipient array.
        JobKind::Bulk => serde_json::to_string(
            &targets.iter().map(|t| t.recipient.as_str()).collect::<Vec<_>>(),
        ),
        JobKind::Campaign => serde_json::to_string(targets),
    };
    value.map_err(|e| SendloopError::Schedule(format!("payload encoding failed: {e}")))
}

/// Decodes a stored payload back into targets. Rejects empty lists so a
/// malformed row fails fast at claim time.
pub(crate) fn decode_payload(kind: JobKind, payload: &str) -> Result<Vec<JobTarget>, String> {
    let targets = match kind {
        JobKind::Bulk => serde_json::from_str::<Vec<String>>(payload)
            .map_err(|e| format!("malformed bulk payload: {e}"))?
            .into_iter()
            .map(JobTarget::bulk)
            .collect::<Vec<_>>(),
        JobKind::Campaign => serde_json::from_str::<Vec<JobTarget>>(payload)
            .map_err(|e| format!("malformed campaign payload: {e}"))?,
    };
    if targets.is_empty() {
        return Err("empty target list".to_string());
    }
    Ok(targets)
}

/// Substitutes `%key%` tokens in a template with the target's field values.
/// `%recipient%` is always available. Unknown tokens are left as-is.
pub(crate) fn render_template(template: &str, target: &JobTarget) -> String {
    let mut text = template.replace("%recipient%", &target.recipient);
    for (key, value) in &target.fields {
        text = text.replace(&format!("%{key}%"), value);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(targets: Vec<JobTarget>, cap: Option<i64>) -> JobRequest {
        JobRequest {
            tenant_id: TenantId::from("acme"),
            channel: Channel::Whatsapp,
            kind: JobKind::Campaign,
            targets,
            template: "hi %name%".to_string(),
            media_path: None,
            local_time: NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            caller_offset_minutes: -180,
            server_offset_minutes: 0,
            per_recipient_delay_ms: Some(100),
            daily_cap: cap,
        }
    }

    fn targets(n: usize) -> Vec<JobTarget> {
        (0..n).map(|i| JobTarget::bulk(format!("r{i}"))).collect()
    }

    #[test]
    fn caller_offset_resolves_to_utc() {
        let local = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let utc = resolve_utc(local, -180, 0);
        assert_eq!(format_utc(utc), "2024-01-10T06:00:00.000Z");
    }

    #[test]
    fn cap_fans_out_across_days_at_same_time() {
        let cfg = DispatcherConfig::default();
        let jobs = plan(&request(targets(230), Some(100)), &cfg).unwrap();

        assert_eq!(jobs.len(), 3);
        let sizes: Vec<usize> = jobs
            .iter()
            .map(|j| decode_payload(JobKind::Campaign, &j.payload).unwrap().len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 30]);
        assert_eq!(jobs[0].scheduled_at_utc, "2024-01-10T06:00:00.000Z");
        assert_eq!(jobs[1].scheduled_at_utc, "2024-01-11T06:00:00.000Z");
        assert_eq!(jobs[2].scheduled_at_utc, "2024-01-12T06:00:00.000Z");
    }

    #[test]
    fn no_cap_produces_one_job() {
        let cfg = DispatcherConfig::default();
        let jobs = plan(&request(targets(230), None), &cfg).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn negative_inputs_normalize_to_defaults() {
        let cfg = DispatcherConfig::default();
        let mut req = request(targets(5), Some(-3));
        req.per_recipient_delay_ms = Some(-1);
        let jobs = plan(&req, &cfg).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0].per_recipient_delay_ms,
            cfg.default_per_recipient_delay_ms as i64
        );
        assert_eq!(jobs[0].daily_cap, None);
    }

    #[test]
    fn empty_target_list_is_rejected() {
        let cfg = DispatcherConfig::default();
        assert!(plan(&request(Vec::new(), None), &cfg).is_err());
    }

    #[test]
    fn bulk_payload_round_trips_as_recipient_array() {
        let encoded = encode_payload(JobKind::Bulk, &targets(2)).unwrap();
        assert_eq!(encoded, r#"["r0","r1"]"#);
        let decoded = decode_payload(JobKind::Bulk, &encoded).unwrap();
        assert_eq!(decoded[1].recipient, "r1");
    }

    #[test]
    fn template_substitution_covers_fields_and_recipient() {
        let mut target = JobTarget::bulk("5511999");
        target.fields.insert("name".to_string(), "Ana".to_string());
        let text = render_template("hi %name%, confirming %recipient% (%missing%)", &target);
        assert_eq!(text, "hi Ana, confirming 5511999 (%missing%)");
    }
}
