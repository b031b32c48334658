// HTML dashboard composed from the chart primitives

use std::collections::BTreeMap;
use anyhow::{Context, Result};
use chrono::{Duration, Local, TimeZone};
use rusqlite::Connection;
use crate::charts::{
    barcode_bars, candle_chart, daily_candles, gauge, pipeline_bar, svg_bar_chart, svg_horizontal_bar,
    BarChartOptions, BarcodeOptions, CandleOptions, GaugeOptions, HorizontalBarOptions, PipelineOptions,
    PipelineSegment, Svg,
};
use crate::models::{StageCode, StagePhase};
use crate::repo::{DealRepo, HistoryRepo, RateRepo};
use crate::services::{BASE_CURRENCY, QUOTE_CURRENCY};
use crate::utils::{escape_html, format_timestamp, format_usd};

pub const ACTIVITY_DAYS: i64 = 30;
const TOP_CLIENTS: usize = 10;

/// Aggregates read from the store for one dashboard render
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub phase_counts: Vec<(StagePhase, usize)>,
    /// Deals whose legacy stage maps to no phase
    pub unmapped: usize,
    pub stage_counts: Vec<(StageCode, usize)>,
    pub total_deals: usize,
    pub closed_deals: usize,
    /// Transitions per local day, oldest first, `ACTIVITY_DAYS` entries
    pub daily_transitions: Vec<f64>,
    /// Latest-quote totals in USD per client, largest first
    pub client_totals: Vec<(String, f64)>,
    /// (timestamp, rate) observations of USD/JPY
    pub rate_observations: Vec<(i64, f64)>,
    pub generated_ts: i64,
}

impl DashboardData {
    pub fn collect(conn: &Connection, now: i64) -> Result<Self> {
        let rows = DealRepo::list_rows(conn).context("Failed to load deals")?;

        let mut phases: BTreeMap<StagePhase, usize> = StagePhase::ALL.iter().map(|p| (*p, 0)).collect();
        let mut stages: BTreeMap<StageCode, usize> = StageCode::ALL.iter().map(|c| (*c, 0)).collect();
        let mut unmapped = 0;
        let mut closed_deals = 0;
        // Keyed by client ID; distinct clients may share a display name
        let mut clients: BTreeMap<Option<i64>, (String, f64)> = BTreeMap::new();

        for row in &rows {
            match row.deal.current_stage.phase() {
                Some(phase) => {
                    *phases.entry(phase).or_default() += 1;
                    if phase == StagePhase::Closed {
                        closed_deals += 1;
                    }
                }
                None => unmapped += 1,
            }
            if let Some(code) = row.deal.current_stage.code() {
                *stages.entry(code).or_default() += 1;
            }
            if let Some(total) = row.quote_total_usd {
                let entry = clients.entry(row.deal.client_id).or_insert_with(|| {
                    (row.client_name.clone().unwrap_or_else(|| "(no client)".to_string()), 0.0)
                });
                entry.1 += total;
            }
        }

        let mut client_totals: Vec<(String, f64)> = clients.into_values().collect();
        client_totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        client_totals.truncate(TOP_CLIENTS);

        let since = now - ACTIVITY_DAYS * 86_400;
        let timestamps = HistoryRepo::transition_timestamps_since(conn, since)
            .context("Failed to load transition history")?;
        let daily_transitions = bucket_by_day(&timestamps, now, ACTIVITY_DAYS);

        let rate_observations = RateRepo::history_since(conn, BASE_CURRENCY, QUOTE_CURRENCY, since)
            .context("Failed to load rate history")?
            .into_iter()
            .map(|q| (q.fetched_ts, q.rate))
            .collect();

        Ok(Self {
            phase_counts: phases.into_iter().collect(),
            unmapped,
            stage_counts: stages.into_iter().collect(),
            total_deals: rows.len(),
            closed_deals,
            daily_transitions,
            client_totals,
            rate_observations,
            generated_ts: now,
        })
    }

    /// Share of deals in the closed phase, in percent
    pub fn closed_percent(&self) -> f64 {
        if self.total_deals == 0 {
            0.0
        } else {
            self.closed_deals as f64 / self.total_deals as f64 * 100.0
        }
    }
}

/// Count timestamps per local calendar day over the `days` days ending at `now`
pub fn bucket_by_day(timestamps: &[i64], now: i64, days: i64) -> Vec<f64> {
    let mut buckets = vec![0.0; days.max(0) as usize];
    let today = match Local.timestamp_opt(now, 0).single() {
        Some(dt) => dt.date_naive(),
        None => return buckets,
    };
    let first = today - Duration::days(days - 1);
    for ts in timestamps {
        if let Some(dt) = Local.timestamp_opt(*ts, 0).single() {
            let offset = (dt.date_naive() - first).num_days();
            if offset >= 0 && offset < days {
                buckets[offset as usize] += 1.0;
            }
        }
    }
    buckets
}

fn section(output: &mut String, title: &str, caption: &str, chart: &Svg) {
    output.push_str("<section>\n");
    output.push_str(&format!("<h2>{}</h2>\n", escape_html(title)));
    if !caption.is_empty() {
        output.push_str(&format!("<p class=\"caption\">{}</p>\n", escape_html(caption)));
    }
    output.push_str(&chart.render());
    output.push_str("\n</section>\n");
}

/// Render the dashboard as a standalone HTML document
pub fn render_dashboard(data: &DashboardData) -> String {
    let mut body = String::new();

    let segments: Vec<PipelineSegment> = data
        .phase_counts
        .iter()
        .map(|(phase, count)| PipelineSegment {
            label: phase.title().to_string(),
            value: *count as f64,
            color: phase.stages()[0].style().hex.to_string(),
        })
        .collect();
    let legend: Vec<String> = data
        .phase_counts
        .iter()
        .map(|(phase, count)| format!("{} {}", phase.title(), count))
        .collect();
    let mut caption = legend.join(" · ");
    if data.unmapped > 0 {
        caption.push_str(&format!(" · Unmapped {}", data.unmapped));
    }
    section(
        &mut body,
        "Pipeline",
        &caption,
        &pipeline_bar(&segments, &PipelineOptions { width: 640.0, ..PipelineOptions::default() }),
    );

    let stage_values: Vec<f64> = data.stage_counts.iter().map(|(_, n)| *n as f64).collect();
    let stage_labels: Vec<String> = data.stage_counts.iter().map(|(code, _)| code.as_str()[1..].to_string()).collect();
    section(
        &mut body,
        "Deals by stage",
        "",
        &svg_bar_chart(
            &stage_values,
            &stage_labels,
            &BarChartOptions { width: 640.0, gap: 4.0, highlight_last: stage_values.len(), ..BarChartOptions::default() },
        ),
    );

    section(
        &mut body,
        "Closed",
        &format!("{} of {} deals", data.closed_deals, data.total_deals),
        &gauge(data.closed_percent(), &GaugeOptions::default()),
    );

    section(
        &mut body,
        "Activity",
        &format!("Stage transitions per day, last {} days", ACTIVITY_DAYS),
        &barcode_bars(
            &data.daily_transitions,
            &BarcodeOptions { width: 640.0, highlight_last: 7, ..BarcodeOptions::default() },
        ),
    );

    let client_caption = data
        .client_totals
        .first()
        .map(|(name, total)| format!("Largest: {} {}", name, format_usd(*total)))
        .unwrap_or_default();
    section(
        &mut body,
        "Quoted value by client (USD)",
        &client_caption,
        &svg_horizontal_bar(&data.client_totals, &HorizontalBarOptions { width: 640.0, ..HorizontalBarOptions::default() }),
    );

    let candles = daily_candles(&data.rate_observations);
    let rate_caption = data
        .rate_observations
        .last()
        .map(|(_, rate)| format!("Latest {:.2}", rate))
        .unwrap_or_default();
    section(
        &mut body,
        &format!("{}/{}", BASE_CURRENCY, QUOTE_CURRENCY),
        &rate_caption,
        &candle_chart(&candles, &CandleOptions { width: 640.0, ..CandleOptions::default() }),
    );

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>BAO Flow dashboard</title>\n\
         <style>body{{font-family:sans-serif;margin:2rem;color:#111827}}\
         section{{margin-bottom:2rem}}.caption{{color:#6b7280;font-size:0.9rem}}</style>\n\
         </head>\n<body>\n<h1>BAO Flow</h1>\n<p class=\"caption\">Generated {}</p>\n{}</body>\n</html>\n",
        escape_html(&format_timestamp(data.generated_ts)),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::models::RateQuote;
    use crate::repo::ClientRepo;
    use crate::workflow::{SqliteTransitionApplier, TransitionApplier};

    #[test]
    fn test_bucket_by_day_places_today_last() {
        let now = Local::now().timestamp();
        let buckets = bucket_by_day(&[now, now - 1, now - 3 * 86_400, now - 90 * 86_400], now, 30);
        assert_eq!(buckets.len(), 30);
        assert!(buckets[29] >= 1.0);
        assert_eq!(buckets.iter().sum::<f64>(), 3.0);
    }

    #[test]
    fn test_collect_counts_phases_and_clients() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let client = ClientRepo::create(&conn, "Sato", Some("Sato Confectionery"), None).unwrap();
        let a = DealRepo::create(&conn, "Gift boxes", client.id, StageCode::M01, None).unwrap();
        DealRepo::create(&conn, "Labels", None, StageCode::M16, None).unwrap();
        DealRepo::add_quote(&conn, a.id.unwrap(), 0.5, 1000).unwrap();
        let mut applier = SqliteTransitionApplier::new(&conn, None);
        applier.apply_transition(a.id.unwrap(), StageCode::M25, "done").unwrap();

        let data = DashboardData::collect(&conn, Local::now().timestamp()).unwrap();
        assert_eq!(data.total_deals, 2);
        assert_eq!(data.closed_deals, 1);
        assert_eq!(data.closed_percent(), 50.0);
        assert!(data.phase_counts.contains(&(StagePhase::Factory, 1)));
        assert_eq!(data.client_totals, vec![("Sato Confectionery".to_string(), 500.0)]);
        assert_eq!(data.daily_transitions.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_legacy_closed_deal_counts_on_gauge() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let old = DealRepo::create(&conn, "Old carton order", None, StageCode::M01, None).unwrap();
        conn.execute("UPDATE deals SET current_stage = 'completed' WHERE id = ?1", [old.id.unwrap()])
            .unwrap();
        DealRepo::create(&conn, "New carton order", None, StageCode::M04, None).unwrap();

        let data = DashboardData::collect(&conn, Local::now().timestamp()).unwrap();
        assert!(data.phase_counts.contains(&(StagePhase::Closed, 1)));
        assert_eq!(data.closed_deals, 1);
        assert_eq!(data.closed_percent(), 50.0);
        assert!(render_dashboard(&data).contains("1 of 2 deals"));
    }

    #[test]
    fn test_clients_sharing_a_company_stay_separate() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let tokyo = ClientRepo::create(&conn, "Ito", Some("Kato Trading"), None).unwrap();
        let osaka = ClientRepo::create(&conn, "Ueda", Some("Kato Trading"), None).unwrap();
        let a = DealRepo::create(&conn, "Jars", tokyo.id, StageCode::M02, None).unwrap();
        let b = DealRepo::create(&conn, "Lids", osaka.id, StageCode::M02, None).unwrap();
        DealRepo::add_quote(&conn, a.id.unwrap(), 1.0, 300).unwrap();
        DealRepo::add_quote(&conn, b.id.unwrap(), 1.0, 100).unwrap();

        let data = DashboardData::collect(&conn, Local::now().timestamp()).unwrap();
        assert_eq!(
            data.client_totals,
            vec![("Kato Trading".to_string(), 300.0), ("Kato Trading".to_string(), 100.0)]
        );
    }

    #[test]
    fn test_render_includes_every_chart() {
        let conn = DbConnection::connect_in_memory().unwrap();
        RateRepo::store(&conn, &RateQuote {
            base: BASE_CURRENCY.to_string(),
            quote: QUOTE_CURRENCY.to_string(),
            rate: 149.5,
            source: "test".to_string(),
            fetched_ts: Local::now().timestamp(),
        }).unwrap();
        DealRepo::create(&conn, "Mailer boxes", None, StageCode::M03, None).unwrap();

        let html = render_dashboard(&DashboardData::collect(&conn, Local::now().timestamp()).unwrap());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<svg").count(), 6);
        assert!(html.contains("Deals by stage"));
        assert!(html.contains("Latest 149.50"));
    }

    #[test]
    fn test_render_empty_store_uses_placeholders() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let html = render_dashboard(&DashboardData::collect(&conn, Local::now().timestamp()).unwrap());
        assert_eq!(html.matches("<svg").count(), 6);
        assert!(html.contains("No data"));
        assert!(!html.contains("NaN"));
    }
}
