/// NRCS AWDB web service client (SNOTEL sites).
///
/// The AWDB service is SOAP only and answers one element per
/// `getHourlyData` call, so a run issues one request per desired element.
/// Those requests are independent and go out in parallel on a small thread
/// pool; the pool is joined before anything is reduced.
///
/// Service documentation: https://www.nrcs.usda.gov/resources/data-and-reports/awdb-web-service
/// Endpoint: https://wcc.sc.egov.usda.gov/awdbWebService/services
///
/// AWDB takes and returns station local time, and always reports English
/// units. Metric conversion happens in the assembler.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use quick_xml::events::Event;
use quick_xml::Reader;
use threadpool::ThreadPool;
use tracing::{debug, error, info};

use crate::analysis::reduce::ReductionPlan;
use crate::error::{PipelineError, Result};
use crate::ingest::{http_client, Source};
use crate::model::{FetchWindow, Provider, RawSample, RawSeries, Readings, UnitSystem};

pub const AWDB_ENDPOINT: &str = "https://wcc.sc.egov.usda.gov/awdbWebService/services";
const AWDB_NAMESPACE: &str = "http://www.wcc.nrcs.usda.gov/ns/awdbWebService";
const DEFAULT_WORKERS: usize = 4;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct NrcsSource {
    client: reqwest::blocking::Client,
    endpoint: String,
    station_triplet: String,
    elements: Vec<String>,
    zone: Tz,
    plan: ReductionPlan,
    workers: usize,
}

impl NrcsSource {
    /// `station_triplet` is the AWDB id, e.g. `"1000:OR:SNTL"`; `zone` is the
    /// station's local timezone, used for both request and response times.
    pub fn new(
        station_triplet: impl Into<String>,
        elements: Vec<String>,
        zone: Tz,
        plan: ReductionPlan,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(Provider::Nrcs)?,
            endpoint: AWDB_ENDPOINT.to_string(),
            station_triplet: station_triplet.into(),
            elements,
            zone,
            plan,
            workers: DEFAULT_WORKERS,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Fans one request per element out over the pool and waits for all of
    /// them. Every element is attempted even if another one fails; the
    /// first hard failure is returned once the pool has drained.
    fn fetch_series(&self, window: &FetchWindow) -> Result<BTreeMap<String, RawSeries>> {
        let begin = format_awdb_time(window.begin, self.zone);
        let end = format_awdb_time(window.end, self.zone);

        let pool = ThreadPool::new(self.workers.min(self.elements.len()).max(1));
        let (tx, rx) = mpsc::channel();

        for element in &self.elements {
            let tx = tx.clone();
            let client = self.client.clone();
            let endpoint = self.endpoint.clone();
            let envelope = build_hourly_data_envelope(&self.station_triplet, element, &begin, &end);
            let element = element.clone();
            let zone = self.zone;

            pool.execute(move || {
                let started = Instant::now();
                let result = post_envelope(&client, &endpoint, &envelope)
                    .and_then(|xml| parse_hourly_data_response(&xml, zone));
                info!(
                    element = %element,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetched NRCS element"
                );
                let _ = tx.send((element, result));
            });
        }
        drop(tx);

        let result = collect_replies(rx, self.elements.len());
        pool.join();
        result
    }
}

/// Drains per-element replies until every worker has hung up.
///
/// Elements are never dropped silently: a worker that died before
/// replying counts as a failed request.
fn collect_replies(
    replies: mpsc::Receiver<(String, Result<RawSeries>)>,
    expected: usize,
) -> Result<BTreeMap<String, RawSeries>> {
    let mut series = BTreeMap::new();
    let mut failure = None;
    let mut received = 0;

    for (element, result) in replies.iter() {
        received += 1;
        match result {
            Ok(samples) => {
                debug!(element = %element, samples = samples.len(), "NRCS series received");
                series.insert(element, samples);
            }
            Err(e) => {
                error!(element = %element, error = %e, "NRCS element fetch failed");
                failure.get_or_insert(e);
            }
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    if received < expected {
        return Err(PipelineError::transport(
            Provider::Nrcs,
            format!("only {} of {} element requests completed", received, expected),
        ));
    }
    Ok(series)
}

impl Source for NrcsSource {
    fn provider(&self) -> Provider {
        Provider::Nrcs
    }

    fn clock_zone(&self) -> Tz {
        self.zone
    }

    fn collect(&self, window: &FetchWindow) -> Result<Readings> {
        let series = self.fetch_series(window)?;
        Ok(self.plan.reduce_all(&series, &self.elements, UnitSystem::Imperial))
    }
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

/// AWDB date format, in station local time.
pub fn format_awdb_time(instant: DateTime<Utc>, zone: Tz) -> String {
    instant.with_timezone(&zone).format("%Y-%m-%d %H:%M:00").to_string()
}

/// SOAP 1.1 envelope for `getHourlyData` of one element at one station.
pub fn build_hourly_data_envelope(station_triplet: &str, element_cd: &str, begin: &str, end: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:q0="{ns}">"#,
            "<soapenv:Body><q0:getHourlyData>",
            "<stationTriplets>{triplet}</stationTriplets>",
            "<elementCd>{element}</elementCd>",
            "<ordinal>1</ordinal>",
            "<beginDate>{begin}</beginDate>",
            "<endDate>{end}</endDate>",
            "</q0:getHourlyData></soapenv:Body></soapenv:Envelope>"
        ),
        ns = AWDB_NAMESPACE,
        triplet = xml_escape(station_triplet),
        element = xml_escape(element_cd),
        begin = begin,
        end = end,
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn post_envelope(client: &reqwest::blocking::Client, endpoint: &str, envelope: &str) -> Result<String> {
    let response = client
        .post(endpoint)
        .header("Content-Type", "text/xml; charset=utf-8")
        .header("SOAPAction", "\"\"")
        .body(envelope.to_string())
        .send()
        .map_err(|e| PipelineError::transport(Provider::Nrcs, e))?;

    let status = response.status();
    let body = response
        .text()
        .map_err(|e| PipelineError::transport(Provider::Nrcs, e))?;

    // Faults come back as HTTP 500 with a readable envelope; prefer its message.
    if !status.is_success() {
        return match parse_hourly_data_response(&body, chrono_tz::UTC) {
            Err(fault @ PipelineError::Transport { .. }) => Err(fault),
            _ => Err(PipelineError::transport(Provider::Nrcs, format!("AWDB HTTP error: {}", status))),
        };
    }

    Ok(body)
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a `getHourlyDataResponse` envelope into a series.
///
/// `values` entries without a `value` child become null samples. An
/// envelope without any `values` is an empty series, not an error.
///
/// # Errors
/// - `Transport` — the envelope is a SOAP fault.
/// - `MalformedResponse` — unreadable XML, timestamps or numbers.
pub fn parse_hourly_data_response(xml: &str, zone: Tz) -> Result<RawSeries> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut series = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    let mut in_values = false;
    let mut date_time: Option<String> = None;
    let mut value: Option<String> = None;
    let mut fault: Option<String> = None;
    let mut saw_envelope = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Envelope" => saw_envelope = true,
                    b"Fault" => fault = Some(String::new()),
                    b"values" => {
                        in_values = true;
                        date_time = None;
                        value = None;
                    }
                    _ => {}
                }
                current = Some(name);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| PipelineError::malformed(Provider::Nrcs, e))?
                    .into_owned();
                match current.as_deref() {
                    Some(b"faultstring") => fault = Some(text),
                    Some(b"dateTime") if in_values => date_time = Some(text),
                    Some(b"value") if in_values => value = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"values" && in_values {
                    in_values = false;
                    series.push(build_sample(date_time.take(), value.take(), zone)?);
                }
                current = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::malformed(
                    Provider::Nrcs,
                    format!("XML error at position {}: {}", reader.buffer_position(), e),
                ));
            }
            _ => {}
        }
    }

    if let Some(message) = fault {
        return Err(PipelineError::transport(Provider::Nrcs, format!("SOAP fault: {}", message)));
    }
    if !saw_envelope {
        return Err(PipelineError::malformed(Provider::Nrcs, "missing SOAP envelope"));
    }

    Ok(series)
}

fn build_sample(date_time: Option<String>, value: Option<String>, zone: Tz) -> Result<RawSample> {
    let date_time = date_time
        .ok_or_else(|| PipelineError::malformed(Provider::Nrcs, "values entry without dateTime"))?;
    let timestamp = parse_awdb_time(&date_time, zone)?;

    let value = match value {
        Some(v) => Some(v.trim().parse::<f64>().map_err(|e| {
            PipelineError::malformed(Provider::Nrcs, format!("bad value '{}': {}", v, e))
        })?),
        None => None,
    };

    Ok(RawSample::new(timestamp, value))
}

fn parse_awdb_time(s: &str, zone: Tz) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| PipelineError::malformed(Provider::Nrcs, format!("bad dateTime '{}': {}", s, e)))?;

    // SNOTEL clocks stay on standard time, so hours that fall in the
    // spring-forward gap are read with the offset in force just before it.
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(naive - Duration::hours(1)))
                .earliest()
                .map(|dt| dt + Duration::hours(1))
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            PipelineError::malformed(Provider::Nrcs, format!("dateTime '{}' does not exist in {}", s, zone))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reduce::most_recent;
    use crate::ingest::fixtures::*;
    use crate::ingest::stub_server::StubServer;
    use crate::model::WindMode;

    const PACIFIC: Tz = chrono_tz::America::Los_Angeles;

    // --- request ------------------------------------------------------------

    #[test]
    fn test_awdb_time_is_station_local() {
        let instant = Utc.with_ymd_and_hms(2024, 12, 18, 21, 0, 0).unwrap();
        assert_eq!(format_awdb_time(instant, PACIFIC), "2024-12-18 13:00:00");
    }

    #[test]
    fn test_envelope_carries_station_element_and_window() {
        let envelope = build_hourly_data_envelope(
            "1000:OR:SNTL",
            "SNWD",
            "2024-12-17 13:00:00",
            "2024-12-18 13:00:00",
        );
        assert!(envelope.contains("<q0:getHourlyData>"));
        assert!(envelope.contains("<stationTriplets>1000:OR:SNTL</stationTriplets>"));
        assert!(envelope.contains("<elementCd>SNWD</elementCd>"));
        assert!(envelope.contains("<ordinal>1</ordinal>"));
        assert!(envelope.contains("<beginDate>2024-12-17 13:00:00</beginDate>"));
        assert!(envelope.contains("<endDate>2024-12-18 13:00:00</endDate>"));
        assert!(envelope.contains(AWDB_NAMESPACE));
    }

    #[test]
    fn test_envelope_escapes_markup() {
        let envelope = build_hourly_data_envelope("1<2", "A&B", "b", "e");
        assert!(envelope.contains("<stationTriplets>1&lt;2</stationTriplets>"));
        assert!(envelope.contains("<elementCd>A&amp;B</elementCd>"));
    }

    // --- response -----------------------------------------------------------

    #[test]
    fn test_parse_hourly_values_in_order() {
        let series = parse_hourly_data_response(fixture_nrcs_tobs_xml(), PACIFIC)
            .expect("fixture should parse");

        assert_eq!(series.len(), 4);
        assert_eq!(series[0].value, Some(21.4));
        assert_eq!(series[3].value, None, "values entry without <value> is a null sample");
        assert_eq!(
            series[0].timestamp,
            Utc.with_ymd_and_hms(2024, 12, 18, 18, 0, 0).unwrap(),
            "10:00 Pacific is 18:00 UTC"
        );
    }

    #[test]
    fn test_latest_non_null_skips_trailing_gap() {
        let series = parse_hourly_data_response(fixture_nrcs_tobs_xml(), PACIFIC).unwrap();
        assert_eq!(most_recent(&series), Some(24.1));
    }

    #[test]
    fn test_spring_forward_gap_is_read_as_standard_time() {
        // 02:00 does not exist on the Pacific clock on 2024-03-10.
        let xml = fixture_nrcs_tobs_xml()
            .replace("2024-12-18 10:00</dateTime>", "2024-03-10 01:00</dateTime>")
            .replace("2024-12-18 11:00</dateTime>", "2024-03-10 02:00</dateTime>")
            .replace("2024-12-18 12:00</dateTime>", "2024-03-10 03:00</dateTime>");
        let series = parse_hourly_data_response(&xml, PACIFIC).expect("gap hour should not fail the parse");

        assert_eq!(series[0].timestamp, Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
        assert_eq!(
            series[1].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap(),
            "02:00 PST is 10:00 UTC"
        );
        assert_eq!(series[1].value, Some(22.8));
        assert_eq!(series[2].timestamp, Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_without_values_is_empty_series() {
        let series = parse_hourly_data_response(fixture_nrcs_empty_xml(), PACIFIC)
            .expect("empty return should still parse");
        assert!(series.is_empty());
    }

    #[test]
    fn test_soap_fault_is_transport_failure() {
        let result = parse_hourly_data_response(fixture_nrcs_fault_xml(), PACIFIC);
        match result {
            Err(PipelineError::Transport { provider, reason }) => {
                assert_eq!(provider, Provider::Nrcs);
                assert!(reason.contains("Invalid station triplet"), "got: {}", reason);
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[test]
    fn test_non_soap_body_is_malformed() {
        let result = parse_hourly_data_response("<html><body>Service Unavailable</body></html>", PACIFIC);
        assert!(
            matches!(result, Err(PipelineError::MalformedResponse { .. })),
            "got {:?}",
            result
        );
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let xml = fixture_nrcs_tobs_xml().replace("<value>22.8</value>", "<value>n/a</value>");
        let result = parse_hourly_data_response(&xml, PACIFIC);
        assert!(matches!(result, Err(PipelineError::MalformedResponse { .. })));
    }

    #[test]
    fn test_source_reports_station_clock() {
        let plan = ReductionPlan::new(Provider::Nrcs, WindMode::Normal, false);
        let source = NrcsSource::new("1000:OR:SNTL", vec!["TOBS".to_string()], PACIFIC, plan)
            .expect("client should build");
        assert_eq!(source.clock_zone(), PACIFIC);
        assert_eq!(source.provider(), Provider::Nrcs);
    }

    // --- fan-out over HTTP --------------------------------------------------

    const ELEMENTS: [&str; 4] = ["TOBS", "SNWD", "WSPD", "WDIR"];

    fn element_of(body: &str) -> &str {
        body.split("<elementCd>")
            .nth(1)
            .and_then(|rest| rest.split("</elementCd>").next())
            .unwrap_or("")
    }

    fn stub_source(server: &StubServer) -> NrcsSource {
        let plan = ReductionPlan::new(Provider::Nrcs, WindMode::Normal, false);
        NrcsSource::new(
            "1000:OR:SNTL",
            ELEMENTS.iter().map(|e| e.to_string()).collect(),
            PACIFIC,
            plan,
        )
        .expect("client should build")
        .with_endpoint(server.url("/awdbWebService/services"))
        .with_workers(2)
    }

    fn window() -> FetchWindow {
        let now = Utc.with_ymd_and_hms(2024, 12, 18, 21, 42, 0).unwrap();
        FetchWindow::ending_at(now, PACIFIC, 3)
    }

    #[test]
    fn test_collect_requests_every_element_and_reduces() {
        let server = StubServer::start(|_, body| match element_of(body) {
            "SNWD" => (200, fixture_nrcs_empty_xml().to_string()),
            _ => (200, fixture_nrcs_tobs_xml().to_string()),
        });
        let source = stub_source(&server);

        let readings = source.collect(&window()).expect("all elements answered");

        let requests = server.requests();
        let mut requested: Vec<&str> = requests.iter().map(|(_, body)| element_of(body)).collect();
        requested.sort();
        assert_eq!(requested, vec!["SNWD", "TOBS", "WDIR", "WSPD"], "one request per element");
        for (url, body) in &requests {
            assert_eq!(url, "/awdbWebService/services");
            assert!(body.contains("<stationTriplets>1000:OR:SNTL</stationTriplets>"));
            assert!(body.contains("<beginDate>2024-12-18 10:00:00</beginDate>"), "window in station time");
            assert!(body.contains("<endDate>2024-12-18 13:00:00</endDate>"));
        }

        assert_eq!(readings.units, UnitSystem::Imperial);
        assert_eq!(readings.values["TOBS"], Some(24.1));
        assert_eq!(readings.values["WSPD"], Some(24.1));
        assert_eq!(readings.values["SNWD"], None, "empty return is missing data, not a failure");
    }

    #[test]
    fn test_fault_on_one_element_fails_after_all_were_requested() {
        let server = StubServer::start(|_, body| match element_of(body) {
            "WSPD" => (500, fixture_nrcs_fault_xml().to_string()),
            _ => (200, fixture_nrcs_tobs_xml().to_string()),
        });
        let source = stub_source(&server);

        let result = source.collect(&window());

        assert_eq!(server.requests().len(), ELEMENTS.len(), "every element attempted");
        match result {
            Err(PipelineError::Transport { provider, reason }) => {
                assert_eq!(provider, Provider::Nrcs);
                assert!(reason.contains("Invalid station triplet"), "fault message kept: {}", reason);
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[test]
    fn test_http_error_without_envelope_reports_status() {
        let server = StubServer::start(|_, _| (503, "<html><body>Service Unavailable</body></html>".to_string()));
        let source = stub_source(&server);

        match source.collect(&window()) {
            Err(PipelineError::Transport { reason, .. }) => {
                assert!(reason.contains("503"), "got: {}", reason)
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_reply_counts_as_failure() {
        let (tx, rx) = mpsc::channel();
        tx.send(("TOBS".to_string(), Ok(Vec::new()))).unwrap();
        drop(tx);

        match collect_replies(rx, 2) {
            Err(PipelineError::Transport { reason, .. }) => {
                assert!(reason.contains("1 of 2"), "got: {}", reason)
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[test]
    fn test_all_replies_collected() {
        let (tx, rx) = mpsc::channel();
        tx.send(("TOBS".to_string(), Ok(Vec::new()))).unwrap();
        tx.send(("SNWD".to_string(), Ok(Vec::new()))).unwrap();
        drop(tx);

        let series = collect_replies(rx, 2).expect("both replies present");
        assert_eq!(series.len(), 2);
    }
}
