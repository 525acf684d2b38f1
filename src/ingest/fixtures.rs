/// Test fixtures: representative payloads from the upstream providers.
///
/// Truncated to the minimum needed to exercise the parsers but otherwise
/// shaped like the real responses.
///
/// NRCS AWDB `getHourlyData` (SOAP 1.1):
///   Envelope.Body.getHourlyDataResponse.return[]
///     .stationTriplet
///     .values[]
///       .dateTime — "yyyy-MM-dd HH:mm", station local time
///       .value    — absent when the sensor had nothing for that hour
///
/// MesoWest / Synoptic `stations/timeseries`:
///   SUMMARY.RESPONSE_MESSAGE
///   STATION[0].OBSERVATIONS
///     .date_time[]          — RFC 3339, UTC
///     .<variable>_set_1[]   — numbers or null, parallel to date_time

/// Three hours of air temperature from a SNOTEL site, with the most recent
/// hour missing its value.
#[cfg(test)]
pub(crate) fn fixture_nrcs_tobs_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:getHourlyDataResponse xmlns:ns2="http://www.wcc.nrcs.usda.gov/ns/awdbWebService">
      <return>
        <beginDate>2024-12-18 10:00</beginDate>
        <duration>HOURLY</duration>
        <endDate>2024-12-18 13:00</endDate>
        <stationTriplet>1000:OR:SNTL</stationTriplet>
        <values>
          <dateTime>2024-12-18 10:00</dateTime>
          <flag>V</flag>
          <value>21.4</value>
        </values>
        <values>
          <dateTime>2024-12-18 11:00</dateTime>
          <flag>V</flag>
          <value>22.8</value>
        </values>
        <values>
          <dateTime>2024-12-18 12:00</dateTime>
          <flag>V</flag>
          <value>24.1</value>
        </values>
        <values>
          <dateTime>2024-12-18 13:00</dateTime>
          <flag>V</flag>
        </values>
      </return>
    </ns2:getHourlyDataResponse>
  </soap:Body>
</soap:Envelope>"#
}

/// Element the station does not carry: the `return` has no `values`.
#[cfg(test)]
pub(crate) fn fixture_nrcs_empty_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:getHourlyDataResponse xmlns:ns2="http://www.wcc.nrcs.usda.gov/ns/awdbWebService">
      <return>
        <duration>HOURLY</duration>
        <stationTriplet>1000:OR:SNTL</stationTriplet>
      </return>
    </ns2:getHourlyDataResponse>
  </soap:Body>
</soap:Envelope>"#
}

/// SOAP fault, e.g. for a malformed station triplet.
#[cfg(test)]
pub(crate) fn fixture_nrcs_fault_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Invalid station triplet: 1000:XX:SNTL</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#
}

/// Four 20-minute observations from a MesoWest station in english units
/// with wind in knots. Snow depth has a null in the middle; wind gust is
/// null at the most recent slot.
#[cfg(test)]
pub(crate) fn fixture_mesowest_json() -> &'static str {
    r#"{
      "SUMMARY": { "RESPONSE_CODE": 1, "RESPONSE_MESSAGE": "OK", "NUMBER_OF_OBJECTS": 1 },
      "STATION": [
        {
          "STID": "TMBWA",
          "NAME": "Timberline Lodge",
          "OBSERVATIONS": {
            "date_time": [
              "2024-12-18T20:00:00Z",
              "2024-12-18T20:20:00Z",
              "2024-12-18T20:40:00Z",
              "2024-12-18T21:00:00Z"
            ],
            "air_temp_set_1": [24.1, 24.3, 24.0, 23.6],
            "snow_depth_set_1": [48.0, null, 49.5, 50.0],
            "wind_speed_set_1": [10.0, 12.0, 14.0, 16.0],
            "wind_gust_set_1": [18.0, 20.0, 22.0, null],
            "wind_direction_set_1": [200.0, 210.0, 220.0, 230.0],
            "weather_cond_code_set_1": ["RA", "RA", "SN", "SN"]
          }
        }
      ],
      "UNITS": { "air_temp": "Fahrenheit", "snow_depth": "Inches", "wind_speed": "Knots" }
    }"#
}

/// Response for a bad token or an unknown station: no STATION entries.
#[cfg(test)]
pub(crate) fn fixture_mesowest_no_station_json() -> &'static str {
    r#"{
      "SUMMARY": {
        "RESPONSE_CODE": 2,
        "RESPONSE_MESSAGE": "No stations found for this request."
      },
      "STATION": []
    }"#
}
