//! Each check variant against a mock deployment

use super::helpers::{booking, explorer_html, mock_json, site_for, HOMEPAGE_HTML};
use mockito::{Matcher, Server};
use rajdhani::checks::{
    validate, Autocomplete, BookingSideEffect, FeatureFlag, SearchTrains, Status, TrainSchedule,
    TripListing, WebpageContent,
};
use rajdhani::site::SearchQuery;

fn query(from: &str, to: &str) -> SearchQuery {
    SearchQuery {
        from_station_code: from.to_string(),
        to_station_code: to.to_string(),
        ..SearchQuery::default()
    }
}

const BOOKING_COLUMNS: [&str; 6] = [
    "id",
    "train_number",
    "ticket_class",
    "date",
    "passenger_name",
    "passenger_email",
];

/// Explorer answers `before` for the first query and `after` for every later one.
fn mock_latest_booking(server: &mut Server, before: &[&str], after: &[&str]) {
    server
        .mock("GET", "/data-explorer")
        .match_query(Matcher::Any)
        .with_body(explorer_html(&BOOKING_COLUMNS, &[before]))
        .expect(1)
        .create();
    server
        .mock("GET", "/data-explorer")
        .match_query(Matcher::Any)
        .with_body(explorer_html(&BOOKING_COLUMNS, &[after]))
        .create();
}

fn rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn test_homepage_present() {
    let mut server = Server::new();
    server.mock("GET", "/").with_body(HOMEPAGE_HTML).create();

    let status = validate(
        &WebpageContent::new("/", "<h2>Search Trains</h2>"),
        &site_for(&server),
    );
    assert_eq!(status.status, Status::Pass);
    assert!(status.message.is_empty());
}

/// Scenario A: the marker text is missing from the home page.
#[test]
fn test_homepage_missing_marker_fails() {
    let mut server = Server::new();
    server
        .mock("GET", "/")
        .with_body("<html><body>Hello, world!</body></html>")
        .create();

    let status = validate(
        &WebpageContent::new("/", "<h2>Search Trains</h2>"),
        &site_for(&server),
    );
    assert_eq!(status.status, Status::Fail);
    assert!(!status.message.is_empty());
    assert!(status.message.contains("<h2>Search Trains</h2>"));
}

#[test]
fn test_content_check_is_idempotent() {
    let mut server = Server::new();
    server.mock("GET", "/").with_body("nothing here").create();
    let site = site_for(&server);
    let check = WebpageContent::new("/", "<h2>Search Trains</h2>");

    assert_eq!(validate(&check, &site), validate(&check, &site));
}

/// Scenario B: an extra unexpected station code.
#[test]
fn test_autocomplete_extra_code_fails() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/stations")
        .match_query(Matcher::UrlEncoded("q".into(), "tk".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"[{"code": "TK", "name": "Tumkur"}, {"code": "XX", "name": "Nowhere"}]"#)
        .create();

    let status = validate(&Autocomplete::new("tk", ["TK"]), &site_for(&server));
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("For input tk"));
    assert!(status.message.contains("TK"));
    assert!(status.message.contains("XX"));
}

#[test]
fn test_autocomplete_is_order_independent() {
    let mut server = Server::new();
    mock_json(
        &mut server,
        "/api/stations",
        r#"[{"code": "MSB"}, {"code": "MAS"}, {"code": "MS"}]"#,
    );
    let site = site_for(&server);

    let forward = validate(&Autocomplete::new("chennai", ["MAS", "MS", "MSB"]), &site);
    let reversed = validate(&Autocomplete::new("chennai", ["MSB", "MS", "MAS"]), &site);
    assert_eq!(forward.status, Status::Pass);
    assert_eq!(reversed.status, Status::Pass);
}

#[test]
fn test_autocomplete_bad_shape_is_error() {
    let mut server = Server::new();
    mock_json(&mut server, "/api/stations", r#"{"stations": []}"#);

    let status = validate(&Autocomplete::new("tk", ["TK"]), &site_for(&server));
    assert_eq!(status.status, Status::Error);
}

#[test]
fn test_search_trains_pass() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("from".into(), "MAS".into()),
            Matcher::UrlEncoded("to".into(), "SBC".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"number": "12007", "name": "Shatabdi", "from_station_code": "MAS", "to_station_code": "SBC"},
                {"number": 12027, "name": "Shatabdi", "departure": "06:00", "arrival": "11:00"}
            ]"#,
        )
        .create();

    let check = SearchTrains::new(query("MAS", "SBC"), ["12027", "12007"]);
    assert_eq!(validate(&check, &site_for(&server)).status, Status::Pass);
}

/// Scenario C: the numbers match but one result carries a disallowed key.
#[test]
fn test_search_trains_extra_key_fails() {
    let mut server = Server::new();
    mock_json(
        &mut server,
        "/api/search",
        r#"[{"number": "101", "name": "A"}, {"number": "102", "name": "B", "foo": 1}]"#,
    );

    let status = validate(
        &SearchTrains::new(query("AAA", "BBB"), ["101", "102"]),
        &site_for(&server),
    );
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("foo"));
}

#[test]
fn test_search_trains_wrong_set_fails() {
    let mut server = Server::new();
    mock_json(&mut server, "/api/search", r#"[{"number": "101"}]"#);

    let status = validate(
        &SearchTrains::new(query("AAA", "BBB"), ["101", "102"]),
        &site_for(&server),
    );
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("102"));
}

#[test]
fn test_search_trains_sends_declared_filters() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("from".into(), "BCT".into()),
            Matcher::UrlEncoded("to".into(), "ADI".into()),
            Matcher::UrlEncoded("class".into(), "CC".into()),
            Matcher::UrlEncoded("dt".into(), "slot1".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(r#"[{"number": "12009"}]"#)
        .create();

    let search = SearchQuery {
        ticket_class: Some("CC".to_string()),
        departure_time: Some("slot1".to_string()),
        ..query("BCT", "ADI")
    };
    let status = validate(&SearchTrains::new(search, ["12009"]), &site_for(&server));
    assert_eq!(status.status, Status::Pass);
    mock.assert();
}

#[test]
fn test_train_schedule() {
    let mut server = Server::new();
    server
        .mock("GET", "/trains/12028")
        .with_body(
            r#"<html><body><h1>12028 Shatabdi</h1>
            <table>
              <tr><th>Code</th><th>Station</th><th>Arrival</th><th>Departure</th></tr>
              <tr><td> MAS </td><td>Chennai Central</td><td></td><td>17:30</td></tr>
              <tr><td>SBC</td><td>Bangalore City</td><td>22:25</td><td></td></tr>
            </table></body></html>"#,
        )
        .create();
    let site = site_for(&server);

    let check = TrainSchedule::new(
        "12028",
        rows(&[
            &["Code", "Station", "Arrival", "Departure"],
            &["MAS", "Chennai Central", "", "17:30"],
        ]),
    );
    assert_eq!(validate(&check, &site).status, Status::Pass);

    let check = TrainSchedule::new("12028", rows(&[&["SBC", "Bangalore City", "22:30", ""]]));
    let status = validate(&check, &site);
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("22:30"));
}

#[test]
fn test_train_schedule_without_table_is_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/trains/12028")
        .with_body("<html><body>coming soon</body></html>")
        .create();

    let check = TrainSchedule::new("12028", vec![vec!["MAS".to_string()]]);
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Error);
    assert!(status.message.contains("<table>"));
}

#[test]
fn test_feature_flag() {
    let mut server = Server::new();
    mock_json(&mut server, "/api/flags", r#"{"login": true, "payments": false}"#);
    let site = site_for(&server);

    assert_eq!(validate(&FeatureFlag::new("login"), &site).status, Status::Pass);
    assert_eq!(validate(&FeatureFlag::new("payments"), &site).status, Status::Fail);
    assert_eq!(validate(&FeatureFlag::new("search"), &site).status, Status::Fail);
}

#[test]
fn test_booking_side_effect_matches_row() {
    let mut server = Server::new();
    let book = server
        .mock("POST", "/book-ticket")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("train".into(), "12028".into()),
            Matcher::UrlEncoded("passenger_email".into(), "alice@example.com".into()),
        ]))
        .with_status(200)
        .create();
    mock_latest_booking(
        &mut server,
        &["6", "12007", "EC", "2022-09-30", "Bob", "bob@example.com"],
        &["7", "12028", "CC", "2022-10-01", "Alice", "alice@example.com"],
    );

    let check = BookingSideEffect::new(booking("12028", "2022-10-01", "Alice", "alice@example.com"));
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Pass, "{}", status.message);
    book.assert();
}

#[test]
fn test_booking_side_effect_mismatch_fails() {
    let mut server = Server::new();
    server.mock("POST", "/book-ticket").with_status(200).create();
    mock_latest_booking(
        &mut server,
        &["6", "12007", "EC", "2022-09-30", "Bob", "bob@example.com"],
        &["7", "12028", "EC", "2022-10-01", "Alice", "alice@example.com"],
    );

    let check = BookingSideEffect::new(booking("12028", "2022-10-01", "Alice", "alice@example.com"));
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("ticket_class"));
}

/// A 2xx from /book-ticket that stores nothing must not pass on an old matching row.
#[test]
fn test_booking_side_effect_ignores_earlier_row() {
    let mut server = Server::new();
    server.mock("POST", "/book-ticket").with_status(200).create();
    let earlier = ["7", "12028", "CC", "2022-10-01", "Alice", "alice@example.com"];
    mock_latest_booking(&mut server, &earlier, &earlier);

    let check = BookingSideEffect::new(booking("12028", "2022-10-01", "Alice", "alice@example.com"));
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("no new booking was stored"));
}

/// Scenario E: the booking was posted but no row was persisted.
#[test]
fn test_booking_side_effect_no_rows() {
    let mut server = Server::new();
    server.mock("POST", "/book-ticket").with_status(200).create();
    server
        .mock("GET", "/data-explorer")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "select * from booking order by id desc limit 1".into(),
        ))
        .with_body(explorer_html(&["id", "train_number"], &[]))
        .create();

    let check = BookingSideEffect::new(booking("12028", "2022-10-01", "Alice", "alice@example.com"));
    let status = validate(&check, &site_for(&server));
    assert!(matches!(status.status, Status::Fail | Status::Error));
    assert!(status.message.contains("Could not make booking"));
}

#[test]
fn test_booking_rejected_fails() {
    let mut server = Server::new();
    server.mock("POST", "/book-ticket").with_status(404).create();
    let earlier = ["6", "12007", "EC", "2022-09-30", "Bob", "bob@example.com"];
    mock_latest_booking(&mut server, &earlier, &earlier);

    let check = BookingSideEffect::new(booking("12028", "2022-10-01", "Alice", "alice@example.com"));
    let status = validate(&check, &site_for(&server));
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("Could not make booking"));
}

#[test]
fn test_trip_listing_shares_session() {
    let mut server = Server::new();
    let login = server
        .mock("POST", "/login")
        .match_body(Matcher::UrlEncoded("email".into(), "carol@example.com".into()))
        .with_header("set-cookie", "session=carol; Path=/")
        .with_body("welcome")
        .create();
    let book = server
        .mock("POST", "/book-ticket")
        .match_header("cookie", Matcher::Regex("session=carol".into()))
        .with_status(200)
        .expect(2)
        .create();
    server
        .mock("GET", "/bookings")
        .match_header("cookie", Matcher::Regex("session=carol".into()))
        .with_body(
            r#"<html><body>
            <div class="booking"><h3>12028 Shatabdi</h3><p>2022-10-03</p><p>Carol</p></div>
            <div class="booking"><h3>12007 Shatabdi</h3><p>2022-10-04</p><p>Dave</p></div>
            </body></html>"#,
        )
        .create();

    let site = site_for(&server);
    let check = TripListing::new(
        "carol@example.com",
        vec![
            booking("12028", "2022-10-03", "Carol", "carol@example.com"),
            booking("12007", "2022-10-04", "Dave", "carol@example.com"),
        ],
    );
    let status = validate(&check, &site);
    assert_eq!(status.status, Status::Pass, "{}", status.message);
    assert!(!site.in_session());
    login.assert();
    book.assert();
}

#[test]
fn test_trip_listing_missing_booking_fails() {
    let mut server = Server::new();
    server.mock("POST", "/login").with_body("ok").create();
    server.mock("POST", "/book-ticket").with_status(200).create();
    server
        .mock("GET", "/bookings")
        .with_body(r#"<div class="card">12028 on 2022-10-03 for Carol</div>"#)
        .create();

    let site = site_for(&server);
    let check = TripListing::new(
        "carol@example.com",
        vec![
            booking("12028", "2022-10-03", "Carol", "carol@example.com"),
            booking("12007", "2022-10-04", "Dave", "carol@example.com"),
        ],
    );
    let status = validate(&check, &site);
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("12007"));
    assert!(!status.message.contains("12028 (CC)"));
    assert!(!site.in_session());
}

#[test]
fn test_trip_listing_login_rejected_fails() {
    let mut server = Server::new();
    server.mock("POST", "/login").with_status(405).create();

    let site = site_for(&server);
    let check = TripListing::new(
        "carol@example.com",
        vec![booking("12028", "2022-10-03", "Carol", "carol@example.com")],
    );
    let status = validate(&check, &site);
    assert_eq!(status.status, Status::Fail);
    assert!(status.message.contains("Could not log in"));
    assert!(!site.in_session());
}
