use viaggiatreno_harvester::parser::{TripParser, parse_trip};
use viaggiatreno_harvester::records::Delays;

fn delays(incoming: Option<i64>, segment: Option<i64>, final_: Option<i64>) -> Delays {
    Delays {
        incoming,
        segment,
        final_,
    }
}

#[test]
fn test_full_trip_pipeline() {
    let bytes = include_bytes!("fixtures/andamento_treno.json");
    let payload = parse_trip(bytes).expect("Failed to parse trip");
    let parser = TripParser::default();

    let summary = parser.parse_summary(&payload);
    assert_eq!(summary.train_number, Some(2145));
    assert_eq!(summary.trip_date, "2023-11-15");
    assert_eq!(summary.origin_id.as_deref(), Some("S01700"));
    assert_eq!(summary.destination.as_deref(), Some("MONZA"));
    assert_eq!(summary.num_stops, 4);
    assert_eq!(summary.num_deleted_stops, 1);
    assert!(!payload.is_deleted());

    let segments = parser.parse_segments(&payload);
    assert_eq!(segments.len(), 6);

    let got: Vec<_> = segments.iter().map(|s| s.delays()).collect();
    assert_eq!(
        got,
        vec![
            delays(None, None, Some(60)),
            delays(Some(60), Some(30), Some(90)),
            delays(Some(90), Some(-30), Some(60)),
            delays(Some(60), None, None),
            delays(None, None, None),
            delays(None, None, Some(30)),
        ]
    );

    let travel = &segments[1];
    assert_eq!(travel.step, 1);
    assert_eq!(travel.from_id.as_deref(), Some("S01700"));
    assert_eq!(travel.to_id.as_deref(), Some("S01326"));
    assert_eq!(travel.from_planned, Some(1_700_004_600));
    assert_eq!(travel.to_real, Some(1_700_005_290));
    assert!(segments.iter().all(|s| s.trip_date == "2023-11-15"));
}

#[test]
fn test_trip_without_stops_field() {
    let payload = parse_trip(br#"{"numeroTreno": 10, "tipoTreno": "ST"}"#).unwrap();
    let parser = TripParser::default();

    assert!(payload.is_deleted());
    assert!(parser.parse_segments(&payload).is_empty());
    let summary = parser.parse_summary(&payload);
    assert_eq!(summary.num_stops, 0);
    assert_eq!(summary.trip_date, "");
}

#[test]
fn test_null_stop_keeps_rest_of_trip() {
    let payload = parse_trip(
        br#"{"numeroTreno": 1, "fermate": [
            {"id": "A", "partenza_teorica": 1000000, "partenzaReale": 1060000},
            null,
            {"id": "B", "arrivo_teorico": 2000000, "arrivoReale": 2120000}
        ]}"#,
    )
    .expect("a null stop must not fail the trip");
    let parser = TripParser::default();

    assert_eq!(parser.parse_summary(&payload).num_stops, 2);
    let segments = parser.parse_segments(&payload);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].delays(), delays(Some(60), Some(60), Some(120)));
}
