//! File-level tests for the tabular format: reading, writing, and the
//! render(parse(T)) == T law and the rejection of text it could not keep.

use std::fs;
use std::io::Write;

use fcst_codec::exchange::{from_document, to_document};
use fcst_codec::{CodecError, TabularCodec};
use fcst_core::entities::ForecastMeta;
use fcst_core::enums::PredClass;
use fcst_core::prediction::PredictionData;
use pretty_assertions::assert_eq;
use rstest::rstest;

const HEADER: &str = "unit,target,class,value,cat,prob,sample,quantile,family,param1,param2,param3";

fn with_header(body: &str) -> String {
    format!("{HEADER}\n{body}")
}

fn roundtrip(text: &str) -> String {
    let codec = TabularCodec::default();
    let elements = codec.read_csv(text.as_bytes()).expect("parses");
    let mut out = Vec::new();
    codec.write_csv(&elements, &mut out).expect("writes");
    String::from_utf8(out).expect("utf8")
}

#[rstest]
#[case::point("loc1,pct next week,point,2.1,,,,,,,,\n")]
#[case::integral_float("loc1,pct next week,point,2.0,,,,,,,,\n")]
#[case::named_two_params("loc1,pct next week,named,,,,,,norm,1.1,2.2,\n")]
#[case::named_three_params("loc1,pct next week,named,,,,,,beta,0.5,1,3\n")]
#[case::bin(
    "loc1,season severity,bin,,mild,0.2,,,,,,\n\
     loc1,season severity,bin,,moderate,0.8,,,,,,\n"
)]
#[case::sample(
    "loc2,cases next week,sample,,,,0,,,,,\n\
     loc2,cases next week,sample,,,,2,,,,,\n\
     loc2,cases next week,sample,,,,5,,,,,\n"
)]
#[case::quantile_unordered(
    "loc3,cases next week,quantile,70,,,,0.75,,,,\n\
     loc3,cases next week,quantile,0,,,,0.25,,,,\n"
)]
#[case::date_values("loc1,Season peak week,mode,2019-12-15,,,,,,,,\n")]
#[case::retractions(
    "loc1,pct next week,point,NULL,,,,,,,,\n\
     loc1,pct next week,named,,,,,,NULL,NULL,,\n\
     loc1,cases next week,bin,,NULL,NULL,,,,,,\n"
)]
#[case::interleaved_keys(
    "loc1,t1,bin,,a,0.5,,,,,,\n\
     loc1,t1,bin,,b,0.5,,,,,,\n\
     loc2,t1,bin,,a,1,,,,,,\n\
     loc1,t1,mean,3,,,,,,,,\n"
)]
fn render_of_parse_is_identity(#[case] body: &str) {
    let text = with_header(body);
    assert_eq!(roundtrip(&text), text);
}

#[rstest]
#[case::trailing_zero("loc1,t1,point,1.50,,,,,,,,\n", "value")]
#[case::leading_zeros("loc1,t1,bin,,007,1,,,,,,\n", "cat")]
#[case::integral_prob("loc1,t1,bin,,low,1.0,,,,,,\n", "prob")]
#[case::exponent_sample("loc1,t1,sample,,,,1e3,,,,,\n", "sample")]
#[case::upper_case_bool("loc1,t1,point,TRUE,,,,,,,,\n", "value")]
#[case::padded_level("loc1,t1,quantile,5,,,,0.50,,,,\n", "quantile")]
#[case::plus_sign_param("loc1,t1,named,,,,,,norm,+1,2,\n", "param1")]
fn non_canonical_cells_are_rejected(#[case] body: &str, #[case] column: &str) {
    let err = TabularCodec::default()
        .read_csv(with_header(body).as_bytes())
        .unwrap_err();
    assert!(matches!(err, CodecError::MalformedRows(_)));
    let reason = &err.row_errors()[0].reason;
    assert!(reason.contains("canonical form"), "{reason}");
    assert!(reason.starts_with(column), "{reason}");
}

#[rstest]
#[case::point_with_cat("loc1,t1,point,4,extra,,,,,,,\n", "cat")]
#[case::bin_with_value("loc1,t1,bin,2,low,1,,,,,,\n", "value")]
#[case::sample_with_family("loc1,t1,sample,,,,3,,norm,,,\n", "family")]
#[case::retraction_with_prob("loc1,t1,point,NULL,,0.5,,,,,,\n", "prob")]
fn cells_outside_the_class_columns_are_rejected(#[case] body: &str, #[case] column: &str) {
    let err = TabularCodec::default()
        .read_csv(with_header(body).as_bytes())
        .unwrap_err();
    let reason = &err.row_errors()[0].reason;
    assert!(reason.contains("does not use"), "{reason}");
    assert!(reason.ends_with(column), "{reason}");
}

#[test]
fn end_to_end_bin_rows_parse_to_one_element() {
    let text = with_header(
        "UnitA,Target1,bin,,low,0.3,,,,,,\n\
         UnitA,Target1,bin,,high,0.7,,,,,,\n",
    );
    let elements = TabularCodec::default().read_csv(text.as_bytes()).unwrap();
    assert_eq!(elements.len(), 1);
    let element = &elements.as_slice()[0];
    assert_eq!(element.pred_class(), PredClass::Bin);
    let Some(PredictionData::Bin(bin)) = element.data() else {
        panic!("expected bin payload");
    };
    let total: f64 = bin.entries.iter().map(|e| e.prob).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn columns_in_any_order_are_accepted() {
    let text = "\
param3,param2,param1,family,quantile,sample,prob,cat,value,class,target,unit
,,,,,,,,4,point,t1,u1
";
    let elements = TabularCodec::default().read_csv(text.as_bytes()).unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements.as_slice()[0].unit, "u1");
}

#[test]
fn ragged_rows_are_reported_with_other_errors() {
    let text = with_header(
        "u1,t1,point,1,,,,,,,,\n\
         u1,t1,point,1\n\
         u1,t1,point,1,,,,,,,,\n",
    );
    let err = TabularCodec::default().read_csv(text.as_bytes()).unwrap_err();
    assert!(matches!(err, CodecError::MalformedRows(_)));
    assert_eq!(err.row_errors().len(), 1);
    assert_eq!(err.row_errors()[0].row, 2);
}

#[test]
fn file_roundtrip_through_tempfile() {
    let text = with_header(
        "loc1,pct next week,point,2.1,,,,,,,,\n\
         loc2,pct next week,bin,,1.1,0.3,,,,,,\n\
         loc2,pct next week,bin,,2.2,0.7,,,,,,\n",
    );
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("forecast.csv");
    fs::File::create(&input)
        .unwrap()
        .write_all(text.as_bytes())
        .unwrap();

    let codec = TabularCodec::default();
    let elements = codec.read_csv(fs::File::open(&input).unwrap()).unwrap();
    let output = dir.path().join("export.csv");
    codec
        .write_csv(&elements, fs::File::create(&output).unwrap())
        .unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), text);
}

#[test]
fn csv_and_exchange_forms_agree() {
    let text = with_header(
        "loc1,pct next week,named,,,,,,norm,1.1,2.2,\n\
         loc1,cases next week,quantile,0,,,,0.25,,,,\n\
         loc1,cases next week,quantile,50,,,,0.75,,,,\n\
         loc2,cases next week,sample,,,,NULL,,,,,\n",
    );
    let codec = TabularCodec::default();
    let elements = codec.read_csv(text.as_bytes()).unwrap();
    let meta = ForecastMeta {
        model: "docs_mod".into(),
        timezero: chrono::NaiveDate::from_ymd_opt(2011, 10, 2).unwrap(),
        issued_at: None,
        source: None,
        notes: None,
    };
    let document = to_document(&meta, &elements).unwrap();
    let json = serde_json::to_string(&document).unwrap();
    let decoded = from_document(serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(decoded.elements, elements);
    assert_eq!(decoded.meta, meta);
}
