//! Uploads through the service: versioning, cross-version retraction,
//! identical-version policy, and queries over the current view.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fcst_codec::TabularCodec;
use fcst_config::{FcstConfig, IdenticalVersionPolicy};
use fcst_core::entities::{
    CandidateForecast, ForecastMeta, ForecastModel, Project, Target, TimeZero, Unit,
};
use fcst_core::enums::{PredClass, TargetType};
use fcst_store::{ForecastQuery, ForecastService, StoreError};
use fcst_validate::Rule;
use pretty_assertions::assert_eq;
use rstest::rstest;

const HEADER: &str = "unit,target,class,value,cat,prob,sample,quantile,family,param1,param2,param3";

fn model(abbreviation: &str, is_oracle: bool) -> ForecastModel {
    ForecastModel {
        id: String::new(),
        name: abbreviation.to_uppercase(),
        abbreviation: abbreviation.into(),
        team_name: "team".into(),
        description: String::new(),
        contributors: String::new(),
        license: "other".into(),
        notes: String::new(),
        citation: None,
        methods: None,
        home_url: String::new(),
        aux_data_url: None,
        is_oracle,
    }
}

fn target(name: &str, target_type: TargetType) -> Target {
    Target {
        id: String::new(),
        name: name.into(),
        description: String::new(),
        target_type,
        is_step_ahead: true,
        numeric_horizon: Some(1.0),
        reference_date_type: None,
        outcome_variable: None,
        cats: Vec::new(),
    }
}

fn timezero(day: u32, season: Option<&str>) -> TimeZero {
    TimeZero {
        id: String::new(),
        timezero_date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
        data_version_date: None,
        is_season_start: season.is_some(),
        season_name: season.map(str::to_string),
    }
}

fn project() -> Project {
    Project {
        id: String::new(),
        name: "flu".into(),
        description: String::new(),
        home_url: String::new(),
        is_public: true,
        units: vec![
            Unit {
                id: String::new(),
                name: "Location 1".into(),
                abbreviation: "loc1".into(),
            },
            Unit {
                id: String::new(),
                name: "Location 2".into(),
                abbreviation: "loc2".into(),
            },
        ],
        targets: vec![
            target("cases", TargetType::Continuous),
            target("severity", TargetType::Nominal),
        ],
        timezeros: vec![timezero(6, Some("2019-2020")), timezero(13, None)],
        models: vec![model("base", false), model("truth", true)],
    }
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, day, 9, 0, 0).unwrap()
}

fn candidate(model: &str, issued: u32, body: &str) -> CandidateForecast {
    let text = format!("{HEADER}\n{body}");
    CandidateForecast {
        meta: ForecastMeta {
            model: model.into(),
            timezero: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            issued_at: Some(at(issued)),
            source: Some("upload.csv".into()),
            notes: None,
        },
        elements: TabularCodec::default()
            .read_csv(text.as_bytes())
            .expect("parses"),
    }
}

fn service(policy: IdenticalVersionPolicy) -> ForecastService {
    let mut config = FcstConfig::default();
    config.store.identical_version = policy;
    let mut service = ForecastService::new(&config);
    service.register_project(project()).unwrap();
    service
}

const FIRST: &str = "loc1,cases,point,10.5,,,,,,,,\n\
                     loc2,cases,point,3.0,,,,,,,,\n\
                     loc1,severity,bin,,mild,0.4,,,,,,\n\
                     loc1,severity,bin,,severe,0.6,,,,,,\n";

#[test]
fn same_issued_at_is_rejected_at_the_store() {
    let mut service = service(IdenticalVersionPolicy::Store);
    service.upload("flu", candidate("base", 7, FIRST)).unwrap();
    let err = service
        .upload("flu", candidate("base", 7, "loc1,cases,point,11.0,,,,,,,,\n"))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateVersion { .. }));
}

#[test]
fn later_version_can_retract_earlier_prediction() {
    let mut service = service(IdenticalVersionPolicy::Store);
    service.upload("flu", candidate("base", 7, FIRST)).unwrap();
    service
        .upload("flu", candidate("base", 9, "loc2,cases,point,NULL,,,,,,,,\n"))
        .unwrap();

    let now = service.query("flu", &ForecastQuery::default()).unwrap();
    let units: Vec<(&str, &str)> = now
        .iter()
        .map(|row| (row.unit.as_str(), row.target.as_str()))
        .collect();
    assert_eq!(units, vec![("loc1", "cases"), ("loc1", "severity"), ("loc1", "severity")]);

    let before = ForecastQuery {
        as_of: Some(at(8)),
        ..ForecastQuery::default()
    };
    assert_eq!(service.query("flu", &before).unwrap().len(), 4);
}

#[test]
fn retraction_of_unknown_key_still_dangles_across_versions() {
    let mut service = service(IdenticalVersionPolicy::Store);
    service.upload("flu", candidate("base", 7, FIRST)).unwrap();
    let err = service
        .upload("flu", candidate("base", 9, "loc2,severity,point,NULL,,,,,,,,\n"))
        .unwrap_err();
    match err {
        StoreError::Validation(err) => {
            assert_eq!(err.violations()[0].rule, Rule::DanglingRetraction);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn backdated_version_cannot_retract_a_later_prediction() {
    let mut service = service(IdenticalVersionPolicy::Store);
    service.upload("flu", candidate("base", 9, FIRST)).unwrap();
    let err = service
        .upload("flu", candidate("base", 7, "loc2,cases,point,NULL,,,,,,,,\n"))
        .unwrap_err();
    match err {
        StoreError::Validation(err) => {
            assert_eq!(err.violations()[0].rule, Rule::DanglingRetraction);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    service
        .upload("flu", candidate("base", 7, "loc2,cases,point,2.5,,,,,,,,\n"))
        .unwrap();
    assert_eq!(service.query("flu", &ForecastQuery::default()).unwrap().len(), 4);
}

#[rstest]
#[case(IdenticalVersionPolicy::Store, true)]
#[case(IdenticalVersionPolicy::Skip, false)]
fn identical_upload_follows_policy(#[case] policy: IdenticalVersionPolicy, #[case] stored: bool) {
    let mut service = service(policy);
    let first = service.upload("flu", candidate("base", 7, FIRST)).unwrap();
    assert_eq!(first.equivalent_to, None);

    let reordered = "loc1,severity,bin,,severe,0.6,,,,,,\n\
                     loc1,severity,bin,,mild,0.4,,,,,,\n\
                     loc2,cases,point,3.0,,,,,,,,\n\
                     loc1,cases,point,10.5,,,,,,,,\n";
    let second = service.upload("flu", candidate("base", 9, reordered)).unwrap();
    assert_eq!(second.equivalent_to, first.forecast_id);
    assert_eq!(second.is_stored(), stored);
    assert_eq!(service.store().forecast_count(), if stored { 2 } else { 1 });
}

#[test]
fn query_rows_carry_season_and_skip_oracles() {
    let mut service = service(IdenticalVersionPolicy::Store);
    service.upload("flu", candidate("base", 7, FIRST)).unwrap();
    service
        .upload("flu", candidate("truth", 7, "loc1,cases,point,12.0,,,,,,,,\n"))
        .unwrap();

    let query = ForecastQuery {
        classes: vec![PredClass::Point],
        ..ForecastQuery::default()
    };
    let rows = service.query("flu", &query).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.model == "base"));
    assert_eq!(rows[0].season, "2019-2020");
    assert_eq!(rows[0].timezero, "2020-01-06");
    assert_eq!(rows[0].value, "10.5");
}

#[test]
fn unknown_query_names_are_reported_together() {
    let service = service(IdenticalVersionPolicy::Store);
    let query = ForecastQuery {
        models: vec!["nobody".into()],
        units: vec!["loc9".into()],
        timezeros: vec![NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()],
        ..ForecastQuery::default()
    };
    let err = service.query("flu", &query).unwrap_err();
    match err {
        StoreError::UnknownReferences { names } => {
            assert_eq!(names, vec!["model nobody", "unit loc9", "timezero 2021-01-01"]);
        }
        other => panic!("expected unknown references, got {other:?}"),
    }
}

#[test]
fn row_limit_is_enforced() {
    let mut config = FcstConfig::default();
    config.store.max_query_rows = 2;
    let mut service = ForecastService::new(&config);
    service.register_project(project()).unwrap();
    service.upload("flu", candidate("base", 7, FIRST)).unwrap();

    let err = service.query("flu", &ForecastQuery::default()).unwrap_err();
    assert!(matches!(err, StoreError::TooManyRows { limit: 2 }));
}

#[test]
fn unknown_project_is_not_found() {
    let mut service = service(IdenticalVersionPolicy::Store);
    let err = service
        .upload("measles", candidate("base", 7, FIRST))
        .unwrap_err();
    assert!(matches!(err, StoreError::Core(_)));
}
