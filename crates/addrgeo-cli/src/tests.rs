use super::*;

#[test]
fn parses_resolve_command() {
    let cli = Cli::try_parse_from(["addrgeo-cli", "resolve", "北京市海淀区六道口西北角的羊肉汤馆"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Resolve {
            ref address,
            deadline_ms: None
        } if address == "北京市海淀区六道口西北角的羊肉汤馆"
    ));
}

#[test]
fn parses_resolve_with_deadline() {
    let cli = Cli::try_parse_from(["addrgeo-cli", "resolve", "六道口", "--deadline-ms", "2500"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Resolve {
            deadline_ms: Some(2500),
            ..
        }
    ));
}

#[test]
fn parses_similarity_command() {
    let cli = Cli::try_parse_from(["addrgeo-cli", "similarity", "北苑小街8号", "北苑小街8号院"])
        .expect("expected valid cli args");

    assert!(matches!(cli.command, Commands::Similarity { .. }));
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["addrgeo-cli"]).is_err());
    assert!(Cli::try_parse_from(["addrgeo-cli", "resolve"]).is_err());
}

#[test]
fn similarity_report_has_all_scores() {
    let report = similarity_report(
        SimilarityWeights::default(),
        "朝阳区北苑小街8号院5号楼D区",
        "朝阳区北苑小街8号院5号楼D区",
    );
    assert_eq!(report["token"], 100.0);
    assert_eq!(report["structural"], 100.0);
    assert_eq!(report["score"], 100.0);
}

#[test]
fn tag_text_maps_to_canonical_fields() {
    let fields = fields_from_tag_text(
        "<prov>北京市</prov><district>海淀区</district><poi>六道口</poi><assist>西北角</assist>",
    );
    assert_eq!(fields.city, "北京市");
    assert_eq!(fields.search_keyword(), "海淀区六道口");
    assert_eq!(fields.hint, "西北角");
}

#[test]
fn parses_nearby_command_with_defaults() {
    let cli = Cli::try_parse_from(["addrgeo-cli", "nearby", "116.35,40.0"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Nearby {
            ref location,
            page: 1,
            page_size: 10,
            gazetteer: None,
            ..
        } if location == "116.35,40.0"
    ));
}

#[test]
fn nearby_report_lists_entries_within_radius_nearest_first() {
    let gazetteer = InMemoryGazetteer::from_json_str(
        r#"[
            {"id": "far", "name": "清华大学", "address": "海淀区双清路", "lat": 40.0, "lng": 116.326, "updated_at": 3},
            {"id": "near", "name": "老北京羊肉汤", "address": "海淀区六道口西北角", "lat": 40.001, "lng": 116.349, "updated_at": 1},
            {"id": "mid", "name": "六道口地铁站", "address": "海淀区学院路", "lat": 40.0, "lng": 116.355, "updated_at": 2}
        ]"#,
    )
    .expect("valid snapshot");

    let report = nearby_report(&gazetteer, &Location::new(116.35, 40.0), 1000.0, 1, 10);
    let ids: Vec<&str> = report
        .as_array()
        .expect("array")
        .iter()
        .map(|hit| hit["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["near", "mid"]);
    assert_eq!(report[0]["location"], "116.349,40.001");
    assert!(report[0]["distance_m"].as_f64().unwrap() < report[1]["distance_m"].as_f64().unwrap());
}
